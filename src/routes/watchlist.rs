use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{RatingLevel, WatchPriority, WatchlistItem},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub user_id: Uuid,
    pub movie_id: i64,
    #[serde(default = "default_priority")]
    pub priority: WatchPriority,
    pub note: Option<String>,
}

fn default_priority() -> WatchPriority {
    WatchPriority::Medium
}

#[derive(Debug, Deserialize)]
pub struct MarkWatchedRequest {
    pub level: RatingLevel,
}

/// Handler for queuing a movie; a duplicate add returns 409
pub async fn add(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> AppResult<StatusCode> {
    state
        .library
        .add_to_watchlist(
            request.user_id,
            request.movie_id,
            request.priority,
            request.note.as_deref(),
        )
        .await?;

    Ok(StatusCode::CREATED)
}

/// Handler for listing the watchlist with joined movie metadata
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<WatchlistItem>>> {
    let items = state.library.watchlist(user_id).await?;
    Ok(Json(items))
}

pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(Uuid, i64)>,
) -> AppResult<StatusCode> {
    state.library.remove_from_watchlist(user_id, movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for the atomic watched transition
///
/// The entry deletion and the rating creation commit together; a missing
/// entry is a plain 404 with no partial mutation.
pub async fn mark_watched(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(Uuid, i64)>,
    Json(request): Json<MarkWatchedRequest>,
) -> AppResult<StatusCode> {
    state
        .library
        .mark_watched(user_id, movie_id, request.level)
        .await?;

    Ok(StatusCode::CREATED)
}
