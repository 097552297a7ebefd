use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppResult, models::RatedMovie, models::RatingLevel, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub user_id: Uuid,
    pub movie_id: i64,
    pub level: RatingLevel,
    #[serde(default = "default_watched")]
    pub watched: bool,
}

fn default_watched() -> bool {
    true
}

/// Handler for recording a rating; re-rating overwrites in place
pub async fn rate(
    State(state): State<AppState>,
    Json(request): Json<RateRequest>,
) -> AppResult<StatusCode> {
    state
        .library
        .rate(
            request.user_id,
            request.movie_id,
            request.level,
            request.watched,
        )
        .await?;

    Ok(StatusCode::CREATED)
}

/// Handler for the rating history with joined movie metadata
pub async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<RatedMovie>>> {
    let history = state.library.history(user_id).await?;
    Ok(Json(history))
}

/// Handler for removing a movie from the library
pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(Uuid, i64)>,
) -> AppResult<StatusCode> {
    state.library.remove_rating(user_id, movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
