use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{PreferenceProfile, ScoredCandidate},
    routes::AppState,
    services::recommendations::MoodFilter,
};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_page")]
    pub page: usize,
    pub mood: Option<MoodFilter>,
}

fn default_limit() -> usize {
    20
}

fn default_page() -> usize {
    1
}

/// Handler for the derived preference profile
pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<PreferenceProfile>> {
    let profile = state.recommender.preference_profile(user_id).await?;
    Ok(Json(profile))
}

/// Handler for the personalized feed
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<ScoredCandidate>>> {
    let feed = state
        .recommender
        .recommendations(user_id, query.limit.clamp(1, 100), query.page, query.mood)
        .await?;

    Ok(Json(feed))
}
