use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult, models::CatalogPage, routes::AppState, services::library::MovieDetailView,
};

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "US".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_page")]
    pub page: i32,
}

fn default_search_page() -> i32 {
    1
}

/// Handler for free-text catalog search
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<CatalogPage>> {
    let page = state.recommender.search(&query.q, query.page).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub user_id: Uuid,
    pub action: String,
}

/// Handler for the movie detail view with trailer and streaming options
pub async fn detail(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> AppResult<Json<MovieDetailView>> {
    let view = state.library.movie_page(movie_id, &query.region).await?;
    Ok(Json(view))
}

/// Handler for non-rating interaction events
pub async fn record_interaction(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    Json(request): Json<InteractionRequest>,
) -> AppResult<StatusCode> {
    state
        .library
        .record_interaction(request.user_id, movie_id, &request.action);

    Ok(StatusCode::ACCEPTED)
}
