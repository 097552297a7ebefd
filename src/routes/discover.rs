use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::CandidateMovie,
    routes::AppState,
    services::ranking::{DiscoverCategory, StyleFilter},
    services::recommendations::DiscoverFilters,
};

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    #[serde(default)]
    pub category: DiscoverCategory,
    #[serde(default)]
    pub style: StyleFilter,
    pub genre: Option<i64>,
    pub actor: Option<i64>,
    pub director: Option<i64>,
    pub company: Option<i64>,
    #[serde(default = "default_page")]
    pub page: i32,
}

fn default_page() -> i32 {
    1
}

/// Handler for the category/style browse feed
pub async fn feed(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<DiscoverQuery>,
) -> AppResult<Json<Vec<CandidateMovie>>> {
    let filters = DiscoverFilters {
        genre_id: query.genre,
        actor_id: query.actor,
        director_id: query.director,
        company_id: query.company,
    };

    let results = state
        .recommender
        .discover(user_id, query.category, query.style, &filters, query.page)
        .await?;

    Ok(Json(results))
}
