use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::library::LibraryService;
use crate::services::recommendations::RecommendationService;

pub mod discover;
pub mod movies;
pub mod ratings;
pub mod recommendations;
pub mod watchlist;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<LibraryService>,
    pub recommender: Arc<RecommendationService>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes(state: AppState) -> Router {
    Router::new()
        // Ratings
        .route("/ratings", post(ratings::rate))
        .route("/ratings/:user_id", get(ratings::history))
        .route("/ratings/:user_id/:movie_id", delete(ratings::remove))
        // Watchlist
        .route("/watchlist", post(watchlist::add))
        .route("/watchlist/:user_id", get(watchlist::list))
        .route("/watchlist/:user_id/:movie_id", delete(watchlist::remove))
        .route(
            "/watchlist/:user_id/:movie_id/watched",
            post(watchlist::mark_watched),
        )
        // Personalization
        .route("/profile/:user_id", get(recommendations::profile))
        .route(
            "/recommendations/:user_id",
            get(recommendations::recommend),
        )
        .route("/discover/:user_id", get(discover::feed))
        // Catalog
        .route("/search", get(movies::search))
        .route("/movies/:movie_id", get(movies::detail))
        .route(
            "/movies/:movie_id/interactions",
            post(movies::record_interaction),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
