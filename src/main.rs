use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use cinefeed_api::config::Config;
use cinefeed_api::db::{self, RatingStore};
use cinefeed_api::routes::{create_router, AppState};
use cinefeed_api::services::library::LibraryService;
use cinefeed_api::services::providers::TmdbProvider;
use cinefeed_api::services::recommendations::RecommendationService;
use cinefeed_api::services::weights::WeightScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::postgres::run_migrations(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = db::Cache::new(redis_client).await;

    let catalog = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        Duration::from_secs(config.catalog_timeout_secs),
    )?);

    let store = Arc::new(RatingStore::new(pool));
    let scheduler = WeightScheduler::new(store.clone(), &config);

    let state = AppState {
        library: Arc::new(LibraryService::new(
            store.clone(),
            catalog.clone(),
            scheduler.clone(),
        )),
        recommender: Arc::new(RecommendationService::new(store, catalog)),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain background work before exiting
    scheduler.shutdown().await;
    cache_handle.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
