//! The user's movie library: rating mutations, watchlist upkeep, the atomic
//! watched transition, and the movie-metadata cache that backs them.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::RatingStore;
use crate::error::AppResult;
use crate::models::{
    best_trailer, MovieRecord, RatedMovie, RatingLevel, Video, WatchPriority, WatchProviders,
    WatchlistItem,
};
use crate::services::providers::CatalogProvider;
use crate::services::weights::WeightScheduler;

/// Detail-page payload: the cached record enriched with the best trailer and
/// regional streaming options
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetailView {
    pub movie: MovieRecord,
    pub trailer: Option<Video>,
    pub watch_providers: Option<WatchProviders>,
}

pub struct LibraryService {
    store: Arc<RatingStore>,
    catalog: Arc<dyn CatalogProvider>,
    scheduler: Arc<WeightScheduler>,
}

impl LibraryService {
    pub fn new(
        store: Arc<RatingStore>,
        catalog: Arc<dyn CatalogProvider>,
        scheduler: Arc<WeightScheduler>,
    ) -> Self {
        Self {
            store,
            catalog,
            scheduler,
        }
    }

    /// Rates a movie, creating or overwriting the single rating for it
    ///
    /// Caches the movie metadata first so the history join always has a row,
    /// then fires the debounced weight recomputation.
    pub async fn rate(
        &self,
        user_id: Uuid,
        movie_id: i64,
        level: RatingLevel,
        watched: bool,
    ) -> AppResult<()> {
        self.ensure_movie_cached(movie_id).await?;
        self.store
            .upsert_rating(user_id, movie_id, level, watched)
            .await?;

        self.scheduler.notify_rating(user_id);

        tracing::info!(
            user_id = %user_id,
            movie_id = movie_id,
            level = level.as_i16(),
            "Rating recorded"
        );

        Ok(())
    }

    pub async fn history(&self, user_id: Uuid) -> AppResult<Vec<RatedMovie>> {
        self.store.get_rating_history(user_id).await
    }

    /// Explicit "remove from my movies"
    pub async fn remove_rating(&self, user_id: Uuid, movie_id: i64) -> AppResult<()> {
        self.store.delete_rating(user_id, movie_id).await
    }

    pub async fn watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistItem>> {
        self.store.get_watchlist(user_id).await
    }

    /// Queues a movie to watch later; adding it twice is rejected
    pub async fn add_to_watchlist(
        &self,
        user_id: Uuid,
        movie_id: i64,
        priority: WatchPriority,
        note: Option<&str>,
    ) -> AppResult<()> {
        self.ensure_movie_cached(movie_id).await?;
        self.store
            .create_watchlist_entry(user_id, movie_id, priority, note)
            .await
    }

    pub async fn remove_from_watchlist(&self, user_id: Uuid, movie_id: i64) -> AppResult<()> {
        self.store.delete_watchlist_entry(user_id, movie_id).await
    }

    /// Converts a watchlist entry into a rating in one transaction
    ///
    /// Entry deletion and rating creation commit together or not at all; on
    /// success the weight recomputation fires like any other rating.
    pub async fn mark_watched(
        &self,
        user_id: Uuid,
        movie_id: i64,
        level: RatingLevel,
    ) -> AppResult<()> {
        self.store.mark_watched(user_id, movie_id, level).await?;
        self.scheduler.notify_rating(user_id);
        Ok(())
    }

    /// Cached movie detail, refreshed from the catalog when stale
    ///
    /// A stale snapshot survives a catalog outage; only a movie the library
    /// has never seen propagates the fetch failure.
    pub async fn movie_detail(&self, movie_id: i64) -> AppResult<MovieRecord> {
        match self.store.get_movie(movie_id).await? {
            Some(record) if !record.is_stale(Utc::now()) => Ok(record),
            Some(stale) => match self.fetch_record(movie_id).await {
                Ok(fresh) => {
                    self.store.upsert_movie(&fresh).await?;
                    Ok(fresh)
                }
                Err(e) => {
                    tracing::warn!(
                        movie_id = movie_id,
                        error = %e,
                        "Refresh failed, serving stale movie record"
                    );
                    Ok(stale)
                }
            },
            None => {
                let fresh = self.fetch_record(movie_id).await?;
                self.store.upsert_movie(&fresh).await?;
                Ok(fresh)
            }
        }
    }

    /// Fetches a catalog record, backfilling keywords when the appended
    /// response dropped them
    async fn fetch_record(&self, movie_id: i64) -> AppResult<MovieRecord> {
        let mut record = self.catalog.details(movie_id).await?;

        if record.keywords.is_empty() {
            match self.catalog.keywords(movie_id).await {
                Ok(keywords) => record.keywords = keywords,
                Err(e) => {
                    tracing::debug!(movie_id = movie_id, error = %e, "Keyword backfill failed");
                }
            }
        }

        Ok(record)
    }

    /// Full detail page with trailer and streaming options
    ///
    /// The enrichment lookups are non-essential: either failing degrades to
    /// `None` instead of failing the page.
    pub async fn movie_page(&self, movie_id: i64, region: &str) -> AppResult<MovieDetailView> {
        let movie = self.movie_detail(movie_id).await?;

        let trailer = match self.catalog.videos(movie_id).await {
            Ok(videos) => best_trailer(&videos).cloned(),
            Err(e) => {
                tracing::warn!(movie_id = movie_id, error = %e, "Video lookup failed");
                None
            }
        };

        let watch_providers = match self.catalog.watch_providers(movie_id, region).await {
            Ok(providers) => providers,
            Err(e) => {
                tracing::warn!(movie_id = movie_id, error = %e, "Provider lookup failed");
                None
            }
        };

        Ok(MovieDetailView {
            movie,
            trailer,
            watch_providers,
        })
    }

    async fn ensure_movie_cached(&self, movie_id: i64) -> AppResult<()> {
        match self.store.get_movie(movie_id).await? {
            Some(record) if !record.is_stale(Utc::now()) => Ok(()),
            Some(_) | None => {
                // Missing or stale: both want a fetch, but only the missing
                // case may fail the mutation
                match self.fetch_record(movie_id).await {
                    Ok(fresh) => self.store.upsert_movie(&fresh).await,
                    Err(e) => {
                        if self.store.get_movie(movie_id).await?.is_some() {
                            tracing::warn!(
                                movie_id = movie_id,
                                error = %e,
                                "Refresh failed, keeping stale movie record"
                            );
                            Ok(())
                        } else {
                            Err(e)
                        }
                    }
                }
            }
        }
    }

    /// Interaction hook for non-rating actions (viewed detail, dismissed, …)
    ///
    /// Only logged today; kept at the service seam so adding durable
    /// interaction signals does not touch the routing layer.
    pub fn record_interaction(&self, user_id: Uuid, movie_id: i64, action: &str) {
        tracing::info!(
            user_id = %user_id,
            movie_id = movie_id,
            action = %action,
            "Interaction recorded"
        );
    }
}

impl std::fmt::Debug for LibraryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryService").finish_non_exhaustive()
    }
}
