//! Candidate aggregation: builds the de-duplicated, exclusion-filtered pool
//! of movies eligible for scoring in one recommendation pass.
//!
//! Three source strategies run in priority order with short-circuiting:
//! similar-to-liked, preferred-genre discovery, and a popularity fallback.
//! Any single catalog failure degrades to an empty contribution from that
//! source; aggregation itself never fails.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{CandidateMovie, CatalogPage, PreferenceProfile, RatedMovie};
use crate::services::providers::{CatalogProvider, DiscoverParams, DiscoverSort};

/// Recent positively-rated movies used as similar-movie seeds
pub const SIMILAR_SEEDS: usize = 5;

/// Preferred genres fed into the discovery stage
pub const DISCOVER_GENRES: usize = 3;

/// Pool size below which the popularity fallback kicks in
pub const MIN_POOL: usize = 20;

/// Vote-count floor filtering out statistically unreliable niche titles
pub const VOTE_FLOOR: i64 = 100;

pub struct CandidateAggregator {
    catalog: Arc<dyn CatalogProvider>,
}

impl CandidateAggregator {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    /// Collects up to `target` candidates for one recommendation pass
    ///
    /// `history` must be ordered most recent first; `exclude` holds every
    /// movie id already rated or watchlisted and nothing in it ever enters
    /// the pool.
    pub async fn collect(
        &self,
        history: &[RatedMovie],
        profile: &PreferenceProfile,
        exclude: &HashSet<i64>,
        target: usize,
    ) -> Vec<CandidateMovie> {
        let mut seen: HashSet<i64> = exclude.clone();
        let mut pool: Vec<CandidateMovie> = Vec::new();

        self.collect_similar(history, &mut seen, &mut pool).await;

        if pool.len() < target && !profile.preferred_genres.is_empty() {
            self.collect_by_genres(profile, &mut seen, &mut pool).await;
        }

        if pool.len() < MIN_POOL {
            self.collect_popular(&mut seen, &mut pool).await;
        }

        tracing::debug!(
            pool = pool.len(),
            excluded = exclude.len(),
            "Candidate pool assembled"
        );

        pool.truncate(target.max(MIN_POOL));
        pool
    }

    /// Fans out similar-movie lookups for the most recent liked titles
    ///
    /// The lookups run concurrently and each failing branch contributes
    /// nothing while the others proceed.
    async fn collect_similar(
        &self,
        history: &[RatedMovie],
        seen: &mut HashSet<i64>,
        pool: &mut Vec<CandidateMovie>,
    ) {
        let seeds: Vec<i64> = history
            .iter()
            .filter(|r| r.event.level.is_positive())
            .take(SIMILAR_SEEDS)
            .map(|r| r.event.movie_id)
            .collect();

        if seeds.is_empty() {
            return;
        }

        let mut tasks = Vec::new();
        for seed in seeds {
            let catalog = Arc::clone(&self.catalog);
            let task = tokio::spawn(async move { catalog.similar(seed, 1).await });
            tasks.push((seed, task));
        }

        for (seed, task) in tasks {
            match task.await {
                Ok(Ok(page)) => absorb(pool, seen, page, VOTE_FLOOR),
                Ok(Err(e)) => {
                    tracing::warn!(seed = seed, error = %e, "Similar-movies source failed");
                }
                Err(e) => {
                    tracing::warn!(seed = seed, error = %e, "Similar-movies task join error");
                }
            }
        }
    }

    async fn collect_by_genres(
        &self,
        profile: &PreferenceProfile,
        seen: &mut HashSet<i64>,
        pool: &mut Vec<CandidateMovie>,
    ) {
        let genre_ids: Vec<i64> = profile
            .preferred_genres
            .iter()
            .take(DISCOVER_GENRES)
            .map(|g| g.id)
            .collect();

        let params = DiscoverParams::new()
            .with_genres(&genre_ids)
            .sort(DiscoverSort::PopularityDesc)
            .min_votes(VOTE_FLOOR);

        match self.catalog.discover(&params).await {
            Ok(page) => absorb(pool, seen, page, VOTE_FLOOR),
            Err(e) => {
                tracing::warn!(error = %e, "Genre-discovery source failed");
            }
        }
    }

    async fn collect_popular(&self, seen: &mut HashSet<i64>, pool: &mut Vec<CandidateMovie>) {
        match self.catalog.popular(1).await {
            Ok(page) => absorb(pool, seen, page, 0),
            Err(e) => {
                tracing::warn!(error = %e, "Popularity fallback failed");
            }
        }
    }
}

/// Inserts a page's results into the pool, skipping anything already seen or
/// below the vote floor
fn absorb(
    pool: &mut Vec<CandidateMovie>,
    seen: &mut HashSet<i64>,
    page: CatalogPage,
    vote_floor: i64,
) {
    for movie in page.results {
        if movie.vote_count < vote_floor {
            continue;
        }
        if seen.insert(movie.tmdb_id) {
            pool.push(movie);
        }
    }
}
