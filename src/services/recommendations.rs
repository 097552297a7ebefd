//! Recommendation orchestration: wires the store, preference extractor,
//! learned weights, candidate aggregator, scorer and ranker into the
//! outward-facing feed operations.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::RatingStore;
use crate::error::AppResult;
use crate::models::{CandidateMovie, CatalogPage, PreferenceProfile, ScoredCandidate};
use crate::services::candidates::CandidateAggregator;
use crate::services::preferences::build_profile;
use crate::services::providers::{CatalogProvider, DiscoverParams, DiscoverSort};
use crate::services::ranking::{
    apply_style_filter, build_discover_params, tiered_shuffle, DiscoverCategory, StyleFilter,
};
use crate::services::scoring::score_pool;

/// Candidates gathered per requested result, before ranking trims the pool
const POOL_FACTOR: usize = 3;

/// Mood shortcut applied as a soft genre pre-filter on the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodFilter {
    Uplifting,
    Intense,
    Thoughtful,
    Scary,
    Lighthearted,
}

impl MoodFilter {
    /// Catalog genre ids that fit the mood
    fn genre_ids(self) -> &'static [i64] {
        match self {
            // comedy, family, music
            MoodFilter::Uplifting => &[35, 10751, 10402],
            // action, thriller, war
            MoodFilter::Intense => &[28, 53, 10752],
            // drama, documentary, history
            MoodFilter::Thoughtful => &[18, 99, 36],
            // horror, mystery
            MoodFilter::Scary => &[27, 9648],
            // comedy, romance, animation
            MoodFilter::Lighthearted => &[35, 10749, 16],
        }
    }
}

/// Extra filters accepted by the discover feed
#[derive(Debug, Clone, Default)]
pub struct DiscoverFilters {
    pub genre_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub director_id: Option<i64>,
    pub company_id: Option<i64>,
}

pub struct RecommendationService {
    store: Arc<RatingStore>,
    catalog: Arc<dyn CatalogProvider>,
}

impl RecommendationService {
    pub fn new(store: Arc<RatingStore>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { store, catalog }
    }

    /// Recomputes the preference profile from the current history
    pub async fn preference_profile(&self, user_id: Uuid) -> AppResult<PreferenceProfile> {
        let history = self.store.get_rating_history(user_id).await?;
        Ok(build_profile(&history))
    }

    /// Free-text catalog search
    pub async fn search(&self, query: &str, page: i32) -> AppResult<CatalogPage> {
        self.catalog.search(query, page).await
    }

    /// The personalized feed: aggregate, score, rank, paginate
    pub async fn recommendations(
        &self,
        user_id: Uuid,
        limit: usize,
        page: usize,
        mood: Option<MoodFilter>,
    ) -> AppResult<Vec<ScoredCandidate>> {
        let history = self.store.get_rating_history(user_id).await?;
        let profile = build_profile(&history);
        let weights = self.store.get_weight_profile(user_id).await?;
        let exclude = self.store.excluded_ids(user_id).await?;

        let aggregator = CandidateAggregator::new(Arc::clone(&self.catalog));
        let pool_target = limit.max(1) * POOL_FACTOR * page.max(1);
        let mut pool = aggregator
            .collect(&history, &profile, &exclude, pool_target)
            .await;

        if let Some(mood) = mood {
            pool = apply_mood_filter(pool, mood);
        }

        let today = Utc::now().date_naive();
        let scored = score_pool(&pool, &profile, weights.as_ref(), today);

        let offset = page.saturating_sub(1) * limit;
        let mut ranked = tiered_shuffle(scored, offset + limit);

        tracing::info!(
            user_id = %user_id,
            pool = pool.len(),
            returned = ranked.len().saturating_sub(offset),
            "Recommendations ranked"
        );

        Ok(ranked.split_off(offset.min(ranked.len())))
    }

    /// Category/style browsing, independent of personalized scoring
    ///
    /// Results still honor the exclusion invariant, and an empty personalized
    /// genre page falls back to a plain catalog genre query.
    pub async fn discover(
        &self,
        user_id: Uuid,
        category: DiscoverCategory,
        style: StyleFilter,
        filters: &DiscoverFilters,
        page: i32,
    ) -> AppResult<Vec<CandidateMovie>> {
        let exclude = self.store.excluded_ids(user_id).await?;
        let today = Utc::now().date_naive();

        let mut params = build_discover_params(category, style, filters.genre_id, page, today);
        params.cast_id = filters.actor_id;
        params.crew_id = filters.director_id;
        params.company_id = filters.company_id;

        // Unfiltered popular/top-rated pages come off the dedicated listing
        // endpoints; everything else needs the discover query
        let unfiltered = style == StyleFilter::All
            && filters.genre_id.is_none()
            && filters.actor_id.is_none()
            && filters.director_id.is_none()
            && filters.company_id.is_none();

        let results = match (unfiltered, category) {
            (true, DiscoverCategory::Popular) => self.catalog.popular(page).await?.results,
            (true, DiscoverCategory::TopRated) => self.catalog.top_rated(page).await?.results,
            _ => self.catalog.discover(&params).await?.results,
        };
        let mut results = filter_excluded(apply_style_filter(results, style), &exclude);

        // A genre the user has never rated often filters down to nothing;
        // fall back to a plain genre query rather than an empty page
        if results.is_empty() {
            if let Some(genre_id) = filters.genre_id {
                tracing::debug!(
                    user_id = %user_id,
                    genre_id = genre_id,
                    "Filtered discover page empty, falling back to plain genre query"
                );
                let fallback = DiscoverParams::new()
                    .with_genres(&[genre_id])
                    .sort(DiscoverSort::PopularityDesc)
                    .page(page);
                let fallback_results = self.catalog.discover(&fallback).await?.results;
                results = filter_excluded(apply_style_filter(fallback_results, style), &exclude);
            }
        }

        Ok(results)
    }
}

fn apply_mood_filter(pool: Vec<CandidateMovie>, mood: MoodFilter) -> Vec<CandidateMovie> {
    let wanted = mood.genre_ids();
    let matching: Vec<CandidateMovie> = pool
        .iter()
        .filter(|m| m.genre_ids.iter().any(|id| wanted.contains(id)))
        .cloned()
        .collect();

    // Soft filter: an empty match keeps the unfiltered pool
    if matching.is_empty() {
        pool
    } else {
        matching
    }
}

fn filter_excluded(results: Vec<CandidateMovie>, exclude: &HashSet<i64>) -> Vec<CandidateMovie> {
    results
        .into_iter()
        .filter(|m| !exclude.contains(&m.tmdb_id))
        .collect()
}
