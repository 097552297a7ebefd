/// Movie catalog provider abstraction
///
/// This module provides a pluggable seam for the external movie catalog
/// (TMDB today). Everything the engine knows about movies outside the user's
/// own library flows through this trait, which keeps the aggregation and
/// scoring pipeline testable against a mock catalog.
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{CatalogPage, Keyword, MovieRecord, Video, WatchProviders},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Sort orders the discover endpoint supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoverSort {
    #[default]
    PopularityDesc,
    VoteAverageDesc,
    ReleaseDateDesc,
}

impl DiscoverSort {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoverSort::PopularityDesc => "popularity.desc",
            DiscoverSort::VoteAverageDesc => "vote_average.desc",
            DiscoverSort::ReleaseDateDesc => "primary_release_date.desc",
        }
    }
}

/// Typed filter set for catalog discovery queries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoverParams {
    pub genre_ids: Vec<i64>,
    pub without_genre_ids: Vec<i64>,
    pub cast_id: Option<i64>,
    pub crew_id: Option<i64>,
    pub company_id: Option<i64>,
    pub original_language: Option<String>,
    pub sort: DiscoverSort,
    pub min_vote_count: i64,
    pub release_after: Option<NaiveDate>,
    pub release_before: Option<NaiveDate>,
    pub page: i32,
}

impl DiscoverParams {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Default::default()
        }
    }

    pub fn with_genres(mut self, ids: &[i64]) -> Self {
        self.genre_ids = ids.to_vec();
        self
    }

    pub fn without_genre(mut self, id: i64) -> Self {
        self.without_genre_ids.push(id);
        self
    }

    pub fn sort(mut self, sort: DiscoverSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn min_votes(mut self, floor: i64) -> Self {
        self.min_vote_count = floor;
        self
    }

    pub fn language(mut self, lang: &str) -> Self {
        self.original_language = Some(lang.to_string());
        self
    }

    pub fn released_between(mut self, after: NaiveDate, before: NaiveDate) -> Self {
        self.release_after = Some(after);
        self.release_before = Some(before);
        self
    }

    pub fn page(mut self, page: i32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Canonical representation used both as the cache key and (split into
    /// pairs) as the request query string
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if !self.genre_ids.is_empty() {
            let joined = self
                .genre_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("with_genres".to_string(), joined));
        }
        if !self.without_genre_ids.is_empty() {
            let joined = self
                .without_genre_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("without_genres".to_string(), joined));
        }
        if let Some(id) = self.cast_id {
            pairs.push(("with_cast".to_string(), id.to_string()));
        }
        if let Some(id) = self.crew_id {
            pairs.push(("with_crew".to_string(), id.to_string()));
        }
        if let Some(id) = self.company_id {
            pairs.push(("with_companies".to_string(), id.to_string()));
        }
        if let Some(lang) = &self.original_language {
            pairs.push(("with_original_language".to_string(), lang.clone()));
        }
        pairs.push(("sort_by".to_string(), self.sort.as_str().to_string()));
        if self.min_vote_count > 0 {
            pairs.push(("vote_count.gte".to_string(), self.min_vote_count.to_string()));
        }
        if let Some(after) = self.release_after {
            pairs.push((
                "primary_release_date.gte".to_string(),
                after.format("%Y-%m-%d").to_string(),
            ));
        }
        if let Some(before) = self.release_before {
            pairs.push((
                "primary_release_date.lte".to_string(),
                before.format("%Y-%m-%d").to_string(),
            ));
        }
        pairs.push(("page".to_string(), self.page.to_string()));

        pairs
    }

    pub fn cache_key(&self) -> String {
        self.to_query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Trait for movie catalog providers
///
/// List endpoints return [`CatalogPage`]s of candidate summaries; `details`
/// returns the full metadata snapshot the library caches. Single-call
/// failures are the caller's concern: aggregation stages degrade to empty
/// contributions, whole-operation callers propagate.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Free-text title search
    async fn search(&self, query: &str, page: i32) -> AppResult<CatalogPage>;

    /// Full movie metadata with credits and keywords appended
    async fn details(&self, movie_id: i64) -> AppResult<MovieRecord>;

    /// Movies the catalog considers similar to the given one
    async fn similar(&self, movie_id: i64, page: i32) -> AppResult<CatalogPage>;

    /// Filtered discovery query
    async fn discover(&self, params: &DiscoverParams) -> AppResult<CatalogPage>;

    /// Generic popularity listing
    async fn popular(&self, page: i32) -> AppResult<CatalogPage>;

    /// Catalog-wide top-rated listing
    async fn top_rated(&self, page: i32) -> AppResult<CatalogPage>;

    /// Plot keywords for one movie
    async fn keywords(&self, movie_id: i64) -> AppResult<Vec<Keyword>>;

    /// Promotional videos for one movie
    async fn videos(&self, movie_id: i64) -> AppResult<Vec<Video>>;

    /// Streaming options for one movie in the given region
    async fn watch_providers(&self, movie_id: i64, region: &str)
        -> AppResult<Option<WatchProviders>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_params_query_pairs() {
        let params = DiscoverParams::new()
            .with_genres(&[28, 12])
            .sort(DiscoverSort::PopularityDesc)
            .min_votes(100)
            .page(2);

        let pairs = params.to_query_pairs();
        assert!(pairs.contains(&("with_genres".to_string(), "28,12".to_string())));
        assert!(pairs.contains(&("sort_by".to_string(), "popularity.desc".to_string())));
        assert!(pairs.contains(&("vote_count.gte".to_string(), "100".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn test_discover_cache_key_is_canonical() {
        let a = DiscoverParams::new().with_genres(&[16]).language("ja");
        let b = DiscoverParams::new().with_genres(&[16]).language("ja");
        assert_eq!(a.cache_key(), b.cache_key());

        let c = DiscoverParams::new().with_genres(&[16]);
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_page_floor_is_one() {
        assert_eq!(DiscoverParams::new().page(0).page, 1);
        assert_eq!(DiscoverParams::new().page(-3).page, 1);
    }

    #[test]
    fn test_release_window_pairs() {
        let after = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let before = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let params = DiscoverParams::new().released_between(after, before);

        let pairs = params.to_query_pairs();
        assert!(pairs.contains(&(
            "primary_release_date.gte".to_string(),
            "2026-02-01".to_string()
        )));
        assert!(pairs.contains(&(
            "primary_release_date.lte".to_string(),
            "2026-08-01".to_string()
        )));
    }
}
