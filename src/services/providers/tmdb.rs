/// TMDB catalog provider
///
/// Implements [`CatalogProvider`] against the TMDB v3 REST API. Every lookup
/// is cached in Redis through the `cached!` read-through: list pages are
/// short-lived, full details live longer since the library keeps its own
/// 30-day snapshot on top.
///
/// API flow:
/// 1. Lists: /search/movie, /movie/{id}/similar, /discover/movie,
///    /movie/popular, /movie/top_rated → pages of summary entries
/// 2. Details: /movie/{id}?append_to_response=credits,keywords → one call
///    brings back everything the cached record needs
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CatalogPage, Keyword, MovieRecord, TmdbKeywordList, TmdbMovieDetails, TmdbPage,
        TmdbVideoList, TmdbWatchProviderMap, Video, WatchProviders,
    },
    services::providers::{CatalogProvider, DiscoverParams},
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 604800; // 1 week
const LIST_CACHE_TTL: u64 = 21600; // 6 hours

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    /// Creates a TMDB provider with a per-call timeout baked into the client
    ///
    /// The timeout keeps a slow upstream from stalling aggregation; callers
    /// of non-essential lookups degrade the resulting error to an empty
    /// contribution.
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            cache,
        })
    }

    /// Issues a GET and deserializes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    async fn fetch_list(&self, path: &str, page: i32) -> AppResult<CatalogPage> {
        let raw: TmdbPage = self
            .get_json(path, &[("page".to_string(), page.max(1).to_string())])
            .await?;

        Ok(raw.into())
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, query: &str, page: i32) -> AppResult<CatalogPage> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Search {
                query: query.to_string(),
                page,
            },
            SEARCH_CACHE_TTL,
            async move {
                let raw: TmdbPage = self
                    .get_json(
                        "/search/movie",
                        &[
                            ("query".to_string(), query.to_string()),
                            ("page".to_string(), page.max(1).to_string()),
                        ],
                    )
                    .await?;

                let results: CatalogPage = raw.into();

                tracing::info!(
                    query = %query,
                    results = results.results.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok::<_, AppError>(results)
            }
        )
    }

    async fn details(&self, movie_id: i64) -> AppResult<MovieRecord> {
        cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let raw: TmdbMovieDetails = self
                    .get_json(
                        &format!("/movie/{}", movie_id),
                        &[(
                            "append_to_response".to_string(),
                            "credits,keywords".to_string(),
                        )],
                    )
                    .await?;

                tracing::debug!(movie_id = movie_id, provider = "tmdb", "Details fetched");

                Ok::<_, AppError>(MovieRecord::from(raw))
            }
        )
    }

    async fn similar(&self, movie_id: i64, page: i32) -> AppResult<CatalogPage> {
        cached!(
            self.cache,
            CacheKey::Similar { movie_id, page },
            LIST_CACHE_TTL,
            async move { self.fetch_list(&format!("/movie/{}/similar", movie_id), page).await }
        )
    }

    async fn discover(&self, params: &DiscoverParams) -> AppResult<CatalogPage> {
        cached!(
            self.cache,
            CacheKey::Discover(params.cache_key()),
            LIST_CACHE_TTL,
            async move {
                let raw: TmdbPage = self
                    .get_json("/discover/movie", &params.to_query_pairs())
                    .await?;

                Ok::<_, AppError>(CatalogPage::from(raw))
            }
        )
    }

    async fn popular(&self, page: i32) -> AppResult<CatalogPage> {
        cached!(
            self.cache,
            CacheKey::Popular(page),
            LIST_CACHE_TTL,
            async move { self.fetch_list("/movie/popular", page).await }
        )
    }

    async fn top_rated(&self, page: i32) -> AppResult<CatalogPage> {
        cached!(
            self.cache,
            CacheKey::TopRated(page),
            LIST_CACHE_TTL,
            async move { self.fetch_list("/movie/top_rated", page).await }
        )
    }

    async fn keywords(&self, movie_id: i64) -> AppResult<Vec<Keyword>> {
        cached!(
            self.cache,
            CacheKey::Keywords(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let raw: TmdbKeywordList = self
                    .get_json(&format!("/movie/{}/keywords", movie_id), &[])
                    .await?;

                Ok::<_, AppError>(raw.keywords)
            }
        )
    }

    async fn videos(&self, movie_id: i64) -> AppResult<Vec<Video>> {
        cached!(
            self.cache,
            CacheKey::Videos(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let raw: TmdbVideoList = self
                    .get_json(&format!("/movie/{}/videos", movie_id), &[])
                    .await?;

                Ok::<_, AppError>(raw.results)
            }
        )
    }

    async fn watch_providers(
        &self,
        movie_id: i64,
        region: &str,
    ) -> AppResult<Option<WatchProviders>> {
        cached!(
            self.cache,
            CacheKey::WatchProviders {
                movie_id,
                region: region.to_string(),
            },
            LIST_CACHE_TTL,
            async move {
                let mut raw: TmdbWatchProviderMap = self
                    .get_json(&format!("/movie/{}/watch/providers", movie_id), &[])
                    .await?;

                Ok::<_, AppError>(raw.results.remove(&region.to_uppercase()))
            }
        )
    }
}
