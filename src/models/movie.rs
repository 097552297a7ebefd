use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Days after which a cached movie record is due for a catalog refresh
pub const MOVIE_CACHE_STALE_DAYS: i64 = 30;

/// A genre as the catalog defines it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A cast member, ordered by billing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

/// A plot keyword attached to a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
}

/// A production company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub id: i64,
    pub name: String,
}

/// A movie collection (franchise) reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: i64,
    pub name: String,
}

/// Cached snapshot of a catalog movie with the metadata the engine consumes
///
/// Read-mostly: written when a movie is first rated or watchlisted, refreshed
/// once the snapshot is older than [`MOVIE_CACHE_STALE_DAYS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub tmdb_id: i64,
    pub title: String,
    pub genres: Vec<Genre>,
    pub director: Option<String>,
    pub director_id: Option<i64>,
    pub cast: Vec<CastMember>,
    pub keywords: Vec<Keyword>,
    pub collection: Option<CollectionRef>,
    pub companies: Vec<ProductionCompany>,
    pub release_date: Option<NaiveDate>,
    pub runtime: Option<i32>,
    pub vote_average: f64,
    pub vote_count: i64,
    pub original_language: Option<String>,
    pub refreshed_at: DateTime<Utc>,
}

impl MovieRecord {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.refreshed_at).num_days() >= MOVIE_CACHE_STALE_DAYS
    }
}

/// A catalog list item eligible for scoring and ranking
///
/// Carries only the summary fields the catalog returns on list endpoints;
/// full metadata lives in [`MovieRecord`] once a movie enters the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub genre_ids: Vec<i64>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    pub release_date: Option<NaiveDate>,
    pub original_language: Option<String>,
}

impl CandidateMovie {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

/// One page of catalog list results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub results: Vec<CandidateMovie>,
    pub total_pages: i32,
}

/// A promotional video attached to a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub name: String,
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub official: bool,
}

/// Picks the most presentable trailer from a movie's video list
///
/// Evaluates an ordered list of predicates and returns the first match:
/// official YouTube trailers beat plain trailers beat teasers beat anything
/// else hosted on YouTube.
pub fn best_trailer(videos: &[Video]) -> Option<&Video> {
    let tiers: [fn(&Video) -> bool; 4] = [
        |v| v.site == "YouTube" && v.kind == "Trailer" && v.official,
        |v| v.site == "YouTube" && v.kind == "Trailer",
        |v| v.site == "YouTube" && v.kind == "Teaser",
        |v| v.site == "YouTube",
    ];

    tiers
        .iter()
        .find_map(|matches| videos.iter().find(|&v| matches(v)))
}

/// Streaming options for a movie in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WatchProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<ProviderEntry>,
    #[serde(default)]
    pub rent: Vec<ProviderEntry>,
    #[serde(default)]
    pub buy: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie entry as TMDB list endpoints return it (search/similar/discover/...)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
}

impl From<TmdbListMovie> for CandidateMovie {
    fn from(movie: TmdbListMovie) -> Self {
        CandidateMovie {
            tmdb_id: movie.id,
            title: movie.title,
            genre_ids: movie.genre_ids,
            overview: movie.overview,
            poster_path: movie.poster_path,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            popularity: movie.popularity,
            release_date: parse_tmdb_date(movie.release_date.as_deref()),
            original_language: movie.original_language,
        }
    }
}

/// One page of a TMDB list response
#[derive(Debug, Deserialize)]
pub struct TmdbPage {
    pub results: Vec<TmdbListMovie>,
    #[serde(default)]
    pub total_pages: i32,
}

impl From<TmdbPage> for CatalogPage {
    fn from(page: TmdbPage) -> Self {
        CatalogPage {
            results: page.results.into_iter().map(CandidateMovie::from).collect(),
            total_pages: page.total_pages,
        }
    }
}

/// Full movie details with credits and keywords appended
#[derive(Debug, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub belongs_to_collection: Option<CollectionRef>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub keywords: Option<TmdbKeywordList>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastEntry>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbCastEntry {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbCrewEntry {
    pub id: i64,
    pub name: String,
    pub job: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TmdbKeywordList {
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

/// Response of the videos endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TmdbVideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

/// Response of the watch-providers endpoint, keyed by region code
#[derive(Debug, Default, Deserialize)]
pub struct TmdbWatchProviderMap {
    #[serde(default)]
    pub results: HashMap<String, WatchProviders>,
}

/// Number of billed cast members retained on a cached record
const CAST_RETAINED: usize = 10;

impl From<TmdbMovieDetails> for MovieRecord {
    fn from(details: TmdbMovieDetails) -> Self {
        let credits = details.credits.unwrap_or_default();
        let director = credits.crew.iter().find(|c| c.job == "Director");

        let mut cast: Vec<CastMember> = credits
            .cast
            .into_iter()
            .map(|c| CastMember {
                id: c.id,
                name: c.name,
                character: c.character,
            })
            .collect();
        cast.truncate(CAST_RETAINED);

        MovieRecord {
            tmdb_id: details.id,
            title: details.title,
            genres: details.genres,
            director: director.map(|d| d.name.clone()),
            director_id: director.map(|d| d.id),
            cast,
            keywords: details.keywords.unwrap_or_default().keywords,
            collection: details.belongs_to_collection,
            companies: details.production_companies,
            release_date: parse_tmdb_date(details.release_date.as_deref()),
            runtime: details.runtime,
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            original_language: details.original_language,
            refreshed_at: Utc::now(),
        }
    }
}

/// TMDB serializes unknown release dates as the empty string
fn parse_tmdb_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
