use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    CastMember, CollectionRef, Genre, Keyword, MovieRecord, ProductionCompany, RatedMovie,
    RatingEvent, RatingLevel, WatchPriority, WatchlistEntry, WatchlistItem, WeightProfile,
};

/// Persistent store for ratings, watchlist entries, cached movie metadata and
/// learned weight profiles
///
/// All provider-shaped nested movie fields cross this boundary as typed JSONB
/// columns; nothing downstream ever sees untyped JSON.
#[derive(Clone)]
pub struct RatingStore {
    pool: PgPool,
}

/// Flat row of a rating joined with its cached movie
#[derive(FromRow)]
struct RatedMovieRow {
    user_id: Uuid,
    movie_id: i64,
    level: i16,
    watched: bool,
    rated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    movie: MovieRow,
}

#[derive(FromRow)]
struct WatchlistItemRow {
    user_id: Uuid,
    movie_id: i64,
    priority: String,
    note: Option<String>,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    movie: MovieRow,
}

#[derive(FromRow)]
struct MovieRow {
    tmdb_id: i64,
    title: String,
    genres: Json<Vec<Genre>>,
    director: Option<String>,
    director_id: Option<i64>,
    cast_members: Json<Vec<CastMember>>,
    keywords: Json<Vec<Keyword>>,
    collection: Option<Json<CollectionRef>>,
    companies: Json<Vec<ProductionCompany>>,
    release_date: Option<NaiveDate>,
    runtime: Option<i32>,
    vote_average: f64,
    vote_count: i64,
    original_language: Option<String>,
    refreshed_at: DateTime<Utc>,
}

impl From<MovieRow> for MovieRecord {
    fn from(row: MovieRow) -> Self {
        MovieRecord {
            tmdb_id: row.tmdb_id,
            title: row.title,
            genres: row.genres.0,
            director: row.director,
            director_id: row.director_id,
            cast: row.cast_members.0,
            keywords: row.keywords.0,
            collection: row.collection.map(|c| c.0),
            companies: row.companies.0,
            release_date: row.release_date,
            runtime: row.runtime,
            vote_average: row.vote_average,
            vote_count: row.vote_count,
            original_language: row.original_language,
            refreshed_at: row.refreshed_at,
        }
    }
}

impl TryFrom<RatedMovieRow> for RatedMovie {
    type Error = AppError;

    fn try_from(row: RatedMovieRow) -> Result<Self, Self::Error> {
        Ok(RatedMovie {
            event: RatingEvent {
                user_id: row.user_id,
                movie_id: row.movie_id,
                level: RatingLevel::try_from(row.level)?,
                watched: row.watched,
                rated_at: row.rated_at,
            },
            movie: row.movie.into(),
        })
    }
}

impl TryFrom<WatchlistItemRow> for WatchlistItem {
    type Error = AppError;

    fn try_from(row: WatchlistItemRow) -> Result<Self, Self::Error> {
        Ok(WatchlistItem {
            entry: WatchlistEntry {
                user_id: row.user_id,
                movie_id: row.movie_id,
                priority: WatchPriority::parse(&row.priority)?,
                note: row.note,
                added_at: row.added_at,
            },
            movie: row.movie.into(),
        })
    }
}

const MOVIE_COLUMNS: &str = "m.tmdb_id, m.title, m.genres, m.director, m.director_id, \
     m.cast_members, m.keywords, m.collection, m.companies, m.release_date, m.runtime, \
     m.vote_average, m.vote_count, m.original_language, m.refreshed_at";

impl RatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    /// Full rating history with joined movie metadata, most recent first
    pub async fn get_rating_history(&self, user_id: Uuid) -> AppResult<Vec<RatedMovie>> {
        let sql = format!(
            "SELECT r.user_id, r.movie_id, r.level, r.watched, r.rated_at, {MOVIE_COLUMNS} \
             FROM ratings r JOIN movie_cache m ON m.tmdb_id = r.movie_id \
             WHERE r.user_id = $1 ORDER BY r.rated_at DESC"
        );

        let rows: Vec<RatedMovieRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RatedMovie::try_from).collect()
    }

    /// Creates or overwrites the single rating for (user, movie)
    pub async fn upsert_rating(
        &self,
        user_id: Uuid,
        movie_id: i64,
        level: RatingLevel,
        watched: bool,
    ) -> AppResult<()> {
        Self::upsert_rating_exec(&self.pool, user_id, movie_id, level, watched).await
    }

    async fn upsert_rating_exec<'e, E>(
        executor: E,
        user_id: Uuid,
        movie_id: i64,
        level: RatingLevel,
        watched: bool,
    ) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO ratings (user_id, movie_id, level, watched, rated_at) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (user_id, movie_id) \
             DO UPDATE SET level = $3, watched = $4, rated_at = now()",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(level.as_i16())
        .bind(watched)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Explicit "remove from my movies"
    pub async fn delete_rating(&self, user_id: Uuid, movie_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM ratings WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No rating for movie {} in this library",
                movie_id
            )));
        }

        Ok(())
    }

    pub async fn count_ratings(&self, user_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM ratings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get::<i64, _>("count")?)
    }

    /// Movie ids the user has already rated or watchlisted
    ///
    /// Anything in this set must never appear in ranked output.
    pub async fn excluded_ids(&self, user_id: Uuid) -> AppResult<std::collections::HashSet<i64>> {
        let rows = sqlx::query(
            "SELECT movie_id FROM ratings WHERE user_id = $1 \
             UNION SELECT movie_id FROM watchlist WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(row.try_get::<i64, _>("movie_id")?))
            .collect()
    }

    // ------------------------------------------------------------------
    // Watchlist
    // ------------------------------------------------------------------

    pub async fn get_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistItem>> {
        let sql = format!(
            "SELECT w.user_id, w.movie_id, w.priority, w.note, w.added_at, {MOVIE_COLUMNS} \
             FROM watchlist w JOIN movie_cache m ON m.tmdb_id = w.movie_id \
             WHERE w.user_id = $1 ORDER BY w.added_at DESC"
        );

        let rows: Vec<WatchlistItemRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(WatchlistItem::try_from).collect()
    }

    /// Adds a watchlist entry; a second add for the same movie is rejected
    pub async fn create_watchlist_entry(
        &self,
        user_id: Uuid,
        movie_id: i64,
        priority: WatchPriority,
        note: Option<&str>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO watchlist (user_id, movie_id, priority, note, added_at) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (user_id, movie_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(priority.as_str())
        .bind(note)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyExists(format!(
                "Movie {} is already on the watchlist",
                movie_id
            )));
        }

        Ok(())
    }

    pub async fn delete_watchlist_entry(&self, user_id: Uuid, movie_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Movie {} is not on the watchlist",
                movie_id
            )));
        }

        Ok(())
    }

    /// Atomically converts a watchlist entry into a rating
    ///
    /// Both the entry deletion and the rating upsert commit together or not at
    /// all; a missing entry rolls back without touching the ratings table.
    pub async fn mark_watched(
        &self,
        user_id: Uuid,
        movie_id: i64,
        level: RatingLevel,
    ) -> AppResult<()> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(AppError::NotFound(format!(
                "Movie {} is not on the watchlist",
                movie_id
            )));
        }

        Self::upsert_rating_exec(&mut *tx, user_id, movie_id, level, true).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            movie_id = movie_id,
            level = level.as_i16(),
            "Watchlist entry converted to rating"
        );

        Ok(())
    }

    // ------------------------------------------------------------------
    // Movie cache
    // ------------------------------------------------------------------

    pub async fn get_movie(&self, movie_id: i64) -> AppResult<Option<MovieRecord>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movie_cache m WHERE m.tmdb_id = $1");

        let row: Option<MovieRow> = sqlx::query_as(&sql)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(MovieRecord::from))
    }

    /// Inserts or refreshes a cached movie snapshot
    pub async fn upsert_movie(&self, movie: &MovieRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO movie_cache \
             (tmdb_id, title, genres, director, director_id, cast_members, keywords, \
              collection, companies, release_date, runtime, vote_average, vote_count, \
              original_language, refreshed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (tmdb_id) DO UPDATE SET \
              title = $2, genres = $3, director = $4, director_id = $5, cast_members = $6, \
              keywords = $7, collection = $8, companies = $9, release_date = $10, \
              runtime = $11, vote_average = $12, vote_count = $13, original_language = $14, \
              refreshed_at = $15",
        )
        .bind(movie.tmdb_id)
        .bind(&movie.title)
        .bind(Json(&movie.genres))
        .bind(&movie.director)
        .bind(movie.director_id)
        .bind(Json(&movie.cast))
        .bind(Json(&movie.keywords))
        .bind(movie.collection.as_ref().map(Json))
        .bind(Json(&movie.companies))
        .bind(movie.release_date)
        .bind(movie.runtime)
        .bind(movie.vote_average)
        .bind(movie.vote_count)
        .bind(&movie.original_language)
        .bind(movie.refreshed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Weight profiles
    // ------------------------------------------------------------------

    pub async fn get_weight_profile(&self, user_id: Uuid) -> AppResult<Option<WeightProfile>> {
        let row = sqlx::query(
            "SELECT user_id, genres, directors, actors, keywords, runtime_fit, era, \
             recency, popularity, rating_count, last_calculated \
             FROM weight_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut profile = WeightProfile {
            user_id: row.try_get("user_id")?,
            genres: row.try_get("genres")?,
            directors: row.try_get("directors")?,
            actors: row.try_get("actors")?,
            keywords: row.try_get("keywords")?,
            runtime_fit: row.try_get("runtime_fit")?,
            era: row.try_get("era")?,
            recency: row.try_get("recency")?,
            popularity: row.try_get("popularity")?,
            rating_count: row.try_get("rating_count")?,
            last_calculated: row.try_get("last_calculated")?,
        };
        // Bounds hold even if the row was edited out-of-band
        profile.clamp_all();

        Ok(Some(profile))
    }

    pub async fn upsert_weight_profile(&self, profile: &WeightProfile) -> AppResult<()> {
        let mut clamped = profile.clone();
        clamped.clamp_all();

        sqlx::query(
            "INSERT INTO weight_profiles \
             (user_id, genres, directors, actors, keywords, runtime_fit, era, recency, \
              popularity, rating_count, last_calculated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (user_id) DO UPDATE SET \
              genres = $2, directors = $3, actors = $4, keywords = $5, runtime_fit = $6, \
              era = $7, recency = $8, popularity = $9, rating_count = $10, \
              last_calculated = $11",
        )
        .bind(clamped.user_id)
        .bind(clamped.genres)
        .bind(clamped.directors)
        .bind(clamped.actors)
        .bind(clamped.keywords)
        .bind(clamped.runtime_fit)
        .bind(clamped.era)
        .bind(clamped.recency)
        .bind(clamped.popularity)
        .bind(clamped.rating_count)
        .bind(clamped.last_calculated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
