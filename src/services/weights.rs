//! Adaptive signal weighting: estimates, per preference dimension, how
//! strongly that dimension separates the user's liked movies from their
//! disliked ones, and keeps the estimates fresh with a per-user debounced
//! background recomputation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::db::RatingStore;
use crate::error::AppResult;
use crate::models::{RatedMovie, WeightProfile};

/// Most frequent entity ids across liked movies treated as the dimension's
/// top signals
const TOP_SIGNALS: usize = 10;

/// Liked movies required before correlation says anything
const MIN_LIKED_FOR_CORRELATION: usize = 3;

/// Data points the runtime heuristic needs
const MIN_RUNTIME_SAMPLES: usize = 3;

/// Data points the era and recency heuristics need
const MIN_DATED_SAMPLES: usize = 5;

/// Derives the full weight profile from a rating history
///
/// Every multiplier lands in `[MIN_WEIGHT, MAX_WEIGHT]`; with too little
/// history each dimension degrades to the neutral 1.0 rather than erroring.
pub fn learn_weights(user_id: Uuid, history: &[RatedMovie], now_year: i32) -> WeightProfile {
    let liked: Vec<&RatedMovie> = history
        .iter()
        .filter(|r| r.event.level.is_positive())
        .collect();
    let disliked: Vec<&RatedMovie> = history
        .iter()
        .filter(|r| r.event.level.is_negative())
        .collect();

    let mut profile = WeightProfile::neutral(user_id);

    profile.genres = correlation_weight(&liked, &disliked, |m| {
        m.movie.genres.iter().map(|g| g.id).collect()
    });
    profile.directors = correlation_weight(&liked, &disliked, |m| {
        m.movie.director_id.into_iter().collect()
    });
    profile.actors = correlation_weight(&liked, &disliked, |m| {
        m.movie.cast.iter().take(5).map(|c| c.id).collect()
    });
    profile.keywords = correlation_weight(&liked, &disliked, |m| {
        m.movie.keywords.iter().map(|k| k.id).collect()
    });

    profile.runtime_fit = runtime_consistency_weight(&liked);
    profile.era = era_spread_weight(&liked);
    profile.recency = recency_weight(&liked, now_year);
    // Rating rows do not retain the catalog vote average, so there is no
    // stored signal to correlate popularity against; stays neutral.
    profile.popularity = 1.0;

    profile.clamp_all();
    profile
}

/// How well a dimension's top signals discriminate liked from disliked
///
/// multiplier = 1.0 + (hit rate over liked − hit rate over disliked),
/// clamped by the caller.
fn correlation_weight<F>(liked: &[&RatedMovie], disliked: &[&RatedMovie], extract: F) -> f64
where
    F: Fn(&RatedMovie) -> Vec<i64>,
{
    if liked.len() < MIN_LIKED_FOR_CORRELATION {
        return 1.0;
    }

    let mut frequency: HashMap<i64, usize> = HashMap::new();
    for movie in liked {
        for id in extract(movie) {
            *frequency.entry(id).or_default() += 1;
        }
    }

    if frequency.is_empty() {
        return 1.0;
    }

    let mut ranked: Vec<(i64, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let top_signals: HashSet<i64> = ranked
        .into_iter()
        .take(TOP_SIGNALS)
        .map(|(id, _)| id)
        .collect();

    let hit_rate = |movies: &[&RatedMovie]| -> f64 {
        if movies.is_empty() {
            return 0.0;
        }
        let hits = movies
            .iter()
            .filter(|m| extract(m).iter().any(|id| top_signals.contains(id)))
            .count();
        hits as f64 / movies.len() as f64
    };

    let correlation = hit_rate(liked) - hit_rate(disliked);
    1.0 + correlation
}

/// Tighter runtime spread across liked movies boosts the runtime dimension
fn runtime_consistency_weight(liked: &[&RatedMovie]) -> f64 {
    let runtimes: Vec<f64> = liked
        .iter()
        .filter_map(|m| m.movie.runtime)
        .map(f64::from)
        .collect();

    if runtimes.len() < MIN_RUNTIME_SAMPLES {
        return 1.0;
    }

    let mean = runtimes.iter().sum::<f64>() / runtimes.len() as f64;
    let variance =
        runtimes.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / runtimes.len() as f64;
    let std_dev = variance.sqrt();

    match std_dev {
        s if s < 15.0 => 1.5,
        s if s < 25.0 => 1.2,
        s if s > 40.0 => 0.7,
        _ => 1.0,
    }
}

/// Fewer distinct liked decades means era is a stronger signal
fn era_spread_weight(liked: &[&RatedMovie]) -> f64 {
    let decades: HashSet<i32> = liked
        .iter()
        .filter_map(|m| m.movie.release_year())
        .map(|year| (year / 10) * 10)
        .collect();

    let dated = liked
        .iter()
        .filter(|m| m.movie.release_year().is_some())
        .count();
    if dated < MIN_DATED_SAMPLES {
        return 1.0;
    }

    match decades.len() {
        d if d <= 2 => 1.5,
        3 => 1.2,
        d if d >= 6 => 0.8,
        _ => 1.0,
    }
}

/// Average age of liked releases shapes the recency dimension
fn recency_weight(liked: &[&RatedMovie], now_year: i32) -> f64 {
    let ages: Vec<f64> = liked
        .iter()
        .filter_map(|m| m.movie.release_year())
        .map(|year| (now_year - year).max(0) as f64)
        .collect();

    if ages.len() < MIN_DATED_SAMPLES {
        return 1.0;
    }

    let average = ages.iter().sum::<f64>() / ages.len() as f64;
    match average {
        a if a < 5.0 => 1.5,
        a if a < 10.0 => 1.2,
        a if a > 30.0 => 0.6,
        a if a > 20.0 => 0.8,
        _ => 1.0,
    }
}

/// Store operations the scheduler needs; a seam so the debounce policy is
/// testable without a database
#[async_trait::async_trait]
pub trait WeightStore: Send + Sync {
    async fn count_ratings(&self, user_id: Uuid) -> AppResult<i64>;
    async fn get_rating_history(&self, user_id: Uuid) -> AppResult<Vec<RatedMovie>>;
    async fn get_weight_profile(&self, user_id: Uuid) -> AppResult<Option<WeightProfile>>;
    async fn upsert_weight_profile(&self, profile: &WeightProfile) -> AppResult<()>;
}

#[async_trait::async_trait]
impl WeightStore for RatingStore {
    async fn count_ratings(&self, user_id: Uuid) -> AppResult<i64> {
        RatingStore::count_ratings(self, user_id).await
    }

    async fn get_rating_history(&self, user_id: Uuid) -> AppResult<Vec<RatedMovie>> {
        RatingStore::get_rating_history(self, user_id).await
    }

    async fn get_weight_profile(&self, user_id: Uuid) -> AppResult<Option<WeightProfile>> {
        RatingStore::get_weight_profile(self, user_id).await
    }

    async fn upsert_weight_profile(&self, profile: &WeightProfile) -> AppResult<()> {
        RatingStore::upsert_weight_profile(self, profile).await
    }
}

struct PendingRecompute {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Debounced per-user weight recomputation
///
/// At most one pending task exists per user; a new rating inside the quiet
/// window aborts and replaces it, so a burst of ratings coalesces into a
/// single recompute. `shutdown` aborts everything still pending for a clean
/// process exit.
pub struct WeightScheduler {
    store: Arc<dyn WeightStore>,
    delay: Duration,
    min_ratings: i64,
    recompute_every: i32,
    pending: Mutex<HashMap<Uuid, PendingRecompute>>,
    next_generation: AtomicU64,
}

impl WeightScheduler {
    pub fn new(store: Arc<dyn WeightStore>, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            store,
            delay: Duration::from_millis(config.weight_debounce_ms),
            min_ratings: config.weight_min_ratings,
            recompute_every: config.weight_recompute_every,
            pending: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        })
    }

    /// Fire-and-forget trigger invoked on every new rating
    pub fn notify_rating(self: &Arc<Self>, user_id: Uuid) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;

        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(scheduler.delay).await;

            if let Err(e) = scheduler.recompute(user_id).await {
                tracing::warn!(
                    error = %e,
                    user_id = %user_id,
                    "Weight recomputation failed"
                );
            }

            // Clear our own entry unless a newer timer already replaced it
            let mut pending = scheduler.pending.lock().unwrap();
            if pending
                .get(&user_id)
                .is_some_and(|p| p.generation == generation)
            {
                pending.remove(&user_id);
            }
        });

        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.insert(user_id, PendingRecompute { generation, handle }) {
            previous.handle.abort();
            tracing::debug!(user_id = %user_id, "Debounce window reset");
        }
    }

    /// Applies the cost-control policy and recomputes when due
    ///
    /// Without a stored profile, one is created only once the history is big
    /// enough. With one, the counter is bumped and a full recomputation runs
    /// every N-th rating; off-cycle firings persist just the counter.
    async fn recompute(&self, user_id: Uuid) -> AppResult<()> {
        match self.store.get_weight_profile(user_id).await? {
            None => {
                let total = self.store.count_ratings(user_id).await?;
                if total < self.min_ratings {
                    tracing::debug!(
                        user_id = %user_id,
                        total = total,
                        needed = self.min_ratings,
                        "Not enough ratings for a weight profile yet"
                    );
                    return Ok(());
                }
                self.full_recompute(user_id).await
            }
            Some(mut existing) => {
                existing.rating_count += 1;
                if existing.rating_count >= self.recompute_every {
                    self.full_recompute(user_id).await
                } else {
                    self.store.upsert_weight_profile(&existing).await
                }
            }
        }
    }

    async fn full_recompute(&self, user_id: Uuid) -> AppResult<()> {
        let history = self.store.get_rating_history(user_id).await?;
        let mut profile = learn_weights(user_id, &history, Utc::now().year());
        profile.rating_count = 0;

        self.store.upsert_weight_profile(&profile).await?;

        tracing::info!(
            user_id = %user_id,
            ratings = history.len(),
            genres = profile.genres,
            recency = profile.recency,
            "Weight profile recomputed"
        );

        Ok(())
    }

    /// Number of users with a pending recompute timer
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Aborts all pending timers for graceful termination
    pub async fn shutdown(&self) {
        let drained: Vec<PendingRecompute> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().map(|(_, p)| p).collect()
        };

        let count = drained.len();
        for pending in drained {
            pending.handle.abort();
        }

        if count > 0 {
            tracing::info!(aborted = count, "Weight scheduler drained");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CastMember, Genre, Keyword, MovieRecord, RatedMovie, RatingEvent, RatingLevel, MAX_WEIGHT,
        MIN_WEIGHT,
    };
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn movie(id: i64, genre_ids: &[i64], year: i32, runtime: i32) -> MovieRecord {
        MovieRecord {
            tmdb_id: id,
            title: format!("Movie {}", id),
            genres: genre_ids
                .iter()
                .map(|gid| Genre {
                    id: *gid,
                    name: format!("Genre {}", gid),
                })
                .collect(),
            director: None,
            director_id: None,
            cast: vec![CastMember {
                id: id * 100,
                name: format!("Lead {}", id),
                character: None,
            }],
            keywords: vec![Keyword {
                id: id * 1000,
                name: format!("kw{}", id),
            }],
            collection: None,
            companies: Vec::new(),
            release_date: NaiveDate::from_ymd_opt(year, 6, 1),
            runtime: Some(runtime),
            vote_average: 7.0,
            vote_count: 1000,
            original_language: Some("en".to_string()),
            refreshed_at: Utc::now(),
        }
    }

    fn rated(movie: MovieRecord, level: RatingLevel) -> RatedMovie {
        RatedMovie {
            event: RatingEvent {
                user_id: Uuid::nil(),
                movie_id: movie.tmdb_id,
                level,
                watched: true,
                rated_at: Utc::now(),
            },
            movie,
        }
    }

    #[test]
    fn test_too_few_liked_movies_stays_neutral() {
        let history = vec![
            rated(movie(1, &[28], 2020, 120), RatingLevel::Like),
            rated(movie(2, &[28], 2021, 110), RatingLevel::Like),
        ];

        let profile = learn_weights(Uuid::nil(), &history, 2026);
        assert_eq!(profile.genres, 1.0);
        assert_eq!(profile.directors, 1.0);
        assert_eq!(profile.actors, 1.0);
        assert_eq!(profile.keywords, 1.0);
    }

    #[test]
    fn test_discriminating_genre_signal_boosts_weight() {
        // Liked movies all share genre 28; disliked ones never touch it
        let history = vec![
            rated(movie(1, &[28], 2020, 120), RatingLevel::SuperLike),
            rated(movie(2, &[28], 2021, 115), RatingLevel::Like),
            rated(movie(3, &[28], 2022, 125), RatingLevel::Like),
            rated(movie(4, &[27], 2020, 100), RatingLevel::Dislike),
            rated(movie(5, &[99], 2019, 90), RatingLevel::Dislike),
        ];

        let profile = learn_weights(Uuid::nil(), &history, 2026);
        // hit rate 1.0 liked vs 0.0 disliked
        assert_eq!(profile.genres, MAX_WEIGHT);
    }

    #[test]
    fn test_non_discriminating_signal_stays_near_neutral() {
        // Genre 28 appears in everything the user touches
        let history = vec![
            rated(movie(1, &[28], 2020, 120), RatingLevel::Like),
            rated(movie(2, &[28], 2021, 115), RatingLevel::Like),
            rated(movie(3, &[28], 2022, 125), RatingLevel::Like),
            rated(movie(4, &[28], 2020, 100), RatingLevel::Dislike),
        ];

        let profile = learn_weights(Uuid::nil(), &history, 2026);
        assert!((profile.genres - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weights_always_clamped() {
        let mut history = Vec::new();
        for id in 0..20 {
            history.push(rated(movie(id, &[28], 2024, 118), RatingLevel::SuperLike));
        }
        for id in 20..30 {
            history.push(rated(movie(id, &[27], 1960, 80), RatingLevel::Dislike));
        }

        let profile = learn_weights(Uuid::nil(), &history, 2026);
        for multiplier in profile.multipliers() {
            assert!((MIN_WEIGHT..=MAX_WEIGHT).contains(&multiplier));
        }
    }

    #[test]
    fn test_runtime_consistency_tiers() {
        // Three liked movies within a few minutes of each other
        let tight = vec![
            rated(movie(1, &[28], 2020, 118), RatingLevel::Like),
            rated(movie(2, &[28], 2021, 121), RatingLevel::Like),
            rated(movie(3, &[28], 2022, 119), RatingLevel::Like),
        ];
        assert_eq!(
            learn_weights(Uuid::nil(), &tight, 2026).runtime_fit,
            1.5
        );

        // Wildly spread runtimes
        let spread = vec![
            rated(movie(1, &[28], 2020, 70), RatingLevel::Like),
            rated(movie(2, &[28], 2021, 150), RatingLevel::Like),
            rated(movie(3, &[28], 2022, 230), RatingLevel::Like),
        ];
        assert_eq!(
            learn_weights(Uuid::nil(), &spread, 2026).runtime_fit,
            0.7
        );
    }

    #[test]
    fn test_era_spread_tiers() {
        // Five liked movies in two decades
        let narrow = vec![
            rated(movie(1, &[28], 1994, 110), RatingLevel::Like),
            rated(movie(2, &[28], 1996, 110), RatingLevel::Like),
            rated(movie(3, &[28], 1999, 110), RatingLevel::Like),
            rated(movie(4, &[28], 2003, 110), RatingLevel::Like),
            rated(movie(5, &[28], 2005, 110), RatingLevel::Like),
        ];
        assert_eq!(learn_weights(Uuid::nil(), &narrow, 2026).era, 1.5);

        // Spread across six decades
        let wide = vec![
            rated(movie(1, &[28], 1965, 110), RatingLevel::Like),
            rated(movie(2, &[28], 1978, 110), RatingLevel::Like),
            rated(movie(3, &[28], 1985, 110), RatingLevel::Like),
            rated(movie(4, &[28], 1994, 110), RatingLevel::Like),
            rated(movie(5, &[28], 2005, 110), RatingLevel::Like),
            rated(movie(6, &[28], 2015, 110), RatingLevel::Like),
        ];
        assert_eq!(learn_weights(Uuid::nil(), &wide, 2026).era, 0.8);
    }

    #[test]
    fn test_recency_tiers() {
        let fresh = vec![
            rated(movie(1, &[28], 2024, 110), RatingLevel::Like),
            rated(movie(2, &[28], 2025, 110), RatingLevel::Like),
            rated(movie(3, &[28], 2023, 110), RatingLevel::Like),
            rated(movie(4, &[28], 2024, 110), RatingLevel::Like),
            rated(movie(5, &[28], 2025, 110), RatingLevel::Like),
        ];
        assert_eq!(learn_weights(Uuid::nil(), &fresh, 2026).recency, 1.5);

        let vintage = vec![
            rated(movie(1, &[28], 1950, 110), RatingLevel::Like),
            rated(movie(2, &[28], 1960, 110), RatingLevel::Like),
            rated(movie(3, &[28], 1955, 110), RatingLevel::Like),
            rated(movie(4, &[28], 1948, 110), RatingLevel::Like),
            rated(movie(5, &[28], 1962, 110), RatingLevel::Like),
        ];
        assert_eq!(learn_weights(Uuid::nil(), &vintage, 2026).recency, 0.6);
    }

    #[test]
    fn test_popularity_stays_neutral_placeholder() {
        let mut history = Vec::new();
        for id in 0..10 {
            history.push(rated(movie(id, &[28], 2020, 110), RatingLevel::SuperLike));
        }

        assert_eq!(learn_weights(Uuid::nil(), &history, 2026).popularity, 1.0);
    }

    // ------------------------------------------------------------------
    // Scheduler
    // ------------------------------------------------------------------

    struct CountingStore {
        total_ratings: i64,
        profile: Mutex<Option<WeightProfile>>,
        recomputes: AtomicUsize,
        counter_writes: AtomicUsize,
    }

    impl CountingStore {
        fn new(total_ratings: i64, profile: Option<WeightProfile>) -> Arc<Self> {
            Arc::new(Self {
                total_ratings,
                profile: Mutex::new(profile),
                recomputes: AtomicUsize::new(0),
                counter_writes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl WeightStore for CountingStore {
        async fn count_ratings(&self, _user_id: Uuid) -> AppResult<i64> {
            Ok(self.total_ratings)
        }

        async fn get_rating_history(&self, _user_id: Uuid) -> AppResult<Vec<RatedMovie>> {
            self.recomputes.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn get_weight_profile(&self, _user_id: Uuid) -> AppResult<Option<WeightProfile>> {
            Ok(self.profile.lock().unwrap().clone())
        }

        async fn upsert_weight_profile(&self, profile: &WeightProfile) -> AppResult<()> {
            self.counter_writes.fetch_add(1, Ordering::SeqCst);
            *self.profile.lock().unwrap() = Some(profile.clone());
            Ok(())
        }
    }

    fn test_config(debounce_ms: u64) -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            tmdb_api_key: String::new(),
            tmdb_api_url: String::new(),
            host: String::new(),
            port: 0,
            catalog_timeout_secs: 1,
            weight_debounce_ms: debounce_ms,
            weight_min_ratings: 10,
            weight_recompute_every: 5,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_ratings_coalesces_into_one_recompute() {
        let store = CountingStore::new(10, None);
        let scheduler = WeightScheduler::new(store.clone(), &test_config(5000));
        let user = Uuid::new_v4();

        for _ in 0..5 {
            scheduler.notify_rating(user);
        }
        assert_eq!(scheduler.pending_count(), 1);

        // Let the debounce window elapse
        tokio::time::sleep(Duration::from_millis(11_000)).await;

        assert_eq!(store.recomputes.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_profile_below_minimum_ratings() {
        let store = CountingStore::new(4, None);
        let scheduler = WeightScheduler::new(store.clone(), &test_config(100));
        scheduler.notify_rating(Uuid::new_v4());

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(store.recomputes.load(Ordering::SeqCst), 0);
        assert_eq!(store.counter_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_profile_increments_until_threshold() {
        let mut existing = WeightProfile::neutral(Uuid::new_v4());
        existing.rating_count = 0;
        let store = CountingStore::new(20, Some(existing));
        let scheduler = WeightScheduler::new(store.clone(), &test_config(100));
        let user = Uuid::new_v4();

        // Four spaced-out ratings only bump the counter
        for _ in 0..4 {
            scheduler.notify_rating(user);
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(store.recomputes.load(Ordering::SeqCst), 0);
        assert_eq!(store.counter_writes.load(Ordering::SeqCst), 4);

        // The fifth hits the threshold and triggers a full recompute
        scheduler.notify_rating(user);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(store.recomputes.load(Ordering::SeqCst), 1);
        let stored = store.profile.lock().unwrap().clone().unwrap();
        assert_eq!(stored.rating_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_pending_timers() {
        let store = CountingStore::new(10, None);
        let scheduler = WeightScheduler::new(store.clone(), &test_config(60_000));

        scheduler.notify_rating(Uuid::new_v4());
        scheduler.notify_rating(Uuid::new_v4());
        assert_eq!(scheduler.pending_count(), 2);

        scheduler.shutdown().await;
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_millis(120_000)).await;
        assert_eq!(store.recomputes.load(Ordering::SeqCst), 0);
    }
}
