//! Preference extraction: turns a raw rating history into structured,
//! multi-dimensional taste signals.
//!
//! Pure over the joined history rows; recomputing from an unchanged history
//! yields an identical profile, ranked lists included.

use std::collections::HashMap;

use crate::models::{
    EraPreference, KeywordPreference, PreferenceEntry, PreferenceProfile, RatedMovie,
    RatingDistribution, RatingStyle, RuntimeBucket,
};

/// Mean rating weight an entity needs before it counts as preferred
/// (at least "OK" leaning positive)
pub const PREFERRED_MEAN_FLOOR: f64 = 2.5;

/// Liked movies a keyword must appear in before it is retained
pub const KEYWORD_MIN_MOVIES: usize = 2;

/// Keywords kept after ranking by occurrence count
pub const KEYWORD_CAP: usize = 50;

/// Billed cast members per movie that feed the actor dimension
pub const CAST_CONSIDERED: usize = 5;

/// Production companies per movie that feed the studio dimension
pub const COMPANIES_CONSIDERED: usize = 3;

#[derive(Default)]
struct EntityAccumulator {
    name: String,
    weights: Vec<f64>,
}

/// Builds the full preference profile from a user's rating history
pub fn build_profile(history: &[RatedMovie]) -> PreferenceProfile {
    if history.is_empty() {
        return PreferenceProfile::empty();
    }

    let total = history.len();
    let mut distribution = RatingDistribution::default();

    let mut genres: HashMap<i64, EntityAccumulator> = HashMap::new();
    let mut directors: HashMap<i64, EntityAccumulator> = HashMap::new();
    let mut actors: HashMap<i64, EntityAccumulator> = HashMap::new();
    let mut collections: HashMap<i64, EntityAccumulator> = HashMap::new();
    let mut studios: HashMap<i64, EntityAccumulator> = HashMap::new();

    // Dislike vs like occurrence counts per genre, for the disliked list
    let mut genre_dislikes: HashMap<i64, usize> = HashMap::new();
    let mut genre_likes: HashMap<i64, usize> = HashMap::new();

    // Keyword id -> (name, count of distinct liked movies)
    let mut keywords: HashMap<i64, (String, usize)> = HashMap::new();

    let mut eras: HashMap<i32, Vec<f64>> = HashMap::new();
    let mut runtimes: HashMap<RuntimeBucket, Vec<f64>> = HashMap::new();

    for rated in history {
        let level = rated.event.level;
        let weight = level.weight();
        let movie = &rated.movie;

        distribution.record(level);

        for genre in &movie.genres {
            record(&mut genres, genre.id, &genre.name, weight);
            // NotInterested carries zero positive weight but still counts as
            // a dislike signal
            if level.is_negative() {
                *genre_dislikes.entry(genre.id).or_default() += 1;
            }
            if level.is_positive() {
                *genre_likes.entry(genre.id).or_default() += 1;
            }
        }

        if let (Some(id), Some(name)) = (movie.director_id, movie.director.as_deref()) {
            record(&mut directors, id, name, weight);
        }

        for member in movie.cast.iter().take(CAST_CONSIDERED) {
            record(&mut actors, member.id, &member.name, weight);
        }

        if let Some(collection) = &movie.collection {
            record(&mut collections, collection.id, &collection.name, weight);
        }

        for company in movie.companies.iter().take(COMPANIES_CONSIDERED) {
            record(&mut studios, company.id, &company.name, weight);
        }

        if level.is_positive() {
            for keyword in &movie.keywords {
                let entry = keywords
                    .entry(keyword.id)
                    .or_insert_with(|| (keyword.name.clone(), 0));
                entry.1 += 1;
            }
        }

        if let Some(year) = movie.release_year() {
            eras.entry((year / 10) * 10).or_default().push(weight);
        }

        if let Some(minutes) = movie.runtime {
            runtimes
                .entry(RuntimeBucket::from_minutes(minutes))
                .or_default()
                .push(weight);
        }
    }

    let disliked_genres = rank_disliked(&genres, &genre_dislikes, &genre_likes, total);
    let director_consistency = consistency(&directors);

    PreferenceProfile {
        total_rated: total,
        preferred_genres: rank_preferred(genres, total),
        disliked_genres,
        directors: rank_preferred(directors, total),
        actors: rank_preferred(actors, total),
        collections: rank_preferred(collections, total),
        studios: rank_preferred(studios, total),
        keywords: rank_keywords(keywords),
        eras: rank_eras(eras),
        preferred_runtime: preferred_runtime(&runtimes),
        director_consistency,
        style: RatingStyle::classify(&distribution),
        distribution,
    }
}

fn record(map: &mut HashMap<i64, EntityAccumulator>, id: i64, name: &str, weight: f64) {
    let entry = map.entry(id).or_default();
    if entry.name.is_empty() {
        entry.name = name.to_string();
    }
    entry.weights.push(weight);
}

fn mean(weights: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    weights.iter().sum::<f64>() / weights.len() as f64
}

/// Population standard deviation of a rating-weight list
fn population_std_dev(weights: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    let mu = mean(weights);
    let variance = weights.iter().map(|w| (w - mu).powi(2)).sum::<f64>() / weights.len() as f64;
    variance.sqrt()
}

/// Ranks a dimension's entities by mean weight discounted by confidence
///
/// Entities below the mean-weight floor never qualify; ties break on count
/// then id so recomputation is deterministic.
fn rank_preferred(map: HashMap<i64, EntityAccumulator>, total: usize) -> Vec<PreferenceEntry> {
    let mut entries: Vec<PreferenceEntry> = map
        .into_iter()
        .map(|(id, acc)| PreferenceEntry {
            id,
            name: acc.name,
            count: acc.weights.len(),
            mean_weight: mean(&acc.weights),
            confidence: acc.weights.len() as f64 / total as f64,
        })
        .filter(|entry| entry.mean_weight >= PREFERRED_MEAN_FLOOR)
        .collect();

    entries.sort_by(|a, b| {
        b.rank_score()
            .partial_cmp(&a.rank_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.count.cmp(&a.count))
            .then(a.id.cmp(&b.id))
    });

    entries
}

/// A genre is disliked only when its dislike count strictly exceeds its
/// like/super-like count; mixed-but-net-positive genres never qualify
fn rank_disliked(
    genres: &HashMap<i64, EntityAccumulator>,
    dislikes: &HashMap<i64, usize>,
    likes: &HashMap<i64, usize>,
    total: usize,
) -> Vec<PreferenceEntry> {
    let mut entries: Vec<PreferenceEntry> = dislikes
        .iter()
        .filter(|(id, count)| **count > likes.get(id).copied().unwrap_or(0))
        .filter_map(|(id, _)| {
            genres.get(id).map(|acc| PreferenceEntry {
                id: *id,
                name: acc.name.clone(),
                count: acc.weights.len(),
                mean_weight: mean(&acc.weights),
                confidence: acc.weights.len() as f64 / total as f64,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        a.mean_weight
            .partial_cmp(&b.mean_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.count.cmp(&a.count))
            .then(a.id.cmp(&b.id))
    });

    entries
}

/// Keywords come only from liked movies, need at least two distinct liked
/// movies, and are capped to the most frequent fifty
fn rank_keywords(keywords: HashMap<i64, (String, usize)>) -> Vec<KeywordPreference> {
    let mut entries: Vec<KeywordPreference> = keywords
        .into_iter()
        .filter(|(_, (_, count))| *count >= KEYWORD_MIN_MOVIES)
        .map(|(id, (name, count))| KeywordPreference { id, name, count })
        .collect();

    entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
    entries.truncate(KEYWORD_CAP);

    entries
}

/// Eras rank purely by mean weight; era preference is directional, not
/// frequency-gated
fn rank_eras(eras: HashMap<i32, Vec<f64>>) -> Vec<EraPreference> {
    let mut entries: Vec<EraPreference> = eras
        .into_iter()
        .map(|(decade, weights)| EraPreference {
            decade,
            count: weights.len(),
            mean_weight: mean(&weights),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.mean_weight
            .partial_cmp(&a.mean_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.decade.cmp(&b.decade))
    });

    entries
}

/// The single runtime bucket with the highest mean rating weight
fn preferred_runtime(runtimes: &HashMap<RuntimeBucket, Vec<f64>>) -> Option<RuntimeBucket> {
    runtimes
        .iter()
        .map(|(bucket, weights)| (*bucket, mean(weights)))
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(bucket_order(b.0).cmp(&bucket_order(a.0)))
        })
        .map(|(bucket, _)| bucket)
}

fn bucket_order(bucket: RuntimeBucket) -> u8 {
    match bucket {
        RuntimeBucket::Short => 0,
        RuntimeBucket::Medium => 1,
        RuntimeBucket::Long => 2,
        RuntimeBucket::Epic => 3,
    }
}

/// Mean per-director spread for directors rated more than once; lower means
/// the user's director taste is more consistent
fn consistency(directors: &HashMap<i64, EntityAccumulator>) -> Option<f64> {
    let spreads: Vec<f64> = directors
        .values()
        .filter(|acc| acc.weights.len() >= 2)
        .map(|acc| population_std_dev(&acc.weights))
        .collect();

    if spreads.is_empty() {
        None
    } else {
        Some(mean(&spreads))
    }
}
