use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::movie::CandidateMovie;
use super::rating::RatingLevel;

/// One ranked entity inside a preference dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub id: i64,
    pub name: String,
    /// How many rated movies touch this entity
    pub count: usize,
    pub mean_weight: f64,
    /// count / total rated movies; discounts rare signals
    pub confidence: f64,
}

impl PreferenceEntry {
    /// Ranking key: strength of the signal discounted by how rare it is
    pub fn rank_score(&self) -> f64 {
        self.mean_weight * self.confidence
    }
}

/// A keyword retained from liked movies, ranked by occurrence count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordPreference {
    pub id: i64,
    pub name: String,
    pub count: usize,
}

/// Taste for a release decade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraPreference {
    /// Decade floor, e.g. 1990 for the nineties
    pub decade: i32,
    pub count: usize,
    pub mean_weight: f64,
}

/// Runtime length buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeBucket {
    Short,
    Medium,
    Long,
    Epic,
}

impl RuntimeBucket {
    pub fn from_minutes(minutes: i32) -> Self {
        match minutes {
            m if m < 90 => RuntimeBucket::Short,
            m if m < 120 => RuntimeBucket::Medium,
            m if m < 150 => RuntimeBucket::Long,
            _ => RuntimeBucket::Epic,
        }
    }
}

/// Histogram of a user's ratings across all levels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDistribution {
    pub not_interested: usize,
    pub dislike: usize,
    pub ok: usize,
    pub like: usize,
    pub super_like: usize,
}

impl RatingDistribution {
    pub fn record(&mut self, level: RatingLevel) {
        match level {
            RatingLevel::NotInterested => self.not_interested += 1,
            RatingLevel::Dislike => self.dislike += 1,
            RatingLevel::Ok => self.ok += 1,
            RatingLevel::Like => self.like += 1,
            RatingLevel::SuperLike => self.super_like += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.not_interested + self.dislike + self.ok + self.like + self.super_like
    }

    /// Fraction of ratings that are Like or SuperLike
    pub fn positive_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.like + self.super_like) as f64 / total as f64
    }
}

/// How generously the user hands out positive ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingStyle {
    Generous,
    Balanced,
    Critical,
}

impl RatingStyle {
    pub fn classify(distribution: &RatingDistribution) -> Self {
        if distribution.total() == 0 {
            return RatingStyle::Balanced;
        }
        let ratio = distribution.positive_ratio();
        if ratio > 0.7 {
            RatingStyle::Generous
        } else if ratio < 0.4 {
            RatingStyle::Critical
        } else {
            RatingStyle::Balanced
        }
    }
}

/// Multi-dimensional taste signals derived from the full rating history
///
/// Recomputed on demand; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub total_rated: usize,
    pub preferred_genres: Vec<PreferenceEntry>,
    pub disliked_genres: Vec<PreferenceEntry>,
    pub directors: Vec<PreferenceEntry>,
    pub actors: Vec<PreferenceEntry>,
    pub collections: Vec<PreferenceEntry>,
    pub studios: Vec<PreferenceEntry>,
    pub keywords: Vec<KeywordPreference>,
    pub eras: Vec<EraPreference>,
    pub preferred_runtime: Option<RuntimeBucket>,
    /// Mean population std-dev of per-director rating weights; lower means
    /// the user's director taste is more consistent
    pub director_consistency: Option<f64>,
    pub distribution: RatingDistribution,
    pub style: RatingStyle,
}

impl PreferenceProfile {
    pub fn empty() -> Self {
        PreferenceProfile {
            total_rated: 0,
            preferred_genres: Vec::new(),
            disliked_genres: Vec::new(),
            directors: Vec::new(),
            actors: Vec::new(),
            collections: Vec::new(),
            studios: Vec::new(),
            keywords: Vec::new(),
            eras: Vec::new(),
            preferred_runtime: None,
            director_consistency: None,
            distribution: RatingDistribution::default(),
            style: RatingStyle::Balanced,
        }
    }
}

/// Lower bound for a learned dimension multiplier
pub const MIN_WEIGHT: f64 = 0.5;
/// Upper bound for a learned dimension multiplier
pub const MAX_WEIGHT: f64 = 2.0;

/// Learned per-user multipliers, one per preference dimension
///
/// Persisted one row per user; written only by the weight learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub user_id: Uuid,
    pub genres: f64,
    pub directors: f64,
    pub actors: f64,
    pub keywords: f64,
    pub runtime_fit: f64,
    pub era: f64,
    pub recency: f64,
    pub popularity: f64,
    /// Ratings seen since the last full recomputation
    pub rating_count: i32,
    pub last_calculated: DateTime<Utc>,
}

impl WeightProfile {
    pub fn neutral(user_id: Uuid) -> Self {
        WeightProfile {
            user_id,
            genres: 1.0,
            directors: 1.0,
            actors: 1.0,
            keywords: 1.0,
            runtime_fit: 1.0,
            era: 1.0,
            recency: 1.0,
            popularity: 1.0,
            rating_count: 0,
            last_calculated: Utc::now(),
        }
    }

    /// Forces every multiplier back into `[MIN_WEIGHT, MAX_WEIGHT]`
    pub fn clamp_all(&mut self) {
        for value in [
            &mut self.genres,
            &mut self.directors,
            &mut self.actors,
            &mut self.keywords,
            &mut self.runtime_fit,
            &mut self.era,
            &mut self.recency,
            &mut self.popularity,
        ] {
            *value = value.clamp(MIN_WEIGHT, MAX_WEIGHT);
        }
    }

    pub fn multipliers(&self) -> [f64; 8] {
        [
            self.genres,
            self.directors,
            self.actors,
            self.keywords,
            self.runtime_fit,
            self.era,
            self.recency,
            self.popularity,
        ]
    }
}

/// A candidate with its desirability score and the reasons behind it
///
/// The reasons list is always non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub movie: CandidateMovie,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_sum_matches_records() {
        let mut distribution = RatingDistribution::default();
        let levels = [
            RatingLevel::SuperLike,
            RatingLevel::SuperLike,
            RatingLevel::Like,
            RatingLevel::Ok,
            RatingLevel::Dislike,
            RatingLevel::NotInterested,
        ];
        for level in levels {
            distribution.record(level);
        }

        assert_eq!(distribution.total(), levels.len());
        assert_eq!(distribution.super_like, 2);
    }

    #[test]
    fn test_rating_style_thresholds() {
        let mut generous = RatingDistribution::default();
        for _ in 0..8 {
            generous.record(RatingLevel::Like);
        }
        generous.record(RatingLevel::Ok);
        assert_eq!(RatingStyle::classify(&generous), RatingStyle::Generous);

        let mut critical = RatingDistribution::default();
        for _ in 0..7 {
            critical.record(RatingLevel::Dislike);
        }
        critical.record(RatingLevel::Like);
        assert_eq!(RatingStyle::classify(&critical), RatingStyle::Critical);

        let mut balanced = RatingDistribution::default();
        balanced.record(RatingLevel::Like);
        balanced.record(RatingLevel::Ok);
        assert_eq!(RatingStyle::classify(&balanced), RatingStyle::Balanced);
    }

    #[test]
    fn test_empty_history_is_balanced_by_definition() {
        assert_eq!(
            RatingStyle::classify(&RatingDistribution::default()),
            RatingStyle::Balanced
        );
    }

    #[test]
    fn test_runtime_bucket_boundaries() {
        assert_eq!(RuntimeBucket::from_minutes(89), RuntimeBucket::Short);
        assert_eq!(RuntimeBucket::from_minutes(90), RuntimeBucket::Medium);
        assert_eq!(RuntimeBucket::from_minutes(119), RuntimeBucket::Medium);
        assert_eq!(RuntimeBucket::from_minutes(120), RuntimeBucket::Long);
        assert_eq!(RuntimeBucket::from_minutes(149), RuntimeBucket::Long);
        assert_eq!(RuntimeBucket::from_minutes(150), RuntimeBucket::Epic);
    }

    #[test]
    fn test_weight_profile_clamp() {
        let mut profile = WeightProfile::neutral(Uuid::new_v4());
        profile.genres = 3.2;
        profile.recency = 0.1;
        profile.clamp_all();

        assert_eq!(profile.genres, MAX_WEIGHT);
        assert_eq!(profile.recency, MIN_WEIGHT);
        for multiplier in profile.multipliers() {
            assert!((MIN_WEIGHT..=MAX_WEIGHT).contains(&multiplier));
        }
    }

    #[test]
    fn test_rank_score_discounts_rare_signals() {
        let strong_rare = PreferenceEntry {
            id: 1,
            name: "Western".to_string(),
            count: 1,
            mean_weight: 4.0,
            confidence: 0.05,
        };
        let moderate_common = PreferenceEntry {
            id: 2,
            name: "Action".to_string(),
            count: 12,
            mean_weight: 3.0,
            confidence: 0.6,
        };

        assert!(moderate_common.rank_score() > strong_rare.rank_score());
    }
}
