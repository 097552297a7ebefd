use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::movie::MovieRecord;
use crate::error::AppError;

/// How a user rated a movie, from hard pass to favorite
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RatingLevel {
    NotInterested,
    Dislike,
    Ok,
    Like,
    SuperLike,
}

impl RatingLevel {
    /// Numeric weight used by preference aggregation
    ///
    /// Zero-weight ratings are excluded from positive-preference averages but
    /// still count toward totals and dislike detection.
    pub fn weight(self) -> f64 {
        match self {
            RatingLevel::NotInterested => 0.0,
            RatingLevel::Dislike => 1.0,
            RatingLevel::Ok => 2.0,
            RatingLevel::Like => 3.0,
            RatingLevel::SuperLike => 4.0,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, RatingLevel::Like | RatingLevel::SuperLike)
    }

    pub fn is_negative(self) -> bool {
        matches!(self, RatingLevel::NotInterested | RatingLevel::Dislike)
    }

    /// Storage representation (SMALLINT column)
    pub fn as_i16(self) -> i16 {
        match self {
            RatingLevel::NotInterested => 0,
            RatingLevel::Dislike => 1,
            RatingLevel::Ok => 2,
            RatingLevel::Like => 3,
            RatingLevel::SuperLike => 4,
        }
    }
}

impl TryFrom<i16> for RatingLevel {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RatingLevel::NotInterested),
            1 => Ok(RatingLevel::Dislike),
            2 => Ok(RatingLevel::Ok),
            3 => Ok(RatingLevel::Like),
            4 => Ok(RatingLevel::SuperLike),
            other => Err(AppError::Internal(format!(
                "Invalid stored rating level: {}",
                other
            ))),
        }
    }
}

/// A user's rating of one movie
///
/// Exactly one event exists per (user, movie); re-rating overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEvent {
    pub user_id: Uuid,
    pub movie_id: i64,
    pub level: RatingLevel,
    pub watched: bool,
    pub rated_at: DateTime<Utc>,
}

/// Priority of a watchlist entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchPriority {
    Low,
    Medium,
    High,
}

impl WatchPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchPriority::Low => "low",
            WatchPriority::Medium => "medium",
            WatchPriority::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "low" => Ok(WatchPriority::Low),
            "medium" => Ok(WatchPriority::Medium),
            "high" => Ok(WatchPriority::High),
            other => Err(AppError::Internal(format!(
                "Invalid stored watch priority: {}",
                other
            ))),
        }
    }
}

/// A movie queued to watch later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub user_id: Uuid,
    pub movie_id: i64,
    pub priority: WatchPriority,
    pub note: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A rating joined with its cached movie metadata
///
/// The row shape the preference extractor and weight learner consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedMovie {
    pub event: RatingEvent,
    pub movie: MovieRecord,
}

/// A watchlist entry joined with its cached movie metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub entry: WatchlistEntry,
    pub movie: MovieRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_weights_are_monotonic() {
        let levels = [
            RatingLevel::NotInterested,
            RatingLevel::Dislike,
            RatingLevel::Ok,
            RatingLevel::Like,
            RatingLevel::SuperLike,
        ];

        for pair in levels.windows(2) {
            assert!(pair[0].weight() < pair[1].weight());
        }
    }

    #[test]
    fn test_rating_level_serialization() {
        let json = serde_json::to_string(&RatingLevel::SuperLike).unwrap();
        assert_eq!(json, "\"super_like\"");

        let parsed: RatingLevel = serde_json::from_str("\"not_interested\"").unwrap();
        assert_eq!(parsed, RatingLevel::NotInterested);
    }

    #[test]
    fn test_rating_level_storage_round_trip() {
        for raw in 0..=4 {
            let level = RatingLevel::try_from(raw).unwrap();
            assert_eq!(level.as_i16(), raw);
        }

        assert!(RatingLevel::try_from(7).is_err());
    }

    #[test]
    fn test_positive_and_negative_split() {
        assert!(RatingLevel::Like.is_positive());
        assert!(RatingLevel::SuperLike.is_positive());
        assert!(!RatingLevel::Ok.is_positive());
        assert!(RatingLevel::Dislike.is_negative());
        assert!(RatingLevel::NotInterested.is_negative());
        assert!(!RatingLevel::Ok.is_negative());
    }

    #[test]
    fn test_watch_priority_round_trip() {
        for priority in [
            WatchPriority::Low,
            WatchPriority::Medium,
            WatchPriority::High,
        ] {
            assert_eq!(WatchPriority::parse(priority.as_str()).unwrap(), priority);
        }

        assert!(WatchPriority::parse("urgent").is_err());
    }
}
