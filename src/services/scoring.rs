//! Candidate scoring: turns taste signals into a numeric desirability score
//! plus human-readable reasons for each candidate.

use chrono::{Datelike, NaiveDate};

use crate::models::{CandidateMovie, PreferenceProfile, ScoredCandidate, WeightProfile};

/// Points available to the genre-match component
pub const GENRE_POINTS: f64 = 40.0;
/// Points available to the catalog-rating component
pub const RATING_POINTS: f64 = 30.0;
/// Points available to the vote-count confidence component
pub const VOTE_POINTS: f64 = 20.0;
/// Points available to the recency bonus
pub const RECENCY_POINTS: f64 = 10.0;

/// Catalog average rating that earns an explicit "highly rated" reason
const HIGHLY_RATED_FLOOR: f64 = 7.5;

/// Vote count at which the confidence component saturates; keeps a handful
/// of blockbusters from dominating every feed
const VOTE_SATURATION: f64 = 5000.0;

/// Scores one candidate against the user's preference profile
///
/// The learned multipliers, when present, scale the genre and recency
/// components. A candidate touching a disliked genre has its entire score
/// halved: the dislike signal is an override, not a subtraction. Every
/// result carries at least one reason.
pub fn score_candidate(
    movie: &CandidateMovie,
    profile: &PreferenceProfile,
    weights: Option<&WeightProfile>,
    today: NaiveDate,
) -> ScoredCandidate {
    let mut reasons: Vec<String> = Vec::new();

    let genre_multiplier = weights.map_or(1.0, |w| w.genres);
    let recency_multiplier = weights.map_or(1.0, |w| w.recency);

    // Genre match
    let matching: Vec<&str> = profile
        .preferred_genres
        .iter()
        .filter(|entry| movie.genre_ids.contains(&entry.id))
        .map(|entry| entry.name.as_str())
        .collect();

    let genre_score = (matching.len() as f64 / profile.preferred_genres.len().max(1) as f64)
        * GENRE_POINTS
        * genre_multiplier;

    if !matching.is_empty() {
        reasons.push(format!("Matches your taste for {}", matching.join(", ")));
    }

    // Catalog rating
    let rating_score = (movie.vote_average / 10.0) * RATING_POINTS;
    if movie.vote_average >= HIGHLY_RATED_FLOOR {
        reasons.push(format!("Highly rated ({:.1}/10)", movie.vote_average));
    }

    // Vote-count confidence, saturating
    let vote_score = (movie.vote_count as f64 / VOTE_SATURATION).min(1.0) * VOTE_POINTS;

    // Recency bonus
    let recency_score = match movie.release_year() {
        Some(year) => {
            let age = today.year() - year;
            if age <= 3 {
                reasons.push("Recent release".to_string());
                RECENCY_POINTS * recency_multiplier
            } else if age <= 10 {
                (RECENCY_POINTS / 2.0) * recency_multiplier
            } else {
                0.0
            }
        }
        None => 0.0,
    };

    let mut score = genre_score + rating_score + vote_score + recency_score;

    // Disliked genres override everything else
    let touches_disliked = profile
        .disliked_genres
        .iter()
        .any(|entry| movie.genre_ids.contains(&entry.id));
    if touches_disliked {
        score /= 2.0;
    }

    if reasons.is_empty() {
        reasons.push("Popular and well-rated".to_string());
    }

    ScoredCandidate {
        movie: movie.clone(),
        score,
        reasons,
    }
}

/// Scores a whole candidate pool
pub fn score_pool(
    pool: &[CandidateMovie],
    profile: &PreferenceProfile,
    weights: Option<&WeightProfile>,
    today: NaiveDate,
) -> Vec<ScoredCandidate> {
    pool.iter()
        .map(|movie| score_candidate(movie, profile, weights, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreferenceEntry;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    fn candidate(genre_ids: &[i64], vote_average: f64, vote_count: i64) -> CandidateMovie {
        CandidateMovie {
            tmdb_id: 1,
            title: "Candidate".to_string(),
            genre_ids: genre_ids.to_vec(),
            overview: None,
            poster_path: None,
            vote_average,
            vote_count,
            popularity: 10.0,
            release_date: NaiveDate::from_ymd_opt(2018, 6, 1),
            original_language: Some("en".to_string()),
        }
    }

    fn entry(id: i64, name: &str) -> PreferenceEntry {
        PreferenceEntry {
            id,
            name: name.to_string(),
            count: 3,
            mean_weight: 4.0,
            confidence: 0.5,
        }
    }

    fn profile(preferred: &[(i64, &str)], disliked: &[(i64, &str)]) -> PreferenceProfile {
        let mut profile = PreferenceProfile::empty();
        profile.preferred_genres = preferred.iter().map(|(id, name)| entry(*id, name)).collect();
        profile.disliked_genres = disliked.iter().map(|(id, name)| entry(*id, name)).collect();
        profile
    }

    #[test]
    fn test_full_genre_match_earns_full_genre_points() {
        let profile = profile(&[(28, "Action")], &[]);
        let movie = candidate(&[28], 0.0, 0);

        let scored = score_candidate(&movie, &profile, None, today());
        // Only genre (40) + half recency (5) contribute
        assert_eq!(scored.score, GENRE_POINTS + RECENCY_POINTS / 2.0);
        assert!(scored.reasons.iter().any(|r| r.contains("Action")));
    }

    #[test]
    fn test_partial_genre_match_is_proportional() {
        let profile = profile(&[(28, "Action"), (35, "Comedy")], &[]);
        let movie = candidate(&[28], 0.0, 0);

        let scored = score_candidate(&movie, &profile, None, today());
        assert_eq!(scored.score, GENRE_POINTS / 2.0 + RECENCY_POINTS / 2.0);
    }

    #[test]
    fn test_disliked_genre_halves_entire_score() {
        let liked_only = profile(&[(28, "Action")], &[]);
        let with_dislike = profile(&[(28, "Action")], &[(27, "Horror")]);
        let movie = candidate(&[28, 27], 8.0, 5000);

        let baseline = score_candidate(&movie, &liked_only, None, today());
        let halved = score_candidate(&movie, &with_dislike, None, today());

        assert_eq!(halved.score, baseline.score / 2.0);
    }

    #[test]
    fn test_highly_rated_reason() {
        let movie = candidate(&[], 8.2, 100);
        let scored = score_candidate(&movie, &PreferenceProfile::empty(), None, today());

        assert!(scored.reasons.iter().any(|r| r.contains("Highly rated")));
        assert!(scored.reasons.iter().any(|r| r.contains("8.2")));
    }

    #[test]
    fn test_vote_count_saturates() {
        let moderate = candidate(&[], 0.0, 5_000);
        let blockbuster = candidate(&[], 0.0, 500_000);
        let empty = PreferenceProfile::empty();

        let a = score_candidate(&moderate, &empty, None, today());
        let b = score_candidate(&blockbuster, &empty, None, today());
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn test_recency_tiers_and_reason() {
        let empty = PreferenceProfile::empty();

        let mut fresh = candidate(&[], 0.0, 0);
        fresh.release_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let scored = score_candidate(&fresh, &empty, None, today());
        assert_eq!(scored.score, RECENCY_POINTS);
        assert!(scored.reasons.iter().any(|r| r.contains("Recent release")));

        let mut old = candidate(&[], 0.0, 0);
        old.release_date = NaiveDate::from_ymd_opt(1995, 1, 1);
        let scored = score_candidate(&old, &empty, None, today());
        assert_eq!(scored.score, 0.0);
    }

    #[test]
    fn test_generic_fallback_reason_is_always_present() {
        let movie = candidate(&[], 5.0, 100);
        let scored = score_candidate(&movie, &PreferenceProfile::empty(), None, today());

        assert_eq!(scored.reasons, vec!["Popular and well-rated".to_string()]);
    }

    #[test]
    fn test_learned_weights_scale_genre_component() {
        let profile = profile(&[(28, "Action")], &[]);
        let movie = candidate(&[28], 0.0, 0);

        let mut weights = WeightProfile::neutral(Uuid::nil());
        weights.genres = 2.0;
        weights.recency = 1.0;

        let unweighted = score_candidate(&movie, &profile, None, today());
        let weighted = score_candidate(&movie, &profile, Some(&weights), today());

        assert_eq!(
            weighted.score - unweighted.score,
            GENRE_POINTS // doubled 40-point component adds 40
        );
    }

    #[test]
    fn test_scores_fall_in_expected_range() {
        let profile = profile(&[(28, "Action")], &[]);
        let mut best = candidate(&[28], 10.0, 1_000_000);
        best.release_date = NaiveDate::from_ymd_opt(2026, 1, 1);

        let scored = score_candidate(&best, &profile, None, today());
        assert!(scored.score > 0.0);
        assert_eq!(
            scored.score,
            GENRE_POINTS + RATING_POINTS + VOTE_POINTS + RECENCY_POINTS
        );
    }
}
