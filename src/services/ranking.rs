//! Ranking and browsing: tier-banded shuffling of scored candidates, and the
//! category/style filters behind the discover feed.

use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::models::{CandidateMovie, ScoredCandidate};
use crate::services::providers::{DiscoverParams, DiscoverSort};

/// Scores at or above this land in the top tier
pub const TIER1_FLOOR: f64 = 70.0;
/// Scores at or above this (and below tier 1) land in the middle tier
pub const TIER2_FLOOR: f64 = 50.0;

/// TMDB genre id for animation, used by the style filters
pub const ANIMATION_GENRE_ID: i64 = 16;

/// Lookback window for the new-releases category
pub const NEW_RELEASE_LOOKBACK_DAYS: i64 = 180;

/// Banded shuffle: best matches surface first, but repeated requests do not
/// return a deterministic, stale top-N
///
/// Candidates split into three score tiers, each tier is shuffled uniformly,
/// and the tiers concatenate top-down before truncation.
pub fn tiered_shuffle(scored: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
    tiered_shuffle_with(scored, limit, &mut rand::thread_rng())
}

pub fn tiered_shuffle_with<R: Rng>(
    scored: Vec<ScoredCandidate>,
    limit: usize,
    rng: &mut R,
) -> Vec<ScoredCandidate> {
    let mut tier1 = Vec::new();
    let mut tier2 = Vec::new();
    let mut tier3 = Vec::new();

    for candidate in scored {
        if candidate.score >= TIER1_FLOOR {
            tier1.push(candidate);
        } else if candidate.score >= TIER2_FLOOR {
            tier2.push(candidate);
        } else {
            tier3.push(candidate);
        }
    }

    tier1.shuffle(rng);
    tier2.shuffle(rng);
    tier3.shuffle(rng);

    let mut ranked = tier1;
    ranked.append(&mut tier2);
    ranked.append(&mut tier3);
    ranked.truncate(limit);
    ranked
}

/// Browsing categories of the discover feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverCategory {
    #[default]
    Popular,
    NewReleases,
    TopRated,
}

/// Animation-based style filters
///
/// Anime is animation in Japanese; cartoons are animation in anything else;
/// movies excludes animation outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleFilter {
    #[default]
    All,
    Movies,
    Anime,
    Cartoons,
}

impl StyleFilter {
    fn is_animated(self) -> bool {
        matches!(self, StyleFilter::Anime | StyleFilter::Cartoons)
    }
}

/// Per-category vote floor; animated styles accumulate far fewer votes and
/// get a much looser floor
pub fn vote_floor(category: DiscoverCategory, style: StyleFilter) -> i64 {
    if style.is_animated() {
        return 30;
    }

    match category {
        DiscoverCategory::Popular => 300,
        DiscoverCategory::NewReleases => 50,
        DiscoverCategory::TopRated => 1000,
    }
}

/// Maps a category/style selection onto a discover query
pub fn build_discover_params(
    category: DiscoverCategory,
    style: StyleFilter,
    genre_filter: Option<i64>,
    page: i32,
    today: NaiveDate,
) -> DiscoverParams {
    let mut params = DiscoverParams::new()
        .min_votes(vote_floor(category, style))
        .page(page);

    params = match category {
        DiscoverCategory::Popular => params.sort(DiscoverSort::PopularityDesc),
        DiscoverCategory::TopRated => params.sort(DiscoverSort::VoteAverageDesc),
        DiscoverCategory::NewReleases => params
            .sort(DiscoverSort::PopularityDesc)
            .released_between(today - Duration::days(NEW_RELEASE_LOOKBACK_DAYS), today),
    };

    params = match style {
        StyleFilter::All => params,
        StyleFilter::Movies => params.without_genre(ANIMATION_GENRE_ID),
        StyleFilter::Anime => {
            let mut p = params;
            p.genre_ids.push(ANIMATION_GENRE_ID);
            p.language("ja")
        }
        // The catalog has no exclude-language filter; the Japanese exclusion
        // happens in apply_style_filter after results come back
        StyleFilter::Cartoons => {
            let mut p = params;
            p.genre_ids.push(ANIMATION_GENRE_ID);
            p
        }
    };

    if let Some(genre_id) = genre_filter {
        if !params.genre_ids.contains(&genre_id) {
            params.genre_ids.push(genre_id);
        }
    }

    params
}

/// Client-side leg of the style filters for constraints the catalog cannot
/// express server-side
pub fn apply_style_filter(results: Vec<CandidateMovie>, style: StyleFilter) -> Vec<CandidateMovie> {
    match style {
        StyleFilter::Cartoons => results
            .into_iter()
            .filter(|m| m.original_language.as_deref() != Some("ja"))
            .collect(),
        StyleFilter::Movies => results
            .into_iter()
            .filter(|m| !m.genre_ids.contains(&ANIMATION_GENRE_ID))
            .collect(),
        StyleFilter::Anime | StyleFilter::All => results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scored(id: i64, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            movie: CandidateMovie {
                tmdb_id: id,
                title: format!("Movie {}", id),
                genre_ids: vec![28],
                overview: None,
                poster_path: None,
                vote_average: 7.0,
                vote_count: 1000,
                popularity: 10.0,
                release_date: None,
                original_language: Some("en".to_string()),
            },
            score,
            reasons: vec!["Popular and well-rated".to_string()],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[test]
    fn test_tiers_never_interleave() {
        let pool: Vec<ScoredCandidate> = vec![
            scored(1, 95.0),
            scored(2, 30.0),
            scored(3, 72.0),
            scored(4, 55.0),
            scored(5, 10.0),
            scored(6, 68.0),
        ];

        let mut rng = StdRng::seed_from_u64(7);
        let ranked = tiered_shuffle_with(pool, 10, &mut rng);

        let tier_of = |score: f64| {
            if score >= TIER1_FLOOR {
                0
            } else if score >= TIER2_FLOOR {
                1
            } else {
                2
            }
        };

        let tiers: Vec<u8> = ranked.iter().map(|c| tier_of(c.score)).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        assert_eq!(ranked.len(), 6);
    }

    #[test]
    fn test_truncates_to_limit() {
        let pool: Vec<ScoredCandidate> = (0..30).map(|id| scored(id, 80.0)).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let ranked = tiered_shuffle_with(pool, 10, &mut rng);
        assert_eq!(ranked.len(), 10);
    }

    #[test]
    fn test_shuffle_varies_within_tier_but_keeps_membership() {
        let pool: Vec<ScoredCandidate> = (0..20).map(|id| scored(id, 80.0)).collect();

        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);
        let a = tiered_shuffle_with(pool.clone(), 20, &mut rng_a);
        let b = tiered_shuffle_with(pool, 20, &mut rng_b);

        let ids =
            |v: &[ScoredCandidate]| -> Vec<i64> { v.iter().map(|c| c.movie.tmdb_id).collect() };
        let mut sorted_a = ids(&a);
        let mut sorted_b = ids(&b);
        sorted_a.sort();
        sorted_b.sort();
        assert_eq!(sorted_a, sorted_b);
        assert_ne!(ids(&a), ids(&b));
    }

    #[test]
    fn test_vote_floors_by_category() {
        assert!(
            vote_floor(DiscoverCategory::TopRated, StyleFilter::All)
                > vote_floor(DiscoverCategory::Popular, StyleFilter::All)
        );
        assert!(
            vote_floor(DiscoverCategory::Popular, StyleFilter::All)
                > vote_floor(DiscoverCategory::NewReleases, StyleFilter::All)
        );
        // Animated styles always loosen the floor
        assert!(
            vote_floor(DiscoverCategory::TopRated, StyleFilter::Anime)
                < vote_floor(DiscoverCategory::NewReleases, StyleFilter::All)
        );
    }

    #[test]
    fn test_new_releases_sets_release_window() {
        let params = build_discover_params(
            DiscoverCategory::NewReleases,
            StyleFilter::All,
            None,
            1,
            today(),
        );

        assert_eq!(
            params.release_after,
            Some(today() - Duration::days(NEW_RELEASE_LOOKBACK_DAYS))
        );
        assert_eq!(params.release_before, Some(today()));
    }

    #[test]
    fn test_top_rated_sorts_by_vote_average() {
        let params = build_discover_params(
            DiscoverCategory::TopRated,
            StyleFilter::All,
            None,
            1,
            today(),
        );
        assert_eq!(params.sort, DiscoverSort::VoteAverageDesc);
    }

    #[test]
    fn test_anime_style_requires_animation_and_japanese() {
        let params =
            build_discover_params(DiscoverCategory::Popular, StyleFilter::Anime, None, 1, today());

        assert!(params.genre_ids.contains(&ANIMATION_GENRE_ID));
        assert_eq!(params.original_language.as_deref(), Some("ja"));
    }

    #[test]
    fn test_movies_style_excludes_animation() {
        let params = build_discover_params(
            DiscoverCategory::Popular,
            StyleFilter::Movies,
            None,
            1,
            today(),
        );
        assert!(params.without_genre_ids.contains(&ANIMATION_GENRE_ID));
    }

    #[test]
    fn test_cartoons_post_filter_drops_japanese_titles() {
        let anime = CandidateMovie {
            tmdb_id: 1,
            title: "Your Name".to_string(),
            genre_ids: vec![ANIMATION_GENRE_ID],
            overview: None,
            poster_path: None,
            vote_average: 8.5,
            vote_count: 9000,
            popularity: 60.0,
            release_date: None,
            original_language: Some("ja".to_string()),
        };
        let cartoon = CandidateMovie {
            tmdb_id: 2,
            title: "Up".to_string(),
            genre_ids: vec![ANIMATION_GENRE_ID],
            overview: None,
            poster_path: None,
            vote_average: 8.0,
            vote_count: 17000,
            popularity: 50.0,
            original_language: Some("en".to_string()),
            release_date: None,
        };

        let filtered = apply_style_filter(vec![anime, cartoon], StyleFilter::Cartoons);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].tmdb_id, 2);
    }

    #[test]
    fn test_genre_filter_merges_into_query() {
        let params = build_discover_params(
            DiscoverCategory::Popular,
            StyleFilter::All,
            Some(35),
            2,
            today(),
        );
        assert_eq!(params.genre_ids, vec![35]);
        assert_eq!(params.page, 2);
    }
}
