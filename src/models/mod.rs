pub mod movie;
pub mod profile;
pub mod rating;

pub use movie::{
    best_trailer, CandidateMovie, CastMember, CatalogPage, CollectionRef, Genre, Keyword,
    MovieRecord, ProductionCompany, ProviderEntry, TmdbKeywordList, TmdbListMovie,
    TmdbMovieDetails, TmdbPage, TmdbVideoList, TmdbWatchProviderMap, Video, WatchProviders,
};
pub use profile::{
    EraPreference, KeywordPreference, PreferenceEntry, PreferenceProfile, RatingDistribution,
    RatingStyle, RuntimeBucket, ScoredCandidate, WeightProfile, MAX_WEIGHT, MIN_WEIGHT,
};
pub use rating::{
    RatedMovie, RatingEvent, RatingLevel, WatchPriority, WatchlistEntry, WatchlistItem,
};
