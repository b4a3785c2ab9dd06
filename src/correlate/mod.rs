//! Cross-layer correlation of differential abundance effect sizes.

pub mod matching;
pub mod stats;

pub use matching::{
    correlate, match_features, write_correlations_csv, write_pairs_csv, CorrelationSummary,
    MatchStrategy, MatchedPair,
};
pub use stats::{correlation_p_value, pearson, rank_average, spearman};
