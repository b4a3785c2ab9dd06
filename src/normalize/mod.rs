//! Normalization of count layers.
//!
//! - **Median-of-ratios**: per-sample size factors against a geometric-mean
//!   pseudo-reference

pub mod median_ratio;

pub use median_ratio::{norm_median_ratio, size_factors, NormalizedCounts};
