//! Differential abundance testing across groups.

pub mod anova;
pub mod engine;

pub use anova::{anova_top_features, write_anova_csv, AnovaRow};
pub use engine::{test_differential_abundance, DiffEngine};
