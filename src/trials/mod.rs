//! Clinical trial lookup and biomarker matching.
//!
//! Trials come from a [`TrialSource`]; the crate ships a small built-in
//! catalog of infection and immune-response studies, and a custom catalog
//! can be loaded from JSON. Matching scores each trial by the fraction of
//! query biomarkers it shares.

mod catalog;
mod matching;
mod report;

pub use catalog::{write_trials_csv, ClinicalTrial, StaticTrialCatalog, TrialSource};
pub use matching::{match_trials, search_trials, write_matches_csv, TrialMatch, TrialQuery};
pub use report::trial_report;

/// Immune markers used when no biomarkers are supplied.
pub const DEFAULT_BIOMARKERS: &[&str] = &[
    "IL6", "TNF", "IFNG", "IL1B", "IL12A", "CXCL10", "CD8A", "CD4", "NFKB1", "STAT1", "JAK1",
    "JAK2",
];

pub fn default_biomarkers() -> Vec<String> {
    DEFAULT_BIOMARKERS.iter().map(|s| s.to_string()).collect()
}
