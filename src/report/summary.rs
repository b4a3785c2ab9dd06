//! Significance counts and top-feature selection for result tables.

use crate::data::{DiffResult, DiffResultSet};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-layer counts of a differential abundance run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceSummary {
    pub layer: String,
    pub method: String,
    pub correction: String,
    pub fc_threshold: f64,
    pub alpha: f64,
    pub n_tested: usize,
    pub n_excluded: usize,
    pub n_significant: usize,
    /// Significant with positive effect (higher in group a).
    pub n_up: usize,
    pub n_down: usize,
}

pub fn summarize(set: &DiffResultSet) -> SignificanceSummary {
    let significant = set.significant();
    SignificanceSummary {
        layer: set.layer.name().to_string(),
        method: set.method.clone(),
        correction: set.correction.clone(),
        fc_threshold: set.thresholds.fc_threshold,
        alpha: set.thresholds.alpha,
        n_tested: set.len(),
        n_excluded: set.excluded.len(),
        n_significant: significant.len(),
        n_up: significant.iter().filter(|r| r.effect_size > 0.0).count(),
        n_down: significant.iter().filter(|r| r.effect_size < 0.0).count(),
    }
}

/// Top `n` results by |effect size| (ties by identifier).
pub fn top_by_effect(set: &DiffResultSet, n: usize, significant_only: bool) -> Vec<&DiffResult> {
    let mut rows: Vec<&DiffResult> = set
        .iter()
        .filter(|r| !significant_only || r.is_significant)
        .collect();
    rows.sort_by(|a, b| {
        b.effect_size
            .abs()
            .total_cmp(&a.effect_size.abs())
            .then_with(|| a.feature_id.cmp(&b.feature_id))
    });
    rows.truncate(n);
    rows
}

/// Write layer summaries to CSV.
pub fn write_summaries_csv<P: AsRef<Path>>(path: P, summaries: &[SignificanceSummary]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record([
        "layer",
        "method",
        "correction",
        "fc_threshold",
        "alpha",
        "n_tested",
        "n_excluded",
        "n_significant",
        "n_up",
        "n_down",
    ])?;
    for s in summaries {
        writer.serialize(s)?;
    }
    writer.flush()?;
    Ok(())
}
