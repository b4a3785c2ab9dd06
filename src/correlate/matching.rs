//! Matching two result tables and correlating their effect sizes.

use super::stats::{correlation_p_value, pearson, spearman};
use crate::data::{DiffResult, DiffResultSet};
use crate::error::{OmicsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// How features of two layers are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Pair features sharing an identifier, in the order of the first table.
    #[default]
    ById,
    /// Pair the i-th entry of each table, for the first min(n_a, n_b) entries.
    ///
    /// This is a weak fallback for layers without a shared identifier space
    /// (e.g. proteins vs metabolites): the pairs carry no biological link and
    /// depend entirely on table order.
    Positional,
}

impl MatchStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ById => "by_id",
            Self::Positional => "positional",
        }
    }
}

/// One matched pair of features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub feature_a: String,
    pub feature_b: String,
    pub effect_a: f64,
    pub effect_b: f64,
}

/// Correlation of effect sizes between two layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub layer_a: String,
    pub layer_b: String,
    #[serde(rename = "n_features")]
    pub n_matched_features: usize,
    pub pearson_r: f64,
    pub pearson_p: f64,
    pub spearman_r: f64,
    pub spearman_p: f64,
}

/// Pair the entries of two result tables.
pub fn match_features(
    results_a: &DiffResultSet,
    results_b: &DiffResultSet,
    strategy: MatchStrategy,
) -> Vec<MatchedPair> {
    let pair = |a: &DiffResult, b: &DiffResult| MatchedPair {
        feature_a: a.feature_id.clone(),
        feature_b: b.feature_id.clone(),
        effect_a: a.effect_size,
        effect_b: b.effect_size,
    };

    match strategy {
        MatchStrategy::ById => {
            let index: HashMap<&str, &DiffResult> = results_b
                .iter()
                .map(|r| (r.feature_id.as_str(), r))
                .collect();
            results_a
                .iter()
                .filter_map(|a| index.get(a.feature_id.as_str()).map(|b| pair(a, b)))
                .collect()
        }
        MatchStrategy::Positional => results_a
            .iter()
            .zip(results_b.iter())
            .map(|(a, b)| pair(a, b))
            .collect(),
    }
}

/// Correlate the effect sizes of two result tables.
///
/// Fails with [`OmicsError::InsufficientData`] below two matched pairs and
/// with [`OmicsError::ConstantInput`] when one side's effects do not vary.
pub fn correlate(
    results_a: &DiffResultSet,
    results_b: &DiffResultSet,
    strategy: MatchStrategy,
) -> Result<CorrelationSummary> {
    let layer_a = results_a.layer.name().to_string();
    let layer_b = results_b.layer.name().to_string();

    let mut pairs = match_features(results_a, results_b, strategy);
    if pairs.len() < 2 {
        return Err(OmicsError::InsufficientData {
            layer_a,
            layer_b,
            n_matched: pairs.len(),
        });
    }

    // Summation order independent of which table came first
    if strategy == MatchStrategy::ById {
        pairs.sort_by(|p, q| p.feature_a.cmp(&q.feature_a));
    }
    let x: Vec<f64> = pairs.iter().map(|p| p.effect_a).collect();
    let y: Vec<f64> = pairs.iter().map(|p| p.effect_b).collect();

    let constant = |layer: &str| OmicsError::ConstantInput {
        layer_a: layer_a.clone(),
        layer_b: layer_b.clone(),
        constant_layer: layer.to_string(),
    };
    let is_constant = |v: &[f64]| v.iter().all(|e| *e == v[0]);
    if is_constant(&x) {
        return Err(constant(&layer_a));
    }
    if is_constant(&y) {
        return Err(constant(&layer_b));
    }

    // Varying effects can still have a sum of squares that underflows to zero
    let degenerate = || {
        let m = x.iter().sum::<f64>() / x.len() as f64;
        if x.iter().map(|e| (e - m).powi(2)).sum::<f64>() == 0.0 {
            constant(&layer_a)
        } else {
            constant(&layer_b)
        }
    };
    let n = pairs.len();
    let pearson_r = pearson(&x, &y).ok_or_else(degenerate)?;
    let spearman_r = spearman(&x, &y).ok_or_else(degenerate)?;

    log::info!(
        "{} vs {} ({}): {} pairs, pearson r = {:.4}, spearman r = {:.4}",
        layer_a,
        layer_b,
        strategy.name(),
        n,
        pearson_r,
        spearman_r
    );

    Ok(CorrelationSummary {
        pearson_p: correlation_p_value(pearson_r, n),
        spearman_p: correlation_p_value(spearman_r, n),
        layer_a,
        layer_b,
        n_matched_features: n,
        pearson_r,
        spearman_r,
    })
}

/// Write correlation summaries to CSV.
pub fn write_correlations_csv<P: AsRef<Path>>(path: P, summaries: &[CorrelationSummary]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record([
        "layer_a",
        "layer_b",
        "n_features",
        "pearson_r",
        "pearson_p",
        "spearman_r",
        "spearman_p",
    ])?;
    for s in summaries {
        writer.serialize(s)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write matched pairs to CSV.
pub fn write_pairs_csv<P: AsRef<Path>>(path: P, pairs: &[MatchedPair]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["feature_a", "feature_b", "effect_a", "effect_b"])?;
    for p in pairs {
        writer.serialize(p)?;
    }
    writer.flush()?;
    Ok(())
}
