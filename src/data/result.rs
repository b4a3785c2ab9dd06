//! Result types for differential abundance analysis.

use crate::data::layer::OmicsLayer;
use crate::error::{OmicsError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// Significance thresholds. Both are required; there are no implicit defaults
/// at the engine level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum absolute effect size (strictly exceeded).
    pub fc_threshold: f64,
    /// Adjusted p-value cutoff (strictly below).
    pub alpha: f64,
}

impl Thresholds {
    pub fn new(fc_threshold: f64, alpha: f64) -> Result<Self> {
        if !fc_threshold.is_finite() || fc_threshold < 0.0 {
            return Err(OmicsError::InvalidParameter(format!(
                "fc_threshold must be a non-negative number, got {}",
                fc_threshold
            )));
        }
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(OmicsError::InvalidParameter(format!(
                "alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(Self { fc_threshold, alpha })
    }

    /// Conventional thresholds for a layer at the given alpha.
    pub fn for_layer(layer: OmicsLayer, alpha: f64) -> Result<Self> {
        Self::new(layer.default_fc_threshold(), alpha)
    }

    pub fn is_significant(&self, adjusted_p_value: f64, effect_size: f64) -> bool {
        adjusted_p_value < self.alpha && effect_size.abs() > self.fc_threshold
    }
}

/// Result for a single feature.
///
/// Field order matches the persisted CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub feature_id: String,
    pub mean_group_a: f64,
    pub mean_group_b: f64,
    /// Difference between groups on the layer's scale (log2 fold change for
    /// log-scale layers and for the count model).
    pub effect_size: f64,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    /// Optional in persisted tables; recomputed from thresholds on load.
    #[serde(default)]
    pub is_significant: bool,
}

/// A feature whose test was undefined and which was left out of the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFailure {
    pub feature_id: String,
    pub reason: String,
}

impl From<FeatureFailure> for OmicsError {
    fn from(f: FeatureFailure) -> Self {
        OmicsError::Computation {
            feature_id: f.feature_id,
            reason: f.reason,
        }
    }
}

/// Total order used for result tables: adjusted p ascending, then
/// |effect size| descending, then feature identifier.
pub fn compare_results(a: &DiffResult, b: &DiffResult) -> Ordering {
    a.adjusted_p_value
        .total_cmp(&b.adjusted_p_value)
        .then_with(|| b.effect_size.abs().total_cmp(&a.effect_size.abs()))
        .then_with(|| a.feature_id.cmp(&b.feature_id))
}

/// Ordered results of one differential abundance run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResultSet {
    pub layer: OmicsLayer,
    pub group_a: String,
    pub group_b: String,
    /// Name of the test strategy.
    pub method: String,
    /// Name of the multiple-testing correction.
    pub correction: String,
    pub thresholds: Thresholds,
    pub results: Vec<DiffResult>,
    /// Features excluded because their statistic was undefined.
    pub excluded: Vec<FeatureFailure>,
}

impl DiffResultSet {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffResult> {
        self.results.iter()
    }

    /// Look up a feature's result.
    pub fn get(&self, feature_id: &str) -> Option<&DiffResult> {
        self.results.iter().find(|r| r.feature_id == feature_id)
    }

    /// Significant results in table order.
    pub fn significant(&self) -> Vec<&DiffResult> {
        self.results.iter().filter(|r| r.is_significant).collect()
    }

    pub fn n_significant(&self) -> usize {
        self.results.iter().filter(|r| r.is_significant).count()
    }

    /// Number of features attempted (tested plus excluded).
    pub fn n_attempted(&self) -> usize {
        self.results.len() + self.excluded.len()
    }

    /// Write all results to CSV.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_results(path, self.results.iter())
    }

    /// Write only significant results to CSV.
    pub fn significant_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_results(path, self.results.iter().filter(|r| r.is_significant))
    }

    /// Write the excluded features and their reasons to CSV.
    pub fn excluded_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(["feature_id", "reason"])?;
        for f in &self.excluded {
            writer.serialize(f)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a result table written by [`DiffResultSet::to_csv`] or by an
    /// external tool using the same columns (`is_significant` may be absent).
    ///
    /// The significance flag is recomputed from `thresholds` and the rows are
    /// put back into canonical order. The table carries no run labels, so the
    /// set is labelled `group_a`/`group_b` with method and correction
    /// `external`; use [`DiffResultSet::with_labels`] to name them.
    pub fn from_csv<P: AsRef<Path>>(path: P, layer: OmicsLayer, thresholds: Thresholds) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut results = Vec::new();
        for (i, row) in reader.deserialize().enumerate() {
            let mut r: DiffResult = row?;
            for (name, p) in [("p_value", r.p_value), ("adjusted_p_value", r.adjusted_p_value)] {
                if !(0.0..=1.0).contains(&p) {
                    return Err(OmicsError::schema(
                        layer.name(),
                        format!("{} out of range at row {}: {}", name, i + 2, p),
                    ));
                }
            }
            r.is_significant = thresholds.is_significant(r.adjusted_p_value, r.effect_size);
            results.push(r);
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = results.iter().find(|r| !seen.insert(r.feature_id.as_str())) {
            return Err(OmicsError::schema(
                layer.name(),
                format!("duplicate feature identifier '{}'", dup.feature_id),
            ));
        }

        results.sort_by(compare_results);
        Ok(Self {
            layer,
            group_a: "group_a".to_string(),
            group_b: "group_b".to_string(),
            method: "external".to_string(),
            correction: "external".to_string(),
            thresholds,
            results,
            excluded: Vec::new(),
        })
    }

    /// Replace the group and method labels, e.g. after [`DiffResultSet::from_csv`].
    pub fn with_labels(
        mut self,
        group_a: impl Into<String>,
        group_b: impl Into<String>,
        method: impl Into<String>,
        correction: impl Into<String>,
    ) -> Self {
        self.group_a = group_a.into();
        self.group_b = group_b.into();
        self.method = method.into();
        self.correction = correction.into();
        self
    }
}

fn write_results<'a, P, I>(path: P, rows: I) -> Result<()>
where
    P: AsRef<Path>,
    I: Iterator<Item = &'a DiffResult>,
{
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record([
        "feature_id",
        "mean_group_a",
        "mean_group_b",
        "effect_size",
        "p_value",
        "adjusted_p_value",
        "is_significant",
    ])?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn result(id: &str, effect: f64, p: f64, q: f64, sig: bool) -> DiffResult {
        DiffResult {
            feature_id: id.to_string(),
            mean_group_a: effect,
            mean_group_b: 0.0,
            effect_size: effect,
            p_value: p,
            adjusted_p_value: q,
            is_significant: sig,
        }
    }

    fn set(results: Vec<DiffResult>) -> DiffResultSet {
        DiffResultSet {
            layer: OmicsLayer::Proteomics,
            group_a: "Infected".into(),
            group_b: "Control".into(),
            method: "welch_t".into(),
            correction: "bonferroni".into(),
            thresholds: Thresholds::new(0.5, 0.05).unwrap(),
            results,
            excluded: vec![],
        }
    }

    #[test]
    fn test_thresholds_strict() {
        let t = Thresholds::new(1.0, 0.05).unwrap();
        assert!(t.is_significant(0.01, 1.5));
        assert!(t.is_significant(0.01, -1.5));
        assert!(!t.is_significant(0.05, 2.0));
        assert!(!t.is_significant(0.01, 1.0));
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(Thresholds::new(-1.0, 0.05).is_err());
        assert!(Thresholds::new(1.0, 0.0).is_err());
        assert!(Thresholds::new(1.0, 1.5).is_err());
        assert!(Thresholds::new(f64::NAN, 0.05).is_err());
    }

    #[test]
    fn test_compare_results() {
        let mut rows = vec![
            result("c", 1.0, 0.01, 0.02, true),
            result("b", -3.0, 0.01, 0.02, true),
            result("a", 1.0, 0.01, 0.02, true),
            result("d", 5.0, 0.001, 0.001, true),
        ];
        rows.sort_by(compare_results);
        let order: Vec<_> = rows.iter().map(|r| r.feature_id.as_str()).collect();
        assert_eq!(order, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_significant() {
        let s = set(vec![
            result("a", 2.0, 0.001, 0.003, true),
            result("b", 0.1, 0.2, 0.6, false),
        ]);
        assert_eq!(s.n_significant(), 1);
        assert_eq!(s.significant()[0].feature_id, "a");
        assert!(s.get("b").is_some());
        assert!(s.get("z").is_none());
    }

    #[test]
    fn test_csv_roundtrip_rederives_significance() {
        let s = set(vec![
            result("a", 2.0, 0.001, 0.003, true),
            result("b", 0.1, 0.2, 0.6, false),
        ]);
        let file = NamedTempFile::new().unwrap();
        s.to_csv(file.path()).unwrap();

        let header = std::fs::read_to_string(file.path()).unwrap();
        assert!(header.starts_with(
            "feature_id,mean_group_a,mean_group_b,effect_size,p_value,adjusted_p_value,is_significant"
        ));

        // Stricter fc threshold: "a" no longer passes
        let strict = Thresholds::new(3.0, 0.05).unwrap();
        let loaded = DiffResultSet::from_csv(file.path(), OmicsLayer::Proteomics, strict).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.n_significant(), 0);
        assert_eq!(loaded.results[0].feature_id, "a");
    }

    #[test]
    fn test_load_without_significance_column() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "feature_id,mean_group_a,mean_group_b,effect_size,p_value,adjusted_p_value\n\
             IL6,20.1,14.0,6.1,0.0001,0.002\n\
             GAPDH,15.0,14.9,0.1,0.4,0.8\n",
        )
        .unwrap();

        let t = Thresholds::new(0.5, 0.05).unwrap();
        let loaded = DiffResultSet::from_csv(file.path(), OmicsLayer::Proteomics, t).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.get("IL6").unwrap().is_significant);
        assert!(!loaded.get("GAPDH").unwrap().is_significant);
        assert_eq!(loaded.group_a, "group_a");
        assert_eq!(loaded.method, "external");

        let labelled = loaded.with_labels("Infected", "Control", "deseq2", "bh");
        assert_eq!(labelled.group_a, "Infected");
        assert_eq!(labelled.correction, "bh");
    }

    #[test]
    fn test_significant_csv_only_has_significant_rows() {
        let s = set(vec![
            result("a", 2.0, 0.001, 0.003, true),
            result("b", 0.1, 0.2, 0.6, false),
        ]);
        let file = NamedTempFile::new().unwrap();
        s.significant_to_csv(file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\na,"));
    }
}
