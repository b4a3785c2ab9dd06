//! The differential abundance engine.
//!
//! One engine serves every omics layer. A run partitions each feature's
//! values by group, applies the configured [`TestStrategy`], corrects the raw
//! p-values of all successfully tested features at once, flags significance
//! and orders the table.

use crate::correct::CorrectionMethod;
use crate::data::{compare_results, DiffResult, DiffResultSet, FeatureFailure, OmicsDataset, Thresholds};
use crate::error::{OmicsError, Result};
use crate::test::{mean, TestKind, TestStrategy};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Raw per-feature outcome before correction.
struct RawTest {
    row: usize,
    mean_a: f64,
    mean_b: f64,
    effect_size: f64,
    p_value: f64,
}

/// Configured differential abundance engine.
///
/// ```ignore
/// let results = DiffEngine::new(Thresholds::new(1.0, 0.05)?)
///     .test(TestKind::NegativeBinomial)
///     .correction(CorrectionMethod::BenjaminiHochberg)
///     .run(&dataset, "Infected", "Control")?;
/// ```
#[derive(Clone)]
pub struct DiffEngine {
    strategy: Arc<dyn TestStrategy>,
    correction: CorrectionMethod,
    thresholds: Thresholds,
    parallel: bool,
}

impl fmt::Debug for DiffEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffEngine")
            .field("strategy", &self.strategy.name())
            .field("correction", &self.correction)
            .field("thresholds", &self.thresholds)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl DiffEngine {
    /// Welch t-test with Bonferroni correction.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            strategy: TestKind::Welch.strategy(),
            correction: CorrectionMethod::Bonferroni,
            thresholds,
            parallel: true,
        }
    }

    /// Use a built-in test.
    pub fn test(mut self, kind: TestKind) -> Self {
        self.strategy = kind.strategy();
        self
    }

    /// Use a custom test.
    pub fn with_strategy<S: TestStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    pub fn correction(mut self, correction: CorrectionMethod) -> Self {
        self.correction = correction;
        self
    }

    /// Test features on the rayon pool (default) or sequentially.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Test every feature of `dataset`, `group_a` against `group_b`.
    ///
    /// Features whose statistic is undefined are excluded and listed in
    /// [`DiffResultSet::excluded`]; the correction counts only tested features.
    pub fn run(&self, dataset: &OmicsDataset, group_a: &str, group_b: &str) -> Result<DiffResultSet> {
        let layer = dataset.layer();
        let (g1, g2) = dataset.groups()?;
        for label in [group_a, group_b] {
            if label != g1 && label != g2 {
                return Err(OmicsError::schema(
                    layer.name(),
                    format!("unknown group '{}' (groups are '{}' and '{}')", label, g1, g2),
                ));
            }
        }
        if group_a == group_b {
            return Err(OmicsError::InvalidParameter(format!(
                "cannot compare group '{}' with itself",
                group_a
            )));
        }

        let idx_a = dataset.group_indices(group_a);
        let idx_b = dataset.group_indices(group_b);
        info!(
            "{}: testing {} features ({} vs {}, n = {} / {}) with {} + {}",
            layer,
            dataset.n_features(),
            group_a,
            group_b,
            idx_a.len(),
            idx_b.len(),
            self.strategy.name(),
            self.correction.name()
        );

        let test_row = |row: usize| -> std::result::Result<RawTest, FeatureFailure> {
            let a = dataset.values_at(row, &idx_a);
            let b = dataset.values_at(row, &idx_b);
            match self.strategy.test(&a, &b) {
                Ok(outcome) => Ok(RawTest {
                    row,
                    mean_a: mean(&a),
                    mean_b: mean(&b),
                    effect_size: self.strategy.effect_size(&a, &b),
                    p_value: outcome.p_value,
                }),
                Err(e) => Err(FeatureFailure {
                    feature_id: dataset.features()[row].clone(),
                    reason: e.to_string(),
                }),
            }
        };

        let outcomes: Vec<_> = if self.parallel {
            (0..dataset.n_features()).into_par_iter().map(test_row).collect()
        } else {
            (0..dataset.n_features()).map(test_row).collect()
        };

        let mut tested = Vec::with_capacity(outcomes.len());
        let mut excluded = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(raw) => tested.push(raw),
                Err(failure) => {
                    warn!(
                        "{}: {}",
                        layer,
                        OmicsError::from(failure.clone())
                    );
                    excluded.push(failure);
                }
            }
        }

        // Barrier: every raw p-value is in before correcting
        let raw_p: Vec<f64> = tested.iter().map(|t| t.p_value).collect();
        let adjusted = self.correction.adjust(&raw_p);

        let mut results: Vec<DiffResult> = tested
            .into_iter()
            .zip(adjusted)
            .map(|(t, q)| {
                // Keeps p <= q even under rounding
                let q = q.max(t.p_value).min(1.0);
                DiffResult {
                    feature_id: dataset.features()[t.row].clone(),
                    mean_group_a: t.mean_a,
                    mean_group_b: t.mean_b,
                    effect_size: t.effect_size,
                    p_value: t.p_value,
                    adjusted_p_value: q,
                    is_significant: self.thresholds.is_significant(q, t.effect_size),
                }
            })
            .collect();
        results.sort_by(compare_results);

        let set = DiffResultSet {
            layer,
            group_a: group_a.to_string(),
            group_b: group_b.to_string(),
            method: self.strategy.name().to_string(),
            correction: self.correction.name().to_string(),
            thresholds: self.thresholds,
            results,
            excluded,
        };
        debug!(
            "{}: {} tested, {} excluded, {} significant",
            layer,
            set.len(),
            set.excluded.len(),
            set.n_significant()
        );
        Ok(set)
    }
}

/// Welch t-test with Bonferroni correction at the given thresholds.
pub fn test_differential_abundance(
    dataset: &OmicsDataset,
    group_a: &str,
    group_b: &str,
    fc_threshold: f64,
    alpha: f64,
) -> Result<DiffResultSet> {
    DiffEngine::new(Thresholds::new(fc_threshold, alpha)?).run(dataset, group_a, group_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OmicsLayer;
    use crate::test::{TestFailure, TestOutcome};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn dataset(rows: &[(&str, [f64; 6])]) -> OmicsDataset {
        let features = rows.iter().map(|(id, _)| id.to_string()).collect();
        let samples: Vec<String> = (1..=6).map(|i| format!("S{:02}", i)).collect();
        let values: Vec<f64> = rows.iter().flat_map(|(_, v)| v.iter().copied()).collect();
        let conditions: Vec<(String, String)> = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), if i < 3 { "Infected" } else { "Control" }.to_string()))
            .collect();
        OmicsDataset::new(
            OmicsLayer::Proteomics,
            features,
            samples,
            DMatrix::from_row_slice(rows.len(), 6, &values),
            &conditions,
        )
        .unwrap()
    }

    fn sample() -> OmicsDataset {
        dataset(&[
            ("up", [20.0, 21.0, 19.5, 14.0, 14.5, 13.8]),
            ("flat", [15.0, 15.2, 14.9, 15.1, 14.8, 15.0]),
            ("down", [10.0, 10.4, 9.8, 12.0, 12.5, 11.9]),
            ("const", [5.0, 5.0, 5.0, 5.0, 5.0, 5.0]),
        ])
    }

    #[test]
    fn test_one_result_per_tested_feature() {
        let set = test_differential_abundance(&sample(), "Infected", "Control", 0.5, 0.05).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.excluded.len(), 1);
        assert_eq!(set.excluded[0].feature_id, "const");
        assert_eq!(set.n_attempted(), 4);
        assert!(set.get("const").is_none());
    }

    #[test]
    fn test_effect_and_means() {
        let set = test_differential_abundance(&sample(), "Infected", "Control", 0.5, 0.05).unwrap();
        let up = set.get("up").unwrap();
        assert_relative_eq!(up.mean_group_a, 60.5 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(up.mean_group_b, 42.3 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(up.effect_size, up.mean_group_a - up.mean_group_b, epsilon = 1e-12);
        assert!(up.effect_size > 5.0);
        let down = set.get("down").unwrap();
        assert!(down.effect_size < 0.0);
    }

    #[test]
    fn test_count_model_effect_is_log2_ratio_of_means() {
        let counts = dataset(&[
            ("G", [40.0, 44.0, 36.0, 10.0, 12.0, 8.0]),
            ("H", [20.0, 25.0, 30.0, 22.0, 27.0, 26.0]),
        ]);
        let set = DiffEngine::new(Thresholds::new(1.0, 0.05).unwrap())
            .test(TestKind::NegativeBinomial)
            .run(&counts, "Infected", "Control")
            .unwrap();
        let g = set.get("G").unwrap();
        assert_relative_eq!(g.mean_group_a, 40.0, epsilon = 1e-12);
        assert_relative_eq!(g.mean_group_b, 10.0, epsilon = 1e-12);
        assert_relative_eq!(g.effect_size, 2.0, epsilon = 1e-12);
        for r in set.iter() {
            assert_relative_eq!(
                r.effect_size,
                (r.mean_group_a / r.mean_group_b).log2(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_bonferroni_uses_tested_count() {
        let set = test_differential_abundance(&sample(), "Infected", "Control", 0.5, 0.05).unwrap();
        for r in set.iter() {
            assert_relative_eq!(r.adjusted_p_value, (r.p_value * 3.0).min(1.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invariants() {
        let set = test_differential_abundance(&sample(), "Infected", "Control", 0.5, 0.05).unwrap();
        for r in set.iter() {
            assert!(r.p_value <= r.adjusted_p_value && r.adjusted_p_value <= 1.0);
            assert_eq!(
                r.is_significant,
                r.adjusted_p_value < 0.05 && r.effect_size.abs() > 0.5
            );
        }
        for w in set.results.windows(2) {
            assert_ne!(compare_results(&w[0], &w[1]), std::cmp::Ordering::Greater);
        }
        assert!(!set.get("flat").unwrap().is_significant);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ds = sample();
        let t = Thresholds::new(0.5, 0.05).unwrap();
        let par = DiffEngine::new(t).run(&ds, "Infected", "Control").unwrap();
        let seq = DiffEngine::new(t).parallel(false).run(&ds, "Infected", "Control").unwrap();
        assert_eq!(par.results, seq.results);
        assert_eq!(par.excluded, seq.excluded);
    }

    #[test]
    fn test_group_order_flips_sign() {
        let ds = sample();
        let ab = test_differential_abundance(&ds, "Infected", "Control", 0.5, 0.05).unwrap();
        let ba = test_differential_abundance(&ds, "Control", "Infected", 0.5, 0.05).unwrap();
        assert_relative_eq!(
            ab.get("up").unwrap().effect_size,
            -ba.get("up").unwrap().effect_size,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_student_keeps_one_sided_constant() {
        let ds = dataset(&[
            ("X", [10.0, 10.0, 10.0, 1.0, 2.0, 3.0]),
            ("Y", [4.0, 5.0, 6.0, 4.0, 5.0, 6.0]),
        ]);
        let t = Thresholds::new(1.0, 0.05).unwrap();
        let welch = DiffEngine::new(t).run(&ds, "Infected", "Control").unwrap();
        assert_eq!(welch.excluded.len(), 1);

        let student = DiffEngine::new(t).test(TestKind::Student).run(&ds, "Infected", "Control").unwrap();
        assert!(student.excluded.is_empty());
        assert!(student.get("X").unwrap().is_significant);
    }

    #[test]
    fn test_unknown_group_is_schema_error() {
        let err = test_differential_abundance(&sample(), "Infected", "Mock", 0.5, 0.05).unwrap_err();
        assert!(matches!(err, OmicsError::Schema { .. }));
        assert!(test_differential_abundance(&sample(), "Infected", "Infected", 0.5, 0.05).is_err());
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(matches!(
            test_differential_abundance(&sample(), "Infected", "Control", 0.5, 0.0),
            Err(OmicsError::InvalidParameter(_))
        ));
    }

    struct AlwaysHalf;

    impl TestStrategy for AlwaysHalf {
        fn name(&self) -> &str {
            "always_half"
        }

        fn test(&self, a: &[f64], _b: &[f64]) -> std::result::Result<TestOutcome, TestFailure> {
            if a.iter().all(|v| *v == a[0]) {
                return Err(TestFailure::ZeroVariance);
            }
            Ok(TestOutcome {
                statistic: 0.0,
                p_value: 0.5,
                df: 1.0,
            })
        }
    }

    #[test]
    fn test_custom_strategy() {
        let set = DiffEngine::new(Thresholds::new(0.0, 1.0).unwrap())
            .with_strategy(AlwaysHalf)
            .correction(CorrectionMethod::BenjaminiHochberg)
            .run(&sample(), "Infected", "Control")
            .unwrap();
        assert_eq!(set.method, "always_half");
        assert_eq!(set.correction, "benjamini_hochberg");
        assert_eq!(set.len(), 3);
        for r in set.iter() {
            assert_relative_eq!(r.adjusted_p_value, 0.5);
            assert!(r.is_significant);
        }
    }
}
