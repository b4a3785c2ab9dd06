//! Two-group hypothesis tests applied feature by feature.
//!
//! Every test implements [`TestStrategy`]; the differential abundance engine
//! only sees the trait, so custom tests plug in next to the built-in ones.

pub mod ttest;

pub use anova::{one_way_anova, AnovaOutcome};
pub use nb::NegativeBinomialWald;
pub use ttest::{StudentT, WelchT};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::sync::Arc;
use thiserror::Error;

/// Outcome of one successful test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    /// Test statistic (t or z).
    pub statistic: f64,
    /// Two-sided p-value in [0, 1].
    pub p_value: f64,
    /// Degrees of freedom; infinite for z tests.
    pub df: f64,
}

/// Why a test could not be computed for a feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TestFailure {
    #[error("too few observations (group sizes {n_a} and {n_b}, need at least {required} each)")]
    TooFewObservations {
        n_a: usize,
        n_b: usize,
        required: usize,
    },

    #[error("{observations} observation(s) in {groups} group(s) leave no residual degrees of freedom")]
    Underdetermined { groups: usize, observations: usize },

    #[error("zero variance, test statistic is undefined")]
    ZeroVariance,

    #[error("non-finite input value")]
    NonFinite,

    #[error("zero mean count in a group, log fold change is undefined")]
    ZeroMean,

    #[error("negative count {0}")]
    NegativeValue(f64),

    #[error("distribution error: {0}")]
    Distribution(String),
}

/// A per-feature two-group test.
///
/// Implementations must be stateless with respect to features: the engine may
/// call `test` for different features concurrently.
pub trait TestStrategy: Send + Sync {
    /// Short name recorded in result sets.
    fn name(&self) -> &str;

    /// Test group `a` against group `b`.
    fn test(&self, a: &[f64], b: &[f64]) -> Result<TestOutcome, TestFailure>;

    /// Effect size reported for the feature. Called only after `test` succeeded.
    fn effect_size(&self, a: &[f64], b: &[f64]) -> f64 {
        mean(a) - mean(b)
    }
}

/// Built-in test strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Welch unequal-variance t-test.
    #[default]
    Welch,
    /// Student pooled-variance t-test.
    Student,
    /// Negative-binomial Wald test for counts.
    NegativeBinomial,
}

impl TestKind {
    pub fn strategy(&self) -> Arc<dyn TestStrategy> {
        match self {
            Self::Welch => Arc::new(WelchT),
            Self::Student => Arc::new(StudentT),
            Self::NegativeBinomial => Arc::new(NegativeBinomialWald),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "welch" | "welch_t" => Some(Self::Welch),
            "student" | "student_t" | "pooled" => Some(Self::Student),
            "nb" | "negative_binomial" | "nb_wald" => Some(Self::NegativeBinomial),
            _ => None,
        }
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample variance with n − 1 denominator; NaN for fewer than two values.
pub fn sample_variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let m = mean(x);
    x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (x.len() - 1) as f64
}

pub(crate) fn check_finite(a: &[f64], b: &[f64]) -> Result<(), TestFailure> {
    if a.iter().chain(b).all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TestFailure::NonFinite)
    }
}

/// Two-sided p-value of a t statistic.
pub(crate) fn t_two_sided(t: f64, df: f64) -> Result<f64, TestFailure> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| TestFailure::Distribution(e.to_string()))?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Two-sided p-value of a standard normal statistic.
pub(crate) fn z_two_sided(z: f64) -> Result<f64, TestFailure> {
    let dist = Normal::new(0.0, 1.0).map_err(|e| TestFailure::Distribution(e.to_string()))?;
    Ok((2.0 * dist.sf(z.abs())).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_relative_eq!(sample_variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5);
        assert!(mean(&[]).is_nan());
        assert!(sample_variance(&[1.0]).is_nan());
    }

    #[test]
    fn test_kind_strategy_names() {
        assert_eq!(TestKind::Welch.strategy().name(), "welch_t");
        assert_eq!(TestKind::Student.strategy().name(), "student_t");
        assert_eq!(TestKind::NegativeBinomial.strategy().name(), "nb_wald");
        assert_eq!(TestKind::default(), TestKind::Welch);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(TestKind::parse("Welch"), Some(TestKind::Welch));
        assert_eq!(TestKind::parse("nb"), Some(TestKind::NegativeBinomial));
        assert_eq!(TestKind::parse("anova"), None);
    }

    #[test]
    fn test_two_sided_at_zero() {
        assert_relative_eq!(t_two_sided(0.0, 10.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(z_two_sided(0.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(z_two_sided(1.959963984540054).unwrap(), 0.05, epsilon = 1e-6);
    }
}
