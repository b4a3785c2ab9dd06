//! Two-sample t-tests.

use super::{check_finite, mean, sample_variance, t_two_sided, TestFailure, TestOutcome, TestStrategy};

/// Welch's unequal-variance t-test.
///
/// Strict: a group with zero variance makes the statistic undefined, even if
/// the other group varies.
#[derive(Debug, Clone, Copy, Default)]
pub struct WelchT;

impl TestStrategy for WelchT {
    fn name(&self) -> &str {
        "welch_t"
    }

    fn test(&self, a: &[f64], b: &[f64]) -> Result<TestOutcome, TestFailure> {
        check_finite(a, b)?;
        let (n_a, n_b) = (a.len(), b.len());
        if n_a < 2 || n_b < 2 {
            return Err(TestFailure::TooFewObservations { n_a, n_b, required: 2 });
        }

        let var_a = sample_variance(a);
        let var_b = sample_variance(b);
        if var_a == 0.0 || var_b == 0.0 {
            return Err(TestFailure::ZeroVariance);
        }

        let se2_a = var_a / n_a as f64;
        let se2_b = var_b / n_b as f64;
        let se2 = se2_a + se2_b;
        let t = (mean(a) - mean(b)) / se2.sqrt();

        // Welch–Satterthwaite
        let df = se2.powi(2)
            / (se2_a.powi(2) / (n_a - 1) as f64 + se2_b.powi(2) / (n_b - 1) as f64);

        Ok(TestOutcome {
            statistic: t,
            p_value: t_two_sided(t, df)?,
            df,
        })
    }
}

/// Student's pooled-variance t-test.
///
/// Only fails when the pooled variance is zero, i.e. both groups are constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentT;

impl TestStrategy for StudentT {
    fn name(&self) -> &str {
        "student_t"
    }

    fn test(&self, a: &[f64], b: &[f64]) -> Result<TestOutcome, TestFailure> {
        check_finite(a, b)?;
        let (n_a, n_b) = (a.len(), b.len());
        if n_a < 1 || n_b < 1 || n_a + n_b < 3 {
            return Err(TestFailure::TooFewObservations { n_a, n_b, required: 1 });
        }

        let ss = |x: &[f64]| {
            let m = mean(x);
            x.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        };
        let df = (n_a + n_b - 2) as f64;
        let pooled = (ss(a) + ss(b)) / df;
        if pooled == 0.0 {
            return Err(TestFailure::ZeroVariance);
        }

        let se = (pooled * (1.0 / n_a as f64 + 1.0 / n_b as f64)).sqrt();
        let t = (mean(a) - mean(b)) / se;

        Ok(TestOutcome {
            statistic: t,
            p_value: t_two_sided(t, df)?,
            df,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const A: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
    const B: [f64; 5] = [2.0, 4.0, 6.0, 8.0, 10.0];

    #[test]
    fn test_welch_statistic_and_df() {
        let out = WelchT.test(&A, &B).unwrap();
        // se^2 = 2.5/5 + 10/5 = 2.5
        assert_relative_eq!(out.statistic, -3.0 / 2.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(out.df, 6.25 / (0.0625 + 1.0), epsilon = 1e-12);
        assert!(out.p_value > 0.09 && out.p_value < 0.13);
    }

    #[test]
    fn test_student_statistic() {
        let out = StudentT.test(&A, &B).unwrap();
        assert_relative_eq!(out.statistic, -3.0 / 2.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(out.df, 8.0);
        // More df than Welch here, so a smaller p-value
        let welch = WelchT.test(&A, &B).unwrap();
        assert!(out.p_value < welch.p_value);
    }

    #[test]
    fn test_welch_zero_variance_in_one_group() {
        let err = WelchT.test(&[10.0, 10.0, 10.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, TestFailure::ZeroVariance);
    }

    #[test]
    fn test_student_tolerates_one_constant_group() {
        let out = StudentT.test(&[10.0, 10.0, 10.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(out.p_value < 0.01);
        assert_eq!(
            StudentT.test(&[10.0, 10.0], &[1.0, 1.0]).unwrap_err(),
            TestFailure::ZeroVariance
        );
    }

    #[test]
    fn test_identical_groups() {
        let out = WelchT.test(&A, &A).unwrap();
        assert_relative_eq!(out.statistic, 0.0);
        assert_relative_eq!(out.p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_and_non_finite() {
        assert!(matches!(
            WelchT.test(&[1.0], &[1.0, 2.0]),
            Err(TestFailure::TooFewObservations { .. })
        ));
        assert_eq!(
            WelchT.test(&[1.0, f64::NAN], &[1.0, 2.0]).unwrap_err(),
            TestFailure::NonFinite
        );
    }

    #[test]
    fn test_effect_size_is_mean_difference() {
        assert_relative_eq!(WelchT.effect_size(&A, &B), -3.0);
    }
}
