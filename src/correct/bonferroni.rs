//! Bonferroni family-wise error rate correction.

/// Multiply each p-value by the number of tests and clip to 1.
pub fn correct_bonferroni(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len() as f64;
    p_values.iter().map(|p| (p * n).min(1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bonferroni_scales_and_clips() {
        let q = correct_bonferroni(&[0.001, 0.01, 0.3, 0.9]);
        assert_relative_eq!(q[0], 0.004);
        assert_relative_eq!(q[1], 0.04);
        assert_relative_eq!(q[2], 1.0);
        assert_relative_eq!(q[3], 1.0);
    }

    #[test]
    fn test_bonferroni_single_and_empty() {
        assert_relative_eq!(correct_bonferroni(&[0.2])[0], 0.2);
        assert!(correct_bonferroni(&[]).is_empty());
    }
}
