//! Multiple testing correction.

pub mod bh;
pub mod bonferroni;

pub use bh::correct_bh;
pub use bonferroni::correct_bonferroni;

use serde::{Deserialize, Serialize};

/// Correction applied to the raw p-values of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// Family-wise error control: p × n, clipped to 1.
    #[default]
    Bonferroni,
    /// False discovery rate control.
    #[serde(alias = "bh", alias = "fdr_bh")]
    BenjaminiHochberg,
}

impl CorrectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bonferroni => "bonferroni",
            Self::BenjaminiHochberg => "benjamini_hochberg",
        }
    }

    /// Adjusted p-values in input order. `n` is `p_values.len()`.
    pub fn adjust(&self, p_values: &[f64]) -> Vec<f64> {
        match self {
            Self::Bonferroni => correct_bonferroni(p_values),
            Self::BenjaminiHochberg => correct_bh(p_values),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bonferroni" => Some(Self::Bonferroni),
            "bh" | "fdr_bh" | "benjamini_hochberg" | "fdr" => Some(Self::BenjaminiHochberg),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjusted_never_below_raw() {
        let p = [0.0001, 0.02, 0.04, 0.3, 0.8];
        for method in [CorrectionMethod::Bonferroni, CorrectionMethod::BenjaminiHochberg] {
            let q = method.adjust(&p);
            for (raw, adj) in p.iter().zip(&q) {
                assert!(raw <= adj && *adj <= 1.0, "{}: {} > {}", method.name(), raw, adj);
            }
        }
    }

    #[test]
    fn test_bh_less_conservative() {
        let p = [0.01, 0.02, 0.03];
        let bonf = CorrectionMethod::Bonferroni.adjust(&p);
        let bh = CorrectionMethod::BenjaminiHochberg.adjust(&p);
        assert!(bh.iter().zip(&bonf).all(|(a, b)| a <= b));
    }

    #[test]
    fn test_serde_names() {
        let m: CorrectionMethod = serde_yaml::from_str("bh").unwrap();
        assert_eq!(m, CorrectionMethod::BenjaminiHochberg);
        assert_eq!(serde_yaml::to_string(&CorrectionMethod::Bonferroni).unwrap().trim(), "bonferroni");
    }
}
