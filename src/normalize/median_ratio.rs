//! Median-of-ratios size factor normalization for count layers.
//!
//! # Algorithm
//!
//! 1. For every feature with a positive count in all samples, compute the
//!    geometric mean across samples (the pseudo-reference).
//! 2. The size factor of a sample is the median over those features of
//!    count / pseudo-reference.
//! 3. Normalized counts are raw counts divided by the sample's size factor.
//!
//! # Reference
//!
//! Anders S, Huber W. Differential expression analysis for sequence count
//! data. Genome Biology 11, R106 (2010).

use crate::data::OmicsDataset;
use crate::error::{OmicsError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// A count dataset divided by per-sample size factors.
#[derive(Debug, Clone)]
pub struct NormalizedCounts {
    pub dataset: OmicsDataset,
    /// Size factor per sample, in sample order.
    pub size_factors: Vec<f64>,
    /// Number of features used to estimate the size factors.
    pub n_reference_features: usize,
}

/// Estimate size factors for a features × samples count matrix.
///
/// Returns the factors and the number of features that entered the
/// pseudo-reference.
pub fn size_factors(counts: &DMatrix<f64>) -> Result<(Vec<f64>, usize)> {
    if counts.iter().any(|&v| v < 0.0 || !v.is_finite()) {
        return Err(OmicsError::InvalidParameter(
            "median-of-ratios normalization requires non-negative finite counts".to_string(),
        ));
    }

    let n_samples = counts.ncols();
    let log_geo_means: Vec<Option<f64>> = counts
        .row_iter()
        .map(|row| {
            if row.iter().all(|&v| v > 0.0) {
                Some(row.iter().map(|v| v.ln()).sum::<f64>() / n_samples as f64)
            } else {
                None
            }
        })
        .collect();

    let n_reference = log_geo_means.iter().filter(|g| g.is_some()).count();
    if n_reference == 0 {
        return Err(OmicsError::EmptyData(
            "no feature has a positive count in every sample".to_string(),
        ));
    }

    let factors: Vec<f64> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            let mut ratios: Vec<f64> = log_geo_means
                .iter()
                .enumerate()
                .filter_map(|(i, g)| g.map(|g| (counts[(i, j)].ln() - g).exp()))
                .collect();
            median(&mut ratios)
        })
        .collect();

    Ok((factors, n_reference))
}

/// Normalize a count dataset by median-of-ratios size factors.
pub fn norm_median_ratio(dataset: &OmicsDataset) -> Result<NormalizedCounts> {
    let (factors, n_reference) = size_factors(dataset.matrix())?;

    let mut data = dataset.matrix().clone();
    for (j, mut col) in data.column_iter_mut().enumerate() {
        col /= factors[j];
    }

    log::debug!(
        "{}: size factors from {} features, range {:.3}..{:.3}",
        dataset.layer(),
        n_reference,
        factors.iter().cloned().fold(f64::INFINITY, f64::min),
        factors.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    );

    Ok(NormalizedCounts {
        dataset: dataset.with_matrix(data)?,
        size_factors: factors,
        n_reference_features: n_reference,
    })
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
