//! Sample × feature matrix of significant features across layers.

use crate::data::{DiffResultSet, OmicsDataset};
use crate::error::{OmicsError, Result};
use log::{debug, warn};
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Samples in rows, features in columns, one binary label per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub samples: Vec<String>,
    /// `layer:feature_id`, so identifiers from different layers stay distinct.
    pub features: Vec<String>,
    pub values: DMatrix<f64>,
    /// True for samples of the positive condition.
    pub labels: Vec<bool>,
    /// Condition label mapped to `true`.
    pub positive: String,
}

impl FeatureMatrix {
    pub fn new(
        samples: Vec<String>,
        features: Vec<String>,
        values: DMatrix<f64>,
        labels: Vec<bool>,
        positive: impl Into<String>,
    ) -> Result<Self> {
        if values.nrows() != samples.len() || values.ncols() != features.len() {
            return Err(OmicsError::InvalidParameter(format!(
                "matrix is {}x{} but there are {} samples and {} features",
                values.nrows(),
                values.ncols(),
                samples.len(),
                features.len()
            )));
        }
        if labels.len() != samples.len() {
            return Err(OmicsError::InvalidParameter(format!(
                "{} labels for {} samples",
                labels.len(),
                samples.len()
            )));
        }
        Ok(Self {
            samples,
            features,
            values,
            labels,
            positive: positive.into(),
        })
    }

    /// Join the significant features of each layer over the samples every
    /// layer shares.
    ///
    /// Samples keep the order of the first layer. The positive class is the
    /// first layer's `group_a`. A sample whose condition differs between
    /// layers is a schema error. Significant features missing from their
    /// dataset are skipped with a warning.
    pub fn from_layers(inputs: &[(&OmicsDataset, &DiffResultSet)]) -> Result<Self> {
        let (first, first_set) = inputs
            .first()
            .ok_or_else(|| OmicsError::EmptyData("no layers to build features from".into()))?;
        let positive = first_set.group_a.clone();

        let samples: Vec<String> = first
            .samples()
            .iter()
            .filter(|s| inputs.iter().all(|(d, _)| d.condition_of(s).is_some()))
            .cloned()
            .collect();
        if samples.is_empty() {
            return Err(OmicsError::EmptyData("layers share no samples".into()));
        }

        let mut labels = Vec::with_capacity(samples.len());
        for s in &samples {
            let condition = first.condition_of(s).unwrap_or_default();
            for (d, _) in &inputs[1..] {
                if d.condition_of(s) != Some(condition) {
                    return Err(OmicsError::schema(
                        d.layer().name(),
                        format!(
                            "sample '{}' is '{}' here but '{}' in {}",
                            s,
                            d.condition_of(s).unwrap_or_default(),
                            condition,
                            first.layer()
                        ),
                    ));
                }
            }
            labels.push(condition == positive);
        }

        let mut features = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        for (dataset, set) in inputs {
            let rows: HashMap<&str, usize> = dataset
                .features()
                .iter()
                .enumerate()
                .map(|(i, f)| (f.as_str(), i))
                .collect();
            let cols: HashMap<&str, usize> = dataset
                .samples()
                .iter()
                .enumerate()
                .map(|(j, s)| (s.as_str(), j))
                .collect();

            for r in set.significant() {
                let Some(&row) = rows.get(r.feature_id.as_str()) else {
                    warn!(
                        "{}: significant feature '{}' is not in the dataset",
                        dataset.layer(),
                        r.feature_id
                    );
                    continue;
                };
                features.push(format!("{}:{}", dataset.layer(), r.feature_id));
                columns.push(
                    samples
                        .iter()
                        .map(|s| dataset.matrix()[(row, cols[s.as_str()])])
                        .collect(),
                );
            }
        }
        if features.is_empty() {
            return Err(OmicsError::EmptyData("no significant features in any layer".into()));
        }
        debug!("feature matrix: {} samples x {} features", samples.len(), features.len());

        let values = DMatrix::from_fn(samples.len(), features.len(), |i, j| columns[j][i]);
        Self::new(samples, features, values, labels, positive)
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Rows `idx` of the matrix with their labels.
    pub fn select_rows(&self, idx: &[usize]) -> (DMatrix<f64>, Vec<bool>) {
        let x = DMatrix::from_fn(idx.len(), self.n_features(), |i, j| self.values[(idx[i], j)]);
        let y = idx.iter().map(|&i| self.labels[i]).collect();
        (x, y)
    }
}
