//! Predicting condition from significant features.
//!
//! Significant features of every layer are joined into one sample × feature
//! matrix ([`FeatureMatrix`]). Each [`Classifier`] is scored by stratified
//! k-fold cross-validation and refit on all samples to rank features.
//!
//! # Classifiers
//!
//! - [`LogisticRegression`]: L2-penalized, on standardized features
//! - [`RandomForest`]: bagged Gini trees with √p features per split

pub mod evaluate;
pub mod features;
pub mod forest;
pub mod logistic;

pub use evaluate::{
    accuracy, cross_validate, rank_importances, roc_auc, stratified_folds, write_importance_csv,
    write_performance_csv, CvSummary, FeatureImportance,
};
pub use features::FeatureMatrix;
pub use forest::RandomForest;
pub use logistic::LogisticRegression;

use crate::error::Result;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary classifier over rows of a sample × feature matrix.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Fit on `x` (samples in rows) with `y[i]` true for the positive class.
    fn fit(&self, x: &DMatrix<f64>, y: &[bool]) -> Result<Box<dyn FittedClassifier>>;
}

/// A trained model.
pub trait FittedClassifier: Send + Sync {
    /// Probability of the positive class for each row of `x`.
    fn predict_proba(&self, x: &DMatrix<f64>) -> Vec<f64>;

    /// Non-negative importance per feature, summing to 1 unless all are zero.
    fn feature_importance(&self) -> Vec<f64>;
}

/// Classifiers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    LogisticRegression,
    RandomForest,
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::LogisticRegression => "logistic_regression",
            ClassifierKind::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check shapes shared by every `fit`.
pub(crate) fn check_training_set(x: &DMatrix<f64>, y: &[bool]) -> Result<()> {
    use crate::error::OmicsError;
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(OmicsError::EmptyData("training matrix has no rows or columns".into()));
    }
    if x.nrows() != y.len() {
        return Err(OmicsError::InvalidParameter(format!(
            "{} training rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Scale `values` in place to sum to 1; all-zero input stays zero.
pub(crate) fn normalize_importance(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}
