//! L2-penalized logistic regression fit by gradient descent.

use super::{check_training_set, normalize_importance, Classifier, FittedClassifier};
use crate::error::Result;
use nalgebra::{DMatrix, DVector};

/// Logistic regression on features standardized with the training mean and
/// standard deviation.
///
/// Minimizes the mean log loss plus `l2 / (2n) · |w|²`; the intercept is not
/// penalized. Feature importance is |w| normalized to sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    pub l2: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is below this.
    pub tolerance: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            l2: 1.0,
            max_iter: 1000,
            tolerance: 1e-6,
        }
    }
}

struct FittedLogistic {
    center: Vec<f64>,
    scale: Vec<f64>,
    weights: DVector<f64>,
    intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Columns shifted to mean 0 and scaled to unit population variance;
/// constant columns are only shifted.
fn standardize(x: &DMatrix<f64>, center: &[f64], scale: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| (x[(i, j)] - center[j]) / scale[j])
}

impl FittedLogistic {
    fn decision(&self, z: &DMatrix<f64>) -> DVector<f64> {
        (z * &self.weights).add_scalar(self.intercept)
    }
}

impl FittedClassifier for FittedLogistic {
    fn predict_proba(&self, x: &DMatrix<f64>) -> Vec<f64> {
        let z = standardize(x, &self.center, &self.scale);
        self.decision(&z).iter().map(|&v| sigmoid(v)).collect()
    }

    fn feature_importance(&self) -> Vec<f64> {
        let mut imp: Vec<f64> = self.weights.iter().map(|w| w.abs()).collect();
        normalize_importance(&mut imp);
        imp
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &[bool]) -> Result<Box<dyn FittedClassifier>> {
        check_training_set(x, y)?;
        let n = x.nrows() as f64;
        let p = x.ncols();

        let center: Vec<f64> = (0..p).map(|j| x.column(j).mean()).collect();
        let scale: Vec<f64> = (0..p)
            .map(|j| {
                let sd = x.column(j).variance().sqrt();
                if sd > 0.0 && sd.is_finite() {
                    sd
                } else {
                    1.0
                }
            })
            .collect();
        let z = standardize(x, &center, &scale);
        let target = DVector::from_iterator(y.len(), y.iter().map(|&v| if v { 1.0 } else { 0.0 }));

        // Standardized columns have mean square at most 1, so the log loss
        // gradient is Lipschitz with constant at most (p + 1) / 4.
        let step = 1.0 / ((p as f64 + 1.0) / 4.0 + self.l2 / n);

        let mut model = FittedLogistic {
            center,
            scale,
            weights: DVector::zeros(p),
            intercept: 0.0,
        };
        for _ in 0..self.max_iter {
            let residual = model.decision(&z).map(sigmoid) - &target;
            let grad_w = z.tr_mul(&residual) / n + &model.weights * (self.l2 / n);
            let grad_b = residual.mean();

            model.weights -= &grad_w * step;
            model.intercept -= grad_b * step;
            if grad_w.amax() < self.tolerance && grad_b.abs() < self.tolerance {
                break;
            }
        }
        Ok(Box::new(model))
    }
}
