//! Stratified cross-validation, scoring and feature ranking.

use super::features::FeatureMatrix;
use super::Classifier;
use crate::correlate::rank_average;
use crate::error::{OmicsError, Result};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cross-validated performance of one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub model: String,
    pub n_folds: usize,
    pub accuracy: f64,
    pub accuracy_std: f64,
    /// `None` when no test fold held both classes.
    pub auc: Option<f64>,
    pub auc_std: Option<f64>,
}

/// Importance of one feature in a model fit on all samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub model: String,
    pub feature: String,
    pub importance: f64,
}

/// Test indices of `k` folds, each class spread round-robin over the folds
/// after a seeded shuffle.
pub fn stratified_folds(labels: &[bool], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k.max(1)];
    let mut offset = 0;
    for class in [true, false] {
        let mut idx: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        idx.shuffle(&mut rng);
        let n_folds = folds.len();
        for (j, i) in idx.iter().enumerate() {
            folds[(j + offset) % n_folds].push(*i);
        }
        // Continue where this class stopped so fold sizes stay even
        offset += idx.len();
    }
    folds.iter_mut().for_each(|f| f.sort_unstable());
    folds
}

/// Area under the ROC curve by the Mann-Whitney statistic, ties counting half.
///
/// `None` unless both classes are present.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || scores.len() != labels.len() {
        return None;
    }
    let ranks = rank_average(scores);
    let rank_sum: f64 = ranks.iter().zip(labels).filter(|(_, &l)| l).map(|(r, _)| r).sum();
    let u = rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// Fraction of samples on the right side of probability 0.5.
pub fn accuracy(scores: &[f64], labels: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = scores.iter().zip(labels).filter(|(&s, &l)| (s >= 0.5) == l).count();
    correct as f64 / labels.len() as f64
}

fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Stratified k-fold cross-validation of `classifier`.
///
/// The fold count is lowered to the size of the smaller class so every test
/// fold holds both classes. Fails when either class has fewer than two
/// samples or `n_folds < 2`.
pub fn cross_validate(
    classifier: &dyn Classifier,
    data: &FeatureMatrix,
    n_folds: usize,
    seed: u64,
) -> Result<CvSummary> {
    if n_folds < 2 {
        return Err(OmicsError::InvalidParameter(format!(
            "cross-validation needs at least 2 folds, got {}",
            n_folds
        )));
    }
    let n_pos = data.labels.iter().filter(|&&l| l).count();
    let n_neg = data.labels.len() - n_pos;
    if n_pos.min(n_neg) < 2 {
        return Err(OmicsError::EmptyData(format!(
            "cross-validation needs 2 samples per class, got {} {} and {} other",
            n_pos, data.positive, n_neg
        )));
    }
    let k = n_folds.min(n_pos.min(n_neg));
    let folds = stratified_folds(&data.labels, k, seed);

    let mut accuracies = Vec::with_capacity(k);
    let mut aucs = Vec::with_capacity(k);
    for (f, test) in folds.iter().enumerate() {
        let train: Vec<usize> = (0..data.n_samples()).filter(|i| test.binary_search(i).is_err()).collect();
        let (x_train, y_train) = data.select_rows(&train);
        let (x_test, y_test) = data.select_rows(test);

        let model = classifier.fit(&x_train, &y_train)?;
        let scores = model.predict_proba(&x_test);
        accuracies.push(accuracy(&scores, &y_test));
        if let Some(auc) = roc_auc(&scores, &y_test) {
            aucs.push(auc);
        }
        debug!(
            "{} fold {}: accuracy {:.3}",
            classifier.name(),
            f + 1,
            accuracies[f]
        );
    }

    let (accuracy, accuracy_std) = mean_std(&accuracies).unwrap_or((0.0, 0.0));
    let auc = mean_std(&aucs);
    let summary = CvSummary {
        model: classifier.name().to_string(),
        n_folds: k,
        accuracy,
        accuracy_std,
        auc: auc.map(|(m, _)| m),
        auc_std: auc.map(|(_, s)| s),
    };
    info!(
        "{}: {}-fold accuracy {:.3} ± {:.3}, AUC {}",
        summary.model,
        k,
        summary.accuracy,
        summary.accuracy_std,
        summary.auc.map_or("n/a".to_string(), |a| format!("{:.3}", a))
    );
    Ok(summary)
}

/// Fit on every sample and keep the `n_top` most important features,
/// ties by feature name.
pub fn rank_importances(
    classifier: &dyn Classifier,
    data: &FeatureMatrix,
    n_top: usize,
) -> Result<Vec<FeatureImportance>> {
    let model = classifier.fit(&data.values, &data.labels)?;
    let mut ranked: Vec<(&String, f64)> = data.features.iter().zip(model.feature_importance()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    Ok(ranked
        .into_iter()
        .take(n_top)
        .map(|(feature, importance)| FeatureImportance {
            model: classifier.name().to_string(),
            feature: feature.clone(),
            importance,
        })
        .collect())
}

pub fn write_performance_csv<P: AsRef<Path>>(path: P, rows: &[CvSummary]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["model", "n_folds", "accuracy", "accuracy_std", "auc", "auc_std"])?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_importance_csv<P: AsRef<Path>>(path: P, rows: &[FeatureImportance]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["model", "feature", "importance"])?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{LogisticRegression, RandomForest};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use tempfile::NamedTempFile;

    /// 12 samples; `signal` separates the classes, `noise` does not.
    fn data() -> FeatureMatrix {
        let n = 12;
        let labels: Vec<bool> = (0..n).map(|i| i < 6).collect();
        let values = DMatrix::from_fn(n, 2, |i, j| match j {
            0 => (if labels[i] { 8.0 } else { 2.0 }) + (i % 3) as f64 * 0.5,
            _ => ((i * 7) % 5) as f64,
        });
        FeatureMatrix::new(
            (0..n).map(|i| format!("S{:02}", i + 1)).collect(),
            vec!["proteomics:signal".into(), "proteomics:noise".into()],
            values,
            labels,
            "Infected",
        )
        .unwrap()
    }

    #[test]
    fn test_stratified_folds_partition_samples() {
        let labels = [true, true, true, true, true, true, false, false, false, false];
        let folds = stratified_folds(&labels, 2, 7);
        assert_eq!(folds.len(), 2);
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.len(), 5);
            assert_eq!(fold.iter().filter(|&&i| labels[i]).count(), 3);
        }
        assert_eq!(folds, stratified_folds(&labels, 2, 7));
    }

    #[test]
    fn test_roc_auc() {
        let auc = roc_auc(&[0.1, 0.4, 0.35, 0.8], &[false, false, true, true]).unwrap();
        assert_relative_eq!(auc, 0.75);
        assert_relative_eq!(roc_auc(&[0.5; 4], &[false, true, false, true]).unwrap(), 0.5);
        assert!(roc_auc(&[0.2, 0.9], &[true, true]).is_none());
        assert_relative_eq!(accuracy(&[0.9, 0.2, 0.4], &[true, false, true]), 2.0 / 3.0);
    }

    #[test]
    fn test_cross_validated_logistic_regression() {
        let summary = cross_validate(&LogisticRegression::default(), &data(), 5, 42).unwrap();
        assert_eq!(summary.model, "logistic_regression");
        assert_eq!(summary.n_folds, 5);
        assert_relative_eq!(summary.accuracy, 1.0);
        assert_relative_eq!(summary.auc.unwrap(), 1.0);
        assert_relative_eq!(summary.auc_std.unwrap(), 0.0);
    }

    #[test]
    fn test_fold_count_capped_by_smaller_class() {
        let mut d = data();
        d.labels = (0..12).map(|i| i < 3).collect();
        let summary = cross_validate(&LogisticRegression::default(), &d, 10, 1).unwrap();
        assert_eq!(summary.n_folds, 3);

        d.labels = (0..12).map(|i| i == 0).collect();
        assert!(matches!(
            cross_validate(&LogisticRegression::default(), &d, 5, 1),
            Err(OmicsError::EmptyData(_))
        ));
        assert!(cross_validate(&LogisticRegression::default(), &data(), 1, 1).is_err());
    }

    #[test]
    fn test_importances_rank_signal_first() {
        let forest = RandomForest {
            n_trees: 30,
            ..Default::default()
        };
        for classifier in [&LogisticRegression::default() as &dyn Classifier, &forest] {
            let ranked = rank_importances(classifier, &data(), 1).unwrap();
            assert_eq!(ranked.len(), 1);
            assert_eq!(ranked[0].feature, "proteomics:signal");
            assert_eq!(ranked[0].model, classifier.name());
        }
    }

    #[test]
    fn test_csv_headers() {
        let file = NamedTempFile::new().unwrap();
        let summary = CvSummary {
            model: "random_forest".into(),
            n_folds: 5,
            accuracy: 0.9,
            accuracy_std: 0.1,
            auc: None,
            auc_std: None,
        };
        write_performance_csv(file.path(), &[summary]).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text, "model,n_folds,accuracy,accuracy_std,auc,auc_std\nrandom_forest,5,0.9,0.1,,\n");

        let rows = rank_importances(&LogisticRegression::default(), &data(), 2).unwrap();
        write_importance_csv(file.path(), &rows).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("model,feature,importance\nlogistic_regression,proteomics:signal,"));
    }
}
