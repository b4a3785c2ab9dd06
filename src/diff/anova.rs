//! Condition-effect ANOVA on the most abundant features of a layer.

use crate::data::OmicsDataset;
use crate::error::Result;
use crate::test::one_way_anova;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ANOVA of condition on one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaRow {
    pub feature_id: String,
    pub f_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// One-way ANOVA of condition on the `n_top` features with the highest mean
/// across all samples.
///
/// Rows are sorted by p-value (ties by feature identifier). Features whose F
/// statistic is undefined are skipped with a warning.
pub fn anova_top_features(dataset: &OmicsDataset, n_top: usize, alpha: f64) -> Result<Vec<AnovaRow>> {
    let (group_a, group_b) = dataset.groups()?;
    let columns = [dataset.group_indices(&group_a), dataset.group_indices(&group_b)];

    let matrix = dataset.matrix();
    let mut by_mean: Vec<(usize, f64)> = (0..dataset.n_features())
        .map(|i| (i, matrix.row(i).mean()))
        .collect();
    by_mean.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| dataset.features()[a.0].cmp(&dataset.features()[b.0]))
    });

    let mut rows = Vec::new();
    for &(i, _) in by_mean.iter().take(n_top) {
        let feature_id = &dataset.features()[i];
        let a = dataset.values_at(i, &columns[0]);
        let b = dataset.values_at(i, &columns[1]);
        match one_way_anova(&[&a, &b]) {
            Ok(out) => rows.push(AnovaRow {
                feature_id: feature_id.clone(),
                f_statistic: out.f_statistic,
                p_value: out.p_value,
                significant: out.p_value < alpha,
            }),
            Err(e) => warn!("ANOVA skipped for '{}': {}", feature_id, e),
        }
    }

    rows.sort_by(|a, b| {
        a.p_value
            .total_cmp(&b.p_value)
            .then_with(|| a.feature_id.cmp(&b.feature_id))
    });
    info!(
        "{}: ANOVA on {} top-mean {}s, {} with p < {}",
        dataset.layer(),
        rows.len(),
        dataset.layer().feature_noun(),
        rows.iter().filter(|r| r.significant).count(),
        alpha
    );
    Ok(rows)
}

/// Write ANOVA rows to CSV.
pub fn write_anova_csv<P: AsRef<Path>>(path: P, rows: &[AnovaRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["feature_id", "f_statistic", "p_value", "significant"])?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}
