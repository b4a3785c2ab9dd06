//! Per-annotation aggregation of effect sizes.

use crate::annotate::AnnotationSource;
use crate::data::DiffResult;
use crate::error::Result;
use crate::test::{mean, sample_variance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Aggregate of the signed effect sizes of all features carrying an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub annotation_name: String,
    pub n_features: usize,
    pub mean_effect: f64,
    /// Sample standard deviation; absent for a single feature.
    pub std_effect: Option<f64>,
}

/// Group effect sizes by annotation.
///
/// Sorted by mean effect, highest first (ties by name).
pub fn summarize_annotations<'a, I, S>(results: I, source: &S) -> Vec<AnnotationSummary>
where
    I: IntoIterator<Item = &'a DiffResult>,
    S: AnnotationSource + ?Sized,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for r in results {
        for a in source.annotations(&r.feature_id) {
            groups
                .entry(a.name.clone())
                .or_insert_with(|| {
                    order.push(a.name.clone());
                    Vec::new()
                })
                .push(r.effect_size);
        }
    }

    let mut summaries: Vec<AnnotationSummary> = order
        .into_iter()
        .map(|name| {
            let effects = groups.remove(&name).unwrap_or_default();
            let std_effect = (effects.len() > 1).then(|| sample_variance(&effects).sqrt());
            AnnotationSummary {
                n_features: effects.len(),
                mean_effect: mean(&effects),
                std_effect,
                annotation_name: name,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.mean_effect
            .total_cmp(&a.mean_effect)
            .then_with(|| a.annotation_name.cmp(&b.annotation_name))
    });
    summaries
}

pub fn write_annotation_summary_csv<P: AsRef<Path>>(path: P, rows: &[AnnotationSummary]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["annotation_name", "n_features", "mean_effect", "std_effect"])?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::AnnotationTable;
    use approx::assert_relative_eq;

    fn result(id: &str, effect: f64) -> DiffResult {
        DiffResult {
            feature_id: id.to_string(),
            mean_group_a: effect,
            mean_group_b: 0.0,
            effect_size: effect,
            p_value: 0.001,
            adjusted_p_value: 0.01,
            is_significant: true,
        }
    }

    #[test]
    fn test_group_stats() {
        let table = AnnotationTable::new("t")
            .with("IL6", &["Cytokine", "TLR"])
            .with("TNF", &["Cytokine"])
            .with("JAK1", &["JAK-STAT"]);
        let results = vec![result("IL6", 2.0), result("TNF", 4.0), result("JAK1", 1.0), result("X", 9.0)];
        let s = summarize_annotations(&results, &table);

        assert_eq!(s.len(), 3);
        assert_eq!(s[0].annotation_name, "Cytokine");
        assert_eq!(s[0].n_features, 2);
        assert_relative_eq!(s[0].mean_effect, 3.0);
        assert_relative_eq!(s[0].std_effect.unwrap(), 2.0f64.sqrt(), epsilon = 1e-12);

        assert_eq!(s[1].annotation_name, "TLR");
        assert_eq!(s[1].std_effect, None);
        assert_eq!(s[2].annotation_name, "JAK-STAT");
    }

    #[test]
    fn test_empty() {
        let table = AnnotationTable::new("t");
        assert!(summarize_annotations(&[result("A", 1.0)], &table).is_empty());
    }
}
