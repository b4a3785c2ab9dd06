//! Annotation sources: feature identifier → ordered annotations.

use crate::error::{OmicsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One annotation of a feature, e.g. a pathway or an interaction partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    /// Explicit edge weight; the mapper falls back to |effect size|.
    pub weight: Option<f64>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: None,
        }
    }

    pub fn weighted(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight: Some(weight),
        }
    }
}

/// Anything that can annotate a feature identifier.
pub trait AnnotationSource {
    /// Short name of the source (e.g. "kegg").
    fn name(&self) -> &str;

    /// Annotations of a feature, in source order. Unknown features yield none.
    fn annotations(&self, feature_id: &str) -> Vec<Annotation>;
}

/// In-memory annotation table.
///
/// Per feature, annotations are an ordered set: re-inserting a name keeps the
/// first occurrence.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    name: String,
    /// Feature IDs in insertion order.
    features: Vec<String>,
    entries: HashMap<String, Vec<Annotation>>,
}

/// CSV row layout for annotation tables.
#[derive(Debug, Serialize, Deserialize)]
struct AnnotationRow {
    feature_id: String,
    annotation_name: String,
    weight: Option<f64>,
}

impl AnnotationTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add one annotation to a feature. Returns false if the name was already present.
    pub fn insert(&mut self, feature_id: &str, annotation: Annotation) -> bool {
        if !self.entries.contains_key(feature_id) {
            self.features.push(feature_id.to_string());
        }
        let list = self.entries.entry(feature_id.to_string()).or_default();
        if list.iter().any(|a| a.name == annotation.name) {
            return false;
        }
        list.push(annotation);
        true
    }

    /// Builder-style insert of unweighted annotations.
    pub fn with(mut self, feature_id: &str, names: &[&str]) -> Self {
        for name in names {
            self.insert(feature_id, Annotation::new(*name));
        }
        self
    }

    /// Number of annotated features.
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Total number of (feature, annotation) entries.
    pub fn n_entries(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.entries.contains_key(feature_id)
    }

    /// Feature IDs in insertion order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Borrow the annotations of a feature.
    pub fn get(&self, feature_id: &str) -> &[Annotation] {
        self.entries.get(feature_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Load from CSV with columns `feature_id,annotation_name,weight`
    /// (`weight` may be empty).
    pub fn from_csv<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut table = Self::new(name);
        for row in reader.deserialize() {
            let row: AnnotationRow = row?;
            if row.feature_id.trim().is_empty() || row.annotation_name.trim().is_empty() {
                return Err(OmicsError::InvalidParameter(format!(
                    "annotation table '{}' has an empty identifier",
                    name
                )));
            }
            table.insert(
                row.feature_id.trim(),
                Annotation {
                    name: row.annotation_name.trim().to_string(),
                    weight: row.weight,
                },
            );
        }
        Ok(table)
    }

    /// Write as CSV with columns `feature_id,annotation_name,weight`.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(["feature_id", "annotation_name", "weight"])?;
        for feature in &self.features {
            for a in self.get(feature) {
                writer.serialize(AnnotationRow {
                    feature_id: feature.clone(),
                    annotation_name: a.name.clone(),
                    weight: a.weight,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl AnnotationSource for AnnotationTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn annotations(&self, feature_id: &str) -> Vec<Annotation> {
        self.get(feature_id).to_vec()
    }
}
