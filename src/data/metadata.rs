//! Sample sheet handling: sample identifiers and their annotation columns.

use crate::error::{OmicsError, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

/// Sample metadata: one row per sample, string-valued columns.
///
/// The first CSV column is the sample identifier; every other column is an
/// annotation (e.g. `condition`, `replicate`).
#[derive(Debug, Clone, Default)]
pub struct SampleSheet {
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Annotation column names (excluding the sample ID column).
    column_names: Vec<String>,
    /// sample_id -> column -> value.
    data: HashMap<String, HashMap<String, String>>,
}

impl SampleSheet {
    /// Create an empty sheet with the given annotation columns.
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            sample_ids: Vec::new(),
            column_names,
            data: HashMap::new(),
        }
    }

    /// Append a sample. Values are matched to columns positionally.
    pub fn push(&mut self, sample_id: &str, values: Vec<String>) -> Result<()> {
        if self.data.contains_key(sample_id) {
            return Err(OmicsError::InvalidParameter(format!(
                "duplicate sample '{}' in sample sheet",
                sample_id
            )));
        }
        if values.len() != self.column_names.len() {
            return Err(OmicsError::InvalidParameter(format!(
                "sample '{}' has {} values, expected {}",
                sample_id,
                values.len(),
                self.column_names.len()
            )));
        }
        let row = self
            .column_names
            .iter()
            .cloned()
            .zip(values)
            .collect::<HashMap<_, _>>();
        self.sample_ids.push(sample_id.to_string());
        self.data.insert(sample_id.to_string(), row);
        Ok(())
    }

    /// Load a sample sheet from a CSV file.
    ///
    /// Expected format:
    /// - First row: header; the first column holds sample IDs
    /// - Subsequent rows: sample ID followed by annotation values
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(OmicsError::EmptyData(
                "Sample sheet must have at least one annotation column".to_string(),
            ));
        }
        let column_names: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
        let mut sheet = Self::new(column_names);

        for record in reader.records() {
            let record = record?;
            let Some(sample_id) = record.get(0).map(str::trim) else {
                continue;
            };
            if sample_id.is_empty() {
                continue;
            }
            let values: Vec<String> = (1..header.len())
                .map(|i| record.get(i).unwrap_or("").trim().to_string())
                .collect();
            sheet.push(sample_id, values)?;
        }

        if sheet.sample_ids.is_empty() {
            return Err(OmicsError::EmptyData("No samples in sample sheet".to_string()));
        }
        Ok(sheet)
    }

    /// Write the sheet as CSV with a leading `sample_id` column.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["sample_id".to_string()];
        header.extend(self.column_names.iter().cloned());
        writer.write_record(&header)?;

        for sid in &self.sample_ids {
            let mut row = vec![sid.clone()];
            for col in &self.column_names {
                row.push(self.get(sid, col).unwrap_or("").to_string());
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get the value of a column for one sample.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&str> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(column))
            .map(String::as_str)
    }

    /// (sample_id, value) pairs of one column in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<(String, String)>> {
        if !self.has_column(column) {
            return Err(OmicsError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| {
                let value = self.get(sid, column).unwrap_or("").to_string();
                (sid.clone(), value)
            })
            .collect())
    }

    /// Unique non-empty levels of a column, in order of first appearance.
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .column(column)?
            .into_iter()
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty() && seen.insert(v.clone()))
            .collect())
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}
