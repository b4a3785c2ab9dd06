//! Feature × sample matrix for one omics layer plus per-sample condition labels.

use crate::data::layer::OmicsLayer;
use crate::data::metadata::SampleSheet;
use crate::error::{OmicsError, Result};
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

/// An immutable omics dataset.
///
/// Rows are features, columns are samples. Every sample carries exactly one
/// condition label. Transformations return a new dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct OmicsDataset {
    layer: OmicsLayer,
    features: Vec<String>,
    samples: Vec<String>,
    matrix: DMatrix<f64>,
    /// Condition label per sample, aligned with `samples`.
    conditions: Vec<String>,
}

impl OmicsDataset {
    /// Build a dataset from a matrix and a sample → condition table.
    ///
    /// Fails with [`OmicsError::Schema`] when:
    /// - feature or sample identifiers are duplicated
    /// - the matrix shape does not match the identifiers
    /// - the condition table does not cover exactly the matrix samples
    /// - any value is not finite
    pub fn new(
        layer: OmicsLayer,
        features: Vec<String>,
        samples: Vec<String>,
        matrix: DMatrix<f64>,
        sample_condition: &[(String, String)],
    ) -> Result<Self> {
        let name = layer.name();

        if let Some(dup) = first_duplicate(&features) {
            return Err(OmicsError::schema(name, format!("duplicate feature identifier '{}'", dup)));
        }
        if let Some(dup) = first_duplicate(&samples) {
            return Err(OmicsError::schema(name, format!("duplicate sample identifier '{}'", dup)));
        }
        if matrix.nrows() != features.len() || matrix.ncols() != samples.len() {
            return Err(OmicsError::schema(
                name,
                format!(
                    "matrix is {}x{} but there are {} features and {} samples",
                    matrix.nrows(),
                    matrix.ncols(),
                    features.len(),
                    samples.len()
                ),
            ));
        }

        let mut lookup: HashMap<&str, &str> = HashMap::with_capacity(sample_condition.len());
        for (sample, condition) in sample_condition {
            if lookup.insert(sample.as_str(), condition.as_str()).is_some() {
                return Err(OmicsError::schema(
                    name,
                    format!("sample '{}' appears more than once in the condition table", sample),
                ));
            }
        }

        let mut conditions = Vec::with_capacity(samples.len());
        for sample in &samples {
            match lookup.remove(sample.as_str()) {
                Some(c) if !c.is_empty() => conditions.push(c.to_string()),
                Some(_) => {
                    return Err(OmicsError::schema(
                        name,
                        format!("sample '{}' has an empty condition label", sample),
                    ))
                }
                None => {
                    return Err(OmicsError::schema(
                        name,
                        format!("sample '{}' has no condition label", sample),
                    ))
                }
            }
        }
        if let Some(extra) = sample_condition
            .iter()
            .map(|(s, _)| s)
            .find(|s| lookup.contains_key(s.as_str()))
        {
            return Err(OmicsError::schema(
                name,
                format!("condition table names sample '{}' which is not in the matrix", extra),
            ));
        }

        if let Some((idx, _)) = matrix.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            // Column-major storage
            let (row, col) = (idx % matrix.nrows(), idx / matrix.nrows());
            return Err(OmicsError::schema(
                name,
                format!(
                    "non-finite value for feature '{}' in sample '{}'",
                    features[row], samples[col]
                ),
            ));
        }

        Ok(Self {
            layer,
            features,
            samples,
            matrix,
            conditions,
        })
    }

    /// Build a dataset taking condition labels from one sample sheet column.
    pub fn from_sheet(
        layer: OmicsLayer,
        features: Vec<String>,
        samples: Vec<String>,
        matrix: DMatrix<f64>,
        sheet: &SampleSheet,
        condition_column: &str,
    ) -> Result<Self> {
        let table = sheet.column(condition_column)?;
        Self::new(layer, features, samples, matrix, &table)
    }

    /// Load a dataset from a feature × sample CSV and a sample sheet CSV.
    ///
    /// The matrix file has a header row `feature_id,<sample>,<sample>,...`
    /// followed by one row per feature.
    pub fn from_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        layer: OmicsLayer,
        matrix_path: P,
        sheet_path: Q,
        condition_column: &str,
    ) -> Result<Self> {
        let sheet = SampleSheet::from_csv(sheet_path)?;
        let (features, samples, matrix) = read_matrix_csv(layer, matrix_path)?;
        Self::from_sheet(layer, features, samples, matrix, &sheet, condition_column)
    }

    /// Write the matrix as CSV (features as rows).
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = Vec::with_capacity(self.samples.len() + 1);
        header.push("feature_id".to_string());
        header.extend(self.samples.iter().cloned());
        writer.write_record(&header)?;

        for (i, feature) in self.features.iter().enumerate() {
            let mut row = Vec::with_capacity(self.samples.len() + 1);
            row.push(feature.clone());
            row.extend(self.matrix.row(i).iter().map(|v| v.to_string()));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the sample → condition table as CSV.
    pub fn write_conditions<P: AsRef<Path>>(&self, path: P, condition_column: &str) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["sample_id", condition_column])?;
        for (s, c) in self.samples.iter().zip(&self.conditions) {
            writer.write_record([s, c])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn layer(&self) -> OmicsLayer {
        self.layer
    }

    /// Feature identifiers in row order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Sample identifiers in column order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Condition label of a sample.
    pub fn condition_of(&self, sample: &str) -> Option<&str> {
        self.samples
            .iter()
            .position(|s| s == sample)
            .map(|i| self.conditions[i].as_str())
    }

    /// The two distinct condition labels, in order of first appearance.
    pub fn groups(&self) -> Result<(String, String)> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = self
            .conditions
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .collect();
        match distinct.as_slice() {
            [a, b] => Ok(((*a).clone(), (*b).clone())),
            other => Err(OmicsError::schema(
                self.layer.name(),
                format!("expected exactly 2 condition labels, found {}", other.len()),
            )),
        }
    }

    /// Samples carrying a condition label, in dataset order.
    pub fn samples_in_group(&self, label: &str) -> Vec<&str> {
        self.group_indices(label)
            .into_iter()
            .map(|i| self.samples[i].as_str())
            .collect()
    }

    /// Column indices of samples carrying a condition label.
    pub fn group_indices(&self, label: &str) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Values of one feature at the given sample columns.
    pub fn values_at(&self, row: usize, columns: &[usize]) -> Vec<f64> {
        columns.iter().map(|&j| self.matrix[(row, j)]).collect()
    }

    /// New dataset restricted to the given features, in the given order.
    pub fn subset_features(&self, ids: &[&str]) -> Result<Self> {
        let index: HashMap<&str, usize> = self
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str(), i))
            .collect();

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            let row = index.get(id).ok_or_else(|| {
                OmicsError::schema(self.layer.name(), format!("unknown feature '{}'", id))
            })?;
            rows.push(*row);
        }

        let matrix = self.matrix.select_rows(rows.iter());
        Self::new(
            self.layer,
            ids.iter().map(|s| s.to_string()).collect(),
            self.samples.clone(),
            matrix,
            &self.condition_table(),
        )
    }

    /// New dataset with the same identifiers and a replacement matrix.
    pub fn with_matrix(&self, matrix: DMatrix<f64>) -> Result<Self> {
        Self::new(
            self.layer,
            self.features.clone(),
            self.samples.clone(),
            matrix,
            &self.condition_table(),
        )
    }

    /// (sample, condition) pairs in sample order.
    pub fn condition_table(&self) -> Vec<(String, String)> {
        self.samples
            .iter()
            .cloned()
            .zip(self.conditions.iter().cloned())
            .collect()
    }
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(id.as_str())).map(String::as_str)
}

fn read_matrix_csv<P: AsRef<Path>>(
    layer: OmicsLayer,
    path: P,
) -> Result<(Vec<String>, Vec<String>, DMatrix<f64>)> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new().from_reader(file);

    let header = reader.headers()?.clone();
    if header.len() < 2 {
        return Err(OmicsError::schema(layer.name(), "matrix has no sample columns"));
    }
    let samples: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();

    let mut features = Vec::new();
    let mut values = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != header.len() {
            return Err(OmicsError::schema(
                layer.name(),
                format!(
                    "row {} has {} fields, expected {}",
                    row_idx + 2,
                    record.len(),
                    header.len()
                ),
            ));
        }
        features.push(record[0].trim().to_string());
        for (col_idx, field) in record.iter().skip(1).enumerate() {
            let v: f64 = field.trim().parse().map_err(|_| OmicsError::InvalidValue {
                value: field.to_string(),
                row: row_idx + 2,
                col: col_idx + 2,
            })?;
            values.push(v);
        }
    }

    if features.is_empty() {
        return Err(OmicsError::EmptyData(format!("{} matrix has no features", layer.name())));
    }

    let matrix = DMatrix::from_row_slice(features.len(), samples.len(), &values);
    Ok((features, samples, matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn table(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(s, c)| (s.to_string(), c.to_string())).collect()
    }

    fn small() -> OmicsDataset {
        OmicsDataset::new(
            OmicsLayer::Proteomics,
            ids(&["P1", "P2"]),
            ids(&["S1", "S2", "S3", "S4"]),
            DMatrix::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
            &table(&[("S1", "Infected"), ("S2", "Infected"), ("S3", "Control"), ("S4", "Control")]),
        )
        .unwrap()
    }

    #[test]
    fn test_groups_and_membership() {
        let ds = small();
        assert_eq!(ds.groups().unwrap(), ("Infected".to_string(), "Control".to_string()));
        assert_eq!(ds.samples_in_group("Control"), vec!["S3", "S4"]);
        assert_eq!(ds.group_indices("Infected"), vec![0, 1]);
        assert_eq!(ds.values_at(1, &[2, 3]), vec![7.0, 8.0]);
        assert_eq!(ds.condition_of("S2"), Some("Infected"));
    }

    #[test]
    fn test_duplicate_feature_is_schema_error() {
        let err = OmicsDataset::new(
            OmicsLayer::RnaSeq,
            ids(&["G1", "G1"]),
            ids(&["S1", "S2"]),
            DMatrix::zeros(2, 2),
            &table(&[("S1", "A"), ("S2", "B")]),
        )
        .unwrap_err();
        assert!(matches!(err, OmicsError::Schema { .. }));
    }

    #[test]
    fn test_sample_sets_must_agree() {
        let missing = OmicsDataset::new(
            OmicsLayer::RnaSeq,
            ids(&["G1"]),
            ids(&["S1", "S2"]),
            DMatrix::zeros(1, 2),
            &table(&[("S1", "A")]),
        );
        assert!(matches!(missing, Err(OmicsError::Schema { .. })));

        let extra = OmicsDataset::new(
            OmicsLayer::RnaSeq,
            ids(&["G1"]),
            ids(&["S1", "S2"]),
            DMatrix::zeros(1, 2),
            &table(&[("S1", "A"), ("S2", "B"), ("S9", "B")]),
        );
        assert!(matches!(extra, Err(OmicsError::Schema { .. })));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = OmicsDataset::new(
            OmicsLayer::RnaSeq,
            ids(&["G1", "G2"]),
            ids(&["S1", "S2"]),
            DMatrix::zeros(1, 2),
            &table(&[("S1", "A"), ("S2", "B")]),
        );
        assert!(matches!(err, Err(OmicsError::Schema { .. })));
    }

    #[test]
    fn test_three_groups_rejected() {
        let ds = OmicsDataset::new(
            OmicsLayer::Metabolomics,
            ids(&["M1"]),
            ids(&["S1", "S2", "S3"]),
            DMatrix::zeros(1, 3),
            &table(&[("S1", "A"), ("S2", "B"), ("S3", "C")]),
        )
        .unwrap();
        assert!(matches!(ds.groups(), Err(OmicsError::Schema { .. })));
    }

    #[test]
    fn test_subset_features() {
        let ds = small();
        let sub = ds.subset_features(&["P2"]).unwrap();
        assert_eq!(sub.features(), &["P2"]);
        assert_eq!(sub.matrix()[(0, 0)], 5.0);
        assert!(ds.subset_features(&["nope"]).is_err());
        // Original untouched
        assert_eq!(ds.n_features(), 2);
    }

    #[test]
    fn test_csv_roundtrip() {
        let mut matrix_file = NamedTempFile::new().unwrap();
        writeln!(matrix_file, "feature_id,S1,S2,S3").unwrap();
        writeln!(matrix_file, "IL6,10,12,3").unwrap();
        writeln!(matrix_file, "TNF,7,8,1").unwrap();
        matrix_file.flush().unwrap();

        let mut sheet_file = NamedTempFile::new().unwrap();
        writeln!(sheet_file, "sample_id,condition").unwrap();
        writeln!(sheet_file, "S1,Infected").unwrap();
        writeln!(sheet_file, "S2,Infected").unwrap();
        writeln!(sheet_file, "S3,Control").unwrap();
        sheet_file.flush().unwrap();

        let ds = OmicsDataset::from_csv(
            OmicsLayer::RnaSeq,
            matrix_file.path(),
            sheet_file.path(),
            "condition",
        )
        .unwrap();
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.matrix()[(1, 1)], 8.0);

        let out = NamedTempFile::new().unwrap();
        ds.to_csv(out.path()).unwrap();
        let reloaded = OmicsDataset::from_csv(
            OmicsLayer::RnaSeq,
            out.path(),
            sheet_file.path(),
            "condition",
        )
        .unwrap();
        assert_eq!(reloaded.matrix(), ds.matrix());
        assert_eq!(reloaded.features(), ds.features());
    }

    #[test]
    fn test_invalid_value() {
        let mut matrix_file = NamedTempFile::new().unwrap();
        writeln!(matrix_file, "feature_id,S1").unwrap();
        writeln!(matrix_file, "IL6,abc").unwrap();
        matrix_file.flush().unwrap();

        let mut sheet_file = NamedTempFile::new().unwrap();
        writeln!(sheet_file, "sample_id,condition").unwrap();
        writeln!(sheet_file, "S1,A").unwrap();
        sheet_file.flush().unwrap();

        let err = OmicsDataset::from_csv(
            OmicsLayer::RnaSeq,
            matrix_file.path(),
            sheet_file.path(),
            "condition",
        )
        .unwrap_err();
        assert!(matches!(err, OmicsError::InvalidValue { row: 2, col: 2, .. }));
    }
}
