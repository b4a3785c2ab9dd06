//! Error types for the omics-biomarker library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum OmicsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed or inconsistent dataset. Fatal for that dataset.
    #[error("Schema error in layer '{layer}': {reason}")]
    Schema { layer: String, reason: String },

    /// A single feature's test is undefined. Recovered per feature by the engine.
    #[error("Computation error for feature '{feature_id}': {reason}")]
    Computation { feature_id: String, reason: String },

    /// Fewer than two matched pairs between two result sets.
    #[error("Insufficient data to correlate '{layer_a}' with '{layer_b}': {n_matched} matched feature(s), need at least 2")]
    InsufficientData {
        layer_a: String,
        layer_b: String,
        n_matched: usize,
    },

    /// Matched effect sizes are constant in one layer, so correlation is undefined.
    #[error("Cannot correlate '{layer_a}' with '{layer_b}': effect sizes are constant in '{constant_layer}'")]
    ConstantInput {
        layer_a: String,
        layer_b: String,
        constant_layer: String,
    },

    #[error("Invalid value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OmicsError {
    /// Shorthand for a schema error on a named layer.
    pub fn schema(layer: &str, reason: impl Into<String>) -> Self {
        Self::Schema {
            layer: layer.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that only affect one feature and are recovered by the engine.
    pub fn is_per_feature(&self) -> bool {
        matches!(self, Self::Computation { .. })
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, OmicsError>;
