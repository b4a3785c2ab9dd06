//! Data structures for multi-omics differential abundance analysis.

mod dataset;
mod layer;
mod metadata;
mod result;

pub use dataset::OmicsDataset;
pub use layer::{OmicsLayer, ValueScale};
pub use metadata::SampleSheet;
pub use result::{compare_results, DiffResult, DiffResultSet, FeatureFailure, Thresholds};
