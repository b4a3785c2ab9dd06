//! Multi-omics biomarker discovery library
//!
//! This library provides the building blocks of a biomarker discovery
//! workflow over RNA-seq, proteomics and metabolomics layers.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (OmicsDataset, SampleSheet, results)
//! - **normalize**: Count normalization (median-of-ratios)
//! - **test**: Per-feature hypothesis tests (Welch, Student, negative binomial Wald)
//! - **correct**: Multiple testing correction (Bonferroni, Benjamini-Hochberg)
//! - **diff**: The differential abundance engine
//! - **correlate**: Cross-layer correlation of effect sizes
//! - **annotate**: Annotation sources, built-in catalogs and edge mapping
//! - **network**: Interaction networks and centrality
//! - **predict**: Cross-validated classifiers over significant features
//! - **trials**: Clinical trial catalog and biomarker matching
//! - **report**: Summary tables and the flat run report
//! - **simulate**: Seeded synthetic layers
//! - **pipeline**: Configuration and staged execution
//!
//! # Example
//!
//! ```no_run
//! use omics_biomarker::prelude::*;
//!
//! // Load a layer
//! let dataset = OmicsDataset::from_csv(
//!     OmicsLayer::Proteomics,
//!     "proteomics_intensities.csv",
//!     "proteomics_metadata.csv",
//!     "condition",
//! )
//! .unwrap();
//!
//! // Welch's t-test with Bonferroni correction
//! let results = test_differential_abundance(&dataset, "Infected", "Control", 0.5, 0.05).unwrap();
//!
//! // Map significant proteins to KEGG pathways
//! let edges = map_to_annotations(results.significant(), &kegg_pathways());
//! ```

pub mod annotate;
pub mod correct;
pub mod correlate;
pub mod data;
pub mod diff;
pub mod error;
pub mod network;
pub mod normalize;
pub mod pipeline;
pub mod predict;
pub mod report;
pub mod simulate;
pub mod test;
pub mod trials;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::annotate::{
        kegg_pathways, map_to_annotations, Annotation, AnnotationEdge, AnnotationSource,
        AnnotationTable,
    };
    pub use crate::correct::CorrectionMethod;
    pub use crate::correlate::{correlate, CorrelationSummary, MatchStrategy};
    pub use crate::data::{
        DiffResult, DiffResultSet, OmicsDataset, OmicsLayer, SampleSheet, Thresholds,
    };
    pub use crate::diff::{anova_top_features, test_differential_abundance, DiffEngine};
    pub use crate::error::{OmicsError, Result};
    pub use crate::network::InteractionNetwork;
    pub use crate::normalize::norm_median_ratio;
    pub use crate::pipeline::{Pipeline, PipelineConfig};
    pub use crate::predict::{
        cross_validate, Classifier, FeatureMatrix, LogisticRegression, RandomForest,
    };
    pub use crate::report::{summarize, summarize_annotations, RunReport};
    pub use crate::simulate::{simulate_layer, SimulationConfig};
    pub use crate::test::{TestKind, TestStrategy};
    pub use crate::trials::{match_trials, StaticTrialCatalog, TrialSource};
}
