//! Configuration and execution of the full multi-omics pipeline.

mod config;
mod runner;

pub use config::{
    AnovaConfig, CorrelationConfig, InteractionConfig, LayerConfig, LayerInput, PathwayConfig,
    PipelineConfig, PredictionConfig, TrialConfig,
};
pub use runner::{layer_results_dir, Pipeline, PipelineRun};
