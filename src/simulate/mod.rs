//! Synthetic data for demos and tests.

pub mod generate;

pub use generate::{
    raw_matrix_file, raw_metadata_file, simulate_layer, SimulatedLayer, SimulationConfig,
    CONDITION_COLUMN, CONTROL, IMMUNE_GENES, IMMUNE_METABOLITES, IMMUNE_PROTEINS, INFECTED,
};
