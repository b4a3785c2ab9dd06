//! Interaction network analysis over significant features.

pub mod graph;

pub use graph::{
    filter_interactions, write_hubs_csv, write_interactions_csv, HubRow, InteractionNetwork,
    NetworkStats,
};
