//! Biomarker-to-annotation mapping.
//!
//! - [`AnnotationSource`]: trait for anything that annotates feature IDs
//! - [`AnnotationTable`]: in-memory / CSV-backed source
//! - [`catalog`]: built-in UniProt, KEGG, STRING and HMDB snapshots
//! - [`map_to_annotations`]: results × source → weighted edges

pub mod catalog;
pub mod mapper;
pub mod source;

pub use catalog::{
    hmdb_metabolite, hmdb_pathways, kegg_pathways, parse_pathway_label, string_interactions,
    string_partners, uniprot_accession, Interaction, MetaboliteInfo,
};
pub use mapper::{
    map_to_annotations, pathway_assignments, write_assignments_csv, write_edges_csv,
    AnnotationEdge, PathwayAssignment,
};
pub use source::{Annotation, AnnotationSource, AnnotationTable};
