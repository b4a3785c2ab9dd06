//! Joining differential results against an annotation source.

use super::catalog::{parse_pathway_label, uniprot_accession};
use super::source::AnnotationSource;
use crate::data::DiffResult;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feature → annotation edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEdge {
    pub feature_id: String,
    pub annotation_name: String,
    /// Annotation weight when the source provides one, else |effect size|.
    #[serde(rename = "effect_size_or_weight")]
    pub weight: f64,
}

/// Map results to annotation edges.
///
/// Edges follow the order of `results`, then the source's annotation order.
/// Features the source does not know produce no edges.
pub fn map_to_annotations<'a, I, S>(results: I, source: &S) -> Vec<AnnotationEdge>
where
    I: IntoIterator<Item = &'a DiffResult>,
    S: AnnotationSource + ?Sized,
{
    results
        .into_iter()
        .flat_map(|r| {
            source
                .annotations(&r.feature_id)
                .into_iter()
                .map(move |a| AnnotationEdge {
                    feature_id: r.feature_id.clone(),
                    annotation_name: a.name,
                    weight: a.weight.unwrap_or_else(|| r.effect_size.abs()),
                })
        })
        .collect()
}

/// Write edges to CSV (`feature_id,annotation_name,effect_size_or_weight`).
pub fn write_edges_csv<P: AsRef<Path>>(path: P, edges: &[AnnotationEdge]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["feature_id", "annotation_name", "effect_size_or_weight"])?;
    for e in edges {
        writer.serialize(e)?;
    }
    writer.flush()?;
    Ok(())
}

/// One row of the protein → pathway mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayAssignment {
    pub feature_id: String,
    pub uniprot_id: String,
    pub pathway_id: String,
    pub pathway_name: String,
    pub effect_size: f64,
    pub adjusted_p_value: f64,
}

/// Expand results into per-pathway rows with UniProt accessions and parsed
/// KEGG identifiers. Labels that are not KEGG-formatted keep an empty id.
pub fn pathway_assignments<'a, I, S>(results: I, pathways: &S) -> Vec<PathwayAssignment>
where
    I: IntoIterator<Item = &'a DiffResult>,
    S: AnnotationSource + ?Sized,
{
    let mut rows = Vec::new();
    for r in results {
        for a in pathways.annotations(&r.feature_id) {
            let (pathway_id, pathway_name) = match parse_pathway_label(&a.name) {
                Some((id, name)) => (id.to_string(), name.to_string()),
                None => (String::new(), a.name.clone()),
            };
            rows.push(PathwayAssignment {
                feature_id: r.feature_id.clone(),
                uniprot_id: uniprot_accession(&r.feature_id).unwrap_or("Unknown").to_string(),
                pathway_id,
                pathway_name,
                effect_size: r.effect_size,
                adjusted_p_value: r.adjusted_p_value,
            });
        }
    }
    rows
}

/// Write pathway assignments to CSV.
pub fn write_assignments_csv<P: AsRef<Path>>(path: P, rows: &[PathwayAssignment]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record([
        "feature_id",
        "uniprot_id",
        "pathway_id",
        "pathway_name",
        "effect_size",
        "adjusted_p_value",
    ])?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}
