//! Built-in reference catalogs for immune-response biomarkers.
//!
//! Small static snapshots of UniProt, KEGG, STRING and HMDB records. They
//! stand in for the live services and are exposed through
//! [`AnnotationSource`](super::AnnotationSource) tables like any other source.

use super::source::{Annotation, AnnotationTable};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const UNIPROT: &[(&str, &str)] = &[
    ("IL6", "P05231"),
    ("TNF", "P01375"),
    ("IFNG", "P01579"),
    ("IL1B", "P01584"),
    ("IL12A", "P29460"),
    ("CXCL10", "P02778"),
    ("CXCL9", "Q07325"),
    ("CD8A", "P01732"),
    ("CD4", "P01730"),
    ("CD19", "P15391"),
    ("NFKB1", "P19838"),
    ("STAT1", "P42224"),
    ("IRF7", "Q92985"),
    ("TLR4", "O00206"),
    ("JAK1", "P23458"),
    ("JAK2", "O60674"),
    ("MAPK1", "P28482"),
    ("MAPK3", "P27361"),
];

const TLR: &str = "hsa04620: Toll-like receptor signaling pathway";
const CYTOKINE: &str = "hsa04060: Cytokine-cytokine receptor interaction";
const TNF_SIGNALING: &str = "hsa04668: TNF signaling pathway";
const CHEMOKINE: &str = "hsa04062: Chemokine signaling pathway";
const JAK_STAT: &str = "hsa04630: JAK-STAT signaling pathway";

const KEGG: &[(&str, &[&str])] = &[
    ("IL6", &[TLR, CYTOKINE]),
    ("TNF", &[CYTOKINE, TNF_SIGNALING]),
    ("IFNG", &[CYTOKINE, CHEMOKINE]),
    ("IL1B", &[CYTOKINE, TLR]),
    ("NFKB1", &[TLR, TNF_SIGNALING]),
    ("STAT1", &[TLR, JAK_STAT]),
    ("JAK1", &[JAK_STAT]),
    ("JAK2", &[JAK_STAT]),
    ("TLR4", &[TLR]),
];

/// (protein1, protein2, combined score, neighborhood score)
const STRING: &[(&str, &str, f64, f64)] = &[
    ("IL6", "STAT3", 0.999, 0.995),
    ("IL6", "JAK1", 0.998, 0.990),
    ("TNF", "NFKB1", 0.999, 0.998),
    ("TNF", "MAPK1", 0.997, 0.985),
    ("IFNG", "STAT1", 0.999, 0.999),
    ("NFKB1", "RELA", 0.999, 0.998),
    ("JAK1", "STAT1", 0.999, 0.997),
    ("JAK2", "STAT1", 0.999, 0.998),
    ("MAPK1", "ERK2", 0.999, 0.999),
    ("TLR4", "MYD88", 0.999, 0.997),
    ("IL1B", "IL1R1", 0.999, 0.999),
    ("CD4", "LCK", 0.999, 0.995),
    ("CD8A", "LCK", 0.998, 0.990),
];

/// (HMDB id, name, status, pathway)
const HMDB: &[(&str, &str, &str, &str)] = &[
    ("HMDB0000148", "Nitric oxide (NO)", "Detected", "Immune response"),
    ("HMDB0000037", "Histamine", "Detected", "Immune response"),
    ("HMDB0000064", "Choline", "Detected", "Lipid metabolism"),
    ("HMDB0000094", "Adrenaline (Epinephrine)", "Detected", "Immune response"),
    ("HMDB0000195", "Proline", "Detected", "Amino acid metabolism"),
    ("HMDB0000001", "1,3-Diaminopropane", "Detected", "Polyamine metabolism"),
    ("HMDB0001847", "Interferon gamma (IFN-γ)", "Protein", "Immune response"),
    ("HMDB0000159", "Glycine", "Detected", "Amino acid metabolism"),
    ("HMDB0000191", "Uracil", "Detected", "Nucleotide metabolism"),
    ("HMDB0000158", "Glutamic acid", "Detected", "Amino acid metabolism"),
];

/// UniProt accession of a gene symbol.
pub fn uniprot_accession(gene: &str) -> Option<&'static str> {
    UNIPROT.iter().find(|(g, _)| *g == gene).map(|(_, acc)| *acc)
}

/// KEGG pathway memberships, labels formatted `hsaNNNNN: name`.
pub fn kegg_pathways() -> AnnotationTable {
    let mut table = AnnotationTable::new("kegg");
    for (gene, pathways) in KEGG {
        for p in *pathways {
            table.insert(gene, Annotation::new(*p));
        }
    }
    table
}

/// A scored protein-protein interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub protein1: String,
    pub protein2: String,
    pub combined_score: f64,
    pub nscore: f64,
}

/// All catalogued STRING interactions.
pub fn string_interactions() -> Vec<Interaction> {
    STRING
        .iter()
        .map(|(a, b, score, nscore)| Interaction {
            protein1: a.to_string(),
            protein2: b.to_string(),
            combined_score: *score,
            nscore: *nscore,
        })
        .collect()
}

/// STRING as an annotation table: each protein is annotated with its
/// partners, weighted by combined score. Interactions are undirected, so
/// both endpoints get an entry.
pub fn string_partners() -> AnnotationTable {
    let mut table = AnnotationTable::new("string");
    for (a, b, score, _) in STRING {
        table.insert(a, Annotation::weighted(*b, *score));
        table.insert(b, Annotation::weighted(*a, *score));
    }
    table
}

/// HMDB record of a metabolite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaboliteInfo {
    pub metabolite_id: String,
    pub name: String,
    pub status: String,
    pub pathway: String,
}

/// Look up a metabolite, falling back to an "Unknown" record.
pub fn hmdb_metabolite(metabolite_id: &str) -> MetaboliteInfo {
    match HMDB.iter().find(|(id, ..)| *id == metabolite_id) {
        Some((id, name, status, pathway)) => MetaboliteInfo {
            metabolite_id: id.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            pathway: pathway.to_string(),
        },
        None => MetaboliteInfo {
            metabolite_id: metabolite_id.to_string(),
            name: format!("Unknown metabolite {}", metabolite_id),
            status: "Detected".to_string(),
            pathway: "Unknown".to_string(),
        },
    }
}

/// HMDB pathway classes of the catalogued metabolites.
pub fn hmdb_pathways() -> AnnotationTable {
    let mut table = AnnotationTable::new("hmdb");
    for (id, _, _, pathway) in HMDB {
        table.insert(id, Annotation::new(*pathway));
    }
    table
}

/// Split a KEGG label `hsa04620: Toll-like receptor signaling pathway`
/// into its identifier and name.
pub fn parse_pathway_label(label: &str) -> Option<(&str, &str)> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"^\s*([a-z]{2,4}\d{5})\s*:\s*(.+?)\s*$").ok())
        .as_ref()?;
    let caps = re.captures(label)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}
