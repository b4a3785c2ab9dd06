//! Omics layer kinds and their numeric conventions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale of the values stored in a layer's matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueScale {
    /// Raw (or size-factor normalized) read counts.
    Counts,
    /// Log2 protein intensities.
    Log2Intensity,
    /// Log2 metabolite abundances.
    Log2Abundance,
}

impl ValueScale {
    /// Whether mean differences on this scale read as log2 fold changes.
    pub fn is_log_scale(&self) -> bool {
        !matches!(self, Self::Counts)
    }
}

/// One omics modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmicsLayer {
    RnaSeq,
    Proteomics,
    Metabolomics,
}

impl OmicsLayer {
    /// All layers in pipeline order.
    pub const ALL: [OmicsLayer; 3] = [Self::RnaSeq, Self::Proteomics, Self::Metabolomics];

    /// Short machine name, used for file and directory names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RnaSeq => "rnaseq",
            Self::Proteomics => "proteomics",
            Self::Metabolomics => "metabolomics",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RnaSeq => "RNA-seq",
            Self::Proteomics => "Proteomics",
            Self::Metabolomics => "Metabolomics",
        }
    }

    /// Word used for the row unit of this layer.
    pub fn feature_noun(&self) -> &'static str {
        match self {
            Self::RnaSeq => "gene",
            Self::Proteomics => "protein",
            Self::Metabolomics => "metabolite",
        }
    }

    pub fn scale(&self) -> ValueScale {
        match self {
            Self::RnaSeq => ValueScale::Counts,
            Self::Proteomics => ValueScale::Log2Intensity,
            Self::Metabolomics => ValueScale::Log2Abundance,
        }
    }

    /// Fold-change threshold conventionally used for this layer.
    pub fn default_fc_threshold(&self) -> f64 {
        match self.scale() {
            ValueScale::Counts => 1.0,
            _ => 0.5,
        }
    }

    /// Parse a layer from its machine name or label.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "rnaseq" | "rna" | "transcriptomics" => Some(Self::RnaSeq),
            "proteomics" | "protein" | "massspec" => Some(Self::Proteomics),
            "metabolomics" | "metabolite" => Some(Self::Metabolomics),
            _ => None,
        }
    }
}

impl fmt::Display for OmicsLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
