//! Seeded synthetic omics layers for an infection study.
//!
//! Every layer shares one design: `n_samples` samples `S01..`, the first
//! half labelled `Infected` and the rest `Control`. A fixed panel of immune
//! markers is shifted upwards in infected samples; all other features are
//! drawn from a common background distribution.

use crate::data::{OmicsDataset, OmicsLayer, SampleSheet};
use crate::error::{OmicsError, Result};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma, Normal, Poisson};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONDITION_COLUMN: &str = "condition";
pub const INFECTED: &str = "Infected";
pub const CONTROL: &str = "Control";

/// Immune-response genes spiked into the RNA-seq layer.
pub const IMMUNE_GENES: &[&str] = &[
    "IFNG", "IL6", "IL12A", "IL1B", "TNF", "CXCL10", "CXCL9", "CD8A", "CD4", "CD19", "NFKB1",
    "STAT1", "IRF7", "TLR4", "MYD88", "IRAK1", "JAK1", "JAK2", "MAPK1", "MAPK3",
];

/// Immune proteins spiked into the proteomics layer.
pub const IMMUNE_PROTEINS: &[&str] = &[
    "IL6", "TNF", "IFNG", "IL1B", "IL12A", "CXCL10", "CXCL9", "CD4", "CD8A", "CD19", "NFKB1",
    "STAT1", "IRF7", "JAK1", "JAK2", "TLR4", "MYD88", "IRAK1", "MAPK1", "MAPK3",
];

/// HMDB identifiers of immune-related metabolites.
pub const IMMUNE_METABOLITES: &[&str] = &[
    "HMDB0000148",
    "HMDB0000037",
    "HMDB0000064",
    "HMDB0000094",
    "HMDB0000195",
    "HMDB0000001",
    "HMDB0001847",
    "HMDB0000159",
    "HMDB0000191",
    "HMDB0000158",
];

/// Configuration for one synthetic layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub layer: OmicsLayer,
    pub n_features: usize,
    pub n_samples: usize,
    pub seed: u64,
}

impl SimulationConfig {
    /// Default dimensions for a layer: 5000 genes, 2000 proteins or 500
    /// metabolites over 24 samples.
    pub fn new(layer: OmicsLayer) -> Self {
        let n_features = match layer {
            OmicsLayer::RnaSeq => 5000,
            OmicsLayer::Proteomics => 2000,
            OmicsLayer::Metabolomics => 500,
        };
        Self {
            layer,
            n_features,
            n_samples: 24,
            seed: 42,
        }
    }

    pub fn with_dimensions(mut self, n_features: usize, n_samples: usize) -> Self {
        self.n_features = n_features;
        self.n_samples = n_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(OmicsError::InvalidParameter(
                "simulation needs at least one feature".to_string(),
            ));
        }
        if self.n_samples < 4 {
            return Err(OmicsError::InvalidParameter(format!(
                "simulation needs at least 4 samples (2 per group), got {}",
                self.n_samples
            )));
        }
        Ok(())
    }
}

/// A generated layer with its sample sheet and the spiked-in markers.
#[derive(Debug, Clone)]
pub struct SimulatedLayer {
    pub dataset: OmicsDataset,
    pub sheet: SampleSheet,
    /// Features generated with a group difference.
    pub markers: Vec<String>,
}

impl SimulatedLayer {
    /// Write `<matrix file>` and `<layer>_metadata.csv` into `dir`.
    ///
    /// Returns the (matrix, metadata) paths.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let layer = self.dataset.layer();
        let matrix_path = dir.join(raw_matrix_file(layer));
        let sheet_path = dir.join(raw_metadata_file(layer));
        self.dataset.to_csv(&matrix_path)?;
        self.sheet.to_csv(&sheet_path)?;
        Ok((matrix_path, sheet_path))
    }
}

/// File name of a layer's raw matrix.
pub fn raw_matrix_file(layer: OmicsLayer) -> &'static str {
    match layer {
        OmicsLayer::RnaSeq => "rnaseq_counts.csv",
        OmicsLayer::Proteomics => "proteomics_intensities.csv",
        OmicsLayer::Metabolomics => "metabolomics_abundances.csv",
    }
}

/// File name of a layer's sample sheet.
pub fn raw_metadata_file(layer: OmicsLayer) -> String {
    format!("{}_metadata.csv", layer.name())
}

fn distribution_error(e: impl std::fmt::Display) -> OmicsError {
    OmicsError::InvalidParameter(format!("invalid distribution parameters: {}", e))
}

/// Negative binomial with numpy's (n, p) parameterisation, sampled as a
/// gamma-Poisson mixture.
struct NegBinomial {
    gamma: Gamma<f64>,
}

impl NegBinomial {
    fn new(n: f64, p: f64) -> Result<Self> {
        let gamma = Gamma::new(n, (1.0 - p) / p).map_err(distribution_error)?;
        Ok(Self { gamma })
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> Result<f64> {
        let lambda = self.gamma.sample(rng);
        if lambda <= 0.0 {
            return Ok(0.0);
        }
        let poisson = Poisson::new(lambda).map_err(distribution_error)?;
        Ok(poisson.sample(rng))
    }
}

fn feature_ids(layer: OmicsLayer, n_features: usize) -> (Vec<String>, usize) {
    let panel = match layer {
        OmicsLayer::RnaSeq => IMMUNE_GENES,
        OmicsLayer::Proteomics => IMMUNE_PROTEINS,
        OmicsLayer::Metabolomics => IMMUNE_METABOLITES,
    };
    let n_markers = panel.len().min(n_features);
    let mut ids: Vec<String> = panel[..n_markers].iter().map(|s| s.to_string()).collect();
    ids.extend((0..n_features - n_markers).map(|i| match layer {
        OmicsLayer::RnaSeq => format!("Gene_{}", i),
        OmicsLayer::Proteomics => format!("Protein_{}", i),
        OmicsLayer::Metabolomics => format!("HMDB{:07}", 200 + i),
    }));
    (ids, n_markers)
}

/// Generate one synthetic layer.
pub fn simulate_layer(config: &SimulationConfig) -> Result<SimulatedLayer> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let n = config.n_samples;
    let half = n / 2;
    let samples: Vec<String> = (0..n).map(|i| format!("S{:02}", i + 1)).collect();

    let mut sheet = SampleSheet::new(vec![CONDITION_COLUMN.to_string(), "replicate".to_string()]);
    for (i, sample) in samples.iter().enumerate() {
        let condition = if i < half { INFECTED } else { CONTROL };
        sheet.push(sample, vec![condition.to_string(), ((i % half) + 1).to_string()])?;
    }

    let (features, n_markers) = feature_ids(config.layer, config.n_features);
    let mut matrix = DMatrix::<f64>::zeros(features.len(), n);

    match config.layer {
        OmicsLayer::RnaSeq => {
            let background = NegBinomial::new(5.0, 0.1)?;
            let up = NegBinomial::new(20.0, 0.3)?;
            let base = NegBinomial::new(5.0, 0.3)?;
            for row in 0..features.len() {
                for col in 0..n {
                    let dist = match (row < n_markers, col < half) {
                        (false, _) => &background,
                        (true, true) => &up,
                        (true, false) => &base,
                    };
                    matrix[(row, col)] = dist.sample(&mut rng)?;
                }
            }
        }
        OmicsLayer::Proteomics | OmicsLayer::Metabolomics => {
            let (bg, infected, control) = match config.layer {
                OmicsLayer::Proteomics => ((15.0, 2.0), (20.0, 1.5), (14.0, 1.5)),
                _ => ((12.0, 2.0), (18.0, 1.5), (11.0, 1.5)),
            };
            let normal = |(mu, sd): (f64, f64)| Normal::new(mu, sd).map_err(distribution_error);
            let background = normal(bg)?;
            let up = normal(infected)?;
            let base = normal(control)?;
            for row in 0..features.len() {
                for col in 0..n {
                    let dist = match (row < n_markers, col < half) {
                        (false, _) => &background,
                        (true, true) => &up,
                        (true, false) => &base,
                    };
                    matrix[(row, col)] = dist.sample(&mut rng);
                }
            }
        }
    }

    let markers = features[..n_markers].to_vec();
    let dataset = OmicsDataset::from_sheet(
        config.layer,
        features,
        samples,
        matrix,
        &sheet,
        CONDITION_COLUMN,
    )?;

    log::info!(
        "Simulated {} layer: {} {} x {} samples ({} markers, seed {})",
        config.layer.name(),
        dataset.n_features(),
        config.layer.feature_noun(),
        dataset.n_samples(),
        markers.len(),
        config.seed
    );

    Ok(SimulatedLayer {
        dataset,
        sheet,
        markers,
    })
}
