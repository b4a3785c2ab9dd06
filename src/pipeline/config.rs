//! Serializable pipeline configuration.

use crate::correct::CorrectionMethod;
use crate::correlate::MatchStrategy;
use crate::data::{OmicsLayer, Thresholds};
use crate::error::{OmicsError, Result};
use crate::predict::ClassifierKind;
use crate::test::TestKind;
use crate::trials::default_biomarkers;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Matrix and sample sheet of a layer loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInput {
    pub matrix: PathBuf,
    pub metadata: PathBuf,
}

/// Settings for one omics layer.
///
/// Unset fields fall back to the layer's conventions: count layers use the
/// negative binomial test with Benjamini-Hochberg correction, median-of-ratios
/// normalization and |log2FC| > 1; intensity layers use Welch's t-test with
/// Bonferroni correction and |effect| > 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub layer: OmicsLayer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<CorrectionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fc_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    /// Group tested as "a"; with `group_b`, overrides the order found in the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_column: Option<String>,
    /// Load from CSV instead of simulating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<LayerInput>,
}

impl LayerConfig {
    /// A config with every setting left at the layer's default.
    pub fn new(layer: OmicsLayer) -> Self {
        Self {
            layer,
            n_features: None,
            test: None,
            correction: None,
            normalize: None,
            fc_threshold: None,
            alpha: None,
            group_a: None,
            group_b: None,
            condition_column: None,
            input: None,
        }
    }

    /// A config with every setting spelled out.
    pub fn explicit(layer: OmicsLayer) -> Self {
        let base = Self::new(layer);
        Self {
            n_features: Some(base.n_features()),
            test: Some(base.test_kind()),
            correction: Some(base.correction()),
            normalize: Some(base.normalize()),
            fc_threshold: Some(base.fc_threshold()),
            alpha: Some(base.alpha()),
            condition_column: Some(base.condition_column().to_string()),
            ..base
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features.unwrap_or(match self.layer {
            OmicsLayer::RnaSeq => 5000,
            OmicsLayer::Proteomics => 2000,
            OmicsLayer::Metabolomics => 500,
        })
    }

    pub fn test_kind(&self) -> TestKind {
        self.test.unwrap_or(match self.layer {
            OmicsLayer::RnaSeq => TestKind::NegativeBinomial,
            _ => TestKind::Welch,
        })
    }

    pub fn correction(&self) -> CorrectionMethod {
        self.correction.unwrap_or(match self.layer {
            OmicsLayer::RnaSeq => CorrectionMethod::BenjaminiHochberg,
            _ => CorrectionMethod::Bonferroni,
        })
    }

    pub fn normalize(&self) -> bool {
        self.normalize.unwrap_or(self.layer == OmicsLayer::RnaSeq)
    }

    pub fn fc_threshold(&self) -> f64 {
        self.fc_threshold.unwrap_or_else(|| self.layer.default_fc_threshold())
    }

    pub fn alpha(&self) -> f64 {
        self.alpha.unwrap_or(0.05)
    }

    pub fn condition_column(&self) -> &str {
        self.condition_column.as_deref().unwrap_or("condition")
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(self.fc_threshold(), self.alpha())
    }
}

/// A pair of layers whose effect sizes are correlated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    pub layer_a: OmicsLayer,
    pub layer_b: OmicsLayer,
    #[serde(default)]
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathwayConfig {
    pub enabled: bool,
    /// Layer whose significant features are mapped.
    pub layer: OmicsLayer,
    /// Annotation CSV (`feature_id,annotation_name,weight`); the built-in
    /// KEGG or HMDB table when unset.
    pub annotations: Option<PathBuf>,
}

impl Default for PathwayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layer: OmicsLayer::Proteomics,
            annotations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub enabled: bool,
    pub layer: OmicsLayer,
    /// Interactions scoring below this are dropped.
    pub min_score: f64,
    /// Rows kept in the hub table of the report.
    pub n_hubs: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layer: OmicsLayer::Proteomics,
            min_score: 0.0,
            n_hubs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub enabled: bool,
    pub condition: String,
    /// `None` keeps every recruitment status.
    pub status: Option<String>,
    /// Biomarkers to match; significant features of all layers when empty.
    pub biomarkers: Vec<String>,
    /// JSON trial catalog; the built-in catalog when unset.
    pub catalog: Option<PathBuf>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            condition: "Infection".to_string(),
            status: None,
            biomarkers: default_biomarkers(),
            catalog: None,
        }
    }
}

/// Condition ANOVA on the highest-mean features of one layer, run with the
/// cross-layer integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnovaConfig {
    pub enabled: bool,
    /// Raw (unnormalized) values of this layer are tested.
    pub layer: OmicsLayer,
    pub n_top: usize,
    pub alpha: f64,
}

impl Default for AnovaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layer: OmicsLayer::RnaSeq,
            n_top: 10,
            alpha: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub enabled: bool,
    pub classifiers: Vec<ClassifierKind>,
    pub n_folds: usize,
    /// Trees of the random forest.
    pub n_trees: usize,
    pub max_depth: usize,
    /// Rows per model in the importance table.
    pub n_top_features: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            classifiers: vec![ClassifierKind::LogisticRegression, ClassifierKind::RandomForest],
            n_folds: 5,
            n_trees: 100,
            max_depth: 10,
            n_top_features: 15,
        }
    }
}

/// Full pipeline configuration, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    /// Root of `data/raw` and `results/`.
    pub output_dir: PathBuf,
    pub seed: u64,
    /// Samples per simulated layer.
    pub n_samples: usize,
    pub parallel: bool,
    /// Features per layer listed in the report.
    pub top_n: usize,
    pub layers: Vec<LayerConfig>,
    pub correlations: Vec<CorrelationConfig>,
    pub pathways: PathwayConfig,
    pub interactions: InteractionConfig,
    pub anova: AnovaConfig,
    pub prediction: PredictionConfig,
    pub trials: TrialConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "infection-biomarkers".to_string(),
            description: Some(
                "Simulated infection vs control study across RNA-seq, proteomics and metabolomics"
                    .to_string(),
            ),
            output_dir: PathBuf::from("."),
            seed: 42,
            n_samples: 24,
            parallel: true,
            top_n: 10,
            layers: OmicsLayer::ALL.iter().map(|&l| LayerConfig::explicit(l)).collect(),
            correlations: vec![
                CorrelationConfig {
                    layer_a: OmicsLayer::RnaSeq,
                    layer_b: OmicsLayer::Proteomics,
                    strategy: MatchStrategy::ById,
                },
                CorrelationConfig {
                    layer_a: OmicsLayer::Proteomics,
                    layer_b: OmicsLayer::Metabolomics,
                    strategy: MatchStrategy::Positional,
                },
            ],
            pathways: PathwayConfig::default(),
            interactions: InteractionConfig::default(),
            anova: AnovaConfig::default(),
            prediction: PredictionConfig::default(),
            trials: TrialConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn layer(&self, layer: OmicsLayer) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.layer == layer)
    }

    /// Check settings that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.n_samples < 4 {
            return Err(OmicsError::InvalidParameter(format!(
                "n_samples must be at least 4, got {}",
                self.n_samples
            )));
        }

        let mut seen = HashSet::new();
        for l in &self.layers {
            if !seen.insert(l.layer) {
                return Err(OmicsError::InvalidParameter(format!(
                    "layer '{}' is configured more than once",
                    l.layer
                )));
            }
            l.thresholds()?;
            if l.n_features() == 0 {
                return Err(OmicsError::InvalidParameter(format!(
                    "layer '{}' has n_features = 0",
                    l.layer
                )));
            }
            if l.group_a.is_some() != l.group_b.is_some() {
                return Err(OmicsError::InvalidParameter(format!(
                    "layer '{}' sets only one of group_a / group_b",
                    l.layer
                )));
            }
        }

        for c in &self.correlations {
            if c.layer_a == c.layer_b {
                return Err(OmicsError::InvalidParameter(format!(
                    "correlation of layer '{}' with itself",
                    c.layer_a
                )));
            }
            for layer in [c.layer_a, c.layer_b] {
                if !seen.contains(&layer) {
                    return Err(OmicsError::InvalidParameter(format!(
                        "correlation references unconfigured layer '{}'",
                        layer
                    )));
                }
            }
        }

        if self.anova.enabled && !(self.anova.alpha > 0.0 && self.anova.alpha < 1.0) {
            return Err(OmicsError::InvalidParameter(format!(
                "anova.alpha must be in (0, 1), got {}",
                self.anova.alpha
            )));
        }
        if self.prediction.enabled {
            if self.prediction.n_folds < 2 {
                return Err(OmicsError::InvalidParameter(format!(
                    "prediction.n_folds must be at least 2, got {}",
                    self.prediction.n_folds
                )));
            }
            if self.prediction.n_trees == 0 || self.prediction.max_depth == 0 {
                return Err(OmicsError::InvalidParameter(
                    "prediction.n_trees and prediction.max_depth must be positive".into(),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.interactions.min_score) {
            return Err(OmicsError::InvalidParameter(format!(
                "interactions.min_score must be in [0, 1], got {}",
                self.interactions.min_score
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_defaults() {
        let rna = LayerConfig::new(OmicsLayer::RnaSeq);
        assert_eq!(rna.test_kind(), TestKind::NegativeBinomial);
        assert_eq!(rna.correction(), CorrectionMethod::BenjaminiHochberg);
        assert!(rna.normalize());
        assert_eq!(rna.fc_threshold(), 1.0);
        assert_eq!(rna.n_features(), 5000);

        let met = LayerConfig::new(OmicsLayer::Metabolomics);
        assert_eq!(met.test_kind(), TestKind::Welch);
        assert_eq!(met.correction(), CorrectionMethod::Bonferroni);
        assert!(!met.normalize());
        assert_eq!(met.fc_threshold(), 0.5);
        assert_eq!(met.n_features(), 500);
        assert_eq!(met.condition_column(), "condition");
    }

    #[test]
    fn test_default_roundtrip() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("negative_binomial"));
        let back = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
seed: 7
n_samples: 8
layers:
  - layer: proteomics
    n_features: 50
    correction: bh
correlations: []
trials:
  enabled: false
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.layers.len(), 1);
        let prot = config.layer(OmicsLayer::Proteomics).unwrap();
        assert_eq!(prot.n_features(), 50);
        assert_eq!(prot.correction(), CorrectionMethod::BenjaminiHochberg);
        assert_eq!(prot.test_kind(), TestKind::Welch);
        assert!(!config.trials.enabled);
        assert_eq!(config.trials.condition, "Infection");
        assert!(config.pathways.enabled);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = PipelineConfig::default();
        config.layers.push(LayerConfig::new(OmicsLayer::RnaSeq));
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.layers.retain(|l| l.layer != OmicsLayer::Metabolomics);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.layers[1].alpha = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.layers[0].group_a = Some("Infected".into());
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.n_samples = 3;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.prediction.n_folds = 1;
        assert!(config.validate().is_err());
        config.prediction.enabled = false;
        config.validate().unwrap();

        let mut config = PipelineConfig::default();
        config.anova.alpha = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prediction_yaml() {
        let yaml = r#"
prediction:
  classifiers: [random_forest]
  n_trees: 20
anova:
  n_top: 5
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.prediction.classifiers, vec![ClassifierKind::RandomForest]);
        assert_eq!(config.prediction.n_trees, 20);
        assert_eq!(config.prediction.n_folds, 5);
        assert_eq!(config.anova.n_top, 5);
        assert_eq!(config.anova.layer, OmicsLayer::RnaSeq);
    }
}
