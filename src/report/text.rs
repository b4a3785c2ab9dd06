//! The flat run report.
//!
//! A [`RunReport`] collects the summaries produced by each stage and renders
//! them as plain text (for people) or YAML (for tooling).

use super::pathway::AnnotationSummary;
use super::summary::SignificanceSummary;
use crate::correlate::CorrelationSummary;
use crate::data::DiffResult;
use crate::diff::AnovaRow;
use crate::error::Result;
use crate::network::{HubRow, NetworkStats};
use crate::predict::{CvSummary, FeatureImportance};
use crate::trials::TrialMatch;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub generated: String,
    pub version: String,
}

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Completed,
    Failed,
    Skipped,
}

impl StageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatus {
    pub stage: String,
    pub state: StageState,
    /// Error message or skip reason.
    pub detail: Option<String>,
}

impl StageStatus {
    pub fn completed(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            state: StageState::Completed,
            detail: None,
        }
    }

    pub fn failed(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            state: StageState::Failed,
            detail: Some(detail.into()),
        }
    }

    pub fn skipped(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            state: StageState::Skipped,
            detail: Some(detail.into()),
        }
    }
}

/// Counts and leading features of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSection {
    pub summary: SignificanceSummary,
    pub top_features: Vec<DiffResult>,
}

/// A correlation that either produced a summary or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub layer_a: String,
    pub layer_b: String,
    pub strategy: String,
    pub summary: Option<CorrelationSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub meta: ReportMeta,
    pub layers: Vec<LayerSection>,
    pub correlations: Vec<CorrelationEntry>,
    #[serde(default)]
    pub anova: Vec<AnovaRow>,
    #[serde(default)]
    pub predictions: Vec<CvSummary>,
    /// Leading features of each model fit on all samples.
    #[serde(default)]
    pub importances: Vec<FeatureImportance>,
    pub pathways: Vec<AnnotationSummary>,
    pub network: Option<NetworkStats>,
    pub hubs: Vec<HubRow>,
    pub trial_matches: Vec<TrialMatch>,
    pub stages: Vec<StageStatus>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// Empty report stamped with the current time and crate version.
    pub fn new() -> Self {
        Self {
            meta: ReportMeta {
                generated: chrono::Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            layers: Vec::new(),
            correlations: Vec::new(),
            anova: Vec::new(),
            predictions: Vec::new(),
            importances: Vec::new(),
            pathways: Vec::new(),
            network: None,
            hubs: Vec::new(),
            trial_matches: Vec::new(),
            stages: Vec::new(),
        }
    }

    pub fn n_failed_stages(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.state == StageState::Failed)
            .count()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_text(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "MULTI-OMICS BIOMARKER DISCOVERY REPORT");
        let _ = writeln!(out, "Generated: {}", self.meta.generated);
        let _ = writeln!(out, "Version: {}", self.meta.version);
        let _ = writeln!(out, "{}", rule);

        if !self.layers.is_empty() {
            section(&mut out, "DIFFERENTIAL ABUNDANCE");
            for layer in &self.layers {
                let s = &layer.summary;
                let _ = writeln!(
                    out,
                    "{} ({} + {}, |effect| > {}, q < {})",
                    s.layer, s.method, s.correction, s.fc_threshold, s.alpha
                );
                let _ = writeln!(
                    out,
                    "  tested: {}  excluded: {}  significant: {} ({} up, {} down)",
                    s.n_tested, s.n_excluded, s.n_significant, s.n_up, s.n_down
                );
                for r in &layer.top_features {
                    let _ = writeln!(
                        out,
                        "    {:<16} effect {:>8.3}  q {:.3e}",
                        r.feature_id, r.effect_size, r.adjusted_p_value
                    );
                }
            }
        }

        if !self.correlations.is_empty() {
            section(&mut out, "CROSS-LAYER CORRELATION");
            for c in &self.correlations {
                match (&c.summary, &c.error) {
                    (Some(s), _) => {
                        let _ = writeln!(
                            out,
                            "{} vs {} [{}]: n = {}, pearson r = {:.3} (p = {:.3e}), spearman r = {:.3} (p = {:.3e})",
                            c.layer_a,
                            c.layer_b,
                            c.strategy,
                            s.n_matched_features,
                            s.pearson_r,
                            s.pearson_p,
                            s.spearman_r,
                            s.spearman_p
                        );
                    }
                    (None, Some(e)) => {
                        let _ = writeln!(out, "{} vs {} [{}]: failed: {}", c.layer_a, c.layer_b, c.strategy, e);
                    }
                    (None, None) => {
                        let _ = writeln!(out, "{} vs {} [{}]: not computed", c.layer_a, c.layer_b, c.strategy);
                    }
                }
            }
        }

        if !self.anova.is_empty() {
            section(&mut out, "CONDITION ANOVA");
            for a in &self.anova {
                let _ = writeln!(
                    out,
                    "    {:<16} F {:>10.3}  p {:.3e}{}",
                    a.feature_id,
                    a.f_statistic,
                    a.p_value,
                    if a.significant { "  *" } else { "" }
                );
            }
        }

        if !self.predictions.is_empty() {
            section(&mut out, "PREDICTIVE MODELING");
            for p in &self.predictions {
                let auc = match (p.auc, p.auc_std) {
                    (Some(m), Some(s)) => format!("{:.3} ± {:.3}", m, s),
                    _ => "n/a".to_string(),
                };
                let _ = writeln!(
                    out,
                    "{} ({}-fold): accuracy {:.3} ± {:.3}, AUC {}",
                    p.model, p.n_folds, p.accuracy, p.accuracy_std, auc
                );
                for f in self.importances.iter().filter(|f| f.model == p.model) {
                    let _ = writeln!(out, "    {:<32} {:.3}", f.feature, f.importance);
                }
            }
        }

        if !self.pathways.is_empty() {
            section(&mut out, "PATHWAY SUMMARY");
            for p in &self.pathways {
                let std = p
                    .std_effect
                    .map_or_else(|| "n/a".to_string(), |s| format!("{:.3}", s));
                let _ = writeln!(
                    out,
                    "{}: {} feature(s), mean effect {:.3}, std {}",
                    p.annotation_name, p.n_features, p.mean_effect, std
                );
            }
        }

        if let Some(net) = &self.network {
            section(&mut out, "INTERACTION NETWORK");
            let _ = writeln!(
                out,
                "nodes: {}  edges: {}  density: {:.3}  components: {}  communities: {} (Q = {:.3})  high-confidence edges: {}",
                net.n_nodes,
                net.n_edges,
                net.density,
                net.n_components,
                net.n_communities,
                net.modularity,
                net.n_high_confidence
            );
            for h in &self.hubs {
                let _ = writeln!(
                    out,
                    "    {:<10} degree {:>3}  betweenness {:.3}  closeness {:.3}",
                    h.protein, h.degree, h.betweenness_centrality, h.closeness_centrality
                );
            }
        }

        if !self.trial_matches.is_empty() {
            section(&mut out, "CLINICAL TRIAL MATCHES");
            for m in &self.trial_matches {
                let _ = writeln!(
                    out,
                    "{} ({:.1}%): {} [{}; {}]",
                    m.nct_id,
                    m.match_percentage,
                    m.matching_biomarkers.join(", "),
                    m.phase,
                    m.status
                );
            }
        }

        if !self.stages.is_empty() {
            section(&mut out, "STAGES");
            for s in &self.stages {
                match &s.detail {
                    Some(d) => {
                        let _ = writeln!(out, "{:<14} {} ({})", s.stage, s.state.as_str(), d);
                    }
                    None => {
                        let _ = writeln!(out, "{:<14} {}", s.stage, s.state.as_str());
                    }
                }
            }
        }

        out
    }

    pub fn write_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn write_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

fn section(out: &mut String, heading: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", heading);
    let _ = writeln!(out, "{}", "-".repeat(heading.len()));
}
