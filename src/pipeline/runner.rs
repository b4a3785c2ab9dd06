//! Stage-by-stage execution of the biomarker discovery pipeline.
//!
//! Stages run in a fixed order: one per configured layer, then pathways,
//! interactions, integration, prediction, trials and the report. A failing stage is
//! recorded and logged; stages that do not depend on it still run, and
//! stages that do are skipped.

use super::config::{LayerConfig, PipelineConfig, PredictionConfig};
use crate::annotate::{
    hmdb_metabolite, hmdb_pathways, kegg_pathways, map_to_annotations, pathway_assignments,
    string_interactions, write_assignments_csv, write_edges_csv, AnnotationSource, AnnotationTable,
};
use crate::correlate::{correlate, match_features, write_correlations_csv, write_pairs_csv};
use crate::data::{DiffResultSet, OmicsDataset, OmicsLayer};
use crate::diff::{anova_top_features, write_anova_csv, DiffEngine};
use crate::error::{OmicsError, Result};
use crate::network::{filter_interactions, write_hubs_csv, write_interactions_csv, InteractionNetwork};
use crate::normalize::norm_median_ratio;
use crate::predict::{
    cross_validate, rank_importances, write_importance_csv, write_performance_csv, Classifier,
    ClassifierKind, FeatureMatrix, LogisticRegression, RandomForest,
};
use crate::report::{
    summarize, summarize_annotations, top_by_effect, write_annotation_summary_csv,
    write_summaries_csv, CorrelationEntry, LayerSection, RunReport, StageStatus,
};
use crate::simulate::{simulate_layer, SimulationConfig};
use crate::trials::{
    match_trials, search_trials, trial_report, write_matches_csv, write_trials_csv,
    StaticTrialCatalog, TrialQuery,
};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Directory under `results/` holding a layer's tables.
pub fn layer_results_dir(layer: OmicsLayer) -> &'static str {
    match layer {
        OmicsLayer::RnaSeq => "rna_seq",
        OmicsLayer::Proteomics => "mass_spec",
        OmicsLayer::Metabolomics => "metabolomics",
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub results: HashMap<OmicsLayer, DiffResultSet>,
    pub report: RunReport,
    pub output_dir: PathBuf,
}

impl PipelineRun {
    pub fn results_for(&self, layer: OmicsLayer) -> Option<&DiffResultSet> {
        self.results.get(&layer)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.output_dir.join("results")
    }

    /// True when no stage failed.
    pub fn is_success(&self) -> bool {
        self.report.n_failed_stages() == 0
    }
}

/// Runs a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage.
    ///
    /// Only failing to create the output directories is an error here;
    /// stage failures are recorded in the report.
    pub fn run(&self) -> Result<PipelineRun> {
        let root = self.config.output_dir.clone();
        let raw_dir = root.join("data").join("raw");
        let results_dir = root.join("results");
        std::fs::create_dir_all(&raw_dir)?;
        std::fs::create_dir_all(&results_dir)?;
        info!("Pipeline '{}' writing to {}", self.config.name, root.display());

        let mut report = RunReport::new();
        let mut results: HashMap<OmicsLayer, DiffResultSet> = HashMap::new();
        // Values as loaded, before normalization
        let mut datasets: HashMap<OmicsLayer, OmicsDataset> = HashMap::new();

        for lc in &self.config.layers {
            let stage = lc.layer.name();
            let out = results_dir.join(layer_results_dir(lc.layer));
            match self.run_layer(lc, &raw_dir, &out) {
                Ok((dataset, set)) => {
                    report.layers.push(LayerSection {
                        summary: summarize(&set),
                        top_features: top_by_effect(&set, self.config.top_n, true)
                            .into_iter()
                            .cloned()
                            .collect(),
                    });
                    results.insert(lc.layer, set);
                    datasets.insert(lc.layer, dataset);
                    report.stages.push(StageStatus::completed(stage));
                }
                Err(e) => report.stages.push(failed(stage, &e)),
            }
        }
        if !report.layers.is_empty() {
            let summaries: Vec<_> = report.layers.iter().map(|l| l.summary.clone()).collect();
            if let Err(e) = write_summaries_csv(results_dir.join("layer_summary.csv"), &summaries) {
                warn!("Could not write layer summary: {}", e);
            }
        }

        let pathways = &self.config.pathways;
        let status = if !pathways.enabled {
            StageStatus::skipped("pathways", "disabled")
        } else if let Some(set) = results.get(&pathways.layer) {
            match self.run_pathways(set, &results_dir.join("pathways"), &mut report) {
                Ok(()) => StageStatus::completed("pathways"),
                Err(e) => failed("pathways", &e),
            }
        } else {
            missing_input("pathways", pathways.layer)
        };
        report.stages.push(status);

        let interactions = &self.config.interactions;
        let status = if !interactions.enabled {
            StageStatus::skipped("interactions", "disabled")
        } else if let Some(set) = results.get(&interactions.layer) {
            match self.run_interactions(set, &results_dir.join("interactions"), &mut report) {
                Ok(()) => StageStatus::completed("interactions"),
                Err(e) => failed("interactions", &e),
            }
        } else {
            missing_input("interactions", interactions.layer)
        };
        report.stages.push(status);

        let status = if self.config.correlations.is_empty() && !self.config.anova.enabled {
            StageStatus::skipped("integration", "no correlations configured")
        } else {
            let out = results_dir.join("integration");
            match self.run_integration(&results, &datasets, &out, &mut report) {
                Ok(notes) if notes.is_empty() => StageStatus::completed("integration"),
                Ok(notes) => StageStatus {
                    detail: Some(notes.join("; ")),
                    ..StageStatus::completed("integration")
                },
                Err(e) => failed("integration", &e),
            }
        };
        report.stages.push(status);

        let status = if !self.config.prediction.enabled {
            StageStatus::skipped("prediction", "disabled")
        } else if results.is_empty() {
            StageStatus::skipped("prediction", "no layer results")
        } else {
            let out = results_dir.join("predictions");
            match self.run_prediction(&results, &datasets, &out, &mut report) {
                Ok(()) => StageStatus::completed("prediction"),
                Err(e) => failed("prediction", &e),
            }
        };
        report.stages.push(status);

        let status = if !self.config.trials.enabled {
            StageStatus::skipped("trials", "disabled")
        } else {
            match self.run_trials(&results, &results_dir.join("clinical_trials"), &mut report) {
                Ok(()) => StageStatus::completed("trials"),
                Err(e) => failed("trials", &e),
            }
        };
        report.stages.push(status);

        // The report cannot list its own stage before it is written
        let written = report
            .write_text(results_dir.join("report.txt"))
            .and_then(|_| report.write_yaml(results_dir.join("report.yaml")));
        report.stages.push(match written {
            Ok(()) => StageStatus::completed("report"),
            Err(e) => failed("report", &e),
        });

        let n_failed = report.n_failed_stages();
        if n_failed == 0 {
            info!("Pipeline '{}' finished: all stages completed", self.config.name);
        } else {
            warn!("Pipeline '{}' finished with {} failed stage(s)", self.config.name, n_failed);
        }

        Ok(PipelineRun {
            results,
            report,
            output_dir: root,
        })
    }

    fn load_layer(&self, lc: &LayerConfig, raw_dir: &Path) -> Result<OmicsDataset> {
        match &lc.input {
            Some(input) => {
                info!("{}: loading {}", lc.layer, input.matrix.display());
                OmicsDataset::from_csv(lc.layer, &input.matrix, &input.metadata, lc.condition_column())
            }
            None => {
                let sim = simulate_layer(
                    &SimulationConfig::new(lc.layer)
                        .with_dimensions(lc.n_features(), self.config.n_samples)
                        .with_seed(self.config.seed),
                )?;
                sim.write_to_dir(raw_dir)?;
                Ok(sim.dataset)
            }
        }
    }

    /// Returns the dataset as loaded alongside the test results.
    fn run_layer(
        &self,
        lc: &LayerConfig,
        raw_dir: &Path,
        out: &Path,
    ) -> Result<(OmicsDataset, DiffResultSet)> {
        let raw = self.load_layer(lc, raw_dir)?;
        let normalized;
        let dataset = if lc.normalize() {
            normalized = norm_median_ratio(&raw)?;
            info!(
                "{}: median-of-ratios size factors from {} reference features",
                lc.layer, normalized.n_reference_features
            );
            &normalized.dataset
        } else {
            &raw
        };

        let (group_a, group_b) = match (&lc.group_a, &lc.group_b) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => dataset.groups()?,
        };
        let engine = DiffEngine::new(lc.thresholds()?)
            .test(lc.test_kind())
            .correction(lc.correction())
            .parallel(self.config.parallel);
        let set = engine.run(dataset, &group_a, &group_b)?;

        std::fs::create_dir_all(out)?;
        let name = lc.layer.name();
        let noun = lc.layer.feature_noun();
        set.to_csv(out.join(format!("{}_results.csv", name)))?;
        set.significant_to_csv(out.join(format!("significant_{}s.csv", noun)))?;
        if !set.excluded.is_empty() {
            set.excluded_to_csv(out.join(format!("excluded_{}s.csv", noun)))?;
        }
        if lc.layer == OmicsLayer::Metabolomics {
            let mut writer = csv::Writer::from_path(out.join("hmdb_metabolite_metadata.csv"))?;
            for r in set.significant() {
                writer.serialize(hmdb_metabolite(&r.feature_id))?;
            }
            writer.flush()?;
        }

        info!(
            "{}: {} of {} {}s significant ({} excluded)",
            lc.layer,
            set.n_significant(),
            set.len(),
            noun,
            set.excluded.len()
        );
        Ok((raw, set))
    }

    fn run_pathways(&self, set: &DiffResultSet, out: &Path, report: &mut RunReport) -> Result<()> {
        let table = match &self.config.pathways.annotations {
            Some(path) => AnnotationTable::from_csv("custom", path)?,
            None if set.layer == OmicsLayer::Metabolomics => hmdb_pathways(),
            None => kegg_pathways(),
        };
        std::fs::create_dir_all(out)?;

        let significant = set.significant();
        let edges = map_to_annotations(significant.iter().copied(), &table);
        write_edges_csv(out.join("pathway_edges.csv"), &edges)?;
        let assignments = pathway_assignments(significant.iter().copied(), &table);
        write_assignments_csv(out.join("protein_pathway_mapping.csv"), &assignments)?;

        let summary = summarize_annotations(significant.iter().copied(), &table);
        write_annotation_summary_csv(out.join("pathway_expression_summary.csv"), &summary)?;
        info!(
            "pathways: {} significant {}s mapped to {} annotation(s) via '{}'",
            significant.len(),
            set.layer.feature_noun(),
            summary.len(),
            table.name()
        );
        report.pathways = summary;
        Ok(())
    }

    fn run_interactions(&self, set: &DiffResultSet, out: &Path, report: &mut RunReport) -> Result<()> {
        let significant = set.significant();
        let proteins: HashSet<&str> = significant.iter().map(|r| r.feature_id.as_str()).collect();
        let min_score = self.config.interactions.min_score;
        let interactions: Vec<_> = filter_interactions(&string_interactions(), &proteins)
            .into_iter()
            .filter(|i| i.combined_score >= min_score)
            .collect();

        std::fs::create_dir_all(out)?;
        write_interactions_csv(out.join("string_interactions.csv"), &interactions)?;

        let network = InteractionNetwork::from_results(significant.iter().copied(), &interactions);
        let stats = network.stats();
        let mut hubs = network.hub_table();
        write_hubs_csv(out.join("hub_proteins.csv"), &hubs)?;
        info!(
            "interactions: {} nodes, {} edges, {} component(s), {} communities",
            stats.n_nodes, stats.n_edges, stats.n_components, stats.n_communities
        );

        hubs.truncate(self.config.interactions.n_hubs);
        report.network = Some(stats);
        report.hubs = hubs;
        Ok(())
    }

    /// Correlations and the condition ANOVA. Returns notes on the parts
    /// that failed.
    fn run_integration(
        &self,
        results: &HashMap<OmicsLayer, DiffResultSet>,
        datasets: &HashMap<OmicsLayer, OmicsDataset>,
        out: &Path,
        report: &mut RunReport,
    ) -> Result<Vec<String>> {
        std::fs::create_dir_all(out)?;
        let mut notes = Vec::new();
        let mut summaries = Vec::new();
        let mut n_failed = 0;

        for c in &self.config.correlations {
            let mut entry = CorrelationEntry {
                layer_a: c.layer_a.name().to_string(),
                layer_b: c.layer_b.name().to_string(),
                strategy: c.strategy.name().to_string(),
                summary: None,
                error: None,
            };
            match (results.get(&c.layer_a), results.get(&c.layer_b)) {
                (Some(a), Some(b)) => match correlate(a, b, c.strategy) {
                    Ok(summary) => {
                        let pairs = match_features(a, b, c.strategy);
                        write_pairs_csv(
                            out.join(format!("{}_vs_{}_pairs.csv", c.layer_a, c.layer_b)),
                            &pairs,
                        )?;
                        info!(
                            "integration: {} vs {} over {} pairs, pearson r = {:.3}",
                            c.layer_a, c.layer_b, summary.n_matched_features, summary.pearson_r
                        );
                        summaries.push(summary.clone());
                        entry.summary = Some(summary);
                    }
                    Err(e) => {
                        warn!("integration: {}", e);
                        entry.error = Some(e.to_string());
                        n_failed += 1;
                    }
                },
                _ => {
                    entry.error = Some("results unavailable".to_string());
                    n_failed += 1;
                }
            }
            report.correlations.push(entry);
        }

        if !self.config.correlations.is_empty() {
            write_correlations_csv(out.join("omics_correlations.csv"), &summaries)?;
        }
        if n_failed > 0 {
            notes.push(format!("{} correlation(s) failed", n_failed));
        }

        let anova = &self.config.anova;
        if anova.enabled {
            match datasets.get(&anova.layer) {
                Some(dataset) => match anova_top_features(dataset, anova.n_top, anova.alpha) {
                    Ok(rows) => {
                        write_anova_csv(out.join("anova_results.csv"), &rows)?;
                        report.anova = rows;
                    }
                    Err(e) => {
                        warn!("integration: ANOVA failed: {}", e);
                        notes.push(format!("ANOVA failed: {}", e));
                    }
                },
                None if self.config.layer(anova.layer).is_some() => {
                    notes.push(format!("ANOVA skipped: no {} data", anova.layer));
                }
                None => info!("integration: ANOVA skipped, {} is not configured", anova.layer),
            }
        }
        Ok(notes)
    }

    /// Cross-validate each configured classifier on the significant
    /// features of every layer with results.
    fn run_prediction(
        &self,
        results: &HashMap<OmicsLayer, DiffResultSet>,
        datasets: &HashMap<OmicsLayer, OmicsDataset>,
        out: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        let config = &self.config.prediction;
        let inputs: Vec<(&OmicsDataset, &DiffResultSet)> = self
            .config
            .layers
            .iter()
            .filter_map(|l| Some((datasets.get(&l.layer)?, results.get(&l.layer)?)))
            .collect();
        let data = FeatureMatrix::from_layers(&inputs)?;
        info!(
            "prediction: {} samples x {} significant features, positive class '{}'",
            data.n_samples(),
            data.n_features(),
            data.positive
        );

        let mut performance = Vec::new();
        let mut importances = Vec::new();
        for &kind in &config.classifiers {
            let classifier = build_classifier(kind, config, self.config.seed);
            performance.push(cross_validate(classifier.as_ref(), &data, config.n_folds, self.config.seed)?);
            importances.extend(rank_importances(classifier.as_ref(), &data, config.n_top_features)?);
        }

        std::fs::create_dir_all(out)?;
        write_performance_csv(out.join("model_performance.csv"), &performance)?;
        write_importance_csv(out.join("feature_importance.csv"), &importances)?;
        report.predictions = performance;
        report.importances = importances;
        Ok(())
    }

    fn run_trials(
        &self,
        results: &HashMap<OmicsLayer, DiffResultSet>,
        out: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        let config = &self.config.trials;
        let catalog = match &config.catalog {
            Some(path) => StaticTrialCatalog::from_json(path)?,
            None => StaticTrialCatalog::builtin()?,
        };
        let query = TrialQuery {
            condition: config.condition.clone(),
            status: config.status.clone(),
        };
        let trials = search_trials(&catalog, &query);

        let biomarkers = if config.biomarkers.is_empty() {
            significant_features(&self.config, results)
        } else {
            config.biomarkers.clone()
        };
        let matches = match_trials(&trials, &biomarkers);
        info!(
            "trials: {} biomarker(s) matched {} of {} trial(s)",
            biomarkers.len(),
            matches.len(),
            trials.len()
        );

        std::fs::create_dir_all(out)?;
        write_trials_csv(out.join("all_clinical_trials.csv"), &trials)?;
        write_matches_csv(out.join("matched_trials.csv"), &matches)?;
        std::fs::write(
            out.join("clinical_trials_report.txt"),
            trial_report(&trials, chrono::Utc::now()),
        )?;

        report.trial_matches = matches;
        Ok(())
    }
}

/// Significant features of every layer, layers in configuration order,
/// duplicates dropped.
fn significant_features(
    config: &PipelineConfig,
    results: &HashMap<OmicsLayer, DiffResultSet>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    config
        .layers
        .iter()
        .filter_map(|l| results.get(&l.layer))
        .flat_map(|set| set.significant())
        .filter(|r| seen.insert(r.feature_id.clone()))
        .map(|r| r.feature_id.clone())
        .collect()
}

fn build_classifier(kind: ClassifierKind, config: &PredictionConfig, seed: u64) -> Box<dyn Classifier> {
    match kind {
        ClassifierKind::LogisticRegression => Box::new(LogisticRegression::default()),
        ClassifierKind::RandomForest => Box::new(RandomForest {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            seed,
            ..Default::default()
        }),
    }
}

fn failed(stage: &str, error: &OmicsError) -> StageStatus {
    warn!("Stage '{}' failed: {}", stage, error);
    StageStatus::failed(stage, error.to_string())
}

fn missing_input(stage: &str, layer: OmicsLayer) -> StageStatus {
    warn!("Stage '{}' skipped: no {} results", stage, layer);
    StageStatus::skipped(stage, format!("no {} results", layer))
}
