//! omics - multi-omics biomarker discovery CLI
//!
//! Command-line interface for differential abundance, cross-layer
//! correlation, annotation and clinical-trial matching.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use omics_biomarker::annotate::{
    hmdb_pathways, kegg_pathways, map_to_annotations, string_partners, write_edges_csv,
    AnnotationSource, AnnotationTable,
};
use omics_biomarker::correct::CorrectionMethod;
use omics_biomarker::correlate::{correlate, write_correlations_csv, MatchStrategy};
use omics_biomarker::data::{DiffResultSet, OmicsDataset, OmicsLayer, Thresholds};
use omics_biomarker::diff::DiffEngine;
use omics_biomarker::error::{OmicsError, Result};
use omics_biomarker::normalize::norm_median_ratio;
use omics_biomarker::pipeline::{Pipeline, PipelineConfig};
use omics_biomarker::report::{summarize, summarize_annotations, top_by_effect, write_annotation_summary_csv};
use omics_biomarker::simulate::{simulate_layer, SimulationConfig};
use omics_biomarker::test::TestKind;
use omics_biomarker::trials::{
    default_biomarkers, match_trials, search_trials, trial_report, write_matches_csv,
    write_trials_csv, StaticTrialCatalog, TrialQuery,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLayer {
    Rnaseq,
    Proteomics,
    Metabolomics,
}

impl From<CliLayer> for OmicsLayer {
    fn from(layer: CliLayer) -> Self {
        match layer {
            CliLayer::Rnaseq => OmicsLayer::RnaSeq,
            CliLayer::Proteomics => OmicsLayer::Proteomics,
            CliLayer::Metabolomics => OmicsLayer::Metabolomics,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTest {
    /// Welch's unequal-variance t-test
    Welch,
    /// Student's pooled-variance t-test
    Student,
    /// Negative binomial Wald test (counts)
    Nb,
}

impl From<CliTest> for TestKind {
    fn from(test: CliTest) -> Self {
        match test {
            CliTest::Welch => TestKind::Welch,
            CliTest::Student => TestKind::Student,
            CliTest::Nb => TestKind::NegativeBinomial,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCorrection {
    Bonferroni,
    Bh,
}

impl From<CliCorrection> for CorrectionMethod {
    fn from(c: CliCorrection) -> Self {
        match c {
            CliCorrection::Bonferroni => CorrectionMethod::Bonferroni,
            CliCorrection::Bh => CorrectionMethod::BenjaminiHochberg,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMatch {
    /// Pair features with the same identifier
    ById,
    /// Pair entries by position (weak fallback)
    Positional,
}

impl From<CliMatch> for MatchStrategy {
    fn from(m: CliMatch) -> Self {
        match m {
            CliMatch::ById => MatchStrategy::ById,
            CliMatch::Positional => MatchStrategy::Positional,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCatalog {
    Kegg,
    Hmdb,
    String,
}

/// Multi-omics biomarker discovery
#[derive(Parser)]
#[command(name = "omics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Worker threads for per-feature testing (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline
    Run {
        /// Pipeline configuration YAML (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write synthetic layer data and sample sheets
    Simulate {
        /// Layer to simulate (all layers when omitted)
        #[arg(short, long, value_enum)]
        layer: Option<CliLayer>,

        /// Features per layer (layer default when omitted)
        #[arg(long)]
        n_features: Option<usize>,

        #[arg(long, default_value = "24")]
        n_samples: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(short, long, default_value = "data/raw")]
        output_dir: PathBuf,
    },

    /// Differential abundance for one layer
    Diff {
        #[arg(short, long, value_enum)]
        layer: CliLayer,

        /// Feature x sample matrix CSV
        #[arg(short, long)]
        matrix: PathBuf,

        /// Sample sheet CSV
        #[arg(short = 's', long)]
        metadata: PathBuf,

        #[arg(long, default_value = "condition")]
        condition_column: String,

        /// Group tested as "a" (first label in the data when omitted)
        #[arg(long, requires = "group_b")]
        group_a: Option<String>,

        #[arg(long, requires = "group_a")]
        group_b: Option<String>,

        #[arg(short, long, value_enum, default_value = "welch")]
        test: CliTest,

        #[arg(long, value_enum, default_value = "bonferroni")]
        correction: CliCorrection,

        /// |effect| threshold (layer default when omitted)
        #[arg(long)]
        fc_threshold: Option<f64>,

        #[arg(long, default_value = "0.05")]
        alpha: f64,

        /// Median-of-ratios normalization before testing
        #[arg(long)]
        normalize: bool,

        /// Output path for the result table
        #[arg(short, long)]
        output: PathBuf,

        /// Number of top features printed
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Correlate the effect sizes of two result tables
    Correlate {
        #[arg(long)]
        results_a: PathBuf,

        #[arg(long, value_enum)]
        layer_a: CliLayer,

        #[arg(long)]
        results_b: PathBuf,

        #[arg(long, value_enum)]
        layer_b: CliLayer,

        #[arg(long, value_enum, default_value = "by-id")]
        strategy: CliMatch,

        /// Output CSV for the summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map results to annotations
    Annotate {
        #[arg(short, long)]
        results: PathBuf,

        #[arg(short, long, value_enum)]
        layer: CliLayer,

        /// Built-in annotation catalog (ignored with --annotations)
        #[arg(long, value_enum, default_value = "kegg")]
        catalog: CliCatalog,

        /// Annotation CSV (feature_id,annotation_name,weight)
        #[arg(long)]
        annotations: Option<PathBuf>,

        /// Map every result, not only significant ones
        #[arg(long)]
        all: bool,

        #[arg(long, default_value = "0.05")]
        alpha: f64,

        /// Output path for the edge list
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for the per-annotation summary
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Match biomarkers against the clinical-trial catalog
    Trials {
        /// Comma-separated biomarkers (built-in immune panel when omitted)
        #[arg(short, long, value_delimiter = ',')]
        biomarkers: Vec<String>,

        #[arg(long, default_value = "Infection")]
        condition: String,

        /// Recruitment status filter ("All" keeps every status)
        #[arg(long, default_value = "All")]
        status: String,

        /// JSON trial catalog (built-in catalog when omitted)
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[arg(short, long, default_value = "results/clinical_trials")]
        output_dir: PathBuf,
    },

    /// Write an example pipeline configuration
    Example {
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = cli.log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!(
            "Warning: Invalid log level '{}' provided. Defaulting to Info.",
            cli.log_level
        );
        log::LevelFilter::Info
    });
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_micros()
        .init();

    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            eprintln!("Warning: could not configure {} threads: {}", n, e);
        }
    }

    let result = match cli.command {
        Commands::Run {
            config,
            output_dir,
            seed,
        } => cmd_run(config.as_deref(), output_dir, seed),

        Commands::Simulate {
            layer,
            n_features,
            n_samples,
            seed,
            output_dir,
        } => cmd_simulate(layer, n_features, n_samples, seed, &output_dir),

        Commands::Diff {
            layer,
            matrix,
            metadata,
            condition_column,
            group_a,
            group_b,
            test,
            correction,
            fc_threshold,
            alpha,
            normalize,
            output,
            top,
        } => cmd_diff(DiffArgs {
            layer: layer.into(),
            matrix,
            metadata,
            condition_column,
            groups: group_a.zip(group_b),
            test: test.into(),
            correction: correction.into(),
            fc_threshold,
            alpha,
            normalize,
            output,
            top,
        }),

        Commands::Correlate {
            results_a,
            layer_a,
            results_b,
            layer_b,
            strategy,
            output,
        } => cmd_correlate(
            &results_a,
            layer_a.into(),
            &results_b,
            layer_b.into(),
            strategy.into(),
            output.as_deref(),
        ),

        Commands::Annotate {
            results,
            layer,
            catalog,
            annotations,
            all,
            alpha,
            output,
            summary,
        } => cmd_annotate(
            &results,
            layer.into(),
            catalog,
            annotations.as_deref(),
            all,
            alpha,
            &output,
            summary.as_deref(),
        ),

        Commands::Trials {
            biomarkers,
            condition,
            status,
            catalog,
            output_dir,
        } => cmd_trials(biomarkers, condition, &status, catalog.as_deref(), &output_dir),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run the full pipeline
fn cmd_run(config_path: Option<&Path>, output_dir: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading pipeline configuration from {}", path.display());
            PipelineConfig::from_file(path)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let run = Pipeline::new(config)?.run()?;
    print!("{}", run.report.to_text());
    println!();
    println!("Results saved to {}", run.results_dir().display());

    if !run.is_success() {
        return Err(OmicsError::Pipeline(format!(
            "{} stage(s) failed",
            run.report.n_failed_stages()
        )));
    }
    Ok(())
}

/// Write synthetic data
fn cmd_simulate(
    layer: Option<CliLayer>,
    n_features: Option<usize>,
    n_samples: usize,
    seed: u64,
    output_dir: &Path,
) -> Result<()> {
    let layers: Vec<OmicsLayer> = match layer {
        Some(l) => vec![l.into()],
        None => OmicsLayer::ALL.to_vec(),
    };
    for layer in layers {
        let base = SimulationConfig::new(layer);
        let config = base
            .clone()
            .with_dimensions(n_features.unwrap_or(base.n_features), n_samples)
            .with_seed(seed);
        let sim = simulate_layer(&config)?;
        let (matrix, sheet) = sim.write_to_dir(output_dir)?;
        println!(
            "{}: {} {}s x {} samples -> {}, {}",
            layer.label(),
            sim.dataset.n_features(),
            layer.feature_noun(),
            sim.dataset.n_samples(),
            matrix.display(),
            sheet.display()
        );
    }
    Ok(())
}

struct DiffArgs {
    layer: OmicsLayer,
    matrix: PathBuf,
    metadata: PathBuf,
    condition_column: String,
    groups: Option<(String, String)>,
    test: TestKind,
    correction: CorrectionMethod,
    fc_threshold: Option<f64>,
    alpha: f64,
    normalize: bool,
    output: PathBuf,
    top: usize,
}

/// Differential abundance for one layer
fn cmd_diff(args: DiffArgs) -> Result<()> {
    let mut dataset = OmicsDataset::from_csv(args.layer, &args.matrix, &args.metadata, &args.condition_column)?;
    info!(
        "Loaded {} {}s x {} samples",
        dataset.n_features(),
        args.layer.feature_noun(),
        dataset.n_samples()
    );
    if args.normalize {
        dataset = norm_median_ratio(&dataset)?.dataset;
    }

    let (group_a, group_b) = match args.groups {
        Some(groups) => groups,
        None => dataset.groups()?,
    };
    let thresholds = Thresholds::new(
        args.fc_threshold.unwrap_or_else(|| args.layer.default_fc_threshold()),
        args.alpha,
    )?;
    let set = DiffEngine::new(thresholds)
        .test(args.test)
        .correction(args.correction)
        .run(&dataset, &group_a, &group_b)?;
    set.to_csv(&args.output)?;

    let s = summarize(&set);
    println!(
        "{}: {} tested, {} excluded, {} significant ({} up, {} down) [{} + {}]",
        args.layer.label(),
        s.n_tested,
        s.n_excluded,
        s.n_significant,
        s.n_up,
        s.n_down,
        s.method,
        s.correction
    );
    for r in top_by_effect(&set, args.top, true) {
        println!(
            "  {:<16} effect {:>8.3}  q {:.3e}",
            r.feature_id, r.effect_size, r.adjusted_p_value
        );
    }
    println!("Results written to {}", args.output.display());
    Ok(())
}

fn load_results(path: &Path, layer: OmicsLayer, alpha: f64) -> Result<DiffResultSet> {
    DiffResultSet::from_csv(path, layer, Thresholds::for_layer(layer, alpha)?)
}

/// Correlate two result tables
fn cmd_correlate(
    results_a: &Path,
    layer_a: OmicsLayer,
    results_b: &Path,
    layer_b: OmicsLayer,
    strategy: MatchStrategy,
    output: Option<&Path>,
) -> Result<()> {
    let a = load_results(results_a, layer_a, 0.05)?;
    let b = load_results(results_b, layer_b, 0.05)?;
    let summary = correlate(&a, &b, strategy)?;

    println!(
        "{} vs {} ({}): n = {}",
        layer_a.label(),
        layer_b.label(),
        strategy.name(),
        summary.n_matched_features
    );
    println!("  Pearson  r = {:.4}, p = {:.4e}", summary.pearson_r, summary.pearson_p);
    println!("  Spearman r = {:.4}, p = {:.4e}", summary.spearman_r, summary.spearman_p);

    if let Some(path) = output {
        write_correlations_csv(path, std::slice::from_ref(&summary))?;
    }
    Ok(())
}

/// Map results to annotations
#[allow(clippy::too_many_arguments)]
fn cmd_annotate(
    results: &Path,
    layer: OmicsLayer,
    catalog: CliCatalog,
    annotations: Option<&Path>,
    all: bool,
    alpha: f64,
    output: &Path,
    summary_path: Option<&Path>,
) -> Result<()> {
    let set = load_results(results, layer, alpha)?;
    let table = match annotations {
        Some(path) => AnnotationTable::from_csv("custom", path)?,
        None => match catalog {
            CliCatalog::Kegg => kegg_pathways(),
            CliCatalog::Hmdb => hmdb_pathways(),
            CliCatalog::String => string_partners(),
        },
    };

    let rows: Vec<_> = if all {
        set.iter().collect()
    } else {
        set.significant()
    };
    let edges = map_to_annotations(rows.iter().copied(), &table);
    write_edges_csv(output, &edges)?;
    println!(
        "{} {}s mapped to {} edge(s) via '{}' -> {}",
        rows.len(),
        layer.feature_noun(),
        edges.len(),
        table.name(),
        output.display()
    );

    if let Some(path) = summary_path {
        let summary = summarize_annotations(rows.iter().copied(), &table);
        write_annotation_summary_csv(path, &summary)?;
        for s in summary.iter().take(10) {
            println!("  {}: {} feature(s), mean effect {:.3}", s.annotation_name, s.n_features, s.mean_effect);
        }
    }
    Ok(())
}

/// Match biomarkers against trials
fn cmd_trials(
    biomarkers: Vec<String>,
    condition: String,
    status: &str,
    catalog_path: Option<&Path>,
    output_dir: &Path,
) -> Result<()> {
    let catalog = match catalog_path {
        Some(path) => StaticTrialCatalog::from_json(path)?,
        None => StaticTrialCatalog::builtin()?,
    };
    let query = TrialQuery {
        condition,
        status: (!status.eq_ignore_ascii_case("all")).then(|| status.to_string()),
    };
    let trials = search_trials(&catalog, &query);

    let biomarkers = if biomarkers.is_empty() {
        default_biomarkers()
    } else {
        biomarkers
    };
    let matches = match_trials(&trials, &biomarkers);

    std::fs::create_dir_all(output_dir)?;
    write_trials_csv(output_dir.join("all_clinical_trials.csv"), &trials)?;
    write_matches_csv(output_dir.join("matched_trials.csv"), &matches)?;
    let report = trial_report(&trials, chrono::Utc::now());
    std::fs::write(output_dir.join("clinical_trials_report.txt"), &report)?;

    println!("Biomarkers: {}", biomarkers.join(", "));
    println!("{} trial(s) found, {} matching", trials.len(), matches.len());
    for m in &matches {
        println!(
            "  {} {:>6.1}%  {}  [{}]",
            m.nct_id, m.match_percentage, m.title, m.status
        );
    }
    println!("Results saved to {}", output_dir.display());
    Ok(())
}

/// Write an example configuration
fn cmd_example(output: &Path) -> Result<()> {
    let config = PipelineConfig::default();
    config.to_file(output)?;
    println!("Example configuration written to {}", output.display());
    Ok(())
}
