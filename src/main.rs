use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use satscan_io::{CustomerReader, ExperimentName, ResultWriter, SweepSettings};
use satscan_model::{
    DepthSearch, MetricReport, SplitCriterion, SweepConfig, VarianceThreshold,
    cumulative_distribution, rank_importances,
};

#[derive(Parser)]
#[command(name = "satscan")]
#[command(about = "Single-feature scans and shallow decision trees for customer satisfaction data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Column layout of the input CSV files.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Name of the customer identifier column
    #[arg(long, default_value = "ID")]
    id_column: String,

    /// Name of the binary label column
    #[arg(long, default_value = "TARGET")]
    label_column: String,
}

/// Experiment naming and output location.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize shape, identifiers, class balance and constant columns
    Summary {
        /// Path to the labeled training CSV file
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        columns: DataArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fit one shallow tree per feature and rank features by holdout ROC-AUC
    Sweep {
        /// Path to the labeled training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Features to scan, comma-separated (defaults to all non-constant features)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Maximum depth of each per-feature tree
        #[arg(long, default_value_t = 1)]
        max_depth: usize,

        /// Share of samples held out for scoring
        #[arg(long, default_value_t = 0.25)]
        test_fraction: f64,

        /// Number of ranked rows printed to stdout
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Impurity criterion: "gini" or "entropy"
        #[arg(long, default_value = "gini")]
        criterion: String,

        #[command(flatten)]
        columns: DataArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Tabulate the per-class cumulative distribution of one feature
    Cumulative {
        /// Path to the labeled training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Feature to tabulate
        #[arg(long)]
        feature: String,

        #[command(flatten)]
        columns: DataArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Search tree depth by cross-validation, refit, and write a submission
    Train {
        /// Path to the labeled training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Path to the unlabeled CSV file to predict
        #[arg(long)]
        test: PathBuf,

        /// Smallest depth to try
        #[arg(long, default_value_t = 2)]
        min_depth: usize,

        /// Largest depth to try
        #[arg(long, default_value_t = 9)]
        max_depth: usize,

        /// Number of stratified cross-validation folds
        #[arg(long, default_value_t = 5)]
        cv_folds: usize,

        /// Features with variance at or below this value are dropped
        #[arg(long, default_value_t = 0.0)]
        variance_threshold: f64,

        /// Impurity criterion: "gini" or "entropy"
        #[arg(long, default_value = "gini")]
        criterion: String,

        #[command(flatten)]
        columns: DataArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct SummaryOutput {
    experiment: String,
    n_rows: usize,
    n_features: usize,
    positive_fraction: f64,
    constant_features: Vec<String>,
}

#[derive(Serialize)]
struct SweepOutput {
    experiment: String,
    n_features: usize,
    n_train: usize,
    n_test: usize,
    top: Vec<SweepRowOutput>,
}

#[derive(Serialize)]
struct SweepRowOutput {
    feature: String,
    roc_auc: Option<f64>,
    cutoff: Option<f64>,
}

#[derive(Serialize)]
struct CumulativeOutput {
    experiment: String,
    feature: String,
    n_points: usize,
}

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_selected_features: usize,
    best_depth: usize,
    cv_mean: MetricReport,
    n_predictions: usize,
    n_predicted_positive: usize,
    top_features: Vec<String>,
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn reader(path: &Path, columns: &DataArgs) -> CustomerReader {
    CustomerReader::new(path)
        .with_id_column(columns.id_column.as_str())
        .with_label_column(columns.label_column.as_str())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Summary {
            data,
            columns,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;

            let dataset = reader(&data, &columns)
                .read_labeled()
                .context("failed to read training CSV")?;
            info!(n_rows = dataset.n_samples(), "dataset loaded");

            let summary = dataset.summary().context("failed to summarize dataset")?;
            if !summary.constant_features.is_empty() {
                warn!(
                    n_constant = summary.constant_features.len(),
                    "dataset has constant features"
                );
            }

            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            writer.write_summary(&summary)?;

            let out = SummaryOutput {
                experiment: output.experiment,
                n_rows: summary.n_rows,
                n_features: summary.n_features,
                positive_fraction: summary.class_balance.positive_fraction,
                constant_features: summary.constant_features,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Sweep {
            data,
            features,
            max_depth,
            test_fraction,
            top,
            criterion,
            columns,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;
            let criterion = parse_criterion(&criterion)?;

            let dataset = reader(&data, &columns)
                .read_labeled()
                .context("failed to read training CSV")?;
            info!(n_rows = dataset.n_samples(), n_features = dataset.n_features(), "dataset loaded");

            let candidates = if features.is_empty() {
                VarianceThreshold::default()
                    .select(dataset.columns())
                    .apply(dataset.feature_names())
            } else {
                features.iter().map(|f| f.to_lowercase()).collect()
            };

            let config = SweepConfig::new()
                .with_max_depth(max_depth)
                .with_test_fraction(test_fraction)
                .with_seed(cli.seed)
                .with_criterion(criterion);

            let result = config
                .run(
                    dataset.columns(),
                    dataset.labels(),
                    dataset.feature_names(),
                    &candidates,
                )
                .context("single-feature sweep failed")?;

            let settings = SweepSettings {
                seed: config.seed(),
                test_fraction: config.test_fraction(),
                max_depth: config.max_depth(),
                n_train: result.partition.train.len(),
                n_test: result.partition.test.len(),
            };
            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            writer.write_sweep(&result.table, settings)?;

            let out = SweepOutput {
                experiment: output.experiment,
                n_features: result.table.len(),
                n_train: settings.n_train,
                n_test: settings.n_test,
                top: result
                    .table
                    .top(top)
                    .iter()
                    .map(|row| SweepRowOutput {
                        feature: row.feature.clone(),
                        roc_auc: row.metrics.roc_auc,
                        cutoff: row.cutoff,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Cumulative {
            data,
            feature,
            columns,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;
            let feature = feature.to_lowercase();

            let dataset = reader(&data, &columns)
                .read_labeled()
                .context("failed to read training CSV")?;

            let values = dataset
                .column(&feature)
                .with_context(|| format!("unknown feature: {feature}"))?;
            let points = cumulative_distribution(values, dataset.labels())
                .with_context(|| format!("cumulative distribution of {feature} failed"))?;

            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            writer.write_cumulative(&feature, &points)?;

            let out = CumulativeOutput {
                experiment: output.experiment,
                feature,
                n_points: points.len(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Train {
            data,
            test,
            min_depth,
            max_depth,
            cv_folds,
            variance_threshold,
            criterion,
            columns,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;
            let criterion = parse_criterion(&criterion)?;

            let train = reader(&data, &columns)
                .read_labeled()
                .context("failed to read training CSV")?;
            let unlabeled = reader(&test, &columns)
                .read_unlabeled()
                .context("failed to read test CSV")?;
            info!(
                n_train = train.n_samples(),
                n_test = unlabeled.n_samples(),
                "datasets loaded"
            );

            let filter = VarianceThreshold::new(variance_threshold)?;
            let selection = filter.select(train.columns());
            let selected = selection.apply(train.feature_names());
            info!(
                threshold = filter.threshold(),
                n_selected = selected.len(),
                n_dropped = selection.dropped().len(),
                "variance threshold applied"
            );
            let train_columns = train.select(&selected)?;

            let search = DepthSearch::new(min_depth, max_depth)?
                .with_folds(cv_folds)
                .with_seed(cli.seed)
                .with_criterion(criterion);
            info!(min_depth, max_depth, n_folds = search.n_folds(), "searching tree depth");
            let result = search
                .run(&train_columns, train.labels())
                .context("depth search failed")?;

            let importances = rank_importances(&result.tree.feature_importances(), &selected);

            let test_columns = unlabeled
                .select(&selected)
                .context("test CSV is missing training features")?;
            let predictions = result
                .tree
                .predict_columns(&test_columns)
                .context("prediction failed")?;

            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            writer.write_search(&result, &selected, &importances)?;
            writer.write_submission(&columns.id_column, unlabeled.ids(), &predictions)?;

            let out = TrainOutput {
                experiment: output.experiment,
                n_selected_features: selected.len(),
                best_depth: result.best_depth,
                cv_mean: result.best().map_or(MetricReport::UNDEFINED, |s| s.mean),
                n_predictions: predictions.len(),
                n_predicted_positive: predictions.iter().filter(|&&p| p == 1).count(),
                top_features: importances.iter().take(10).map(|f| f.name.clone()).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
