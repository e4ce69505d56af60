use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use superphot_classify::{
    ClassSet, CrossValidator, Dataset, Evaluation, ParameterGrid, Pipeline, Sweep,
    aggregate_by_group,
};
use superphot_io::{
    ObservationTable, ResultWriter, TableReader, read_json, write_json, write_sweep_table,
};
use superphot_resample::{Sampler, SamplingStrategy};
use superphot_rf::RandomForestConfig;

#[derive(Parser)]
#[command(name = "superphot")]
#[command(about = "Supernova-type classification with synthetic oversampling and random forests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base seed for the oversampler and the forest
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    /// Log errors only and skip the confusion-matrix report
    #[arg(long, global = true)]
    quiet: bool,

    /// Worker threads for training and prediction (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// How to obtain the pipeline: from a JSON file or from flags.
#[derive(Args, Debug, Clone)]
struct PipelineArgs {
    /// JSON pipeline file (as written by `init-pipeline`); overrides the flags below
    #[arg(long)]
    pipeline: Option<PathBuf>,

    /// Oversampler: "mvg" or "smote"
    #[arg(long, default_value = "mvg")]
    sampler: String,

    /// Oversample every class to this many rows (sampler default if not set)
    #[arg(long)]
    samples_per_class: Option<usize>,

    /// Trees per forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Depth limit for each tree; unset grows trees fully
    #[arg(long)]
    max_depth: Option<usize>,

    /// Skip feature standardization
    #[arg(long, default_value_t = false)]
    no_scale: bool,
}

/// Input table options shared by every command that reads observations.
#[derive(Args, Debug, Clone)]
struct TableArgs {
    /// Metadata columns carried to the output instead of used as features
    #[arg(long, value_delimiter = ',', default_value = "hostz,flag0,flag1,flag2")]
    metadata: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Train on all labeled rows, classify every row, then validate
    Classify {
        /// Path to the input CSV table
        #[arg(long)]
        data: PathBuf,

        /// Directory that receives results.txt and validation.json
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Skip the leave-one-group-out validation
        #[arg(long, default_value_t = false)]
        skip_validation: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Run leave-one-group-out validation only
    Validate {
        /// Path to the table whose groups are held out and scored
        #[arg(long)]
        data: PathBuf,

        /// Path to a separate training table (defaults to the labeled rows of --data)
        #[arg(long)]
        train_data: Option<PathBuf>,

        /// Directory that receives results.txt and validation.json
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Sweep hyperparameters over a JSON grid
    Optimize {
        /// JSON parameter grid: an object of name -> values, or a list of them
        #[arg(long)]
        param_dist: PathBuf,

        /// JSON pipeline file to tune
        #[arg(long)]
        pipeline: PathBuf,

        /// Path to the table whose groups are held out and scored
        #[arg(long)]
        test_data: PathBuf,

        /// Path to a separate training table (defaults to the labeled rows of --test-data)
        #[arg(long)]
        train_data: Option<PathBuf>,

        /// Number of randomly sampled combinations (default: the full grid)
        #[arg(short = 'i', long)]
        n_iter: Option<usize>,

        /// Number of parallel workers (default: sequential)
        #[arg(short = 'j', long)]
        n_jobs: Option<usize>,

        /// Results table; appended to if it already exists
        #[arg(long, default_value = "hyperparameters.txt")]
        saveto: PathBuf,

        /// Directory for the per-combination JSON files
        #[arg(long, default_value = ".")]
        artifact_dir: PathBuf,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Write a pipeline JSON file for `optimize` and `--pipeline`
    InitPipeline {
        /// Output path
        #[arg(long, default_value = "pipeline.json")]
        output: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

// Summaries printed to stdout.

#[derive(Serialize)]
struct ClassifyOutput {
    n_rows: usize,
    n_groups: usize,
    n_labeled_groups: usize,
    classes: Vec<String>,
    results: PathBuf,
    validation: Option<ValidationOutput>,
}

#[derive(Serialize)]
struct ValidationOutput {
    n_folds: usize,
    n_scored_groups: usize,
    accuracy: f64,
    f1_score: f64,
    report: PathBuf,
}

#[derive(Serialize)]
struct OptimizeOutput {
    n_combinations: usize,
    n_failed: usize,
    n_rows_in_table: usize,
    best: Option<serde_json::Map<String, serde_json::Value>>,
    saveto: PathBuf,
}

#[derive(Serialize)]
struct InitPipelineOutput {
    output: PathBuf,
    sampler: &'static str,
    n_trees: usize,
}

fn build_pipeline(args: &PipelineArgs, seed: u64) -> Result<Pipeline> {
    if let Some(path) = &args.pipeline {
        let pipeline: Pipeline = read_json(path).context("failed to read pipeline file")?;
        info!(path = %path.display(), sampler = %pipeline.sampler(), "pipeline loaded");
        return Ok(pipeline);
    }

    let mut sampler = args
        .sampler
        .parse::<Sampler>()
        .context("invalid --sampler")?
        .with_seed(Some(seed));
    if let Some(n) = args.samples_per_class {
        sampler = sampler.with_strategy(SamplingStrategy::SamplesPerClass(n))?;
    }
    let classifier = RandomForestConfig::new(args.n_trees)?
        .with_max_depth(args.max_depth)
        .with_seed(seed);
    Ok(Pipeline::new(sampler, classifier).with_scale(!args.no_scale))
}

fn read_table(path: &Path, table: &TableArgs) -> Result<ObservationTable> {
    TableReader::new(path)
        .with_metadata_columns(table.metadata.clone())
        .read()
        .with_context(|| format!("failed to read table {}", path.display()))
}

/// Labeled rows of the scored table and of the training table, encoded
/// against the class set of the training rows.
fn load_train_test(
    test_path: &Path,
    train_path: Option<&Path>,
    table: &TableArgs,
) -> Result<(ClassSet, Dataset, Dataset)> {
    let test = read_table(test_path, table)?;
    let train = train_path.map(|path| read_table(path, table)).transpose()?;
    let (classes, train, test) = test
        .validation_datasets(train.as_ref())
        .context("cannot build labeled validation sets")?;
    info!(classes = %classes, n_train = train.len(), n_test = test.len(), "tables loaded");
    Ok((classes, train, test))
}

/// Leave-one-group-out validation scored on the labeled groups of `test`.
fn run_validation(
    pipeline: &Pipeline,
    classes: &ClassSet,
    train: &Dataset,
    test: &Dataset,
    output_dir: &Path,
    quiet: bool,
) -> Result<ValidationOutput> {
    let cv = CrossValidator::new(classes.clone())
        .validate(pipeline, train, test)
        .context("leave-one-group-out validation failed")?;
    let groups = aggregate_by_group(test.groups(), test.labels(), &cv.probabilities)?;

    let (truth, predicted): (Vec<usize>, Vec<usize>) = groups
        .iter()
        .filter_map(|g| g.label.map(|label| (label, g.predicted())))
        .unzip();
    let evaluation = Evaluation::new(&truth, &predicted, classes)
        .context("no labeled groups to score")?;
    info!(
        accuracy = evaluation.accuracy,
        f1_score = evaluation.f1_macro,
        "validation complete"
    );
    if !quiet {
        eprintln!("{evaluation}");
    }

    let report = ResultWriter::new(output_dir)?.write_evaluation(&evaluation, cv.n_folds)?;
    Ok(ValidationOutput {
        n_folds: cv.n_folds,
        n_scored_groups: truth.len(),
        accuracy: evaluation.accuracy,
        f1_score: evaluation.f1_macro,
        report,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("cannot size the global rayon pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Classify {
            data,
            output_dir,
            skip_validation,
            pipeline,
            table,
        } => {
            let pipeline = build_pipeline(&pipeline, cli.seed)?;
            let observations = read_table(&data, &table)?;
            let classes = observations
                .class_set()
                .context("input table has no labeled rows")?;
            let dataset = observations.to_dataset(&classes)?;

            let labeled = dataset.labeled_indices();
            let features: Vec<Vec<f64>> = labeled.iter().map(|&i| dataset.features()[i].clone()).collect();
            let labels: Vec<usize> = labeled.iter().filter_map(|&i| dataset.labels()[i]).collect();
            info!(n_labeled = labels.len(), n_rows = dataset.len(), classes = %classes, "training classifier");

            let fitted = pipeline
                .fit(&features, &labels, &classes, dataset.feature_names())
                .context("training failed")?;
            let proba = fitted.predict_proba(dataset.features()).context("prediction failed")?;
            let groups = aggregate_by_group(dataset.groups(), dataset.labels(), &proba)?;

            let results = ResultWriter::new(&output_dir)?.write_classification(&observations, &groups, &classes)?;

            let validation = if skip_validation {
                None
            } else {
                let train = observations.labeled().to_dataset(&classes)?;
                Some(run_validation(&pipeline, &classes, &train, &train, &output_dir, cli.quiet)?)
            };

            let output = ClassifyOutput {
                n_rows: dataset.len(),
                n_groups: groups.len(),
                n_labeled_groups: groups.iter().filter(|g| g.label.is_some()).count(),
                classes: classes.names().to_vec(),
                results,
                validation,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Validate {
            data,
            train_data,
            output_dir,
            pipeline,
            table,
        } => {
            let pipeline = build_pipeline(&pipeline, cli.seed)?;
            let (classes, train, test) = load_train_test(&data, train_data.as_deref(), &table)?;
            let output = run_validation(&pipeline, &classes, &train, &test, &output_dir, cli.quiet)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Optimize {
            param_dist,
            pipeline,
            test_data,
            train_data,
            n_iter,
            n_jobs,
            saveto,
            artifact_dir,
            table,
        } => {
            let grid_json: serde_json::Value = read_json(&param_dist).context("failed to read parameter grid")?;
            let grid = ParameterGrid::from_json(&grid_json)?;
            let pipeline: Pipeline = read_json(&pipeline).context("failed to read pipeline file")?;
            let (classes, train, test) = load_train_test(&test_data, train_data.as_deref(), &table)?;

            let param_sets = match n_iter {
                Some(n) => grid.sample(n, cli.seed),
                None => grid.combinations(),
            };
            info!(n_combinations = param_sets.len(), "testing parameter combinations");

            let records = Sweep::new(pipeline, classes)
                .with_n_jobs(n_jobs)
                .with_artifact_dir(&artifact_dir)
                .run(&param_sets, &train, &test)?;

            let n_failed = records.iter().filter(|r| !r.contains_key("accuracy")).count();
            if n_failed > 0 {
                warn!(n_failed, "some parameter combinations failed");
            }
            let best = records
                .iter()
                .filter_map(|r| r.get("f1_score").and_then(serde_json::Value::as_f64).map(|f1| (f1, r)))
                .max_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, r)| r.clone());

            let n_rows_in_table = write_sweep_table(&saveto, &records, true)?;

            let output = OptimizeOutput {
                n_combinations: records.len(),
                n_failed,
                n_rows_in_table,
                best,
                saveto,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::InitPipeline { output, pipeline } => {
            let pipeline = build_pipeline(&pipeline, cli.seed)?;
            write_json(&output, &pipeline)?;
            info!(path = %output.display(), "pipeline written");

            let summary = InitPipelineOutput {
                output,
                sampler: pipeline.sampler().name(),
                n_trees: pipeline.classifier().n_trees(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
