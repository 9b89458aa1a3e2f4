//! Titanic Steps CLI - run one pipeline step per invocation
//!
//! # Commands
//!
//! ```bash
//! titanic-steps drop_unuseful_columns   # TRAIN_FILE, TEST_FILE, UNUSEFUL_COLUMNS
//! titanic-steps transform_fields        # TRAIN_FILE, TEST_FILE, FIELDS_TO_TRANSFORM
//! titanic-steps train_and_predict       # TRAIN_FILE, TEST_FILE, FIELD_TO_PREDICT,
//!                                       # ALGORITHM, FIELDS_TO_USE
//! ```
//!
//! Every command prints one YAML document with the key `output` to stdout.
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use titanic_steps::{
    prune, train_and_predict, transform, EnvSource, ListEncoding, PipelineResult, ProcessEnv,
    PruneConfig, ResultMode, StepOutput, StorageConfig, TrainConfig, TransformConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "titanic-steps")]
#[command(about = "Prune, transform and classify the Titanic passenger dataset", long_about = None)]
struct Cli {
    /// How list parameters are encoded in the environment
    #[arg(long, global = true, env = "LIST_ENCODING", ignore_case = true)]
    list_encoding: Option<ListEncoding>,

    /// Directory output files are written to
    #[arg(long, global = true, env = "STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop UNUSEFUL_COLUMNS from both tables
    #[command(name = "drop_unuseful_columns", alias = "prune")]
    DropUnusefulColumns,

    /// Impute and encode FIELDS_TO_TRANSFORM in both tables
    #[command(name = "transform_fields", alias = "transform")]
    TransformFields,

    /// Fit a classifier on the train table and label the test table
    #[command(name = "train_and_predict", alias = "train")]
    TrainAndPredict {
        /// Write results to a file or return them inline
        #[arg(long, env = "RESULT_MODE", ignore_case = true)]
        result_mode: Option<ResultMode>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "titanic_steps=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", e.kind(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> PipelineResult<()> {
    let env = ProcessEnv;

    let encoding = match cli.list_encoding {
        Some(encoding) => encoding,
        None => ListEncoding::from_env(&env)?,
    };
    let storage = cli
        .storage_root
        .map(StorageConfig::new)
        .unwrap_or_else(|| StorageConfig::from_env(&env));

    let output = match cli.command {
        Commands::DropUnusefulColumns => cmd_prune(&env, encoding, &storage)?,
        Commands::TransformFields => cmd_transform(&env, encoding, &storage)?,
        Commands::TrainAndPredict { result_mode } => {
            cmd_train(&env, encoding, &storage, result_mode)?
        }
    };

    print!("{}", output.to_yaml()?);
    Ok(())
}

fn cmd_prune(
    env: &impl EnvSource,
    encoding: ListEncoding,
    storage: &StorageConfig,
) -> PipelineResult<StepOutput> {
    let config = PruneConfig::from_env(env, encoding)?;
    let ids = prune(&config, storage)?;
    Ok(StepOutput::files(&ids, encoding))
}

fn cmd_transform(
    env: &impl EnvSource,
    encoding: ListEncoding,
    storage: &StorageConfig,
) -> PipelineResult<StepOutput> {
    let config = TransformConfig::from_env(env, encoding)?;
    let ids = transform(&config, storage)?;
    Ok(StepOutput::files(&ids, encoding))
}

fn cmd_train(
    env: &impl EnvSource,
    encoding: ListEncoding,
    storage: &StorageConfig,
    result_mode: Option<ResultMode>,
) -> PipelineResult<StepOutput> {
    let mut config = TrainConfig::from_env(env, encoding)?;
    if let Some(mode) = result_mode {
        config.result_mode = mode;
    }
    let outcome = train_and_predict(&config, storage)?;
    Ok(StepOutput::prediction(outcome))
}
