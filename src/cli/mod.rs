//! Command-line parsing for the credit default pipeline.
//!
//! Argument parsing and command dispatch stay apart from the pipeline code; this
//! module only describes flags.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "credit-default",
    version,
    about = "Train a credit-card default classifier and answer repayment predictions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train on a dataset CSV and print the evaluation summary.
    Train(TrainArgs),
    /// Train, then predict a single request given by flags.
    Predict(PredictArgs),
    /// Train, then answer JSON-line requests from stdin (one JSON response per line).
    Serve(TrainArgs),
    /// Write a synthetic dataset CSV in the UCI column layout.
    Synth(SynthArgs),
}

/// Dataset and training options.
#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Dataset CSV. Falls back to `CREDIT_DATA_PATH` (environment or `.env`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Seed shared by the splitter and the balancer.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Neighbours considered when interpolating minority rows.
    #[arg(long, default_value_t = 5)]
    pub smote_k: usize,

    /// Minority/majority ratio reached by interpolation before duplication fills the rest.
    #[arg(long, default_value_t = 1.0)]
    pub balance_ratio: f64,

    /// Boosting rounds.
    #[arg(long, default_value_t = 100)]
    pub rounds: usize,

    #[arg(long, default_value_t = 0.3)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 6)]
    pub max_depth: usize,

    /// Histogram bins per feature.
    #[arg(long, default_value_t = 256)]
    pub max_bins: usize,

    /// Write run metrics (reports, schema, evaluation) to JSON.
    #[arg(long = "export-metrics", value_name = "JSON")]
    pub export_metrics: Option<PathBuf>,
}

/// One prediction request, as the form would submit it.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub train: TrainArgs,

    #[arg(long)]
    pub credit_limit: String,

    #[arg(long)]
    pub age: String,

    /// Male | Female
    #[arg(long)]
    pub gender: Option<String>,

    /// Graduate School | University | High School | Others
    #[arg(long)]
    pub education: Option<String>,

    /// Married | Single | Others
    #[arg(long)]
    pub marital_status: Option<String>,

    /// Pay Duly | No Consumption | Payment Delay for 1 Month | ... for 2 Months | ... for 3 Months
    #[arg(long)]
    pub repayment_status: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(short = 'n', long, default_value_t = 5_000)]
    pub rows: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
