//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the training pipeline
//! - prints reports, answers predictions, writes optional exports

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use crate::cli::{Command, PredictArgs, SynthArgs, TrainArgs};
use crate::domain::{BoostParams, InferenceRequest, PipelineConfig};
use crate::error::AppError;
use crate::inference::Predictor;
use crate::io::export::{MetricsFile, write_metrics_json};

pub mod pipeline;
pub mod serve;

/// Environment variable consulted when `--data` is absent.
pub const DATA_PATH_ENV: &str = "CREDIT_DATA_PATH";

/// Entry point for the `credit-default` binary.
pub fn run() -> Result<(), AppError> {
    // Before logging so `.env` can set RUST_LOG.
    dotenvy::dotenv().ok();
    crate::logging::init();

    let cli = crate::cli::Cli::parse();
    let result = match cli.command {
        Command::Train(args) => handle_train(&args),
        Command::Predict(args) => handle_predict(&args),
        Command::Serve(args) => handle_serve(&args),
        Command::Synth(args) => handle_synth(&args),
    };
    if let Err(err) = &result {
        log_failure(err);
    }
    result
}

/// Usage errors (code 2) are left to the caller's plain message.
fn log_failure(err: &AppError) {
    match err.exit_code() {
        3 => error!(exit_code = 3, error = %err, "training pipeline failed"),
        4 => error!(exit_code = 4, error = %err, "internal error"),
        _ => {}
    }
}

fn handle_train(args: &TrainArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(args)?;
    let run = pipeline::run_training(&config)?;
    println!("{}", crate::report::format_training_summary(&run, &config));
    export_metrics(&run, &config)
}

fn handle_predict(args: &PredictArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.train)?;
    let run = pipeline::run_training(&config)?;
    export_metrics(&run, &config)?;

    let request = InferenceRequest {
        credit_limit: args.credit_limit.clone(),
        age: args.age.clone(),
        gender: args.gender.clone(),
        education: args.education.clone(),
        marital_status: args.marital_status.clone(),
        repayment_status: args.repayment_status.clone(),
    };

    let predictor = Predictor::new(run.artifact);
    let prediction = predictor.predict_detailed(&request).map_err(|err| {
        let code = if err.is_user_error() { 2 } else { 4 };
        AppError::new(code, err.to_string())
    })?;
    println!(
        "{} ({}; probability of default {:.3})",
        prediction.verdict.message(),
        prediction.verdict,
        prediction.probability
    );
    Ok(())
}

fn handle_serve(args: &TrainArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(args)?;
    let run = pipeline::run_training(&config)?;
    export_metrics(&run, &config)?;
    info!(accuracy = run.evaluation.accuracy, "model ready; reading requests from stdin");

    let predictor = Predictor::new(run.artifact);
    serve::serve_lines(&predictor, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let records = crate::data::generate_dataset(args.rows, args.seed)?;
    crate::data::write_dataset_file(&args.output, &records)?;
    let defaults = records.iter().filter(|r| r.default == 1).count();
    println!(
        "Wrote {} rows ({} defaults) to {}",
        records.len(),
        defaults,
        args.output.display()
    );
    Ok(())
}

fn export_metrics(run: &pipeline::TrainingRun, config: &PipelineConfig) -> Result<(), AppError> {
    let Some(path) = &config.export_metrics else {
        return Ok(());
    };
    let metrics = MetricsFile {
        tool: "credit-default",
        generated_at: MetricsFile::timestamp_now(),
        seed: config.seed,
        test_fraction: config.test_fraction,
        boost: &config.boost,
        rows_read: run.rows_read,
        rows_skipped: run.row_errors.len(),
        rows_dropped_negative: run.dropped,
        split: &run.split,
        balance: &run.balance,
        positive_class_weight: run.scale_pos_weight,
        schema: run.schema().columns(),
        evaluation: &run.evaluation,
    };
    write_metrics_json(path, &metrics)?;
    info!(path = %path.display(), "metrics written");
    Ok(())
}

/// Resolve CLI flags (plus `CREDIT_DATA_PATH`) into a validated config.
pub fn pipeline_config_from_args(args: &TrainArgs) -> Result<PipelineConfig, AppError> {
    let data_path = match &args.data {
        Some(path) => path.clone(),
        None => std::env::var_os(DATA_PATH_ENV).map(PathBuf::from).ok_or_else(|| {
            AppError::new(
                2,
                format!("No dataset given. Pass --data <CSV> or set {DATA_PATH_ENV}."),
            )
        })?,
    };

    let config = PipelineConfig {
        data_path,
        seed: args.seed,
        test_fraction: args.test_fraction,
        smote_k: args.smote_k,
        balance_ratio: args.balance_ratio,
        boost: BoostParams {
            n_rounds: args.rounds,
            learning_rate: args.learning_rate,
            max_depth: args.max_depth,
            max_bins: args.max_bins,
            ..BoostParams::default()
        },
        export_metrics: args.export_metrics.clone(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn args() -> TrainArgs {
        TrainArgs {
            data: Some(PathBuf::from("cards.csv")),
            seed: 7,
            test_fraction: 0.25,
            smote_k: 3,
            balance_ratio: 0.8,
            rounds: 15,
            learning_rate: 0.1,
            max_depth: 4,
            max_bins: 64,
            export_metrics: None,
        }
    }

    #[test]
    fn flags_map_onto_the_config() {
        let config = pipeline_config_from_args(&args()).unwrap();
        assert_eq!(config.data_path, PathBuf::from("cards.csv"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.smote_k, 3);
        assert_eq!(config.boost.n_rounds, 15);
        assert_eq!(config.boost.max_bins, 64);
        assert_eq!(config.boost.lambda, BoostParams::default().lambda);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged(err: &AppError) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || log_failure(err));
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn training_and_internal_failures_are_logged() {
        let out = logged(&AppError::training_failure("only one class in the training labels"));
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("training pipeline failed"), "{out}");
        assert!(out.contains("only one class in the training labels"), "{out}");

        let out = logged(&AppError::new(4, "scaler width 3, schema width 4"));
        assert!(out.contains("internal error"), "{out}");
        assert!(out.contains("exit_code=4"), "{out}");

        assert!(logged(&AppError::new(2, "No dataset given.")).is_empty());
    }

    #[test]
    fn invalid_flags_are_usage_errors() {
        let mut bad = args();
        bad.test_fraction = 1.5;
        assert_eq!(pipeline_config_from_args(&bad).unwrap_err().exit_code(), 2);
    }
}
