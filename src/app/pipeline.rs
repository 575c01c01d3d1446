//! The training workflow shared by every subcommand.
//!
//! ingest -> clean -> encode (freeze schema) -> split -> balance (train only)
//! -> scale + fit -> evaluate on the untouched test part
//!
//! Any stage failure aborts the run; no artifact exists until the last step
//! succeeds.

use tracing::info;

use crate::domain::{CreditRecord, PipelineConfig};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, RowError, load_records};
use crate::models::{Evaluation, TrainedArtifact, TrainingBundle, positive_class_weight, train};
use crate::prep::{
    BalanceConfig, BalanceReport, CategoricalEncoder, FeatureSchema, SplitReport, balance, drop_negative_monetary,
    train_test_split,
};

/// Everything one training run produced.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
    /// Rows removed by the cleaner.
    pub dropped: usize,
    pub split: SplitReport,
    pub balance: BalanceReport,
    pub scale_pos_weight: f64,
    pub evaluation: Evaluation,
    pub artifact: TrainedArtifact,
}

impl TrainingRun {
    pub fn schema(&self) -> &FeatureSchema {
        self.artifact.schema()
    }
}

/// Load `config.data_path` and train.
pub fn run_training(config: &PipelineConfig) -> Result<TrainingRun, AppError> {
    config.validate()?;
    let ingest = load_records(&config.data_path)?;
    run_training_on(ingest, config)
}

/// Train on rows already in memory.
pub fn run_training_from_records(records: Vec<CreditRecord>, config: &PipelineConfig) -> Result<TrainingRun, AppError> {
    let rows_read = records.len();
    let ingest = IngestedData {
        records,
        row_errors: Vec::new(),
        rows_read,
    };
    run_training_on(ingest, config)
}

fn run_training_on(ingest: IngestedData, config: &PipelineConfig) -> Result<TrainingRun, AppError> {
    config.validate()?;
    let IngestedData {
        records,
        row_errors,
        rows_read,
    } = ingest;
    if records.is_empty() {
        return Err(AppError::training_failure("the dataset has no usable rows"));
    }

    let cleaned = drop_negative_monetary(records);
    info!(kept = cleaned.records.len(), dropped = cleaned.dropped, "cleaned rows");
    if cleaned.records.is_empty() {
        return Err(AppError::training_failure(
            "every row has a negative bill or payment amount",
        ));
    }

    let encoder = CategoricalEncoder::fit(&cleaned.records)?;
    let encoded = encoder.transform(&cleaned.records)?;
    info!(columns = encoder.schema().len(), rows = encoded.n_rows(), "schema frozen");

    let split = train_test_split(&encoded, config.test_fraction, config.seed)?;
    info!(
        train_rows = split.report.train_rows,
        train_positive_ratio = split.report.train_positive_ratio(),
        test_rows = split.report.test_rows,
        test_positive_ratio = split.report.test_positive_ratio(),
        "split"
    );

    let scale_pos_weight = positive_class_weight(&split.train.labels)?;
    let balance_config = BalanceConfig {
        k_neighbors: config.smote_k,
        ratio: config.balance_ratio,
        seed: config.seed,
    };
    let (balanced, balance_report) = balance(&split.train, &balance_config)?;
    info!(
        synthetic = balance_report.synthetic,
        duplicated = balance_report.duplicated,
        per_class = balance_report.after_positive,
        "balanced training set"
    );

    let bundle = TrainingBundle {
        train: balanced,
        test: split.test,
        schema: encoder.into_schema(),
    };
    let output = train(bundle, scale_pos_weight, &config.boost)?;

    Ok(TrainingRun {
        rows_read,
        row_errors,
        dropped: cleaned.dropped,
        split: split.report,
        balance: balance_report,
        scale_pos_weight,
        evaluation: output.evaluation,
        artifact: output.artifact,
    })
}
