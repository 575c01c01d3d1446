//! Training metrics export (JSON).
//!
//! The file is a snapshot of one run: configuration, data accounting, split and
//! balancing reports, the frozen schema and the hold-out evaluation.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::domain::BoostParams;
use crate::error::AppError;
use crate::models::Evaluation;
use crate::prep::{BalanceReport, SplitReport};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsFile<'a> {
    pub tool: &'static str,
    pub generated_at: String,
    pub seed: u64,
    pub test_fraction: f64,
    pub boost: &'a BoostParams,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub rows_dropped_negative: usize,
    pub split: &'a SplitReport,
    pub balance: &'a BalanceReport,
    pub positive_class_weight: f64,
    pub schema: &'a [String],
    pub evaluation: &'a Evaluation,
}

impl MetricsFile<'_> {
    pub fn timestamp_now() -> String {
        Local::now().to_rfc3339()
    }
}

pub fn write_metrics_json(path: &Path, metrics: &MetricsFile<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create metrics JSON '{}': {e}", path.display())))?;
    write_metrics(file, metrics)
}

pub fn write_metrics<W: Write>(writer: W, metrics: &MetricsFile<'_>) -> Result<(), AppError> {
    serde_json::to_writer_pretty(writer, metrics)
        .map_err(|e| AppError::new(2, format!("Failed to write metrics JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfusionMatrix, Evaluation};

    #[test]
    fn metrics_json_has_the_expected_shape() {
        let boost = BoostParams::default();
        let split = SplitReport {
            train_rows: 8,
            train_positive: 2,
            test_rows: 2,
            test_positive: 1,
        };
        let balance = BalanceReport {
            minority_label: 1,
            before_negative: 6,
            before_positive: 2,
            synthetic: 4,
            duplicated: 0,
            after_negative: 6,
            after_positive: 6,
        };
        let evaluation = Evaluation::from_confusion(ConfusionMatrix {
            true_positive: 1,
            false_positive: 0,
            true_negative: 1,
            false_negative: 0,
        });
        let schema = vec!["limit_bal".to_string(), "sex_2".to_string()];
        let metrics = MetricsFile {
            tool: "credit-default",
            generated_at: MetricsFile::timestamp_now(),
            seed: 42,
            test_fraction: 0.2,
            boost: &boost,
            rows_read: 11,
            rows_skipped: 0,
            rows_dropped_negative: 1,
            split: &split,
            balance: &balance,
            positive_class_weight: 4.0,
            schema: &schema,
            evaluation: &evaluation,
        };

        let mut buf = Vec::new();
        write_metrics(&mut buf, &metrics).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["tool"], "credit-default");
        assert_eq!(value["evaluation"]["accuracy"], 1.0);
        assert_eq!(value["evaluation"]["confusion"]["true_positive"], 1);
        assert_eq!(value["balance"]["after_positive"], 6);
        assert_eq!(value["schema"][1], "sex_2");
        assert_eq!(value["boost"]["n_rounds"], 100);
    }
}
