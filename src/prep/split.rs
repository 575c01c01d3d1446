//! Seeded train/test partition.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::prep::encode::EncodedData;

/// Class counts on both sides of the split (reported, not enforced).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub train_rows: usize,
    pub train_positive: usize,
    pub test_rows: usize,
    pub test_positive: usize,
}

impl SplitReport {
    pub fn train_positive_ratio(&self) -> f64 {
        ratio(self.train_positive, self.train_rows)
    }

    pub fn test_positive_ratio(&self) -> f64 {
        ratio(self.test_positive, self.test_rows)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: EncodedData,
    pub test: EncodedData,
    pub report: SplitReport,
}

/// Shuffle row indices with `seed`; the first `ceil(test_fraction * n)` go to test.
pub fn train_test_split(data: &EncodedData, test_fraction: f64, seed: u64) -> Result<TrainTestSplit, PipelineError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidParameter(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n = data.n_rows();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::EmptyData(format!(
            "{n} rows cannot be split into non-empty train and test parts"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = subset(data, train_idx);
    let test = subset(data, test_idx);

    let report = SplitReport {
        train_rows: train.n_rows(),
        train_positive: train.positives(),
        test_rows: test.n_rows(),
        test_positive: test.positives(),
    };

    Ok(TrainTestSplit { train, test, report })
}

fn subset(data: &EncodedData, rows: &[usize]) -> EncodedData {
    EncodedData {
        features: data.features.select_rows(rows.iter()),
        labels: rows.iter().map(|&i| data.labels[i]).collect(),
    }
}
