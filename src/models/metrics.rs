//! Hold-out evaluation.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::models::gbdt::Classifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (1, 1) => cm.true_positive += 1,
                (0, 1) => cm.false_positive += 1,
                (1, _) => cm.false_negative += 1,
                _ => cm.true_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

/// 0 when the denominator is 0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Scores on the untouched, scaled test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub n_rows: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        Self {
            n_rows: confusion.total(),
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            confusion,
        }
    }
}

pub fn evaluate<C: Classifier>(model: &C, features: &DMatrix<f64>, labels: &[u8]) -> Evaluation {
    let predicted: Vec<u8> = features
        .row_iter()
        .map(|row| {
            let row: Vec<f64> = row.iter().copied().collect();
            model.predict(&row)
        })
        .collect();
    Evaluation::from_confusion(ConfusionMatrix::from_labels(labels, &predicted))
}
