//! Minority-class oversampling for the training partition.
//!
//! Two steps, both driven by one seeded RNG:
//!
//! 1. SMOTE-style interpolation: a synthetic row is `x + gap * (nn - x)` where `x`
//!    is a random minority row, `nn` one of its k nearest minority neighbours and
//!    `gap ~ U[0, 1)`. Rows are added until minority = ceil(ratio * majority).
//! 2. Duplication: random minority rows (original or synthetic) are copied until
//!    both classes have exactly the same count.
//!
//! Output rows: all input rows unchanged and in order, then synthetic rows, then
//! duplicates. The test partition must never be passed in here.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::prep::encode::EncodedData;

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceConfig {
    pub k_neighbors: usize,
    /// Target minority/majority ratio for the interpolation step.
    pub ratio: f64,
    pub seed: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            ratio: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub minority_label: u8,
    pub before_negative: usize,
    pub before_positive: usize,
    pub synthetic: usize,
    pub duplicated: usize,
    pub after_negative: usize,
    pub after_positive: usize,
}

/// Balance `data` to a 1:1 class ratio.
pub fn balance(data: &EncodedData, config: &BalanceConfig) -> Result<(EncodedData, BalanceReport), PipelineError> {
    if data.n_rows() == 0 {
        return Err(PipelineError::EmptyData("Cannot balance an empty training set".to_string()));
    }
    if !(config.ratio > 0.0 && config.ratio <= 1.0) {
        return Err(PipelineError::InvalidParameter(format!(
            "balance ratio must be in (0, 1], got {}",
            config.ratio
        )));
    }
    if config.k_neighbors == 0 {
        return Err(PipelineError::InvalidParameter("k_neighbors must be > 0".to_string()));
    }

    let positives = data.positives();
    let negatives = data.n_rows() - positives;
    if positives == 0 {
        return Err(PipelineError::SingleClass { class: 0 });
    }
    if negatives == 0 {
        return Err(PipelineError::SingleClass { class: 1 });
    }

    let (minority_label, n_min, n_maj) = if positives <= negatives {
        (1u8, positives, negatives)
    } else {
        (0u8, negatives, positives)
    };

    let width = data.n_features();
    let mut rows: Vec<Vec<f64>> = (0..data.n_rows()).map(|i| data.row(i)).collect();
    let mut labels = data.labels.clone();
    let mut rng = StdRng::seed_from_u64(config.seed);

    // Step 1: interpolation.
    let minority: Vec<Vec<f64>> = rows
        .iter()
        .zip(&labels)
        .filter(|(_, l)| **l == minority_label)
        .map(|(r, _)| r.clone())
        .collect();

    let target = ((config.ratio * n_maj as f64).ceil() as usize).clamp(n_min, n_maj);
    let n_synthetic = target - n_min;
    let mut synthetic = Vec::with_capacity(n_synthetic);

    if n_synthetic > 0 && n_min >= 2 {
        let k = config.k_neighbors.min(n_min - 1);
        let neighbours = nearest_neighbours(&minority, k);
        for _ in 0..n_synthetic {
            let i = rng.gen_range(0..n_min);
            let j = neighbours[i][rng.gen_range(0..k)];
            let gap: f64 = rng.r#gen();
            let row: Vec<f64> = minority[i]
                .iter()
                .zip(&minority[j])
                .map(|(a, b)| a + gap * (b - a))
                .collect();
            synthetic.push(row);
        }
    } else if n_synthetic > 0 {
        warn!(n_min, "single minority row; skipping interpolation, duplicating instead");
    }
    let n_synthetic = synthetic.len();

    // Step 2: duplication over the step-1 minority pool.
    let mut pool = minority;
    pool.extend(synthetic.iter().cloned());
    let n_duplicated = n_maj - pool.len();
    let mut duplicates = Vec::with_capacity(n_duplicated);
    for _ in 0..n_duplicated {
        let i = rng.gen_range(0..pool.len());
        duplicates.push(pool[i].clone());
    }

    rows.extend(synthetic);
    rows.extend(duplicates);
    labels.extend(std::iter::repeat_n(minority_label, n_synthetic + n_duplicated));

    let balanced = EncodedData::from_rows(&rows, labels, width)?;
    let after_positive = balanced.positives();
    let report = BalanceReport {
        minority_label,
        before_negative: negatives,
        before_positive: positives,
        synthetic: n_synthetic,
        duplicated: n_duplicated,
        after_negative: balanced.n_rows() - after_positive,
        after_positive,
    };
    debug!(?report, "balanced training set");

    Ok((balanced, report))
}

/// Indices of the `k` nearest rows (Euclidean) for every row, excluding itself.
///
/// Ties break on the lower index so results do not depend on thread scheduling.
fn nearest_neighbours(rows: &[Vec<f64>], k: usize) -> Vec<Vec<usize>> {
    rows.par_iter()
        .enumerate()
        .map(|(i, x)| {
            let mut dists: Vec<(f64, usize)> = rows
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, y)| (squared_distance(x, y), j))
                .collect();
            let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
            if dists.len() > k {
                dists.select_nth_unstable_by(k - 1, by_distance);
                dists.truncate(k);
            }
            dists.sort_by(by_distance);
            dists.into_iter().map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
