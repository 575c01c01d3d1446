//! Histogram-based gradient-boosted trees for binary classification.
//!
//! Each round fits one regression tree to the gradient/hessian of the weighted
//! logistic loss:
//!
//! ```text
//! g_i = w_i (p_i - y_i)        h_i = w_i p_i (1 - p_i)
//! leaf = -G / (H + λ) · η      gain = ½ [G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ)]
//! ```
//!
//! Features are pre-binned into at most `max_bins` quantile bins so a split
//! search is a single histogram pass per feature. The search runs in parallel
//! across features; the reduction walks features in index order so results are
//! identical for every thread count.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, enabled};

use crate::domain::BoostParams;
use crate::error::PipelineError;

/// Splits must improve the objective by more than this.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// A binary classifier over fixed-width feature vectors.
pub trait Classifier {
    /// Width of the vectors the model was fitted on.
    fn n_features(&self) -> usize;

    /// Probability of label 1. `row.len()` must equal `n_features()`.
    fn predict_proba(&self, row: &[f64]) -> f64;

    fn threshold(&self) -> f64 {
        0.5
    }

    fn predict(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba(row) >= self.threshold())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostParams,
    scale_pos_weight: f64,
    base_margin: f64,
    n_features: usize,
    trees: Vec<Tree>,
}

impl GradientBoostedTrees {
    /// Fit on `features` (one row per sample) against 0/1 `labels`.
    ///
    /// Rows labelled 1 carry weight `scale_pos_weight`, rows labelled 0 weight 1.
    pub fn fit(
        features: &DMatrix<f64>,
        labels: &[u8],
        scale_pos_weight: f64,
        params: &BoostParams,
    ) -> Result<Self, PipelineError> {
        let n = features.nrows();
        if n == 0 {
            return Err(PipelineError::EmptyData("Cannot fit a classifier on zero rows".to_string()));
        }
        if labels.len() != n {
            return Err(PipelineError::WidthMismatch {
                expected: n,
                got: labels.len(),
            });
        }
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 {
            return Err(PipelineError::SingleClass { class: 0 });
        }
        if positives == n {
            return Err(PipelineError::SingleClass { class: 1 });
        }
        if !(scale_pos_weight.is_finite() && scale_pos_weight > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "positive class weight must be finite and > 0, got {scale_pos_weight}"
            )));
        }
        if params.max_bins < 2 || params.max_bins > u16::MAX as usize {
            return Err(PipelineError::InvalidParameter(format!(
                "max_bins must be in [2, 65535], got {}",
                params.max_bins
            )));
        }

        let weights: Vec<f64> = labels
            .iter()
            .map(|&l| if l == 1 { scale_pos_weight } else { 1.0 })
            .collect();
        let targets: Vec<f64> = labels.iter().map(|&l| f64::from(l)).collect();
        let binned = BinnedFeatures::build(features, params.max_bins);

        let base_margin = 0.0;
        let mut margins = vec![base_margin; n];
        let mut delta = vec![0.0; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let all_rows: Vec<usize> = (0..n).collect();
        let mut trees = Vec::with_capacity(params.n_rounds);

        for round in 0..params.n_rounds {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = weights[i] * (p - targets[i]);
                hess[i] = weights[i] * (p * (1.0 - p)).max(1e-16);
            }

            let ctx = GrowContext {
                binned: &binned,
                grad: &grad,
                hess: &hess,
                params,
            };
            let mut nodes = Vec::new();
            ctx.build(all_rows.clone(), 0, &mut nodes, &mut delta);
            let tree = Tree { nodes };

            for (m, d) in margins.iter_mut().zip(&delta) {
                *m += d;
            }

            if enabled!(Level::DEBUG) {
                debug!(
                    round,
                    leaves = tree.n_leaves(),
                    loss = weighted_log_loss(&margins, &targets, &weights),
                    "boosting round"
                );
            }
            trees.push(tree);
        }

        Ok(Self {
            params: params.clone(),
            scale_pos_weight,
            base_margin,
            n_features: features.ncols(),
            trees,
        })
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }

    pub fn scale_pos_weight(&self) -> f64 {
        self.scale_pos_weight
    }

    /// Raw additive score before the sigmoid.
    pub fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

impl Classifier for GradientBoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }

    fn threshold(&self) -> f64 {
        self.params.threshold
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn weighted_log_loss(margins: &[f64], targets: &[f64], weights: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for ((m, y), w) in margins.iter().zip(targets).zip(weights) {
        let p = sigmoid(*m).clamp(1e-15, 1.0 - 1e-15);
        total -= w * (y * p.ln() + (1.0 - y) * (1.0 - p).ln());
        weight_sum += w;
    }
    total / weight_sum
}

/// Per-feature quantile cut points and the bin index of every row.
///
/// Bin `b` holds values in `(cuts[b-1], cuts[b]]`; the last bin is open above.
struct BinnedFeatures {
    cuts: Vec<Vec<f64>>,
    /// `bins[feature][row]`
    bins: Vec<Vec<u16>>,
}

impl BinnedFeatures {
    fn build(features: &DMatrix<f64>, max_bins: usize) -> Self {
        let (cuts, bins): (Vec<Vec<f64>>, Vec<Vec<u16>>) = (0..features.ncols())
            .into_par_iter()
            .map(|j| {
                let column: Vec<f64> = features.column(j).iter().copied().collect();
                let cuts = quantile_cuts(&column, max_bins);
                let bins = column
                    .iter()
                    .map(|x| cuts.partition_point(|c| c < x) as u16)
                    .collect();
                (cuts, bins)
            })
            .unzip();
        Self { cuts, bins }
    }
}

fn quantile_cuts(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let Some(&max) = sorted.last() else {
        return Vec::new();
    };

    let mut unique = sorted.clone();
    unique.dedup();

    let mut cuts: Vec<f64> = if unique.len() <= max_bins {
        unique
    } else {
        let n = sorted.len();
        (1..max_bins).map(|b| sorted[b * n / max_bins]).collect()
    };
    cuts.dedup();
    // A cut at the maximum would leave an empty right side.
    cuts.retain(|c| *c < max);
    cuts
}

struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct GrowContext<'a> {
    binned: &'a BinnedFeatures,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoostParams,
}

impl GrowContext<'_> {
    /// Grow the subtree for `rows`; returns its node index.
    ///
    /// Every row lands in exactly one leaf, whose value is written to `delta`.
    fn build(&self, rows: Vec<usize>, depth: usize, nodes: &mut Vec<Node>, delta: &mut [f64]) -> usize {
        let idx = nodes.len();
        nodes.push(Node::Leaf { value: 0.0 });

        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();

        let split = if depth < self.params.max_depth && rows.len() >= 2 {
            self.best_split(&rows, g, h)
        } else {
            None
        };

        let Some(split) = split else {
            let value = -g / (h + self.params.lambda) * self.params.learning_rate;
            for &r in &rows {
                delta[r] = value;
            }
            nodes[idx] = Node::Leaf { value };
            return idx;
        };

        let column = &self.binned.bins[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&r| column[r] as usize <= split.bin);
        drop(rows);

        let left = self.build(left_rows, depth + 1, nodes, delta);
        let right = self.build(right_rows, depth + 1, nodes, delta);
        nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: self.binned.cuts[split.feature][split.bin],
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let lambda = self.params.lambda;
        let min_child = self.params.min_child_weight;
        let parent_score = g * g / (h + lambda);

        let per_feature: Vec<Option<SplitCandidate>> = (0..self.binned.cuts.len())
            .into_par_iter()
            .map(|feature| {
                let cuts = &self.binned.cuts[feature];
                if cuts.is_empty() {
                    return None;
                }
                let column = &self.binned.bins[feature];
                let mut hist_g = vec![0.0; cuts.len() + 1];
                let mut hist_h = vec![0.0; cuts.len() + 1];
                for &r in rows {
                    let b = column[r] as usize;
                    hist_g[b] += self.grad[r];
                    hist_h[b] += self.hess[r];
                }

                let mut best: Option<SplitCandidate> = None;
                let (mut gl, mut hl) = (0.0, 0.0);
                for bin in 0..cuts.len() {
                    gl += hist_g[bin];
                    hl += hist_h[bin];
                    let (gr, hr) = (g - gl, h - hl);
                    if hl <= 0.0 || hr <= 0.0 || hl < min_child || hr < min_child {
                        continue;
                    }
                    let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score);
                    if gain > MIN_SPLIT_GAIN && best.as_ref().is_none_or(|b| gain > b.gain) {
                        best = Some(SplitCandidate { feature, bin, gain });
                    }
                }
                best
            })
            .collect();

        per_feature.into_iter().flatten().fold(None, |acc, cand| match acc {
            Some(best) if best.gain >= cand.gain => Some(best),
            _ => Some(cand),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rounds: usize) -> BoostParams {
        BoostParams {
            n_rounds: rounds,
            ..BoostParams::default()
        }
    }

    /// Label is 1 when x0 > 5, x1 is noise.
    fn threshold_data() -> (DMatrix<f64>, Vec<u8>) {
        let n = 60;
        let flat: Vec<f64> = (0..n).flat_map(|i| [(i % 11) as f64, ((i * 7) % 5) as f64]).collect();
        let labels = (0..n).map(|i| u8::from(i % 11 > 5)).collect();
        (DMatrix::from_row_slice(n, 2, &flat), labels)
    }

    #[test]
    fn learns_a_single_threshold() {
        let (x, y) = threshold_data();
        let model = GradientBoostedTrees::fit(&x, &y, 1.0, &params(20)).unwrap();
        for i in 0..x.nrows() {
            let row: Vec<f64> = x.row(i).iter().copied().collect();
            assert_eq!(model.predict(&row), y[i], "row {i}");
        }
        assert_eq!(model.predict(&[10.0, 0.0]), 1);
        assert_eq!(model.predict(&[0.0, 4.0]), 0);
    }

    #[test]
    fn first_split_is_on_the_informative_feature() {
        let (x, y) = threshold_data();
        let model = GradientBoostedTrees::fit(&x, &y, 1.0, &params(1)).unwrap();
        match &model.trees()[0].nodes()[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 5.0);
            }
            other => panic!("expected a split at the root, got {other:?}"),
        }
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = threshold_data();
        let a = GradientBoostedTrees::fit(&x, &y, 2.5, &params(10)).unwrap();
        let b = GradientBoostedTrees::fit(&x, &y, 2.5, &params(10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn positive_weight_raises_scores() {
        // Overlapping classes: weighting positives must push probabilities up.
        let flat: Vec<f64> = (0..40).map(|i| (i % 4) as f64).collect();
        let x = DMatrix::from_row_slice(40, 1, &flat);
        let y: Vec<u8> = (0..40).map(|i| u8::from(i % 5 == 0)).collect();
        let plain = GradientBoostedTrees::fit(&x, &y, 1.0, &params(5)).unwrap();
        let weighted = GradientBoostedTrees::fit(&x, &y, 5.0, &params(5)).unwrap();
        assert!(weighted.predict_proba(&[1.0]) > plain.predict_proba(&[1.0]));
    }

    #[test]
    fn constant_features_produce_stumps() {
        let x = DMatrix::from_element(10, 3, 1.0);
        let y: Vec<u8> = (0..10).map(|i| u8::from(i < 3)).collect();
        let model = GradientBoostedTrees::fit(&x, &y, 1.0, &params(3)).unwrap();
        assert!(model.trees().iter().all(|t| t.nodes().len() == 1));
        assert!(model.predict_proba(&[1.0, 1.0, 1.0]) < 0.5);
    }

    #[test]
    fn quantile_cuts_respect_max_bins() {
        let values: Vec<f64> = (0..1000).map(f64::from).collect();
        let cuts = quantile_cuts(&values, 16);
        assert!(cuts.len() <= 15);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));

        let few = quantile_cuts(&[3.0, 1.0, 2.0, 2.0], 16);
        assert_eq!(few, vec![1.0, 2.0]);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let x = DMatrix::from_element(4, 1, 0.0);
        assert_eq!(
            GradientBoostedTrees::fit(&x, &[0, 0, 0, 0], 1.0, &params(1)).unwrap_err(),
            PipelineError::SingleClass { class: 0 }
        );
        assert!(matches!(
            GradientBoostedTrees::fit(&DMatrix::zeros(0, 1), &[], 1.0, &params(1)),
            Err(PipelineError::EmptyData(_))
        ));
    }
}
