//! Classifier, evaluation and the trained artifact.
//!
//! The classifier sits behind the `Classifier` trait so the predictor and the
//! evaluator stay generic over it.

pub mod artifact;
pub mod gbdt;
pub mod metrics;
pub mod trainer;

pub use artifact::TrainedArtifact;
pub use gbdt::{Classifier, GradientBoostedTrees, Node, Tree};
pub use metrics::{ConfusionMatrix, Evaluation, evaluate};
pub use trainer::{TrainOutput, TrainingBundle, positive_class_weight, train};
