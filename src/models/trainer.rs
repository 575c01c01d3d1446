//! Fit scaler + classifier on the balanced training partition and score the
//! untouched test partition.

use tracing::info;

use crate::domain::BoostParams;
use crate::error::PipelineError;
use crate::models::artifact::TrainedArtifact;
use crate::models::gbdt::GradientBoostedTrees;
use crate::models::metrics::{Evaluation, evaluate};
use crate::prep::{EncodedData, FeatureSchema, StandardScaler};

/// Everything the trainer consumes.
///
/// `train` is the balanced partition; `test` must be the split's test partition
/// exactly as encoded (never balanced).
#[derive(Debug, Clone)]
pub struct TrainingBundle {
    pub train: EncodedData,
    pub test: EncodedData,
    pub schema: FeatureSchema,
}

#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub artifact: TrainedArtifact,
    pub evaluation: Evaluation,
}

/// Weight for label-1 rows: `total / positives`.
///
/// Computed on the training labels before balancing.
pub fn positive_class_weight(labels: &[u8]) -> Result<f64, PipelineError> {
    if labels.is_empty() {
        return Err(PipelineError::EmptyData("No training labels".to_string()));
    }
    let positives = labels.iter().filter(|&&l| l == 1).count();
    if positives == 0 {
        return Err(PipelineError::SingleClass { class: 0 });
    }
    Ok(labels.len() as f64 / positives as f64)
}

pub fn train(bundle: TrainingBundle, scale_pos_weight: f64, params: &BoostParams) -> Result<TrainOutput, PipelineError> {
    let TrainingBundle { train, test, schema } = bundle;
    for part in [&train, &test] {
        if part.n_features() != schema.len() {
            return Err(PipelineError::WidthMismatch {
                expected: schema.len(),
                got: part.n_features(),
            });
        }
    }
    if test.n_rows() == 0 {
        return Err(PipelineError::EmptyData("The test partition is empty".to_string()));
    }

    let scaler = StandardScaler::fit(&train.features)?;
    let x_train = scaler.transform(&train.features)?;
    let model = GradientBoostedTrees::fit(&x_train, &train.labels, scale_pos_weight, params)?;

    let x_test = scaler.transform(&test.features)?;
    let evaluation = evaluate(&model, &x_test, &test.labels);
    info!(
        rounds = params.n_rounds,
        test_rows = evaluation.n_rows,
        accuracy = evaluation.accuracy,
        f1 = evaluation.f1,
        "model trained"
    );

    let artifact = TrainedArtifact::new(model, scaler, schema)?;
    Ok(TrainOutput { artifact, evaluation })
}
