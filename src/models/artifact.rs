//! The immutable bundle handed from training to prediction.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::gbdt::{Classifier, GradientBoostedTrees};
use crate::prep::{FeatureSchema, StandardScaler};

/// Fitted model, fitted scaler and the schema both were fitted against.
///
/// All three share one width; `new` refuses to build an artifact otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "ArtifactParts<M>",
    bound(deserialize = "M: Classifier + Deserialize<'de>")
)]
pub struct TrainedArtifact<M = GradientBoostedTrees> {
    model: M,
    scaler: StandardScaler,
    schema: FeatureSchema,
}

#[derive(Deserialize)]
struct ArtifactParts<M> {
    model: M,
    scaler: StandardScaler,
    schema: FeatureSchema,
}

impl<M: Classifier> TryFrom<ArtifactParts<M>> for TrainedArtifact<M> {
    type Error = PipelineError;

    fn try_from(parts: ArtifactParts<M>) -> Result<Self, Self::Error> {
        TrainedArtifact::new(parts.model, parts.scaler, parts.schema)
    }
}

impl<M: Classifier> TrainedArtifact<M> {
    pub fn new(model: M, scaler: StandardScaler, schema: FeatureSchema) -> Result<Self, PipelineError> {
        for got in [scaler.n_features(), model.n_features()] {
            if got != schema.len() {
                return Err(PipelineError::WidthMismatch {
                    expected: schema.len(),
                    got,
                });
            }
        }
        Ok(Self { model, scaler, schema })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}
