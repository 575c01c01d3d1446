//! Request → verdict, using one immutable trained artifact.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{InferenceRequest, Verdict};
use crate::error::PredictError;
use crate::inference::encoder::InferenceEncoder;
use crate::models::{Classifier, GradientBoostedTrees, TrainedArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verdict: Verdict,
    /// Model probability of default.
    pub probability: f64,
}

/// Stateless apart from the artifact; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Predictor<M = GradientBoostedTrees> {
    artifact: TrainedArtifact<M>,
}

impl<M: Classifier> Predictor<M> {
    pub fn new(artifact: TrainedArtifact<M>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &TrainedArtifact<M> {
        &self.artifact
    }

    /// The unscaled feature vector for `request`.
    pub fn encode(&self, request: &InferenceRequest) -> Result<Vec<f64>, PredictError> {
        InferenceEncoder::new(self.artifact.schema()).encode(request)
    }

    pub fn predict_detailed(&self, request: &InferenceRequest) -> Result<Prediction, PredictError> {
        let row = self.encode(request)?;
        let scaled = self.artifact.scaler().transform_row(&row).map_err(|err| {
            error!(%err, "scaler rejected an encoded request");
            PredictError::SchemaMismatch {
                missing: Vec::new(),
                unexpected: Vec::new(),
                detail: err.to_string(),
            }
        })?;

        let model = self.artifact.model();
        // Same labelling path as hold-out evaluation.
        Ok(Prediction {
            verdict: Verdict::from_label(model.predict(&scaled)),
            probability: model.predict_proba(&scaled),
        })
    }

    pub fn predict(&self, request: &InferenceRequest) -> Result<Verdict, PredictError> {
        self.predict_detailed(request).map(|p| p.verdict)
    }

    pub fn predict_proba(&self, request: &InferenceRequest) -> Result<f64, PredictError> {
        self.predict_detailed(request).map(|p| p.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    use crate::domain::CreditRecord;
    use crate::models::evaluate;
    use crate::prep::{CategoricalEncoder, StandardScaler};

    /// Defaults exactly when the scaled credit limit is below the training mean.
    struct LowLimitDefaults {
        width: usize,
    }

    impl Classifier for LowLimitDefaults {
        fn n_features(&self) -> usize {
            self.width
        }
        fn predict_proba(&self, row: &[f64]) -> f64 {
            if row[0] < 0.0 { 0.8 } else { 0.2 }
        }
    }

    fn record(limit_bal: f64, sex: i32, education: i32, marriage: i32) -> CreditRecord {
        CreditRecord {
            limit_bal,
            sex,
            education,
            marriage,
            age: 30.0,
            pay_status: [0; 6],
            bill_amt: [0.0; 6],
            pay_amt: [0.0; 6],
            default: 0,
        }
    }

    /// Labels every row as a default regardless of its probability.
    struct FixedLabel {
        width: usize,
    }

    impl Classifier for FixedLabel {
        fn n_features(&self) -> usize {
            self.width
        }
        fn predict_proba(&self, _row: &[f64]) -> f64 {
            0.1
        }
        fn predict(&self, _row: &[f64]) -> u8 {
            1
        }
    }

    fn artifact<M: Classifier>(model: impl FnOnce(usize) -> M) -> TrainedArtifact<M> {
        let records = vec![
            record(10_000.0, 1, 1, 1),
            record(50_000.0, 2, 2, 2),
            record(90_000.0, 1, 3, 3),
            record(130_000.0, 2, 4, 1),
        ];
        let encoder = CategoricalEncoder::fit(&records).unwrap();
        let encoded = encoder.transform(&records).unwrap();
        let scaler = StandardScaler::fit(&encoded.features).unwrap();
        let schema = encoder.into_schema();
        let model = model(schema.len());
        TrainedArtifact::new(model, scaler, schema).unwrap()
    }

    fn predictor() -> Predictor<LowLimitDefaults> {
        Predictor::new(artifact(|width| LowLimitDefaults { width }))
    }

    fn request(limit: &str) -> InferenceRequest {
        InferenceRequest {
            credit_limit: limit.to_string(),
            age: "25".to_string(),
            gender: Some("Male".to_string()),
            education: Some("University".to_string()),
            marital_status: Some("Single".to_string()),
            repayment_status: Some("Pay Duly".to_string()),
        }
    }

    #[test]
    fn maps_labels_to_verdicts() {
        let p = predictor();
        assert_eq!(p.predict(&request("20000")).unwrap(), Verdict::WillNotRepay);
        assert_eq!(p.predict(&request("200000")).unwrap(), Verdict::WillRepay);
        assert_eq!(p.predict_proba(&request("20000")).unwrap(), 0.8);
    }

    #[test]
    fn verdict_follows_the_model_label_like_evaluation_does() {
        let p = Predictor::new(artifact(|width| FixedLabel { width }));
        let prediction = p.predict_detailed(&request("200000")).unwrap();
        assert_eq!(prediction.verdict, Verdict::WillNotRepay);
        assert_eq!(prediction.probability, 0.1);

        let row = p.encode(&request("200000")).unwrap();
        let scaled = p.artifact().scaler().transform_row(&row).unwrap();
        let features = DMatrix::from_row_slice(1, scaled.len(), &scaled);
        let eval = evaluate(p.artifact().model(), &features, &[1]);
        assert_eq!(eval.accuracy, 1.0);
    }

    #[test]
    fn encode_exposes_the_unscaled_vector() {
        let p = predictor();
        let row = p.encode(&request("20000")).unwrap();
        assert_eq!(row[0], 20_000.0);
        assert_eq!(row.len(), p.artifact().schema().len());
    }

    #[test]
    fn a_bad_request_fails_alone() {
        let p = predictor();
        let err = p.predict(&request("abc")).unwrap_err();
        assert!(matches!(err, PredictError::Validation { field: "credit_limit", .. }));
        assert!(p.predict(&request("20000")).is_ok());
    }

    #[test]
    fn predictor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();
    }
}
