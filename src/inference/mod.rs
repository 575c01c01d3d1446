//! Serving side: one form request in, one verdict out.

pub mod encoder;
pub mod predictor;

pub use encoder::InferenceEncoder;
pub use predictor::{Prediction, Predictor};
