//! JSON-lines request loop.
//!
//! One request object per input line, one response object per output line. A
//! bad request produces an error response and the loop moves on; only I/O
//! failure ends it early.

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{InferenceRequest, Verdict};
use crate::error::{AppError, PredictError};
use crate::inference::Predictor;
use crate::models::Classifier;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        verdict: Verdict,
        message: &'static str,
        probability: f64,
    },
    Error {
        kind: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<&'static str>,
        message: String,
    },
}

impl Response {
    fn from_error(err: &PredictError) -> Self {
        Response::Error {
            kind: err.kind(),
            field: err.field(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: usize,
    pub predictions: usize,
    /// Validation, selection and malformed-JSON rejections.
    pub user_errors: usize,
    /// Schema mismatches.
    pub faults: usize,
}

/// Answer one request line.
pub fn respond<M: Classifier>(predictor: &Predictor<M>, line: &str) -> Response {
    let request: InferenceRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return Response::Error {
                kind: "malformed",
                field: None,
                message: format!("Request is not a valid JSON object: {e}"),
            };
        }
    };

    match predictor.predict_detailed(&request) {
        Ok(p) => Response::Ok {
            verdict: p.verdict,
            message: p.verdict.message(),
            probability: p.probability,
        },
        Err(err) => {
            debug!(kind = err.kind(), field = ?err.field(), "request rejected");
            Response::from_error(&err)
        }
    }
}

pub fn serve_lines<M, R, W>(predictor: &Predictor<M>, input: R, mut output: W) -> Result<ServeStats, AppError>
where
    M: Classifier,
    R: BufRead,
    W: Write,
{
    let io_err = |e: std::io::Error| AppError::new(2, format!("Request stream I/O error: {e}"));
    let mut stats = ServeStats::default();

    for line in input.lines() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        stats.requests += 1;

        let response = respond(predictor, &line);
        match &response {
            Response::Ok { .. } => stats.predictions += 1,
            Response::Error { kind: "schema_mismatch", .. } => stats.faults += 1,
            Response::Error { .. } => stats.user_errors += 1,
        }

        serde_json::to_writer(&mut output, &response)
            .map_err(|e| AppError::new(4, format!("Failed to encode response: {e}")))?;
        output.write_all(b"\n").map_err(io_err)?;
        output.flush().map_err(io_err)?;
    }

    info!(
        requests = stats.requests,
        predictions = stats.predictions,
        user_errors = stats.user_errors,
        faults = stats.faults,
        "request stream closed"
    );
    Ok(stats)
}
