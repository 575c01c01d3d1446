//! Error types.
//!
//! - `AppError`: run-level failure carrying a process exit code
//!   (2 = input/usage, 3 = no usable data / training failure, 4 = internal fault).
//! - `PipelineError`: failures raised by the preprocessing and training stages.
//! - `PredictError`: per-request failures at the prediction boundary.

use std::fmt;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Training produced no usable data or no usable model. No artifact is published.
    pub fn training_failure(message: impl Into<String>) -> Self {
        Self::new(3, format!("Training failed: {}", message.into()))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure inside a pipeline stage (encode, split, balance, scale, fit).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A stage received zero rows where it needs at least one.
    EmptyData(String),
    /// Only one outcome class is present; balancing and fitting are undefined.
    SingleClass { class: u8 },
    /// A feature matrix/vector width differs from the fitted width.
    WidthMismatch { expected: usize, got: usize },
    /// A categorical level was neither the reference level nor an encoded level.
    UnknownLevel { column: String },
    /// The encoder produced the same column name twice.
    DuplicateColumn(String),
    /// Invalid stage configuration.
    InvalidParameter(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::EmptyData(msg) => write!(f, "Empty data: {msg}"),
            PipelineError::SingleClass { class } => {
                write!(f, "Only class {class} is present; both outcome classes are required")
            }
            PipelineError::WidthMismatch { expected, got } => {
                write!(f, "Feature width mismatch: expected {expected} columns, got {got}")
            }
            PipelineError::UnknownLevel { column } => {
                write!(f, "Categorical level `{column}` is not part of the frozen schema")
            }
            PipelineError::DuplicateColumn(name) => write!(f, "Duplicate schema column `{name}`"),
            PipelineError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyData(_) | PipelineError::SingleClass { .. } => {
                AppError::training_failure(err.to_string())
            }
            PipelineError::InvalidParameter(_) => AppError::new(2, err.to_string()),
            PipelineError::WidthMismatch { .. }
            | PipelineError::UnknownLevel { .. }
            | PipelineError::DuplicateColumn(_) => AppError::new(4, err.to_string()),
        }
    }
}

/// Failure of a single prediction request.
///
/// `Validation` and `Selection` are user-correctable; `SchemaMismatch` means the
/// inference encoding drifted from the training encoding and is never the user's fault.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    /// A numeric field could not be parsed or is out of range.
    Validation { field: &'static str, message: String },
    /// A required choice was not made or names no known option.
    Selection { field: &'static str, message: String },
    /// The assembled feature map does not match the frozen schema.
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
        detail: String,
    },
}

impl PredictError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        PredictError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn selection(field: &'static str, message: impl Into<String>) -> Self {
        PredictError::Selection {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation { .. } => "validation",
            PredictError::Selection { .. } => "selection",
            PredictError::SchemaMismatch { .. } => "schema_mismatch",
        }
    }

    /// The offending form field, if the error is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PredictError::Validation { field, .. } | PredictError::Selection { field, .. } => Some(field),
            PredictError::SchemaMismatch { .. } => None,
        }
    }

    pub fn is_user_error(&self) -> bool {
        !matches!(self, PredictError::SchemaMismatch { .. })
    }
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictError::Validation { field, message } => write!(f, "Invalid {field}: {message}"),
            PredictError::Selection { field, message } => write!(f, "Invalid {field} selection: {message}"),
            PredictError::SchemaMismatch {
                missing,
                unexpected,
                detail,
            } => {
                write!(f, "Schema mismatch ({detail})")?;
                if !missing.is_empty() {
                    write!(f, "; missing columns: {}", missing.join(", "))?;
                }
                if !unexpected.is_empty() {
                    write!(f, "; unexpected columns: {}", unexpected.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PredictError {}
