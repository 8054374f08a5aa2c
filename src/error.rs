//! Error types for planning runs.

use serde::Serialize;
use thiserror::Error;

/// Stable error codes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidDate,
    DepotNotConfigured,
    MatrixSizeOutOfRange,
    MatrixTransportFailure,
    MatrixTimeout,
    MatrixMalformedResponse,
    MatrixProviderErrorCode,
    MatrixInvalidJobIndex,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidDate => "INVALID_DATE",
            ErrorKind::DepotNotConfigured => "DEPOT_NOT_CONFIGURED",
            ErrorKind::MatrixSizeOutOfRange => "MATRIX_SIZE_OUT_OF_RANGE",
            ErrorKind::MatrixTransportFailure => "MATRIX_TRANSPORT_FAILURE",
            ErrorKind::MatrixTimeout => "MATRIX_TIMEOUT",
            ErrorKind::MatrixMalformedResponse => "MATRIX_MALFORMED_RESPONSE",
            ErrorKind::MatrixProviderErrorCode => "MATRIX_PROVIDER_ERROR_CODE",
            ErrorKind::MatrixInvalidJobIndex => "MATRIX_INVALID_JOB_INDEX",
            ErrorKind::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("matrix needs between {min} and {max} coordinates (depot included), got {count}; batch larger requests")]
    SizeOutOfRange { count: usize, min: usize, max: usize },

    #[error("routing service request failed: {0}")]
    Transport(String),

    #[error("routing service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("routing service did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("routing service response is malformed: {0}")]
    MalformedResponse(String),

    #[error("routing service answered with code {code}: {message}")]
    ProviderErrorCode { code: String, message: String },

    #[error("job {job_id} has matrix index {found}, expected {expected}; indices must run 1..=n without gaps")]
    InvalidJobIndex { job_id: String, found: usize, expected: usize },
}

impl MatrixError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatrixError::SizeOutOfRange { .. } => ErrorKind::MatrixSizeOutOfRange,
            MatrixError::Transport(_) | MatrixError::HttpStatus { .. } => {
                ErrorKind::MatrixTransportFailure
            }
            MatrixError::Timeout { .. } => ErrorKind::MatrixTimeout,
            MatrixError::MalformedResponse(_) => ErrorKind::MatrixMalformedResponse,
            MatrixError::ProviderErrorCode { .. } => ErrorKind::MatrixProviderErrorCode,
            MatrixError::InvalidJobIndex { .. } => ErrorKind::MatrixInvalidJobIndex,
        }
    }
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("invalid planning date {input:?}, expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("depot location is not configured")]
    DepotNotConfigured,

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::InvalidDate { .. } => ErrorKind::InvalidDate,
            PlanError::DepotNotConfigured => ErrorKind::DepotNotConfigured,
            PlanError::Matrix(err) => err.kind(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: String, value: String },

    #[error("http client could not be built: {0}")]
    Client(#[from] reqwest::Error),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidConfig
    }
}
