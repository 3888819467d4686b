//! Error taxonomy of the library boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a library call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("allocation failed: {0}")]
    AllocationFailure(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("unsupported encoding tag {0}")]
    UnsupportedEncoding(i32),
    #[error("malformed material in {}: {reason}", path.display())]
    MalformedMaterial { path: PathBuf, reason: String },
    #[error("precondition unmet: {0}")]
    PreconditionUnmet(&'static str),
}

impl ApiError {
    /// Classify the error for reports and logs.
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::AllocationFailure(_) => ApiErrorKind::AllocationFailure,
            Self::InvalidArgument(_) => ApiErrorKind::InvalidArgument,
            Self::NotFound { .. } => ApiErrorKind::NotFound,
            Self::UnsupportedEncoding(_) => ApiErrorKind::UnsupportedEncoding,
            Self::MalformedMaterial { .. } => ApiErrorKind::MalformedMaterial,
            Self::PreconditionUnmet(_) => ApiErrorKind::PreconditionUnmet,
        }
    }
}

/// Serializable classification of [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    AllocationFailure,
    InvalidArgument,
    NotFound,
    UnsupportedEncoding,
    MalformedMaterial,
    PreconditionUnmet,
}

impl ApiErrorKind {
    /// Stable label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllocationFailure => "allocation_failure",
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::UnsupportedEncoding => "unsupported_encoding",
            Self::MalformedMaterial => "malformed_material",
            Self::PreconditionUnmet => "precondition_unmet",
        }
    }
}

/// Result alias for library calls.
pub type ApiResult<T> = Result<T, ApiError>;
