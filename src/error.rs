use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::{ErrorResponse, RequestStatus};
use crate::services::{RepositoryError, ScorerError};

/// Coarse error classification surfaced to callers of the four operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    UpstreamUnavailable,
    ValidationFailed,
    PersistenceFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::PersistenceFailed => "persistence_failed",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::PersistenceFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors returned by the calibration, feedback, matching and request operations
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A request between these users already exists (status: {existing})")]
    DuplicateRequest { existing: RequestStatus },

    #[error("Request is no longer pending (status: {current})")]
    RequestClosed { current: RequestStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Scorer unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::NotFound(_) => ErrorKind::NotFound,
            MatchError::DuplicateRequest { .. }
            | MatchError::RequestClosed { .. }
            | MatchError::Conflict(_) => ErrorKind::Conflict,
            MatchError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            MatchError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            MatchError::PersistenceFailed(_) => ErrorKind::PersistenceFailed,
        }
    }
}

impl From<RepositoryError> for MatchError {
    fn from(err: RepositoryError) -> Self {
        MatchError::PersistenceFailed(err.to_string())
    }
}

impl From<ScorerError> for MatchError {
    fn from(err: ScorerError) -> Self {
        MatchError::UpstreamUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for MatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MatchError::ValidationFailed(errors.to_string())
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        HttpResponse::build(kind.status_code()).json(ErrorResponse {
            error: kind.as_str().to_string(),
            message: self.to_string(),
            status_code: kind.status_code().as_u16(),
        })
    }
}
