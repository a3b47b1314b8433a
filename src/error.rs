//! Core Error Types
//!
//! Every public operation returns either a success payload or a tagged
//! `CoreError`. The transport layer turns the error into an
//! [`ErrorResponse`] without having to inspect its message.

use serde::Serialize;
use thiserror::Error;

/// Why there was not enough data to compute a result
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InsufficientData {
    /// Fewer retained observations than the analysis requires
    #[error("{have} observations retained, at least {need} required")]
    Observations { have: usize, need: usize },

    /// The activity metric is absent from the activity window
    #[error("no activity data available")]
    ActivityData,

    /// Fewer than two yield samples in the retained window
    #[error("no productivity data available")]
    ProductivityData,

    /// Fewer than two distinct calendar months observed
    #[error("{months} distinct month(s) observed, at least 2 required")]
    SeasonalData { months: usize },

    /// Nothing in the data cache for the requested range
    #[error("no data available for the requested range")]
    History,
}

/// Errors surfaced by the analysis core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Malformed or missing input; the caller's fault
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not enough history to compute a trend or forecast
    #[error("Insufficient data: {0}")]
    InsufficientData(#[from] InsufficientData),

    /// Unknown user, session, or analysis id
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A sub-analysis failed but the overall result was still produced
    #[error("Computation degraded in {section}: {reason}")]
    ComputationDegraded { section: String, reason: String },

    /// Unexpected arithmetic or logic fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::InsufficientData(_) => "INSUFFICIENT_DATA",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::ComputationDegraded { .. } => "COMPUTATION_DEGRADED",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller caused the failure (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoreError::Validation(_) | CoreError::NotFound { .. })
    }

    /// Build the tagged failure handed back to the transport layer
    pub fn to_response(&self) -> ErrorResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        let code = self.code();

        if self.is_client_error() {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        } else {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Core error occurred"
            );
        }

        ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::not_found("session", "alice");
        assert_eq!(err.to_string(), "session not found: alice");

        let err: CoreError = InsufficientData::Observations { have: 3, need: 5 }.into();
        assert_eq!(
            err.to_string(),
            "Insufficient data: 3 observations retained, at least 5 required"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(
            CoreError::from(InsufficientData::History).code(),
            "INSUFFICIENT_DATA"
        );
        assert_eq!(CoreError::Internal("x".into()).code(), "INTERNAL_ERROR");
        assert!(CoreError::validation("x").is_client_error());
        assert!(!CoreError::Internal("x".into()).is_client_error());
    }

    #[test]
    fn test_error_response_serializes() {
        let response = CoreError::not_found("analysis", "job-1").to_response();
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"code\":\"NOT_FOUND\""));
        assert!(json.contains("analysis not found: job-1"));
        assert!(!response.request_id.is_empty());
    }
}
