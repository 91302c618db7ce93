//! Error types for the Bizdesk client

use bizdesk_core::dto::books::NormalizeError;
use bizdesk_core::validation::ValidationError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Bizdesk client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No usable access token; signing in again may help
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The token refresh failed; local session state has been cleared
    #[error("Session is no longer valid: {0}")]
    SessionInvalid(String),

    /// Request payload failed local validation and was not sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Response payload could not be mapped to a domain type
    #[error("Malformed API record: {0}")]
    Normalize(#[from] NormalizeError),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Check if the user has to sign in again
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::SessionInvalid(_))
            || matches!(self, Self::ApiError { status: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ClientError::api_error(404, "gone").is_not_found());
        assert!(ClientError::api_error(400, "bad").is_client_error());
        assert!(!ClientError::api_error(400, "bad").is_server_error());
        assert!(ClientError::api_error(503, "down").is_server_error());
    }

    #[test]
    fn test_auth_failures() {
        assert!(ClientError::SessionInvalid("expired".into()).is_auth_failure());
        assert!(ClientError::Unauthorized("no token".into()).is_auth_failure());
        assert!(ClientError::api_error(401, "").is_auth_failure());
        assert!(!ClientError::api_error(403, "").is_auth_failure());
    }
}
