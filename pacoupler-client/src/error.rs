//! Error types for the coupler HTTP clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to PA, the tag database or the index
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection, timeout, TLS...)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body returned by the API
        message: String,
    },

    /// The PA token exchange was rejected
    #[error("authentication failed (status {status}): {message}")]
    AuthenticationFailed { status: u16, message: String },

    /// A PA query was attempted before `authenticate`
    #[error("not authenticated with the PA API")]
    NotAuthenticated,

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
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
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if the request never got a response (connection refused, timeout)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if e.is_connect() || e.is_timeout())
    }
}
