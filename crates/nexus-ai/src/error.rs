//! Error types for nexus-ai

use thiserror::Error;

/// Result type alias using nexus-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a reasoning capability (the "provider error")
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Any other model failure (used by embedded and scripted models)
    #[error("Model error: {0}")]
    Model(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_api() {
        let e = Error::api("invalid_request_error", "bad tool schema");
        assert_eq!(
            e.to_string(),
            "API error: bad tool schema (type: invalid_request_error)"
        );
    }
}
