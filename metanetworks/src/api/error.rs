use thiserror::Error;

/// Substring the MetaNetworks API puts in the error body when an object is
/// locked by another in-flight change.
pub const BUSY_MARKER: &str = "is busy. Try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("resource not found: {path}")]
    NotFound { path: String },

    #[error("resource busy: {message}")]
    ResourceBusy { message: String },

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ApiError::ResourceBusy { .. })
    }

    /// Errors worth another attempt after backing off.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::RateLimited | ApiError::ServiceUnavailable
        )
    }

    /// Classify a non-success response body.
    pub(crate) fn from_response(status: u16, path: &str, body: String) -> Self {
        if body.contains(BUSY_MARKER) {
            return ApiError::ResourceBusy { message: body };
        }

        match status {
            401 => ApiError::AuthError,
            404 => ApiError::NotFound {
                path: path.to_string(),
            },
            429 => ApiError::RateLimited,
            _ => ApiError::ApiError {
                status,
                message: body,
            },
        }
    }
}
