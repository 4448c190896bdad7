//! API Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Payment API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (DNS, connection reset, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {error_code}: {message}")]
    Http {
        status: u16,
        error_code: String,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request was cancelled by its owner
    #[error("Request aborted")]
    Aborted,

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Cancellation is a normal outcome, never reported as a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Aborted)
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Network(_) => "We couldn't reach the payment service. Check your connection and try again.",
            ApiError::Http { status, .. } if *status >= 500 => "The payment service is temporarily unavailable. Please try again.",
            ApiError::Http { .. } => "The payment could not be processed. Please check your details.",
            ApiError::NotFound(_) => "This payment session no longer exists.",
            _ => "An error occurred processing your payment.",
        }
    }
}
