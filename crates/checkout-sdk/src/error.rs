//! Error Types

use checkout_api::ApiError;
use checkout_core::CoreError;
use thiserror::Error;

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types
#[derive(Error, Debug)]
pub enum SdkError {
    /// Behavior tree or blackboard invariant violated during an update
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Payment API failure surfaced synchronously
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Operation not allowed in the current checkout state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The SDK was destroyed
    #[error("SDK destroyed")]
    Destroyed,
}

impl SdkError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            SdkError::Api(err) => err.user_message(),
            SdkError::InvalidState(_) => "Please complete the payment form first.",
            SdkError::Core(_) | SdkError::Destroyed => "Payment is unavailable. Please reload the page.",
        }
    }
}
