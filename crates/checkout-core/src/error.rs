//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
///
/// Every variant except [`CoreError::Behavior`] is a programming error: an
/// invariant of the tree or the blackboard was violated. They are meant to
/// surface during development, not to be handled in production flows.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The update engine went deeper than its configured ceiling
    #[error("Max recursion depth exceeded ({0}); is a node its own ancestor?")]
    MaxRecursionDepth(usize),

    /// A driver kept rebuilding because the world never stopped changing
    #[error("World still changing after {0} update passes; does a hook change it on every cycle?")]
    UpdatePassesExceeded(usize),

    /// A state that the product configuration never produces was reached
    #[error("Unreachable state: {0}")]
    Unreachable(String),

    /// Payment action type/descriptor pair with no handler
    #[error("Unsupported action: {action_type} / {descriptor}")]
    UnsupportedAction {
        action_type: String,
        descriptor: String,
    },

    /// A blackboard field the current state requires is absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A behavior was constructed with subjects of the wrong shape
    #[error("Invalid subject at index {index}: expected {expected}")]
    InvalidSubject { index: usize, expected: &'static str },

    /// Error raised by a behavior's own lifecycle hook
    #[error("Behavior error: {0}")]
    Behavior(String),
}

impl CoreError {
    /// Whether this error signals a bug rather than a runtime condition
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(self, CoreError::Behavior(_))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Behavior(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursion_message() {
        let err = CoreError::MaxRecursionDepth(100);
        assert!(err.to_string().starts_with("Max recursion depth exceeded"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_update_passes_message_is_distinct() {
        let err = CoreError::UpdatePassesExceeded(32);
        assert!(err.to_string().contains("32 update passes"));
        assert!(!err.to_string().contains("ancestor"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: CoreError = anyhow::anyhow!("container gone").into();
        assert!(matches!(err, CoreError::Behavior(ref msg) if msg == "container gone"));
        assert!(!err.is_invariant_violation());
    }
}
