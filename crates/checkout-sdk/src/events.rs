//! Merchant-facing events
//!
//! Emitted by behaviors on enter/exit and fanned out over a broadcast
//! channel; see [`crate::Sdk::subscribe`].

use serde::{Deserialize, Serialize};

/// Why a submission ended, first matching cause wins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionEndReason {
    SessionExpiredOrCanceled,
    PaymentEntityFailed,
    PaymentEntityExpired,
    PaymentEntityCanceled,
    NetworkError,
    /// The create call was still in flight when the submission exited
    Aborted,
    ActionCanceled,
    SessionCompleted,
    /// Ended for a reason not covered above (e.g. the SDK was destroyed)
    Interrupted,
}

impl SubmissionEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionEndReason::SessionExpiredOrCanceled => "SESSION_EXPIRED_OR_CANCELED",
            SubmissionEndReason::PaymentEntityFailed => "PAYMENT_ENTITY_FAILED",
            SubmissionEndReason::PaymentEntityExpired => "PAYMENT_ENTITY_EXPIRED",
            SubmissionEndReason::PaymentEntityCanceled => "PAYMENT_ENTITY_CANCELED",
            SubmissionEndReason::NetworkError => "NETWORK_ERROR",
            SubmissionEndReason::Aborted => "ABORTED",
            SubmissionEndReason::ActionCanceled => "ACTION_CANCELED",
            SubmissionEndReason::SessionCompleted => "SESSION_COMPLETED",
            SubmissionEndReason::Interrupted => "INTERRUPTED",
        }
    }
}

impl std::fmt::Display for SubmissionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an action is presented to the customer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Iframe,
    Redirect,
}

/// Event delivered to the merchant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SdkEvent {
    /// Session loaded, form can be shown
    Ready { session_id: String },

    /// Unrecoverable error; the SDK must be re-created
    FatalError { message: String },

    /// Channel selection or form validity changed
    FormStatus {
        channel_code: Option<String>,
        valid: bool,
    },

    SubmissionBegin { channel_code: String },

    SubmissionEnd {
        reason: SubmissionEndReason,
        user_error_message: Option<String>,
        developer_error_message: Option<String>,
    },

    ActionBegin { kind: ActionKind, url: String },

    ActionEnd,

    SessionComplete { session_id: String },

    SessionExpiredOrCanceled { status: String },
}

impl SdkEvent {
    /// Event name as seen by merchant listeners
    pub fn name(&self) -> &'static str {
        match self {
            SdkEvent::Ready { .. } => "ready",
            SdkEvent::FatalError { .. } => "fatal-error",
            SdkEvent::FormStatus { .. } => "form-status",
            SdkEvent::SubmissionBegin { .. } => "submission-begin",
            SdkEvent::SubmissionEnd { .. } => "submission-end",
            SdkEvent::ActionBegin { .. } => "action-begin",
            SdkEvent::ActionEnd => "action-end",
            SdkEvent::SessionComplete { .. } => "session-complete",
            SdkEvent::SessionExpiredOrCanceled { .. } => "session-expired-or-canceled",
        }
    }
}

/// Message posted by an action page (iframe) back to the SDK
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMessage {
    Completed,
    Canceled,
}
