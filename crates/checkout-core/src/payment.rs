//! Payment Entities
//!
//! The payment request (or payment token) created on submission, and the
//! actions the customer must complete before it settles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a payment request / token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEntityStatus {
    Pending,
    RequiresAction,
    Failed,
    Expired,
    Canceled,
    AcceptingPayments,
    Authorized,
    Active,
    Succeeded,
}

impl PaymentEntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEntityStatus::Pending => "PENDING",
            PaymentEntityStatus::RequiresAction => "REQUIRES_ACTION",
            PaymentEntityStatus::Failed => "FAILED",
            PaymentEntityStatus::Expired => "EXPIRED",
            PaymentEntityStatus::Canceled => "CANCELED",
            PaymentEntityStatus::AcceptingPayments => "ACCEPTING_PAYMENTS",
            PaymentEntityStatus::Authorized => "AUTHORIZED",
            PaymentEntityStatus::Active => "ACTIVE",
            PaymentEntityStatus::Succeeded => "SUCCEEDED",
        }
    }

    /// Failed, expired or canceled
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            PaymentEntityStatus::Failed | PaymentEntityStatus::Expired | PaymentEntityStatus::Canceled
        )
    }
}

impl std::fmt::Display for PaymentEntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the entity is a one-off payment request or a reusable token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEntityKind {
    PaymentRequest,
    PaymentToken,
}

/// What the customer is asked to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    RedirectCustomer,
    PresentToCustomer,
    ApiPostRequest,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RedirectCustomer => "REDIRECT_CUSTOMER",
            ActionType::PresentToCustomer => "PRESENT_TO_CUSTOMER",
            ActionType::ApiPostRequest => "API_POST_REQUEST",
        }
    }
}

/// How the action's value is to be interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDescriptor {
    WebUrl,
    DeeplinkUrl,
    QrString,
    PaymentCode,
    Captcha,
}

impl ActionDescriptor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionDescriptor::WebUrl => "WEB_URL",
            ActionDescriptor::DeeplinkUrl => "DEEPLINK_URL",
            ActionDescriptor::QrString => "QR_STRING",
            ActionDescriptor::PaymentCode => "PAYMENT_CODE",
            ActionDescriptor::Captcha => "CAPTCHA",
        }
    }
}

/// A pending customer action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,

    pub descriptor: ActionDescriptor,

    /// URL or payload, depending on the descriptor
    pub value: String,

    /// The target page may run inside a sandboxed iframe
    #[serde(default)]
    pub iframe_capable: bool,
}

impl PaymentAction {
    /// Redirect to a web page
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::RedirectCustomer,
            descriptor: ActionDescriptor::WebUrl,
            value: url.into(),
            iframe_capable: false,
        }
    }

    pub fn iframe_capable(mut self) -> Self {
        self.iframe_capable = true;
        self
    }
}

/// Payment request or token created by a submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntity {
    pub id: String,

    pub kind: PaymentEntityKind,

    pub status: PaymentEntityStatus,

    pub channel_code: String,

    /// Pending customer actions, in server order
    #[serde(default)]
    pub actions: Vec<PaymentAction>,

    /// Machine-readable failure reason, set once the entity failed
    #[serde(default)]
    pub failure_code: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PaymentEntity {
    pub fn new(id: impl Into<String>, channel_code: impl Into<String>, status: PaymentEntityStatus) -> Self {
        Self {
            id: id.into(),
            kind: PaymentEntityKind::PaymentRequest,
            status,
            channel_code: channel_code.into(),
            actions: Vec::new(),
            failure_code: None,
            created_at: None,
        }
    }

    pub fn with_action(mut self, action: PaymentAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Result of a card BIN lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    pub bin: String,

    /// Card network (VISA, MASTERCARD, ...)
    pub brand: String,

    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default)]
    pub country: Option<String>,
}
