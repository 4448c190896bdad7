//! Payment API Abstraction
//!
//! The network surface the SDK's behaviors call. Implementations return plain
//! futures; cancellation is the caller's business (behaviors wrap calls in
//! abortable tasks and drop the future on exit).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use checkout_core::{CardInfo, PaymentEntity, Session};

use crate::error::Result;

/// Body of a create-payment call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub session_id: String,

    pub channel_code: String,

    /// Form input for the channel
    #[serde(default)]
    pub channel_properties: serde_json::Map<String, serde_json::Value>,
}

/// Result of one poll: the session and, when asked for, the payment entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub session: Session,

    #[serde(default)]
    pub payment_entity: Option<PaymentEntity>,
}

/// Payment API client trait (Strategy pattern)
///
/// The SDK runs on a single-threaded executor, so futures need not be `Send`.
#[async_trait(?Send)]
pub trait PaymentApi {
    /// Fetch the session the token was issued for
    async fn fetch_session(&self) -> Result<Session>;

    /// Create a payment request (or token) for the selected channel
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentEntity>;

    /// Poll the session and, optionally, one payment entity
    async fn poll(&self, session_id: &str, payment_entity_id: Option<&str>) -> Result<PollResponse>;

    /// Test mode: settle a pending payment entity
    async fn simulate_payment(&self, payment_entity_id: &str) -> Result<()>;

    /// Card BIN lookup
    async fn lookup_card(&self, bin: &str) -> Result<CardInfo>;

    /// Client name (for logs)
    fn name(&self) -> &str;
}
