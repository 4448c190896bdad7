//! World State (blackboard)
//!
//! Immutable snapshot of everything the tree builder reads. The SDK driver
//! owns it and replaces it wholesale on each change; behaviors only ever see
//! `&WorldState` and request changes through the driver.

use serde::{Deserialize, Serialize};

use crate::payment::{CardInfo, PaymentEntity};
use crate::session::Session;

/// Top-level SDK status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SdkStatus {
    #[default]
    Loading,
    Active,
    FatalError,
}

/// UI / flow flags
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldFlags {
    /// Customer pressed "pay"; cleared once the payment entity exists
    pub submission_requested: bool,

    /// Customer finished the current action (iframe reported completion)
    pub action_completed: bool,

    /// Customer dismissed the current action
    pub action_canceled: bool,

    /// Test mode: simulate the payment of the pending entity
    pub simulate_payment_requested: bool,

    /// Bumped by poll-immediately requests; restarts the poll worker
    pub poll_generation: u32,
}

/// Blackboard snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub sdk_status: SdkStatus,

    /// Message shown while in [`SdkStatus::FatalError`]
    pub fatal_error: Option<String>,

    pub session: Option<Session>,

    /// Selected channel code
    pub channel_code: Option<String>,

    /// Form input for the selected channel
    pub channel_properties: serde_json::Map<String, serde_json::Value>,

    /// Result of the last card BIN lookup
    pub card_info: Option<CardInfo>,

    pub payment_entity: Option<PaymentEntity>,

    pub flags: WorldFlags,
}

impl WorldState {
    /// Fresh state while the session is being fetched
    pub fn loading() -> Self {
        Self::default()
    }

    /// Active SDK with a loaded session
    pub fn active(session: Session) -> Self {
        Self {
            sdk_status: SdkStatus::Active,
            session: Some(session),
            ..Self::default()
        }
    }

    /// Drop the payment entity and the per-submission flags
    pub fn end_submission(&mut self) {
        self.payment_entity = None;
        self.flags.submission_requested = false;
        self.flags.action_completed = false;
        self.flags.simulate_payment_requested = false;
    }

    /// Card number digits typed so far, if the form has one
    pub fn card_number_digits(&self) -> Option<String> {
        self.channel_properties
            .get("card_number")
            .and_then(|v| v.as_str())
            .map(|s| s.chars().filter(char::is_ascii_digit).collect())
    }
}
