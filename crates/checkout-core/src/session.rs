//! Checkout Session
//!
//! The merchant-created session the SDK is embedded for: amount, currency and
//! the payment channels the customer may pick from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Session lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Expired,
    Canceled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Expired => "EXPIRED",
            SessionStatus::Canceled => "CANCELED",
        }
    }

    /// Expired or canceled: the session ended without a payment
    pub fn is_abnormal(&self) -> bool {
        matches!(self, SessionStatus::Expired | SessionStatus::Canceled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment channel offered by the session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identifier (e.g. `CARDS`, `ID_DANA`)
    pub channel_code: String,

    /// Display name
    pub brand_name: String,

    /// Channel property keys the form must fill before submission
    #[serde(default)]
    pub required_properties: Vec<String>,

    /// Card channel: triggers BIN lookup on the card number
    #[serde(default)]
    pub is_card: bool,
}

impl Channel {
    pub fn new(channel_code: impl Into<String>, brand_name: impl Into<String>) -> Self {
        Self {
            channel_code: channel_code.into(),
            brand_name: brand_name.into(),
            required_properties: Vec::new(),
            is_card: false,
        }
    }

    pub fn with_required(mut self, keys: &[&str]) -> Self {
        self.required_properties = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    pub fn card(mut self) -> Self {
        self.is_card = true;
        self
    }

    /// Whether `properties` holds a non-empty value for every required key
    pub fn accepts(&self, properties: &serde_json::Map<String, serde_json::Value>) -> bool {
        self.required_properties.iter().all(|key| match properties.get(key) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        })
    }
}

/// A checkout session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: String,

    pub status: SessionStatus,

    /// Amount to collect
    pub amount: Decimal,

    /// ISO 4217 currency
    pub currency: String,

    /// ISO 3166 country
    pub country: String,

    /// Channels the customer may pick from
    #[serde(default)]
    pub channels: Vec<Channel>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(id: impl Into<String>, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Active,
            amount,
            currency: currency.into(),
            country: "ID".into(),
            channels: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Look up an offered channel by code
    pub fn channel(&self, channel_code: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.channel_code == channel_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_channel_accepts_required_properties() {
        let channel = Channel::new("CARDS", "Card").with_required(&["card_number", "cvn"]);

        let filled = json!({"card_number": "4000000000001091", "cvn": "123"});
        let blank = json!({"card_number": "4000000000001091", "cvn": "  "});
        let missing = json!({"card_number": "4000000000001091"});

        assert!(channel.accepts(filled.as_object().unwrap()));
        assert!(!channel.accepts(blank.as_object().unwrap()));
        assert!(!channel.accepts(missing.as_object().unwrap()));
    }

    #[test]
    fn test_session_wire_format() {
        let session = Session::new("ps-1", dec!(150000), "IDR")
            .with_channel(Channel::new("ID_DANA", "DANA"));
        let value = serde_json::to_value(&session).unwrap();

        assert_eq!(value["status"], "ACTIVE");
        assert_eq!(value["amount"], "150000");
        assert!(session.channel("ID_DANA").is_some());
        assert!(session.channel("ID_OVO").is_none());
    }
}
