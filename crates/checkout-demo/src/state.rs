//! Application State

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal_macros::dec;

use checkout_core::{CardInfo, Channel, PaymentEntity, Session};

/// Everything the mock payment API knows
pub struct Store {
    pub session: Session,
    pub entities: HashMap<String, PaymentEntity>,
    pub cards: HashMap<String, CardInfo>,
}

impl Store {
    /// One active session offering an e-wallet and cards
    pub fn demo() -> Self {
        let session = Session::new(
            format!("ps-{}", uuid::Uuid::new_v4().simple()),
            dec!(150000),
            "IDR",
        )
        .with_channel(Channel::new("ID_DANA", "DANA"))
        .with_channel(
            Channel::new("CARDS", "Credit / Debit Card")
                .card()
                .with_required(&["card_number", "expiry_month", "expiry_year", "cvn"]),
        );

        let cards = [
            CardInfo {
                bin: "400000".into(),
                brand: "VISA".into(),
                issuer: Some("DEMO BANK".into()),
                country: Some("ID".into()),
            },
            CardInfo {
                bin: "520000".into(),
                brand: "MASTERCARD".into(),
                issuer: None,
                country: Some("SG".into()),
            },
        ]
        .into_iter()
        .map(|card| (card.bin.clone(), card))
        .collect();

        Self {
            session,
            entities: HashMap::new(),
            cards,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,

    /// Bearer token clients must present
    pub session_token: Arc<str>,

    /// Base of the (fake) 3DS pages handed out as actions
    pub action_base_url: Arc<str>,
}

impl AppState {
    pub fn new(store: Store, session_token: &str, action_base_url: &str) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            session_token: Arc::from(session_token),
            action_base_url: Arc::from(action_base_url.trim_end_matches('/')),
        }
    }

    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
