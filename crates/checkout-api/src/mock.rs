//! Mock Payment API
//!
//! For testing and demo purposes. Keeps a session and the payment entities it
//! created in memory; tests script transitions with the setter methods.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use checkout_core::{
    CardInfo, PaymentAction, PaymentEntity, PaymentEntityStatus, Session, SessionStatus,
};

use crate::client::{CreatePaymentRequest, PaymentApi, PollResponse};
use crate::error::{ApiError, Result};

/// How the next create-payment call answers
#[derive(Clone, Debug)]
pub enum CreateOutcome {
    /// Entity with this status and these actions
    Entity {
        status: PaymentEntityStatus,
        actions: Vec<PaymentAction>,
    },
    /// HTTP error
    Error { status: u16, error_code: String },
}

#[derive(Default)]
struct MockState {
    session: Option<Session>,
    create_script: VecDeque<CreateOutcome>,
    entities: HashMap<String, PaymentEntity>,
    cards: HashMap<String, CardInfo>,
    calls: Vec<&'static str>,
}

/// In-memory payment API
pub struct MockPaymentApi {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockPaymentApi {
    pub fn new(session: Session) -> Self {
        Self {
            state: Mutex::new(MockState {
                session: Some(session),
                ..MockState::default()
            }),
            latency: Duration::ZERO,
        }
    }

    /// API whose session fetch fails with 404
    pub fn without_session() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every call (for exercising cancellation)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_card(self, info: CardInfo) -> Self {
        self.lock().cards.insert(info.bin.clone(), info);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn call(&self, name: &'static str) {
        self.lock().calls.push(name);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Queue the answer of the next create-payment call
    pub fn push_create(&self, outcome: CreateOutcome) {
        self.lock().create_script.push_back(outcome);
    }

    pub fn set_session_status(&self, status: SessionStatus) {
        if let Some(session) = self.lock().session.as_mut() {
            session.status = status;
        }
    }

    /// Change a created entity's status; `actions` replaces its action list
    pub fn set_entity_status(&self, id: &str, status: PaymentEntityStatus, actions: Option<Vec<PaymentAction>>) {
        if let Some(entity) = self.lock().entities.get_mut(id) {
            entity.status = status;
            if let Some(actions) = actions {
                entity.actions = actions;
            }
            if status.is_terminal_failure() {
                entity.failure_code = Some(format!("{}_BY_MOCK", status.as_str()));
            }
        }
    }

    /// Most recently created entity
    pub fn last_entity(&self) -> Option<PaymentEntity> {
        self.lock().entities.values().max_by_key(|e| e.created_at).cloned()
    }

    /// Number of calls to `name` (`fetch_session`, `create_payment`, ...)
    pub fn call_count(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == name).count()
    }
}

#[async_trait(?Send)]
impl PaymentApi for MockPaymentApi {
    async fn fetch_session(&self) -> Result<Session> {
        self.call("fetch_session").await;
        self.lock()
            .session
            .clone()
            .ok_or_else(|| ApiError::NotFound("session".into()))
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentEntity> {
        self.call("create_payment").await;
        let mut state = self.lock();

        let (status, actions) = match state.create_script.pop_front() {
            Some(CreateOutcome::Error { status, error_code }) => {
                return Err(ApiError::Http {
                    status,
                    error_code,
                    message: "scripted failure".into(),
                });
            }
            Some(CreateOutcome::Entity { status, actions }) => (status, actions),
            None => (PaymentEntityStatus::Pending, Vec::new()),
        };

        let mut entity = PaymentEntity::new(
            format!("pr-{}", uuid::Uuid::new_v4().simple()),
            request.channel_code.clone(),
            status,
        );
        entity.actions = actions;
        entity.created_at = Some(Utc::now());

        state.entities.insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    async fn poll(&self, session_id: &str, payment_entity_id: Option<&str>) -> Result<PollResponse> {
        self.call("poll").await;
        let state = self.lock();

        let session = state
            .session
            .clone()
            .filter(|s| s.id == session_id)
            .ok_or_else(|| ApiError::NotFound(session_id.to_string()))?;
        let payment_entity = payment_entity_id.and_then(|id| state.entities.get(id).cloned());

        Ok(PollResponse { session, payment_entity })
    }

    async fn simulate_payment(&self, payment_entity_id: &str) -> Result<()> {
        self.call("simulate_payment").await;
        let mut state = self.lock();

        let entity = state
            .entities
            .get_mut(payment_entity_id)
            .ok_or_else(|| ApiError::NotFound(payment_entity_id.to_string()))?;
        entity.status = PaymentEntityStatus::Succeeded;
        entity.actions.clear();

        if let Some(session) = state.session.as_mut() {
            session.status = SessionStatus::Completed;
        }
        Ok(())
    }

    async fn lookup_card(&self, bin: &str) -> Result<CardInfo> {
        self.call("lookup_card").await;
        self.lock()
            .cards
            .get(bin)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("card bin {bin}")))
    }

    fn name(&self) -> &str {
        "MockPaymentApi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            session_id: "ps-1".into(),
            channel_code: "ID_DANA".into(),
            channel_properties: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_poll() {
        let api = MockPaymentApi::new(Session::new("ps-1", dec!(25000), "IDR"));

        let entity = api.create_payment(&request()).await.unwrap();
        assert_eq!(entity.status, PaymentEntityStatus::Pending);

        api.set_entity_status(&entity.id, PaymentEntityStatus::Failed, None);
        let polled = api.poll("ps-1", Some(&entity.id)).await.unwrap();

        let polled_entity = polled.payment_entity.unwrap();
        assert_eq!(polled_entity.status, PaymentEntityStatus::Failed);
        assert_eq!(polled_entity.failure_code.as_deref(), Some("FAILED_BY_MOCK"));
        assert_eq!(api.call_count("poll"), 1);
    }

    #[tokio::test]
    async fn test_scripted_create_failure() {
        let api = MockPaymentApi::new(Session::new("ps-1", dec!(25000), "IDR"));
        api.push_create(CreateOutcome::Error { status: 503, error_code: "SERVER_ERROR".into() });

        let err = api.create_payment(&request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(api.last_entity().is_none());
    }

    #[tokio::test]
    async fn test_simulate_completes_session() {
        let api = MockPaymentApi::new(Session::new("ps-1", dec!(25000), "IDR"));
        let entity = api.create_payment(&request()).await.unwrap();

        api.simulate_payment(&entity.id).await.unwrap();
        let polled = api.poll("ps-1", Some(&entity.id)).await.unwrap();

        assert_eq!(polled.session.status, SessionStatus::Completed);
        assert_eq!(polled.payment_entity.unwrap().status, PaymentEntityStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let api = MockPaymentApi::without_session();
        assert!(matches!(api.fetch_session().await, Err(ApiError::NotFound(_))));
    }
}
