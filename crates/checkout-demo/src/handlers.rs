//! Mock Payment API Handlers
//!
//! Implements the REST surface `HttpPaymentApi` talks to, backed by the
//! in-memory [`Store`](crate::state::Store). Card payments require a 3DS
//! action; every other channel starts out pending.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use checkout_api::{CreatePaymentRequest, PollResponse};
use checkout_core::{
    CardInfo, PaymentAction, PaymentEntity, PaymentEntityStatus, Session, SessionStatus,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: &'static str,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub payment_request_id: Option<String>,
}

/// Errors answered by the mock API
#[derive(Debug, Error)]
pub enum MockApiError {
    #[error("Missing or invalid session token")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Session is {0}")]
    SessionInactive(SessionStatus),
}

impl IntoResponse for MockApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            MockApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "INVALID_SESSION_TOKEN"),
            MockApiError::NotFound(_) => (StatusCode::NOT_FOUND, "DATA_NOT_FOUND"),
            MockApiError::Validation(_) => (StatusCode::BAD_REQUEST, "API_VALIDATION_ERROR"),
            MockApiError::SessionInactive(_) => (StatusCode::CONFLICT, "SESSION_NOT_ACTIVE"),
        };
        let body = ErrorResponse {
            error_code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, MockApiError>;

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let expected = format!("Bearer {}", state.session_token);
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(MockApiError::Unauthorized)
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions/current", get(current_session))
        .route("/api/sessions/{id}/poll", get(poll_session))
        .route("/api/payment_requests", post(create_payment_request))
        .route("/api/payment_requests/{id}/simulate", post(simulate_payment))
        .route("/api/cards/{bin}", get(lookup_card))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Session>> {
    authorize(&state, &headers)?;
    Ok(Json(state.store().session.clone()))
}

pub async fn create_payment_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentEntity>)> {
    authorize(&state, &headers)?;
    let mut store = state.store();

    if store.session.id != payload.session_id {
        return Err(MockApiError::NotFound(format!("session {}", payload.session_id)));
    }
    if store.session.status != SessionStatus::Active {
        return Err(MockApiError::SessionInactive(store.session.status));
    }
    let channel = store
        .session
        .channel(&payload.channel_code)
        .ok_or_else(|| MockApiError::Validation(format!("channel {} is not offered", payload.channel_code)))?;
    if !channel.accepts(&payload.channel_properties) {
        return Err(MockApiError::Validation(format!(
            "missing channel properties for {}",
            payload.channel_code
        )));
    }

    let id = format!("pr-{}", uuid::Uuid::new_v4().simple());
    let mut entity = if channel.is_card {
        PaymentEntity::new(&id, &payload.channel_code, PaymentEntityStatus::RequiresAction).with_action(
            PaymentAction::redirect(format!("{}/3ds/{id}", state.action_base_url)).iframe_capable(),
        )
    } else {
        PaymentEntity::new(&id, &payload.channel_code, PaymentEntityStatus::Pending)
    };
    entity.created_at = Some(Utc::now());

    tracing::info!(payment_request_id = %id, channel = %payload.channel_code, status = %entity.status, "Payment request created");
    store.entities.insert(id, entity.clone());
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn poll_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<PollQuery>,
) -> ApiResult<Json<PollResponse>> {
    authorize(&state, &headers)?;
    let store = state.store();

    if store.session.id != id {
        return Err(MockApiError::NotFound(format!("session {id}")));
    }
    let payment_entity = query
        .payment_request_id
        .and_then(|pr| store.entities.get(&pr).cloned());

    Ok(Json(PollResponse {
        session: store.session.clone(),
        payment_entity,
    }))
}

/// Settle a payment request as if the customer paid
pub async fn simulate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers)?;
    let mut store = state.store();

    let entity = store
        .entities
        .get_mut(&id)
        .ok_or_else(|| MockApiError::NotFound(format!("payment request {id}")))?;
    entity.status = PaymentEntityStatus::Succeeded;
    entity.actions.clear();
    store.session.status = SessionStatus::Completed;

    tracing::info!(payment_request_id = %id, "Payment simulated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn lookup_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(bin): Path<String>,
) -> ApiResult<Json<CardInfo>> {
    authorize(&state, &headers)?;
    state
        .store()
        .cards
        .get(&bin)
        .cloned()
        .map(Json)
        .ok_or_else(|| MockApiError::NotFound(format!("card bin {bin}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::state::Store;

    const TOKEN: &str = "test-token";

    fn app() -> (AppState, Router) {
        let state = AppState::new(Store::demo(), TOKEN, "https://acs.test");
        (state.clone(), router(state))
    }

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json");
        match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_token() {
        let (_, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/current")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "INVALID_SESSION_TOKEN");
    }

    #[tokio::test]
    async fn test_card_payment_requires_action() {
        let (state, app) = app();
        let session_id = state.store().session.id.clone();

        let body = serde_json::json!({
            "session_id": session_id,
            "channel_code": "CARDS",
            "channel_properties": {
                "card_number": "4000000000001091",
                "expiry_month": "12",
                "expiry_year": "2030",
                "cvn": "123"
            }
        });
        let response = app
            .oneshot(request("POST", "/api/payment_requests", Some(body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let entity = json_body(response).await;
        assert_eq!(entity["status"], "REQUIRES_ACTION");
        assert_eq!(entity["actions"][0]["iframe_capable"], true);
        assert!(entity["actions"][0]["value"].as_str().unwrap().starts_with("https://acs.test/3ds/"));
    }

    #[tokio::test]
    async fn test_missing_properties_rejected() {
        let (state, app) = app();
        let session_id = state.store().session.id.clone();

        let body = serde_json::json!({ "session_id": session_id, "channel_code": "CARDS" });
        let response = app
            .oneshot(request("POST", "/api/payment_requests", Some(body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_simulate_then_poll() {
        let (state, app) = app();
        let session_id = state.store().session.id.clone();

        let body = serde_json::json!({ "session_id": session_id, "channel_code": "ID_DANA" });
        let response = app
            .clone()
            .oneshot(request("POST", "/api/payment_requests", Some(body)))
            .await
            .unwrap();
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request("POST", &format!("/api/payment_requests/{id}/simulate"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let uri = format!("/api/sessions/{session_id}/poll?payment_request_id={id}");
        let polled = json_body(app.oneshot(request("GET", &uri, None)).await.unwrap()).await;
        assert_eq!(polled["session"]["status"], "COMPLETED");
        assert_eq!(polled["payment_entity"]["status"], "SUCCEEDED");
    }

    #[tokio::test]
    async fn test_unknown_card_bin() {
        let (_, app) = app();
        let response = app
            .oneshot(request("GET", "/api/cards/999999", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
