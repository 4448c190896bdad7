//! HTTP Payment API Client
//!
//! REST implementation of [`PaymentApi`] over reqwest.
//!
//! | Operation          | Request                                              |
//! |--------------------|------------------------------------------------------|
//! | `fetch_session`    | `GET  /sessions/current`                             |
//! | `create_payment`   | `POST /payment_requests`                             |
//! | `poll`             | `GET  /sessions/{id}/poll?payment_request_id={pr}`   |
//! | `simulate_payment` | `POST /payment_requests/{id}/simulate`               |
//! | `lookup_card`      | `GET  /cards/{bin}`                                  |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use checkout_core::{CardInfo, PaymentEntity, Session};

use crate::client::{CreatePaymentRequest, PaymentApi, PollResponse};
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

/// reqwest-backed payment API client
pub struct HttpPaymentApi {
    client: Client,
    config: ApiConfig,
}

impl HttpPaymentApi {
    /// Create from configuration
    pub fn from_config(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ApiConfig::from_env()?)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.config.session_token)
            .header("Accept", "application/json")
    }

    /// Send the request and decode a JSON body, mapping error statuses
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }
        Err(Self::error_from(status, &body))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Err(Self::error_from(status, &body))
    }

    fn error_from(status: StatusCode, body: &str) -> ApiError {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let (error_code, message) = parsed
            .map(|e| (e.error_code, e.message))
            .unwrap_or_else(|| (String::new(), body.chars().take(200).collect()));

        if status == StatusCode::NOT_FOUND {
            return ApiError::NotFound(message);
        }
        ApiError::Http {
            status: status.as_u16(),
            error_code,
            message,
        }
    }
}

#[async_trait(?Send)]
impl PaymentApi for HttpPaymentApi {
    async fn fetch_session(&self) -> Result<Session> {
        let url = self.config.endpoint("sessions/current");
        tracing::debug!(%url, "Fetching session");
        self.send(self.client.get(url)).await
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentEntity> {
        let url = self.config.endpoint("payment_requests");
        tracing::debug!(%url, channel = %request.channel_code, "Creating payment request");
        self.send(self.client.post(url).json(request)).await
    }

    async fn poll(&self, session_id: &str, payment_entity_id: Option<&str>) -> Result<PollResponse> {
        let url = self.config.endpoint(&format!("sessions/{session_id}/poll"));
        let mut builder = self.client.get(url);
        if let Some(id) = payment_entity_id {
            builder = builder.query(&[("payment_request_id", id)]);
        }
        self.send(builder).await
    }

    async fn simulate_payment(&self, payment_entity_id: &str) -> Result<()> {
        let url = self
            .config
            .endpoint(&format!("payment_requests/{payment_entity_id}/simulate"));
        self.send_empty(self.client.post(url)).await
    }

    async fn lookup_card(&self, bin: &str) -> Result<CardInfo> {
        let url = self.config.endpoint(&format!("cards/{bin}"));
        self.send(self.client.get(url)).await
    }

    fn name(&self) -> &str {
        "HttpPaymentApi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = HttpPaymentApi::error_from(
            StatusCode::BAD_REQUEST,
            r#"{"error_code":"API_VALIDATION_ERROR","message":"cvn is required"}"#,
        );
        assert!(matches!(
            err,
            ApiError::Http { status: 400, ref error_code, .. } if error_code == "API_VALIDATION_ERROR"
        ));

        let err = HttpPaymentApi::error_from(StatusCode::NOT_FOUND, "no such session");
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg == "no such session"));

        let err = HttpPaymentApi::error_from(StatusCode::BAD_GATEWAY, "<html>");
        assert!(err.is_retryable());
    }
}
