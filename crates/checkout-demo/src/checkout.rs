//! Scripted Checkout
//!
//! Plays the customer against the SDK: waits for the form, fills it in,
//! submits, passes the 3DS challenge and settles the payment through the
//! test-mode simulation. Must run inside a `LocalSet`.

use std::rc::Rc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use checkout_api::PaymentApi;
use checkout_sdk::behaviors::PaymentPending;
use checkout_sdk::{
    ActionKind, ActionMessage, HeadlessActionContainer, Sdk, SdkConfig, SdkEvent,
    SubmissionEndReason,
};

/// How the scripted checkout ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    SessionEnded(String),
    SubmissionEnded(SubmissionEndReason),
}

/// Form input the customer types for `channel_code`
pub fn channel_properties(channel_code: &str) -> Map<String, Value> {
    let properties = match channel_code {
        "CARDS" => json!({
            "card_number": "4000 0000 0000 1091",
            "expiry_month": "12",
            "expiry_year": "2030",
            "cvn": "123",
            "cardholder_name": "Demo Customer"
        }),
        _ => json!({}),
    };
    match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub async fn run(
    api: Rc<dyn PaymentApi>,
    config: SdkConfig,
    channel_code: &str,
    deadline: Duration,
) -> anyhow::Result<Outcome> {
    let container = Rc::new(HeadlessActionContainer::new());
    let sdk = Sdk::new(config, api, container);
    let mut events = BroadcastStream::new(sdk.subscribe());
    sdk.start()?;

    let result = tokio::time::timeout(deadline, drive(&sdk, &mut events, channel_code)).await;
    sdk.destroy()?;

    match result {
        Ok(outcome) => outcome,
        Err(_) => anyhow::bail!("checkout did not finish within {deadline:?}"),
    }
}

async fn drive(
    sdk: &Sdk,
    events: &mut BroadcastStream<SdkEvent>,
    channel_code: &str,
) -> anyhow::Result<Outcome> {
    let mut submitted = false;
    let mut simulated = false;
    let mut ticker = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            item = events.next() => {
                let event = match item {
                    Some(Ok(event)) => event,
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        tracing::warn!(skipped, "Missed SDK events");
                        continue;
                    }
                    None => anyhow::bail!("SDK event channel closed"),
                };
                tracing::info!(event = %serde_json::to_string(&event)?, "SDK event");

                match event {
                    SdkEvent::Ready { .. } => {
                        sdk.select_channel(channel_code)?;
                        sdk.set_channel_properties(channel_properties(channel_code))?;
                    }
                    SdkEvent::FormStatus { valid: true, .. } if !submitted => {
                        submitted = true;
                        sdk.submit()?;
                    }
                    SdkEvent::ActionBegin { kind: ActionKind::Iframe, url } => {
                        tracing::info!(%url, "Customer passes the challenge");
                        sdk.post_action_message(ActionMessage::Completed);
                    }
                    SdkEvent::ActionEnd if !simulated => {
                        simulated = true;
                        sdk.simulate_payment()?;
                    }
                    SdkEvent::SubmissionEnd { reason, developer_error_message, .. } => {
                        if reason != SubmissionEndReason::SessionCompleted {
                            tracing::warn!(%reason, ?developer_error_message, "Submission ended");
                            return Ok(Outcome::SubmissionEnded(reason));
                        }
                    }
                    SdkEvent::SessionComplete { .. } => return Ok(Outcome::Completed),
                    SdkEvent::SessionExpiredOrCanceled { status } => {
                        return Ok(Outcome::SessionEnded(status));
                    }
                    SdkEvent::FatalError { message } => anyhow::bail!("SDK fatal error: {message}"),
                    _ => {}
                }
            }
            _ = ticker.tick() => {
                if !simulated && sdk.find_behavior::<PaymentPending>().is_some() {
                    simulated = true;
                    sdk.simulate_payment()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_api::{ApiConfig, HttpPaymentApi};
    use checkout_sdk::PollConfig;

    use crate::handlers::router;
    use crate::state::{AppState, Store};

    async fn serve() -> String {
        let state = AppState::new(Store::demo(), "e2e-token", "https://acs.test");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn fast_config() -> SdkConfig {
        SdkConfig::default().with_poll(PollConfig {
            initial_delay: Duration::from_millis(20),
            multiplier: 1.0,
            max_delay: Duration::from_millis(20),
            max_attempts: 500,
        })
    }

    async fn checkout(channel_code: &str) -> Outcome {
        let base_url = serve().await;
        let api = HttpPaymentApi::from_config(ApiConfig::new(base_url, "e2e-token")).unwrap();

        tokio::task::LocalSet::new()
            .run_until(run(Rc::new(api), fast_config(), channel_code, Duration::from_secs(10)))
            .await
            .unwrap()
    }

    #[test]
    fn test_card_properties_fill_required_fields() {
        let properties = channel_properties("CARDS");
        for key in ["card_number", "expiry_month", "expiry_year", "cvn"] {
            assert!(properties.contains_key(key), "{key}");
        }
        assert!(channel_properties("ID_DANA").is_empty());
    }

    #[tokio::test]
    async fn test_ewallet_checkout_over_http() {
        assert_eq!(checkout("ID_DANA").await, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_card_checkout_with_challenge_over_http() {
        assert_eq!(checkout("CARDS").await, Outcome::Completed);
    }
}
