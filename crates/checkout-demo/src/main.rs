//! Checkout SDK demo
//!
//! Starts an Axum mock of the payment API, then drives one checkout through
//! the SDK against it over HTTP.
//!
//! ```text
//! checkout-demo [CHANNEL_CODE]     # CARDS (default) or ID_DANA
//! ```

mod checkout;
mod handlers;
mod state;

use std::rc::Rc;
use std::time::Duration;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_api::{ApiConfig, HttpPaymentApi};
use checkout_sdk::SdkConfig;

use crate::checkout::Outcome;
use crate::state::{AppState, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,checkout_sdk=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let session_token =
        std::env::var("CHECKOUT_SESSION_TOKEN").unwrap_or_else(|_| "demo-session-token".into());
    let action_base_url =
        std::env::var("ACTION_BASE_URL").unwrap_or_else(|_| "https://acs.sandbox.local".into());
    let channel_code = std::env::args().nth(1).unwrap_or_else(|| "CARDS".into());

    // Mock payment API
    let state = AppState::new(Store::demo(), &session_token, &action_base_url);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = handlers::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Mock API server stopped: {}", e);
        }
    });

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Mock payment API running on http://{}", local_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("  GET  /api/sessions/current");
    tracing::info!("  GET  /api/sessions/{{id}}/poll");
    tracing::info!("  POST /api/payment_requests");
    tracing::info!("  POST /api/payment_requests/{{id}}/simulate");
    tracing::info!("  GET  /api/cards/{{bin}}");

    // SDK client
    let api_config = ApiConfig {
        timeout_secs: 10,
        ..ApiConfig::new(format!("http://{local_addr}/api"), session_token)
    };
    let api = HttpPaymentApi::from_config(api_config)?;

    let local = tokio::task::LocalSet::new();
    let outcome = local
        .run_until(checkout::run(
            Rc::new(api),
            SdkConfig::from_env(),
            &channel_code,
            Duration::from_secs(60),
        ))
        .await?;

    match outcome {
        Outcome::Completed => tracing::info!(channel = %channel_code, "✓ Checkout completed"),
        Outcome::SessionEnded(status) => tracing::warn!(%status, "Session ended without payment"),
        Outcome::SubmissionEnded(reason) => tracing::warn!(%reason, "Payment not completed"),
    }
    Ok(())
}
