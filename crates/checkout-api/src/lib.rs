//! # checkout-api
//!
//! Payment API client for the checkout SDK.
//!
//! The SDK's leaf behaviors talk to the payment backend exclusively through
//! the [`PaymentApi`] trait, so the transport can be swapped:
//!
//! - [`HttpPaymentApi`]: REST over reqwest, authenticated with the session token
//! - [`MockPaymentApi`]: in-memory, scriptable; used by tests and the demo
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_api::{ApiConfig, HttpPaymentApi, PaymentApi};
//!
//! let api = HttpPaymentApi::from_config(ApiConfig::new("https://api.example.com/v1", token))?;
//! let session = api.fetch_session().await?;
//! ```

mod client;
mod config;
mod error;
mod http;
mod mock;

pub use client::{CreatePaymentRequest, PaymentApi, PollResponse};
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use http::HttpPaymentApi;
pub use mock::{CreateOutcome, MockPaymentApi};
