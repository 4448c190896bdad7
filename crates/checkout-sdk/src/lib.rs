//! # checkout-sdk
//!
//! Checkout components SDK. The payment flow is a behavior chain rebuilt from
//! the world state on every change:
//!
//! ```text
//! ┌─────────────┐  change   ┌────────────┐  chain  ┌──────────────────────┐
//! │ Sdk (world) │ ────────▶ │ build_tree │ ──────▶ │ BehaviorTreeRunner   │
//! └─────────────┘           └────────────┘         │ exit / update / enter│
//!        ▲                                          └──────────┬───────────┘
//!        │            post_update (tasks, hooks)               │
//!        └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let local = tokio::task::LocalSet::new();
//! local.run_until(async {
//!     let sdk = Sdk::new(SdkConfig::from_env(), Rc::new(api), Rc::new(HeadlessActionContainer::new()));
//!     let mut events = sdk.subscribe();
//!     sdk.start()?;
//!     // ... select_channel / set_channel_properties / submit
//! }).await;
//! ```

pub mod behaviors;
pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod poll;
pub mod sdk;
pub mod task;
pub mod tree;

pub use config::{PollConfig, SdkConfig};
pub use container::{ActionContainer, ActionView, HeadlessActionContainer};
pub use error::{Result, SdkError};
pub use events::{ActionKind, ActionMessage, SdkEvent, SubmissionEndReason};
pub use sdk::{Sdk, SdkNode};
pub use tree::{build_tree, can_use_iframe, form_is_valid};
