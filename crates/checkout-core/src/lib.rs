//! # checkout-core
//!
//! Behavior-tree lifecycle runner and blackboard model for the checkout SDK.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  build_tree   ┌──────────────────┐  update(prev, next)  ┌────────────────────┐
//! │  WorldState  │──────────────▶│  BehaviorNode    │─────────────────────▶│ BehaviorTreeRunner │
//! │ (blackboard) │               │  chain (pure)    │                      │ exit / enter / upd │
//! └──────────────┘               └──────────────────┘                      └────────────────────┘
//!        ▲                                                                            │
//!        └──────────────────────── update_world (behaviors) ◀────────────────────────┘
//! ```
//!
//! The builder lives in `checkout-sdk`; this crate holds the engine and the
//! data it operates on.

pub mod behavior;
pub mod error;
pub mod node;
pub mod payment;
pub mod runner;
pub mod session;
pub mod world;

pub use behavior::{Behavior, BehaviorImpl};
pub use error::{CoreError, Result};
pub use node::{BehaviorNode, Subject, Subjects};
pub use payment::{
    ActionDescriptor, ActionType, CardInfo, PaymentAction, PaymentEntity, PaymentEntityKind,
    PaymentEntityStatus,
};
pub use runner::{chain, find_behavior, BehaviorTreeRunner, DEFAULT_MAX_RECURSION_DEPTH};
pub use session::{Channel, Session, SessionStatus};
pub use world::{SdkStatus, WorldFlags, WorldState};
