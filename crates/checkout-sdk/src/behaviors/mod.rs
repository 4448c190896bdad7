//! Concrete behaviors of the checkout chain
//!
//! Each behavior is constructed with the [`Sdk`](crate::Sdk) handle and its
//! node's subjects. Side effects (events, network calls, action UI) start in
//! `enter` and are torn down in `exit`.

mod action;
mod form;
mod lifecycle;
mod payment;
mod submission;

pub use action::{ActionIframe, ActionRedirect};
pub use form::{CardLookup, ChannelInvalid, ChannelPicker, ChannelValid};
pub use lifecycle::{Active, FatalError, Loading, SessionCompleted, SessionFailed};
pub use payment::{PaymentFailed, PaymentPending, RequiresAction, SimulatePayment};
pub use submission::Submission;
