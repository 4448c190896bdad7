//! SDK Driver
//!
//! Owns the world snapshot and the current behavior chain. Every world change
//! rebuilds the chain with [`build_tree`] and hands both chains to the
//! [`BehaviorTreeRunner`].
//!
//! World changes requested while a cycle is running (from a behavior hook)
//! are not nested: the running cycle is marked dirty and the outermost call
//! keeps rebuilding until the chain settles, bounded by
//! [`SdkConfig::max_update_passes`].
//!
//! A failed cycle moves the SDK into `SdkStatus::FatalError` and runs one more
//! pass, so the stale chain is exited and `[FatalError]` entered.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::sync::broadcast;

use checkout_api::PaymentApi;
use checkout_core::{BehaviorNode, BehaviorTreeRunner, CoreError, SdkStatus, WorldState};

use crate::config::SdkConfig;
use crate::container::ActionContainer;
use crate::error::{Result, SdkError};
use crate::events::{ActionMessage, SdkEvent};
use crate::tree::{build_tree, form_is_valid};

/// Behavior node whose instances receive the SDK handle
pub type SdkNode = BehaviorNode<Sdk>;

struct SdkInner {
    config: SdkConfig,
    api: Rc<dyn PaymentApi>,
    container: Rc<dyn ActionContainer>,
    runner: BehaviorTreeRunner,
    world: RefCell<Rc<WorldState>>,
    tree: RefCell<Option<Rc<SdkNode>>>,
    updating: Cell<bool>,
    dirty: Cell<bool>,
    destroyed: Cell<bool>,
    events: broadcast::Sender<SdkEvent>,
    action_messages: broadcast::Sender<ActionMessage>,
}

/// Checkout SDK handle
///
/// Cheap to clone; behaviors and their tasks hold clones. The chain keeps the
/// SDK alive until [`Sdk::destroy`] is called.
#[derive(Clone)]
pub struct Sdk {
    inner: Rc<SdkInner>,
}

impl Sdk {
    pub fn new(config: SdkConfig, api: Rc<dyn PaymentApi>, container: Rc<dyn ActionContainer>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (action_messages, _) = broadcast::channel(16);
        let runner = BehaviorTreeRunner::with_max_depth(config.max_recursion_depth);

        tracing::info!(api = api.name(), "Creating checkout SDK");

        Self {
            inner: Rc::new(SdkInner {
                config,
                api,
                container,
                runner,
                world: RefCell::new(Rc::new(WorldState::loading())),
                tree: RefCell::new(None),
                updating: Cell::new(false),
                dirty: Cell::new(false),
                destroyed: Cell::new(false),
                events,
                action_messages,
            }),
        }
    }

    /// Build and enter the initial chain (starts loading the session)
    ///
    /// Must be called from within a `tokio::task::LocalSet`.
    pub fn start(&self) -> Result<()> {
        if self.inner.destroyed.get() {
            return Err(SdkError::Destroyed);
        }
        self.inner.config.validate()?;
        self.run_cycles()
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub fn api(&self) -> Rc<dyn PaymentApi> {
        self.inner.api.clone()
    }

    pub fn container(&self) -> Rc<dyn ActionContainer> {
        self.inner.container.clone()
    }

    /// Current world snapshot
    pub fn world(&self) -> Rc<WorldState> {
        self.inner.world.borrow().clone()
    }

    /// Subscribe to merchant events
    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn action_messages(&self) -> broadcast::Receiver<ActionMessage> {
        self.inner.action_messages.subscribe()
    }

    pub(crate) fn emit(&self, event: SdkEvent) {
        tracing::debug!(event = event.name(), "Emitting event");
        // No listeners is fine
        let _ = self.inner.events.send(event);
    }

    /// Live behavior of type `T` in the current chain
    pub fn find_behavior<T: 'static>(&self) -> Option<Rc<T>> {
        let tree = self.inner.tree.borrow().clone();
        checkout_core::find_behavior::<T, Sdk>(tree.as_ref())
    }

    /// Names of the behaviors in the current chain, root first
    pub fn chain_names(&self) -> Vec<&'static str> {
        let tree = self.inner.tree.borrow().clone();
        checkout_core::chain(tree.as_ref()).map(|node| node.name()).collect()
    }

    /// Apply `change` to a copy of the world and run the update cycle
    ///
    /// Unchanged worlds do not trigger a cycle.
    pub fn update_world(&self, change: impl FnOnce(&mut WorldState)) -> Result<()> {
        if self.inner.destroyed.get() {
            return Err(SdkError::Destroyed);
        }

        let current = self.world();
        let mut next = WorldState::clone(&current);
        change(&mut next);
        if next == *current {
            return Ok(());
        }
        *self.inner.world.borrow_mut() = Rc::new(next);

        self.run_cycles()
    }

    /// Fire-and-forget world change from a hook or task
    ///
    /// Failures are already logged and reported as a fatal-error event.
    pub(crate) fn post_update(&self, change: impl FnOnce(&mut WorldState)) {
        match self.update_world(change) {
            Ok(()) | Err(SdkError::Destroyed) => {}
            Err(err) => tracing::debug!(error = %err, "Deferred world update failed"),
        }
    }

    fn run_cycles(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.updating.get() {
            inner.dirty.set(true);
            return Ok(());
        }

        inner.updating.set(true);
        let result = self.drain_cycles();
        inner.updating.set(false);

        if let Err(err) = &result {
            tracing::error!(error = %err, chain = ?self.chain_names(), "Behavior tree update failed");
            self.enter_fatal_error(err.to_string());
        }
        result.map_err(SdkError::from)
    }

    /// Replace whatever the failed cycle left behind with `[FatalError]`
    ///
    /// The `FatalError` behavior emits the event on enter; it is emitted here
    /// only when that chain cannot be reached.
    fn enter_fatal_error(&self, message: String) {
        let inner = &self.inner;
        let world = self.world();
        if inner.destroyed.get() || world.sdk_status == SdkStatus::FatalError {
            self.emit(SdkEvent::FatalError { message });
            return;
        }

        let mut next = WorldState::clone(&world);
        next.sdk_status = SdkStatus::FatalError;
        next.fatal_error = Some(message.clone());
        *inner.world.borrow_mut() = Rc::new(next);

        inner.updating.set(true);
        let recovered = self.drain_cycles();
        inner.updating.set(false);

        if let Err(err) = recovered {
            tracing::error!(error = %err, "Could not enter the fatal error state");
            self.emit(SdkEvent::FatalError { message });
        }
    }

    fn drain_cycles(&self) -> checkout_core::Result<()> {
        let inner = &self.inner;

        for pass in 1..=inner.config.max_update_passes {
            inner.dirty.set(false);

            let world = self.world();
            let next = build_tree(&world)?;
            let prev = inner.tree.replace(next.clone());

            tracing::trace!(pass, "Update cycle");
            inner.runner.update(prev.as_ref(), next.as_ref(), self)?;

            if !inner.dirty.get() || inner.destroyed.get() {
                return Ok(());
            }
        }
        Err(CoreError::UpdatePassesExceeded(inner.config.max_update_passes))
    }

    /// Select a payment channel, resetting the form
    pub fn select_channel(&self, channel_code: &str) -> Result<()> {
        let world = self.world();
        let session = world
            .session
            .as_ref()
            .ok_or_else(|| SdkError::InvalidState("session is not loaded".into()))?;
        if session.channel(channel_code).is_none() {
            return Err(SdkError::InvalidState(format!("unknown channel {channel_code}")));
        }
        if is_submitting(&world) {
            return Err(SdkError::InvalidState("submission in progress".into()));
        }

        tracing::info!(channel = %channel_code, "Channel selected");
        self.update_world(|w| {
            if w.channel_code.as_deref() != Some(channel_code) {
                w.channel_code = Some(channel_code.to_string());
                w.channel_properties.clear();
                w.card_info = None;
            }
        })
    }

    /// Merge form input for the selected channel
    pub fn set_channel_properties(
        &self,
        properties: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        if self.world().channel_code.is_none() {
            return Err(SdkError::InvalidState("no channel selected".into()));
        }
        self.update_world(|w| {
            for (key, value) in properties {
                w.channel_properties.insert(key, value);
            }
        })
    }

    /// Start a submission for the current form
    pub fn submit(&self) -> Result<()> {
        let world = self.world();
        if world.sdk_status != SdkStatus::Active {
            return Err(SdkError::InvalidState("SDK is not active".into()));
        }
        if is_submitting(&world) {
            return Err(SdkError::InvalidState("submission in progress".into()));
        }
        if !form_is_valid(&world) {
            return Err(SdkError::InvalidState("form is not valid".into()));
        }

        tracing::info!(channel = ?world.channel_code, "Submitting payment");
        self.update_world(|w| {
            w.flags.submission_requested = true;
            w.flags.action_completed = false;
            w.flags.action_canceled = false;
        })
    }

    /// Test mode: ask the backend to settle the pending payment entity
    pub fn simulate_payment(&self) -> Result<()> {
        if self.world().payment_entity.is_none() {
            return Err(SdkError::InvalidState("no payment entity to simulate".into()));
        }
        self.update_world(|w| w.flags.simulate_payment_requested = true)
    }

    /// Restart polling without waiting for the backoff
    pub fn poll_immediately(&self) -> Result<()> {
        self.update_world(|w| w.flags.poll_generation = w.flags.poll_generation.wrapping_add(1))
    }

    /// Deliver a message from the action page
    pub fn post_action_message(&self, message: ActionMessage) {
        tracing::debug!(?message, "Action message");
        let _ = self.inner.action_messages.send(message);
    }

    /// Exit the whole chain and stop all tasks
    pub fn destroy(&self) -> Result<()> {
        if self.inner.destroyed.replace(true) {
            return Ok(());
        }
        tracing::info!("Destroying checkout SDK");

        let tree = self.inner.tree.borrow_mut().take();
        self.inner.runner.update(tree.as_ref(), None, self)?;
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

fn is_submitting(world: &WorldState) -> bool {
    world.flags.submission_requested || world.payment_entity.is_some()
}
