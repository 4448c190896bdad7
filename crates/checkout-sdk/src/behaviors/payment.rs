//! Payment entity behaviors

use checkout_core::{Behavior, BehaviorImpl, CoreError, Result, Subjects};

use crate::poll::PollWorker;
use crate::sdk::Sdk;
use crate::task::OwnedTask;

/// Start `poller` for `payment_entity_id` in the current session
fn start_polling(sdk: &Sdk, poller: &PollWorker, payment_entity_id: &str) -> Result<()> {
    let session_id = sdk
        .world()
        .session
        .as_ref()
        .map(|s| s.id.clone())
        .ok_or(CoreError::MissingField("session"))?;
    poller.start(sdk, session_id, payment_entity_id.to_string());
    Ok(())
}

/// Waiting for the backend to settle the entity
pub struct PaymentPending {
    sdk: Sdk,
    payment_entity_id: String,
    poller: PollWorker,
}

impl BehaviorImpl<Sdk> for PaymentPending {
    const NAME: &'static str = "PaymentPending";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            payment_entity_id: subjects.str(0)?.to_string(),
            poller: PollWorker::new(),
        })
    }
}

impl PaymentPending {
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}

impl Behavior for PaymentPending {
    fn enter(&self) -> Result<()> {
        tracing::debug!(payment_entity_id = %self.payment_entity_id, "Polling pending payment");
        start_polling(&self.sdk, &self.poller, &self.payment_entity_id)
    }

    fn exit(&self) -> Result<()> {
        self.poller.stop();
        Ok(())
    }
}

/// Customer must complete an action; polls meanwhile
pub struct RequiresAction {
    sdk: Sdk,
    payment_entity_id: String,
    poller: PollWorker,
}

impl BehaviorImpl<Sdk> for RequiresAction {
    const NAME: &'static str = "RequiresAction";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            payment_entity_id: subjects.str(0)?.to_string(),
            poller: PollWorker::new(),
        })
    }
}

impl Behavior for RequiresAction {
    fn enter(&self) -> Result<()> {
        tracing::debug!(payment_entity_id = %self.payment_entity_id, "Payment requires customer action");
        start_polling(&self.sdk, &self.poller, &self.payment_entity_id)
    }

    fn exit(&self) -> Result<()> {
        self.poller.stop();
        Ok(())
    }
}

/// Test mode: asks the backend to settle the entity, then polls at once
pub struct SimulatePayment {
    sdk: Sdk,
    payment_entity_id: String,
    task: OwnedTask,
}

impl BehaviorImpl<Sdk> for SimulatePayment {
    const NAME: &'static str = "SimulatePayment";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            payment_entity_id: subjects.str(0)?.to_string(),
            task: OwnedTask::new(),
        })
    }
}

impl Behavior for SimulatePayment {
    fn enter(&self) -> Result<()> {
        let sdk = self.sdk.clone();
        let payment_entity_id = self.payment_entity_id.clone();

        self.task.spawn("simulate_payment", move |stop| async move {
            let result = sdk.api().simulate_payment(&payment_entity_id).await;
            if stop.is_stopped() {
                return;
            }

            match result {
                Ok(()) => {
                    tracing::info!(%payment_entity_id, "Payment simulated");
                    sdk.post_update(|world| {
                        world.flags.simulate_payment_requested = false;
                        world.flags.poll_generation = world.flags.poll_generation.wrapping_add(1);
                    });
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    tracing::warn!(%payment_entity_id, error = %err, "Payment simulation failed");
                    sdk.post_update(|world| world.flags.simulate_payment_requested = false);
                }
            }
        });
        Ok(())
    }

    fn exit(&self) -> Result<()> {
        self.task.stop();
        Ok(())
    }
}

/// Entity failed, expired or was canceled; the submission ends right after
pub struct PaymentFailed {
    payment_entity_id: String,
    status: String,
}

impl BehaviorImpl<Sdk> for PaymentFailed {
    const NAME: &'static str = "PaymentFailed";

    fn construct(_sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            payment_entity_id: subjects.str(0)?.to_string(),
            status: subjects.str(1)?.to_string(),
        })
    }
}

impl Behavior for PaymentFailed {
    fn enter(&self) -> Result<()> {
        tracing::warn!(payment_entity_id = %self.payment_entity_id, status = %self.status, "Payment entity failed");
        Ok(())
    }
}
