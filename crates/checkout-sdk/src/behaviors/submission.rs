//! Submission
//!
//! Spans one attempt to pay: creates the payment entity, follows it through
//! the child behaviors, and on exit reports why the attempt ended.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use checkout_api::CreatePaymentRequest;
use checkout_core::{
    Behavior, BehaviorImpl, CoreError, PaymentEntityStatus, Result, SessionStatus, Subjects,
    WorldState,
};

use crate::events::{SdkEvent, SubmissionEndReason};
use crate::sdk::Sdk;
use crate::task::OwnedTask;

/// Outcome of the create call, shared with its task
#[derive(Default)]
struct CreateState {
    in_flight: Cell<bool>,
    /// (user message, developer message)
    network_error: RefCell<Option<(String, String)>>,
}

pub struct Submission {
    sdk: Sdk,
    session_id: String,
    create: Rc<CreateState>,
    task: OwnedTask,
    entity_status: Cell<Option<PaymentEntityStatus>>,
    failure_code: RefCell<Option<String>>,
    ending: Cell<bool>,
}

impl BehaviorImpl<Sdk> for Submission {
    const NAME: &'static str = "Submission";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            session_id: subjects.str(0)?.to_string(),
            create: Rc::default(),
            task: OwnedTask::new(),
            entity_status: Cell::new(None),
            failure_code: RefCell::new(None),
            ending: Cell::new(false),
        })
    }
}

impl Submission {
    /// Last observed status of the payment entity
    pub fn entity_status(&self) -> Option<PaymentEntityStatus> {
        self.entity_status.get()
    }

    pub fn is_creating(&self) -> bool {
        self.create.in_flight.get()
    }

    fn observe(&self, world: &WorldState) {
        if let Some(entity) = &world.payment_entity {
            self.entity_status.set(Some(entity.status));
            if entity.failure_code.is_some() {
                *self.failure_code.borrow_mut() = entity.failure_code.clone();
            }
        }
    }

    fn start_create(&self, world: &WorldState) -> Result<()> {
        let channel_code = world
            .channel_code
            .clone()
            .ok_or(CoreError::MissingField("channel_code"))?;
        let request = CreatePaymentRequest {
            session_id: self.session_id.clone(),
            channel_code,
            channel_properties: world.channel_properties.clone(),
        };

        let sdk = self.sdk.clone();
        let create = self.create.clone();
        create.in_flight.set(true);

        self.task.spawn("create_payment", move |stop| async move {
            let result = sdk.api().create_payment(&request).await;
            if stop.is_stopped() {
                return;
            }
            create.in_flight.set(false);

            match result {
                Ok(entity) => {
                    tracing::info!(payment_entity_id = %entity.id, status = %entity.status, "Payment entity created");
                    sdk.post_update(|world| {
                        world.payment_entity = Some(entity);
                        world.flags.submission_requested = false;
                    });
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Create payment failed");
                    *create.network_error.borrow_mut() =
                        Some((err.user_message().to_string(), err.to_string()));
                    sdk.post_update(WorldState::end_submission);
                }
            }
        });
        Ok(())
    }

    /// Snapshot of what this submission has seen so far
    fn observed(&self) -> Observed {
        Observed {
            entity_status: self.entity_status.get(),
            failure_code: self.failure_code.borrow().clone(),
            network_error: self.create.network_error.borrow().clone(),
            create_in_flight: self.create.in_flight.get(),
        }
    }
}

/// What a submission learned before it ended
#[derive(Debug, Default, Clone)]
struct Observed {
    entity_status: Option<PaymentEntityStatus>,
    failure_code: Option<String>,
    /// (user message, developer message)
    network_error: Option<(String, String)>,
    create_in_flight: bool,
}

/// Reason, user message and developer message of a submission end
type EndReport = (SubmissionEndReason, Option<String>, Option<String>);

/// First matching cause wins: abnormal session, failed entity, network error,
/// aborted create, canceled action, completed session, anything else.
fn end_reason(world: &WorldState, observed: &Observed) -> EndReport {
    let session_status = world.session.as_ref().map(|s| s.status);

    if let Some(status) = session_status.filter(SessionStatus::is_abnormal) {
        return (
            SubmissionEndReason::SessionExpiredOrCanceled,
            Some("The payment session has ended. Please start again.".into()),
            Some(format!("session status is {status}")),
        );
    }
    if let Some(reason) = observed.entity_status.and_then(failure_reason) {
        let developer = observed
            .failure_code
            .clone()
            .or_else(|| observed.entity_status.map(|s| s.as_str().to_string()));
        return (
            reason,
            Some("The payment was not completed. Please try again.".into()),
            developer,
        );
    }
    if let Some((user, developer)) = observed.network_error.clone() {
        return (SubmissionEndReason::NetworkError, Some(user), Some(developer));
    }
    if observed.create_in_flight {
        return (SubmissionEndReason::Aborted, None, None);
    }
    if world.flags.action_canceled {
        return (SubmissionEndReason::ActionCanceled, None, None);
    }
    if session_status == Some(SessionStatus::Completed) {
        return (SubmissionEndReason::SessionCompleted, None, None);
    }
    (SubmissionEndReason::Interrupted, None, None)
}

fn failure_reason(status: PaymentEntityStatus) -> Option<SubmissionEndReason> {
    match status {
        PaymentEntityStatus::Failed => Some(SubmissionEndReason::PaymentEntityFailed),
        PaymentEntityStatus::Expired => Some(SubmissionEndReason::PaymentEntityExpired),
        PaymentEntityStatus::Canceled => Some(SubmissionEndReason::PaymentEntityCanceled),
        PaymentEntityStatus::Pending
        | PaymentEntityStatus::RequiresAction
        | PaymentEntityStatus::AcceptingPayments
        | PaymentEntityStatus::Authorized
        | PaymentEntityStatus::Active
        | PaymentEntityStatus::Succeeded => None,
    }
}

impl Behavior for Submission {
    fn enter(&self) -> Result<()> {
        let world = self.sdk.world();
        self.observe(&world);

        let channel_code = world.channel_code.clone().unwrap_or_default();
        tracing::info!(session_id = %self.session_id, channel = %channel_code, "Submission started");
        self.sdk.emit(SdkEvent::SubmissionBegin { channel_code });

        if world.payment_entity.is_none() {
            self.start_create(&world)?;
        }
        Ok(())
    }

    fn update(&self) -> Result<()> {
        let world = self.sdk.world();
        self.observe(&world);

        let failed = self
            .entity_status
            .get()
            .is_some_and(|s| s.is_terminal_failure());
        if failed && !self.ending.replace(true) {
            tracing::info!(status = ?self.entity_status.get(), "Payment entity failed, ending submission");
            self.sdk.post_update(WorldState::end_submission);
        }
        Ok(())
    }

    fn exit(&self) -> Result<()> {
        self.task.stop();

        let world = self.sdk.world();
        self.observe(&world);

        let (reason, user_error_message, developer_error_message) =
            end_reason(&world, &self.observed());
        tracing::info!(%reason, "Submission ended");
        self.sdk.emit(SdkEvent::SubmissionEnd {
            reason,
            user_error_message,
            developer_error_message,
        });

        let completed = world
            .session
            .as_ref()
            .is_some_and(|s| s.status == SessionStatus::Completed);
        if !completed && (world.payment_entity.is_some() || world.flags.submission_requested) {
            self.sdk.post_update(WorldState::end_submission);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::Session;
    use rust_decimal_macros::dec;

    fn world_with(status: SessionStatus) -> WorldState {
        let mut session = Session::new("ps-1", dec!(150000), "IDR");
        session.status = status;
        let mut world = WorldState::active(session);
        world.channel_code = Some("ID_DANA".into());
        world
    }

    fn failed_entity() -> Observed {
        Observed {
            entity_status: Some(PaymentEntityStatus::Failed),
            failure_code: Some("INSUFFICIENT_BALANCE".into()),
            ..Observed::default()
        }
    }

    fn network_error() -> Option<(String, String)> {
        Some(("Network problem.".into(), "HTTP 503: SERVER_ERROR".into()))
    }

    #[test]
    fn test_expired_session_beats_failed_entity() {
        let world = world_with(SessionStatus::Expired);

        let (reason, user, developer) = end_reason(&world, &failed_entity());

        assert_eq!(reason, SubmissionEndReason::SessionExpiredOrCanceled);
        assert!(user.is_some());
        assert_eq!(developer.as_deref(), Some("session status is EXPIRED"));
    }

    #[test]
    fn test_failed_entity_beats_network_error() {
        let world = world_with(SessionStatus::Active);
        let observed = Observed {
            network_error: network_error(),
            ..failed_entity()
        };

        let (reason, _, developer) = end_reason(&world, &observed);

        assert_eq!(reason, SubmissionEndReason::PaymentEntityFailed);
        assert_eq!(developer.as_deref(), Some("INSUFFICIENT_BALANCE"));
    }

    #[test]
    fn test_network_error_beats_in_flight_create() {
        let world = world_with(SessionStatus::Active);
        let observed = Observed {
            network_error: network_error(),
            create_in_flight: true,
            ..Observed::default()
        };

        let (reason, user, _) = end_reason(&world, &observed);

        assert_eq!(reason, SubmissionEndReason::NetworkError);
        assert_eq!(user.as_deref(), Some("Network problem."));
    }

    #[test]
    fn test_in_flight_create_beats_action_cancel() {
        let mut world = world_with(SessionStatus::Active);
        world.flags.action_canceled = true;
        let observed = Observed {
            create_in_flight: true,
            ..Observed::default()
        };

        let (reason, user, developer) = end_reason(&world, &observed);

        assert_eq!(reason, SubmissionEndReason::Aborted);
        assert!(user.is_none() && developer.is_none());
    }

    #[test]
    fn test_action_cancel_beats_completed_session() {
        let mut world = world_with(SessionStatus::Completed);
        world.flags.action_canceled = true;

        let (reason, _, _) = end_reason(&world, &Observed::default());

        assert_eq!(reason, SubmissionEndReason::ActionCanceled);
    }

    #[test]
    fn test_quiet_end_reasons() {
        let completed = world_with(SessionStatus::Completed);
        assert_eq!(
            end_reason(&completed, &Observed::default()).0,
            SubmissionEndReason::SessionCompleted
        );

        let active = world_with(SessionStatus::Active);
        assert_eq!(
            end_reason(&active, &Observed::default()).0,
            SubmissionEndReason::Interrupted
        );
    }

    #[test]
    fn test_failed_entity_without_code_reports_status() {
        let world = world_with(SessionStatus::Active);
        let observed = Observed {
            entity_status: Some(PaymentEntityStatus::Expired),
            ..Observed::default()
        };

        let (reason, _, developer) = end_reason(&world, &observed);

        assert_eq!(reason, SubmissionEndReason::PaymentEntityExpired);
        assert_eq!(developer.as_deref(), Some("EXPIRED"));
    }

    #[test]
    fn test_failure_reason_mapping() {
        assert_eq!(
            failure_reason(PaymentEntityStatus::Expired),
            Some(SubmissionEndReason::PaymentEntityExpired)
        );
        assert_eq!(failure_reason(PaymentEntityStatus::RequiresAction), None);
    }
}
