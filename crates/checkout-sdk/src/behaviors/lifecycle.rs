//! SDK and session lifecycle behaviors

use checkout_core::{Behavior, BehaviorImpl, Result, SdkStatus, Subjects};

use crate::events::SdkEvent;
use crate::sdk::Sdk;
use crate::task::OwnedTask;

/// Fetches the session; the chain root until it is loaded
pub struct Loading {
    sdk: Sdk,
    task: OwnedTask,
}

impl BehaviorImpl<Sdk> for Loading {
    const NAME: &'static str = "Loading";

    fn construct(sdk: &Sdk, _subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            task: OwnedTask::new(),
        })
    }
}

impl Behavior for Loading {
    fn enter(&self) -> Result<()> {
        let sdk = self.sdk.clone();
        self.task.spawn("fetch_session", move |stop| async move {
            let result = sdk.api().fetch_session().await;
            if stop.is_stopped() {
                return;
            }

            match result {
                Ok(session) => {
                    tracing::info!(session_id = %session.id, status = %session.status, "Session loaded");
                    sdk.post_update(|world| {
                        world.sdk_status = SdkStatus::Active;
                        world.session = Some(session);
                    });
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    tracing::error!(error = %err, "Failed to load session");
                    sdk.post_update(|world| {
                        world.sdk_status = SdkStatus::FatalError;
                        world.fatal_error = Some(err.user_message().to_string());
                    });
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

pub struct FatalError {
    sdk: Sdk,
    message: String,
}

impl BehaviorImpl<Sdk> for FatalError {
    const NAME: &'static str = "FatalError";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            message: subjects.str(0)?.to_string(),
        })
    }
}

impl Behavior for FatalError {
    fn enter(&self) -> Result<()> {
        self.sdk.emit(SdkEvent::FatalError {
            message: self.message.clone(),
        });
        Ok(())
    }
}

/// Root of a loaded session
pub struct Active {
    sdk: Sdk,
    session_id: String,
}

impl BehaviorImpl<Sdk> for Active {
    const NAME: &'static str = "Active";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            session_id: subjects.str(0)?.to_string(),
        })
    }
}

impl Behavior for Active {
    fn enter(&self) -> Result<()> {
        self.sdk.emit(SdkEvent::Ready {
            session_id: self.session_id.clone(),
        });
        Ok(())
    }
}

pub struct SessionCompleted {
    sdk: Sdk,
    session_id: String,
}

impl BehaviorImpl<Sdk> for SessionCompleted {
    const NAME: &'static str = "SessionCompleted";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            session_id: subjects.str(0)?.to_string(),
        })
    }
}

impl Behavior for SessionCompleted {
    fn enter(&self) -> Result<()> {
        tracing::info!(session_id = %self.session_id, "Session completed");
        self.sdk.emit(SdkEvent::SessionComplete {
            session_id: self.session_id.clone(),
        });
        Ok(())
    }
}

/// Session expired or was canceled
pub struct SessionFailed {
    sdk: Sdk,
    status: String,
}

impl BehaviorImpl<Sdk> for SessionFailed {
    const NAME: &'static str = "SessionFailed";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            status: subjects.str(0)?.to_string(),
        })
    }
}

impl Behavior for SessionFailed {
    fn enter(&self) -> Result<()> {
        tracing::warn!(status = %self.status, "Session ended without payment");
        self.sdk.emit(SdkEvent::SessionExpiredOrCanceled {
            status: self.status.clone(),
        });
        Ok(())
    }
}
