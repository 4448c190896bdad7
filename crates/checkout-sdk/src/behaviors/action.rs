//! Customer action behaviors

use tokio::sync::broadcast::error::RecvError;

use checkout_core::{Behavior, BehaviorImpl, Result, Subjects};

use crate::container::ActionView;
use crate::events::{ActionKind, ActionMessage, SdkEvent};
use crate::sdk::Sdk;
use crate::task::OwnedTask;

/// Action page embedded in the container; listens for its completion message
pub struct ActionIframe {
    sdk: Sdk,
    url: String,
    listener: OwnedTask,
}

impl BehaviorImpl<Sdk> for ActionIframe {
    const NAME: &'static str = "ActionIframe";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            url: subjects.str(0)?.to_string(),
            listener: OwnedTask::new(),
        })
    }
}

impl ActionIframe {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Behavior for ActionIframe {
    fn enter(&self) -> Result<()> {
        // Subscribe before mounting so an early message is not lost
        let mut messages = self.sdk.action_messages();

        self.sdk.container().mount(ActionView::Iframe {
            url: self.url.clone(),
        })?;
        self.sdk.emit(SdkEvent::ActionBegin {
            kind: ActionKind::Iframe,
            url: self.url.clone(),
        });

        let sdk = self.sdk.clone();
        self.listener.spawn("action_listener", move |stop| async move {
            loop {
                let received = messages.recv().await;
                if stop.is_stopped() {
                    return;
                }

                match received {
                    Ok(ActionMessage::Completed) => {
                        tracing::info!("Customer completed the action");
                        sdk.post_update(|world| {
                            world.flags.action_completed = true;
                            world.flags.poll_generation = world.flags.poll_generation.wrapping_add(1);
                        });
                        return;
                    }
                    Ok(ActionMessage::Canceled) => {
                        tracing::info!("Customer canceled the action");
                        sdk.post_update(|world| {
                            world.end_submission();
                            world.flags.action_canceled = true;
                        });
                        return;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Action listener lagged");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        });
        Ok(())
    }

    fn exit(&self) -> Result<()> {
        self.listener.stop();
        self.sdk.container().clear();
        self.sdk.emit(SdkEvent::ActionEnd);
        Ok(())
    }
}

/// Action page the customer is sent away to
pub struct ActionRedirect {
    sdk: Sdk,
    url: String,
}

impl BehaviorImpl<Sdk> for ActionRedirect {
    const NAME: &'static str = "ActionRedirect";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            url: subjects.str(0)?.to_string(),
        })
    }
}

impl Behavior for ActionRedirect {
    fn enter(&self) -> Result<()> {
        self.sdk.emit(SdkEvent::ActionBegin {
            kind: ActionKind::Redirect,
            url: self.url.clone(),
        });
        self.sdk.container().redirect(&self.url)?;
        Ok(())
    }

    fn exit(&self) -> Result<()> {
        self.sdk.container().clear();
        self.sdk.emit(SdkEvent::ActionEnd);
        Ok(())
    }
}
