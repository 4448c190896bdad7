//! Channel selection and form validity

use checkout_core::{Behavior, BehaviorImpl, Result, Subjects};

use crate::events::SdkEvent;
use crate::sdk::Sdk;
use crate::task::OwnedTask;

fn form_status(sdk: &Sdk, channel_code: Option<&str>, valid: bool) {
    sdk.emit(SdkEvent::FormStatus {
        channel_code: channel_code.map(str::to_string),
        valid,
    });
}

/// No channel selected yet
pub struct ChannelPicker {
    sdk: Sdk,
}

impl BehaviorImpl<Sdk> for ChannelPicker {
    const NAME: &'static str = "ChannelPicker";

    fn construct(sdk: &Sdk, _subjects: &Subjects) -> Result<Self> {
        Ok(Self { sdk: sdk.clone() })
    }
}

impl Behavior for ChannelPicker {
    fn enter(&self) -> Result<()> {
        form_status(&self.sdk, None, false);
        Ok(())
    }
}

/// Channel selected, required fields missing
pub struct ChannelInvalid {
    sdk: Sdk,
    channel_code: String,
}

impl BehaviorImpl<Sdk> for ChannelInvalid {
    const NAME: &'static str = "ChannelInvalid";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            channel_code: subjects.str(0)?.to_string(),
        })
    }
}

impl Behavior for ChannelInvalid {
    fn enter(&self) -> Result<()> {
        form_status(&self.sdk, Some(&self.channel_code), false);
        Ok(())
    }
}

/// Channel selected and ready to submit
pub struct ChannelValid {
    sdk: Sdk,
    channel_code: String,
}

impl BehaviorImpl<Sdk> for ChannelValid {
    const NAME: &'static str = "ChannelValid";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            channel_code: subjects.str(0)?.to_string(),
        })
    }
}

impl ChannelValid {
    pub fn channel_code(&self) -> &str {
        &self.channel_code
    }
}

impl Behavior for ChannelValid {
    fn enter(&self) -> Result<()> {
        form_status(&self.sdk, Some(&self.channel_code), true);
        Ok(())
    }
}

/// Looks up the card BIN once enough digits are typed
pub struct CardLookup {
    sdk: Sdk,
    bin: String,
    task: OwnedTask,
}

impl BehaviorImpl<Sdk> for CardLookup {
    const NAME: &'static str = "CardLookup";

    fn construct(sdk: &Sdk, subjects: &Subjects) -> Result<Self> {
        Ok(Self {
            sdk: sdk.clone(),
            bin: subjects.str(0)?.to_string(),
            task: OwnedTask::new(),
        })
    }
}

impl Behavior for CardLookup {
    fn enter(&self) -> Result<()> {
        let sdk = self.sdk.clone();
        let bin = self.bin.clone();

        self.task.spawn("card_lookup", move |stop| async move {
            let result = sdk.api().lookup_card(&bin).await;
            if stop.is_stopped() {
                return;
            }

            match result {
                Ok(info) => {
                    tracing::debug!(%bin, brand = %info.brand, "Card BIN resolved");
                    sdk.post_update(|world| {
                        let still_typed = world
                            .card_number_digits()
                            .is_some_and(|digits| digits.starts_with(&bin));
                        if still_typed {
                            world.card_info = Some(info);
                        }
                    });
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => tracing::warn!(%bin, error = %err, "Card BIN lookup failed"),
            }
        });
        Ok(())
    }

    fn exit(&self) -> Result<()> {
        self.task.stop();
        Ok(())
    }
}
