//! Poll Worker
//!
//! Polls the session and the payment entity with exponential backoff and
//! feeds the results into the world. Owned by the pending / requires-action
//! behaviors, which restart it whenever their poll generation changes.

use std::time::Duration;

use checkout_api::PollResponse;
use checkout_core::WorldState;

use crate::config::PollConfig;
use crate::sdk::Sdk;
use crate::task::OwnedTask;

/// Delay before each poll attempt: zero first, then growing to the cap
#[derive(Clone, Debug)]
pub struct Backoff {
    config: PollConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            config: config.clone(),
            attempt: 0,
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let attempt = self.attempt;
        self.attempt += 1;

        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        let max_delay = self.config.max_delay;
        let base = self.config.initial_delay.min(max_delay);
        if base.is_zero() {
            return Some(Duration::ZERO);
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.config.effective_multiplier().powi(exponent);
        let delay = Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(max_delay);
        Some(delay.min(max_delay))
    }
}

/// Merge a poll result into the world
///
/// The entity is only taken over if it is still the one the world tracks; a
/// late answer for a discarded entity must not resurrect it.
pub fn apply_poll(world: &mut WorldState, response: PollResponse) {
    world.session = Some(response.session);

    let Some(entity) = response.payment_entity else {
        return;
    };
    if world
        .payment_entity
        .as_ref()
        .is_some_and(|current| current.id == entity.id)
    {
        world.payment_entity = Some(entity);
    }
}

#[derive(Default)]
pub struct PollWorker {
    task: OwnedTask,
}

impl PollWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, sdk: &Sdk, session_id: String, payment_entity_id: String) {
        let sdk = sdk.clone();
        let config = sdk.config().poll.clone();

        self.task.spawn("poll", move |stop| async move {
            for (attempt, delay) in Backoff::new(&config).enumerate() {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if stop.is_stopped() {
                    return;
                }

                let result = sdk.api().poll(&session_id, Some(&payment_entity_id)).await;
                if stop.is_stopped() {
                    tracing::debug!(%payment_entity_id, "Discarding poll result of stopped worker");
                    return;
                }

                match result {
                    Ok(response) => {
                        tracing::trace!(attempt, %payment_entity_id, "Poll result");
                        sdk.post_update(|world| apply_poll(world, response));
                        if stop.is_stopped() {
                            return;
                        }
                    }
                    Err(err) if err.is_cancelled() => return,
                    Err(err) => {
                        tracing::warn!(attempt, error = %err, "Poll failed");
                    }
                }
            }
            tracing::info!(%payment_entity_id, "Poll attempts exhausted");
        });
    }

    pub fn stop(&self) {
        self.task.stop();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{PaymentEntity, PaymentEntityStatus, Session, SessionStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn test_backoff_schedule() {
        let config = PollConfig {
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_millis(500),
            max_attempts: 6,
        };

        let delays: Vec<u128> = Backoff::new(&config).map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![0, 100, 200, 400, 500, 500]);
    }

    #[test]
    fn test_backoff_zero_attempts() {
        let config = PollConfig {
            max_attempts: 0,
            ..PollConfig::default()
        };
        assert_eq!(Backoff::new(&config).count(), 0);
    }

    #[test]
    fn test_backoff_huge_initial_delay_is_capped() {
        let config = PollConfig {
            initial_delay: Duration::from_millis(u64::MAX),
            max_attempts: 25,
            ..PollConfig::default()
        };

        let delays: Vec<Duration> = Backoff::new(&config).collect();
        assert_eq!(delays.len(), 25);
        assert_eq!(delays[0], Duration::ZERO);
        assert!(delays[1..].iter().all(|d| *d == config.max_delay));
    }

    #[test]
    fn test_backoff_huge_factor_is_capped() {
        let config = PollConfig {
            initial_delay: Duration::from_millis(100),
            multiplier: f64::MAX,
            max_delay: Duration::from_secs(2),
            max_attempts: 5,
        };

        let delays: Vec<u128> = Backoff::new(&config).map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![0, 100, 2000, 2000, 2000]);
    }

    #[test]
    fn test_backoff_bad_multiplier_means_constant_delay() {
        for multiplier in [-2.0, 0.5, f64::NAN] {
            let config = PollConfig {
                initial_delay: Duration::from_millis(100),
                multiplier,
                max_delay: Duration::from_secs(1),
                max_attempts: 4,
            };

            let delays: Vec<u128> = Backoff::new(&config).map(|d| d.as_millis()).collect();
            assert_eq!(delays, vec![0, 100, 100, 100], "multiplier {multiplier}");
        }
    }

    #[test]
    fn test_apply_poll_ignores_stale_entity() {
        let mut session = Session::new("ps-1", dec!(10000), "IDR");
        let mut world = WorldState::active(session.clone());
        world.payment_entity = Some(PaymentEntity::new("pr-2", "ID_DANA", PaymentEntityStatus::Pending));

        session.status = SessionStatus::Completed;
        apply_poll(
            &mut world,
            PollResponse {
                session,
                payment_entity: Some(PaymentEntity::new("pr-1", "ID_DANA", PaymentEntityStatus::Failed)),
            },
        );

        assert_eq!(world.session.as_ref().unwrap().status, SessionStatus::Completed);
        let entity = world.payment_entity.unwrap();
        assert_eq!(entity.id, "pr-2");
        assert_eq!(entity.status, PaymentEntityStatus::Pending);
    }
}
