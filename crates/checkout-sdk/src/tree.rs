//! Tree Builder
//!
//! Pure function from a [`WorldState`] to the behavior chain that should be
//! active. Every match is exhaustive: a status this integration does not
//! handle is an error, never a silent fallthrough.
//!
//! ```text
//! Loading
//! FatalError(message)
//! Active(session)
//! ├── SessionCompleted
//! ├── SessionFailed(status)
//! ├── ChannelPicker
//! ├── ChannelInvalid(code)
//! ├── ChannelValid(code)
//! │   └── CardLookup(bin)
//! └── Submission(session)
//!     ├── PaymentPending(entity, generation)
//!     │   └── SimulatePayment(entity)
//!     ├── RequiresAction(entity, generation)
//!     │   ├── ActionIframe(url)
//!     │   ├── ActionRedirect(url)
//!     │   └── SimulatePayment(entity)  (action completed)
//!     └── PaymentFailed(entity, status)
//! ```

use std::rc::Rc;

use checkout_core::{
    ActionDescriptor, ActionType, Channel, CoreError, PaymentAction, PaymentEntity,
    PaymentEntityStatus, Result, SdkStatus, Session, SessionStatus, WorldState, subjects,
};

use crate::behaviors::{
    ActionIframe, ActionRedirect, Active, CardLookup, ChannelInvalid, ChannelPicker, ChannelValid,
    FatalError, Loading, PaymentFailed, PaymentPending, RequiresAction, SessionCompleted,
    SessionFailed, SimulatePayment, Submission,
};
use crate::sdk::SdkNode;

/// Digits of a card number needed for a BIN lookup
pub const BIN_LENGTH: usize = 6;

/// Chain for `world`, root first
pub fn build_tree(world: &WorldState) -> Result<Option<Rc<SdkNode>>> {
    let root = match world.sdk_status {
        SdkStatus::Loading => SdkNode::new::<Loading>(subjects![]),
        SdkStatus::FatalError => SdkNode::new::<FatalError>(subjects![
            world.fatal_error.clone().unwrap_or_default()
        ]),
        SdkStatus::Active => {
            let session = world.session.as_ref().ok_or(CoreError::MissingField("session"))?;
            SdkNode::with_child::<Active>(subjects![&session.id], session_tree(world, session)?)
        }
    };
    Ok(Some(root))
}

fn session_tree(world: &WorldState, session: &Session) -> Result<Option<Rc<SdkNode>>> {
    let node = match session.status {
        SessionStatus::Active => {
            if world.flags.submission_requested || world.payment_entity.is_some() {
                submission_tree(world, session)?
            } else {
                form_tree(world, session)?
            }
        }
        SessionStatus::Completed => SdkNode::new::<SessionCompleted>(subjects![&session.id]),
        SessionStatus::Expired | SessionStatus::Canceled => {
            SdkNode::new::<SessionFailed>(subjects![session.status.as_str()])
        }
    };
    Ok(Some(node))
}

fn form_tree(world: &WorldState, session: &Session) -> Result<Rc<SdkNode>> {
    let Some(code) = &world.channel_code else {
        return Ok(SdkNode::new::<ChannelPicker>(subjects![]));
    };
    let channel = session
        .channel(code)
        .ok_or(CoreError::MissingField("channel"))?;

    if channel.accepts(&world.channel_properties) {
        Ok(SdkNode::with_child::<ChannelValid>(
            subjects![code],
            card_lookup(world, channel),
        ))
    } else {
        Ok(SdkNode::with_child::<ChannelInvalid>(
            subjects![code],
            card_lookup(world, channel),
        ))
    }
}

fn card_lookup(world: &WorldState, channel: &Channel) -> Option<Rc<SdkNode>> {
    if !channel.is_card {
        return None;
    }
    let digits = world.card_number_digits()?;
    (digits.len() >= BIN_LENGTH)
        .then(|| SdkNode::new::<CardLookup>(subjects![&digits[..BIN_LENGTH]]))
}

fn submission_tree(world: &WorldState, session: &Session) -> Result<Rc<SdkNode>> {
    let child = match &world.payment_entity {
        Some(entity) => Some(payment_entity_tree(world, entity)?),
        None => None,
    };
    Ok(SdkNode::with_child::<Submission>(subjects![&session.id], child))
}

fn payment_entity_tree(world: &WorldState, entity: &PaymentEntity) -> Result<Rc<SdkNode>> {
    let generation = world.flags.poll_generation;
    let simulate = world
        .flags
        .simulate_payment_requested
        .then(|| SdkNode::new::<SimulatePayment>(subjects![&entity.id]));

    match entity.status {
        PaymentEntityStatus::Pending | PaymentEntityStatus::Active | PaymentEntityStatus::Succeeded => {
            Ok(SdkNode::with_child::<PaymentPending>(
                subjects![&entity.id, generation],
                simulate,
            ))
        }
        PaymentEntityStatus::RequiresAction => {
            let child = if world.flags.action_completed {
                simulate
            } else {
                let action = entity.actions.first().ok_or_else(|| {
                    CoreError::Unreachable(format!("payment entity {} requires action but has none", entity.id))
                })?;
                Some(action_tree(world, action)?)
            };
            Ok(SdkNode::with_child::<RequiresAction>(
                subjects![&entity.id, generation],
                child,
            ))
        }
        PaymentEntityStatus::Failed | PaymentEntityStatus::Expired | PaymentEntityStatus::Canceled => {
            Ok(SdkNode::new::<PaymentFailed>(subjects![&entity.id, entity.status.as_str()]))
        }
        PaymentEntityStatus::AcceptingPayments | PaymentEntityStatus::Authorized => {
            Err(CoreError::Unreachable(format!(
                "payment entity status {} is not used by checkout sessions",
                entity.status
            )))
        }
    }
}

fn action_tree(world: &WorldState, action: &PaymentAction) -> Result<Rc<SdkNode>> {
    let unsupported = || CoreError::UnsupportedAction {
        action_type: action.action_type.as_str().to_string(),
        descriptor: action.descriptor.as_str().to_string(),
    };

    match action.action_type {
        ActionType::RedirectCustomer => match action.descriptor {
            ActionDescriptor::WebUrl => {
                if can_use_iframe(action, &world.channel_properties) {
                    Ok(SdkNode::new::<ActionIframe>(subjects![&action.value]))
                } else {
                    Ok(SdkNode::new::<ActionRedirect>(subjects![&action.value]))
                }
            }
            ActionDescriptor::DeeplinkUrl
            | ActionDescriptor::QrString
            | ActionDescriptor::PaymentCode
            | ActionDescriptor::Captcha => Err(unsupported()),
        },
        ActionType::PresentToCustomer | ActionType::ApiPostRequest => Err(unsupported()),
    }
}

/// Whether a web-url action may be shown embedded
///
/// Needs the backend's hint and an https page. A merchant-supplied return url
/// means the customer is expected to leave the page, so no iframe then.
pub fn can_use_iframe(
    action: &PaymentAction,
    channel_properties: &serde_json::Map<String, serde_json::Value>,
) -> bool {
    action.iframe_capable
        && action.value.starts_with("https://")
        && !channel_properties.contains_key("success_return_url")
}

/// Session active, channel selected and its required fields filled
pub fn form_is_valid(world: &WorldState) -> bool {
    let (Some(session), Some(code)) = (&world.session, &world.channel_code) else {
        return false;
    };
    session.status == SessionStatus::Active
        && session
            .channel(code)
            .is_some_and(|channel| channel.accepts(&world.channel_properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::chain;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn session() -> Session {
        Session::new("ps-1", dec!(150000), "IDR")
            .with_channel(Channel::new("ID_DANA", "DANA"))
            .with_channel(
                Channel::new("CARDS", "Card")
                    .card()
                    .with_required(&["card_number", "expiry_month", "cvn"]),
            )
    }

    fn names(world: &WorldState) -> Vec<&'static str> {
        let root = build_tree(world).unwrap();
        chain(root.as_ref()).map(|n| n.name()).collect()
    }

    fn submitting(status: PaymentEntityStatus) -> WorldState {
        let mut world = WorldState::active(session());
        world.channel_code = Some("ID_DANA".into());
        world.payment_entity = Some(
            PaymentEntity::new("pr-1", "ID_DANA", status)
                .with_action(PaymentAction::redirect("https://pay.example/auth").iframe_capable()),
        );
        world
    }

    #[test]
    fn test_loading_and_fatal() {
        assert_eq!(names(&WorldState::loading()), vec!["Loading"]);

        let world = WorldState {
            sdk_status: SdkStatus::FatalError,
            fatal_error: Some("session not found".into()),
            ..WorldState::default()
        };
        let root = build_tree(&world).unwrap().unwrap();
        assert_eq!(root.name(), "FatalError");
        assert_eq!(root.subjects().str(0).unwrap(), "session not found");
    }

    #[test]
    fn test_active_without_session_is_error() {
        let world = WorldState {
            sdk_status: SdkStatus::Active,
            ..WorldState::default()
        };
        assert!(matches!(build_tree(&world), Err(CoreError::MissingField("session"))));
    }

    #[test]
    fn test_form_states() {
        let mut world = WorldState::active(session());
        assert_eq!(names(&world), vec!["Active", "ChannelPicker"]);

        world.channel_code = Some("CARDS".into());
        world.channel_properties.insert("card_number".into(), json!("4000 00"));
        assert_eq!(names(&world), vec!["Active", "ChannelInvalid", "CardLookup"]);

        world.channel_properties.insert("expiry_month".into(), json!("12"));
        world.channel_properties.insert("cvn".into(), json!("123"));
        let root = build_tree(&world).unwrap();
        let nodes: Vec<_> = chain(root.as_ref()).collect();
        assert_eq!(nodes[1].name(), "ChannelValid");
        assert_eq!(nodes[2].subjects().str(0).unwrap(), "400000");
        assert!(form_is_valid(&world));
    }

    #[test]
    fn test_short_card_number_has_no_lookup() {
        let mut world = WorldState::active(session());
        world.channel_code = Some("CARDS".into());
        world.channel_properties.insert("card_number".into(), json!("4000"));
        assert_eq!(names(&world), vec!["Active", "ChannelInvalid"]);
        assert!(!form_is_valid(&world));
    }

    #[test]
    fn test_session_terminal_states_override_submission() {
        let mut world = submitting(PaymentEntityStatus::Pending);

        world.session.as_mut().unwrap().status = SessionStatus::Completed;
        assert_eq!(names(&world), vec!["Active", "SessionCompleted"]);

        world.session.as_mut().unwrap().status = SessionStatus::Expired;
        let root = build_tree(&world).unwrap();
        let failed = chain(root.as_ref()).last().unwrap();
        assert_eq!(failed.name(), "SessionFailed");
        assert_eq!(failed.subjects().str(0).unwrap(), "EXPIRED");
    }

    #[test]
    fn test_submission_chain() {
        let mut world = WorldState::active(session());
        world.channel_code = Some("ID_DANA".into());
        world.flags.submission_requested = true;
        assert_eq!(names(&world), vec!["Active", "Submission"]);

        let mut world = submitting(PaymentEntityStatus::Pending);
        world.flags.simulate_payment_requested = true;
        assert_eq!(names(&world), vec!["Active", "Submission", "PaymentPending", "SimulatePayment"]);

        let world = submitting(PaymentEntityStatus::Canceled);
        assert_eq!(names(&world), vec!["Active", "Submission", "PaymentFailed"]);
    }

    #[test]
    fn test_poll_generation_is_a_subject() {
        let mut world = submitting(PaymentEntityStatus::Pending);
        let before = build_tree(&world).unwrap().unwrap();
        world.flags.poll_generation += 1;
        let after = build_tree(&world).unwrap().unwrap();

        assert!(before.same_as(&after));
        let pending = |root: &Rc<SdkNode>| chain(Some(root)).nth(2).unwrap();
        assert!(!pending(&before).same_as(&pending(&after)));
    }

    #[test]
    fn test_requires_action_picks_iframe_or_redirect() {
        let mut world = submitting(PaymentEntityStatus::RequiresAction);
        assert_eq!(names(&world), vec!["Active", "Submission", "RequiresAction", "ActionIframe"]);

        world
            .channel_properties
            .insert("success_return_url".into(), json!("https://shop.example/done"));
        assert_eq!(names(&world), vec!["Active", "Submission", "RequiresAction", "ActionRedirect"]);

        world.flags.action_completed = true;
        assert_eq!(names(&world), vec!["Active", "Submission", "RequiresAction"]);

        world.flags.simulate_payment_requested = true;
        assert_eq!(names(&world), vec!["Active", "Submission", "RequiresAction", "SimulatePayment"]);
    }

    #[test]
    fn test_can_use_iframe() {
        let props = serde_json::Map::new();
        assert!(can_use_iframe(&PaymentAction::redirect("https://a.example").iframe_capable(), &props));
        assert!(!can_use_iframe(&PaymentAction::redirect("https://a.example"), &props));
        assert!(!can_use_iframe(&PaymentAction::redirect("http://a.example").iframe_capable(), &props));
    }

    #[test]
    fn test_unsupported_action_is_error() {
        let mut world = submitting(PaymentEntityStatus::RequiresAction);
        let entity = world.payment_entity.as_mut().unwrap();
        entity.actions[0].descriptor = ActionDescriptor::QrString;

        assert!(matches!(
            build_tree(&world),
            Err(CoreError::UnsupportedAction { ref descriptor, .. }) if descriptor == "QR_STRING"
        ));
    }

    #[test]
    fn test_requires_action_without_actions_is_unreachable() {
        let mut world = submitting(PaymentEntityStatus::RequiresAction);
        world.payment_entity.as_mut().unwrap().actions.clear();
        assert!(matches!(build_tree(&world), Err(CoreError::Unreachable(_))));
    }

    #[test]
    fn test_unused_entity_status_is_unreachable() {
        let world = submitting(PaymentEntityStatus::Authorized);
        assert!(matches!(build_tree(&world), Err(CoreError::Unreachable(_))));
    }
}
