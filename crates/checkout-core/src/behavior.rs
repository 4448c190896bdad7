//! Behavior Lifecycle
//!
//! A behavior is a unit of lifecycle logic attached to one position of the
//! behavior chain. The runner constructs it when its node becomes active and
//! drives it through `enter` / `update` / `exit`.
//!
//! Hooks take `&self`: a hook may trigger a nested update cycle that exits
//! the very behavior currently running, so behaviors keep their mutable state
//! in `Cell` / `RefCell`.

use std::any::Any;

use crate::error::Result;
use crate::node::Subjects;

/// Lifecycle hooks - implement to add a new state to the chain
pub trait Behavior: Any {
    /// Called once, after the whole child subtree has been entered
    fn enter(&self) -> Result<()>;

    /// Called on every update cycle in which the node is unchanged
    fn update(&self) -> Result<()> {
        Ok(())
    }

    /// Called once when the node leaves the chain, after its children exited
    fn exit(&self) -> Result<()> {
        Ok(())
    }
}

/// Construction side of a behavior, used as the node's `impl` tag
///
/// `C` is the context injected into every instance (the SDK handle in
/// production, a recorder in tests).
pub trait BehaviorImpl<C>: Behavior + Sized {
    /// Name used in logs and `Debug` output
    const NAME: &'static str;

    /// Build an instance from the context and the node's subjects
    fn construct(ctx: &C, subjects: &Subjects) -> Result<Self>;
}
