//! Tree Update Engine
//!
//! Diffs the previous behavior chain against the newly built one and runs the
//! minimal exit / construct / enter sequence so that afterwards exactly the
//! nodes of the new chain hold live instances.
//!
//! ```text
//!   previous:  Active ── Submission ── Pending(pr-1, 0)
//!                 =           =            ≠
//!   next:      Active ── Submission ── RequiresAction(pr-1, 0) ── ActionIframe(url)
//!
//!   exit Pending; construct RequiresAction, construct ActionIframe,
//!   enter ActionIframe, enter RequiresAction; update Submission, update Active
//! ```
//!
//! Ordering:
//! - exits of a changed subtree run bottom-up and all precede construction
//! - construction runs top-down, `enter()` bottom-up
//! - `update()` on unchanged nodes runs child before parent
//! - a behavior whose `enter()` has not started yet (an ancestor waiting on a
//!   nested cycle) gets neither `update()` nor `exit()`

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{CoreError, Result};
use crate::node::BehaviorNode;

/// Default ceiling for the recursion depth counter
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 100;

/// Applies chain transitions and guards against runaway recursion
///
/// The depth counter is shared by every call on the same runner, so a
/// behavior that re-enters [`update`](Self::update) from its `enter()` hook
/// consumes the same budget as the call that entered it.
#[derive(Debug)]
pub struct BehaviorTreeRunner {
    depth: Cell<usize>,
    max_depth: usize,
}

impl Default for BehaviorTreeRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the shared depth counter when a recursion step returns
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl BehaviorTreeRunner {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_RECURSION_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            depth: Cell::new(0),
            max_depth,
        }
    }

    /// Current nesting depth (zero when idle)
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    fn descend(&self) -> Result<DepthGuard<'_>> {
        let next = self.depth.get() + 1;
        if next > self.max_depth {
            return Err(CoreError::MaxRecursionDepth(self.max_depth));
        }
        self.depth.set(next);
        Ok(DepthGuard { depth: &self.depth })
    }

    /// Transition from `prev` to `next`, injecting `ctx` into new instances
    pub fn update<C>(
        &self,
        prev: Option<&Rc<BehaviorNode<C>>>,
        next: Option<&Rc<BehaviorNode<C>>>,
        ctx: &C,
    ) -> Result<()> {
        let _guard = self.descend()?;

        let (prev, next) = match (prev, next) {
            (Some(p), Some(n)) if p.same_as(n) => (p, n),
            (prev, next) => {
                if let Some(prev) = prev {
                    self.exit_subtree(prev)?;
                }
                if let Some(next) = next {
                    self.enter_subtree(next, ctx)?;
                }
                return Ok(());
            }
        };

        if !Rc::ptr_eq(prev, next) {
            next.put_instance(prev.take_instance());
        }

        self.update(prev.child().as_ref(), next.child().as_ref(), ctx)?;

        if let Some(instance) = next.live().filter(|instance| instance.has_entered()) {
            tracing::trace!(behavior = next.name(), "update");
            instance.behavior.update()?;
        }
        Ok(())
    }

    /// Exit `node` and everything below it, deepest first
    pub fn exit_subtree<C>(&self, node: &Rc<BehaviorNode<C>>) -> Result<()> {
        let _guard = self.descend()?;

        if let Some(child) = node.child() {
            self.exit_subtree(&child)?;
        }

        let Some(instance) = node.live() else {
            return Ok(());
        };
        instance.mark_exited();

        let result = if instance.has_entered() {
            tracing::debug!(behavior = node.name(), "exit");
            instance.behavior.exit()
        } else {
            tracing::debug!(behavior = node.name(), "dropping behavior that never entered");
            Ok(())
        };
        node.put_instance(None);
        result
    }

    /// Construct `node` and its subtree top-down, then enter bottom-up
    pub fn enter_subtree<C>(&self, node: &Rc<BehaviorNode<C>>, ctx: &C) -> Result<()> {
        let _guard = self.descend()?;

        tracing::debug!(behavior = node.name(), subjects = ?node.subjects(), "construct");
        let instance = node.construct(ctx)?;
        node.put_instance(Some(instance.clone()));

        if let Some(child) = node.child() {
            self.enter_subtree(&child, ctx)?;
        }

        // A nested cycle triggered below may already have torn this node down.
        if instance.is_exited() {
            tracing::debug!(behavior = node.name(), "skipping enter of exited behavior");
            return Ok(());
        }

        tracing::debug!(behavior = node.name(), "enter");
        instance.mark_entered();
        instance.behavior.enter()
    }
}

/// Upper bound on chain walks, so a cyclic chain cannot hang a lookup
const MAX_CHAIN_WALK: usize = DEFAULT_MAX_RECURSION_DEPTH;

/// Find the live instance of behavior `T` in the chain starting at `root`
pub fn find_behavior<T: 'static, C>(root: Option<&Rc<BehaviorNode<C>>>) -> Option<Rc<T>> {
    chain(root).find(|node| node.is::<T>()).and_then(|node| node.instance::<T>())
}

/// Iterate the nodes of a chain from `root` downwards
pub fn chain<C>(root: Option<&Rc<BehaviorNode<C>>>) -> impl Iterator<Item = Rc<BehaviorNode<C>>> {
    std::iter::successors(root.cloned(), |node| node.child()).take(MAX_CHAIN_WALK)
}
