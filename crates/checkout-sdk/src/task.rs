//! Owned background tasks
//!
//! Behaviors start their asynchronous work in `enter` and must stop it in
//! `exit`. A stopped task never touches the world again: the future is
//! aborted at its next suspension point, and code already running past an
//! await checks the [`StopSignal`] before applying results.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::future::{AbortHandle, abortable};

/// Cooperative stop flag shared with a running task
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Rc<Cell<bool>>);

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }

    fn stop(&self) {
        self.0.set(true);
    }
}

struct Running {
    signal: StopSignal,
    abort: AbortHandle,
}

/// Handle to at most one local task; stopping (or dropping) it cancels the task
#[derive(Default)]
pub struct OwnedTask {
    running: RefCell<Option<Running>>,
}

impl OwnedTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn onto the current `LocalSet`, stopping any previous task first
    pub fn spawn<F, Fut>(&self, name: &'static str, make: F)
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.stop();

        let signal = StopSignal::default();
        let (future, abort) = abortable(make(signal.clone()));
        tokio::task::spawn_local(async move {
            if future.await.is_err() {
                tracing::trace!(task = name, "task aborted");
            }
        });

        *self.running.borrow_mut() = Some(Running { signal, abort });
    }

    pub fn stop(&self) {
        if let Some(running) = self.running.borrow_mut().take() {
            running.signal.stop();
            running.abort.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .borrow()
            .as_ref()
            .is_some_and(|r| !r.signal.is_stopped() && !r.abort.is_aborted())
    }
}

impl Drop for OwnedTask {
    fn drop(&mut self) {
        self.stop();
    }
}
