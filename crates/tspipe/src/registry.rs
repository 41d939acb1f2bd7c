//! Process-wide bookkeeping of running invocations and abort requests.
//!
//! An abort request sets a flag that running invocations observe between
//! stages. Its callback fires once no invocation is running, after which the
//! flag is cleared again.

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::{Error, Result};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    running: usize,
    aborted: bool,
    pending: Vec<Callback>,
}

#[derive(Default)]
pub struct Registry {
    state: Mutex<State>,
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registry shared by every invocation that was not given its own.
    pub fn global() -> Arc<Registry> {
        GLOBAL.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking callback never runs under the lock, so the state is
        // consistent even if the mutex is poisoned.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn running(&self) -> usize {
        self.lock().running
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Fail with [`Error::Aborted`] if an abort is pending.
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }

    /// Request that all running invocations stop.
    ///
    /// `callback` runs immediately if nothing is running, otherwise when the
    /// last running invocation finishes.
    pub fn abort_all<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let drained = {
            let mut state = self.lock();
            state.aborted = true;
            state.pending.push(Box::new(callback));
            debug!(running = state.running, "abort requested");
            if state.running == 0 {
                Some(drain(&mut state))
            } else {
                None
            }
        };
        run_callbacks(drained);
    }

    /// Like [`Registry::abort_all`], resolving once every invocation has stopped.
    pub async fn abort_all_and_wait(&self) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.abort_all(move || {
            let _ = tx.send(());
        });
        let _ = rx.await;
    }

    /// Mark an invocation as running until the guard is dropped.
    pub fn enter(self: &Arc<Self>) -> RunningGuard {
        self.lock().running += 1;
        RunningGuard {
            registry: Arc::clone(self),
        }
    }

    fn exit(&self) {
        let drained = {
            let mut state = self.lock();
            state.running = state.running.saturating_sub(1);
            if state.running == 0 && state.aborted {
                Some(drain(&mut state))
            } else {
                None
            }
        };
        run_callbacks(drained);
    }
}

fn drain(state: &mut State) -> Vec<Callback> {
    state.aborted = false;
    std::mem::take(&mut state.pending)
}

fn run_callbacks(callbacks: Option<Vec<Callback>>) {
    for callback in callbacks.into_iter().flatten() {
        callback();
    }
}

/// Keeps an invocation counted as running.
pub struct RunningGuard {
    registry: Arc<Registry>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.registry.exit();
    }
}
