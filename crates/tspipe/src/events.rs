use tracing::{debug, error, info, warn};

use crate::artifact::Artifact;
use crate::error::{Error, Result};

/// Progress hooks for an invocation.
///
/// `on_stdout` and `on_stderr` may be called from different tasks at the
/// same time; lines keep their order within one stream only.
pub trait Observer: Send + Sync {
    fn on_start(&self) {}
    fn on_end(&self, _result: &Result<()>) {}
    fn on_artifact(&self, _artifact: &Artifact) {}
    fn on_stdout(&self, _line: &str) {}
    fn on_stderr(&self, _line: &str) {}
    /// Faults that do not decide the invocation's result, such as a
    /// compiler that could not be started.
    fn on_error(&self, _error: &Error) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_start(&self) {
        debug!("invocation started");
    }

    fn on_end(&self, result: &Result<()>) {
        match result {
            Ok(()) => debug!("invocation finished"),
            Err(err) => warn!(error = %err, "invocation failed"),
        }
    }

    fn on_artifact(&self, artifact: &Artifact) {
        debug!(path = %artifact.path.display(), "emitted");
    }

    fn on_stdout(&self, line: &str) {
        info!(target: "tspipe::tsc", "{line}");
    }

    fn on_stderr(&self, line: &str) {
        warn!(target: "tspipe::tsc", "{line}");
    }

    fn on_error(&self, error: &Error) {
        error!(error = %error, "compiler process error");
    }
}
