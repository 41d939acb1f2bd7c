//! One compile-and-republish request.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::args::{SourceFile, build_arguments, render_argument_file};
use crate::artifact::Artifact;
use crate::compiler;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Observer, TracingObserver};
use crate::registry::Registry;
use crate::rewrite::{RewriteContext, collect_artifacts};
use crate::runner::{self, RunOutcome};
use crate::workspace::{self, Placeholder, Workspace};

/// What an invocation produced.
///
/// `artifacts` can be non-empty even when `result` is an error: outside safe
/// mode the output of a failed compile is still published.
#[derive(Debug)]
pub struct Completion {
    pub artifacts: Vec<Artifact>,
    pub result: Result<()>,
}

pub struct Invocation {
    sources: Vec<SourceFile>,
    config: Config,
    registry: Arc<Registry>,
    observer: Arc<dyn Observer>,
}

impl Invocation {
    pub fn new(sources: Vec<SourceFile>, config: Config) -> Self {
        Invocation {
            sources,
            config,
            registry: Registry::global(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every stage, then clean up whatever was created.
    ///
    /// The end event fires after cleanup and before the invocation stops
    /// counting as running.
    pub async fn run(self, cwd: &Path) -> Completion {
        let guard = self.registry.enter();
        self.observer.on_start();

        let mut scratch = Workspace::new();
        let mut artifacts = Vec::new();
        let result = self.execute(cwd, &mut scratch, &mut artifacts).await;
        scratch.cleanup();

        self.observer.on_end(&result);
        drop(guard);
        Completion { artifacts, result }
    }

    async fn execute(
        &self,
        cwd: &Path,
        scratch: &mut Workspace,
        artifacts: &mut Vec<Artifact>,
    ) -> Result<()> {
        self.registry.check()?;
        let program = compiler::locate(&self.config, cwd)?;
        let version = match compiler::version(&program).await {
            Ok(version) => version,
            Err(err @ Error::Process { .. }) => {
                self.observer.on_error(&err);
                return Ok(());
            }
            Err(err) => {
                warn!(error = %err, "continuing with unknown compiler version");
                String::new()
            }
        };

        self.registry.check()?;
        let temp_root = self.config.temp_root();
        let temp_dir = scratch
            .set_temp_dir(workspace::create_temp_dir(&temp_root)?)
            .to_path_buf();

        self.registry.check()?;
        if let Some(placeholder) = workspace::create_placeholder(&self.sources, &self.config)? {
            scratch.set_placeholder(placeholder);
        }

        self.registry.check()?;
        let args = build_arguments(
            &self.config,
            &version,
            Some(temp_dir.as_path()),
            &self.sources,
            scratch.placeholder().map(Placeholder::path),
        );
        debug!(?args, "compiler arguments");
        let argument_file = scratch
            .set_argument_file(workspace::create_argument_file(
                &temp_root,
                &render_argument_file(&args)?,
            )?)
            .to_path_buf();

        self.registry.check()?;
        let outcome = runner::run(&program, &argument_file, cwd, self.observer.clone()).await;
        let run_result = match outcome {
            RunOutcome::Succeeded | RunOutcome::Errored => Ok(()),
            RunOutcome::Failed { code } => Err(Error::ProcessFailed { code }),
        };
        if self.config.safe && outcome != RunOutcome::Succeeded {
            debug!("safe mode: skipping output after compiler failure");
            return run_result;
        }

        self.registry.check()?;
        let out_dir = self.config.resolved_out_dir(cwd);
        let placeholder_stem = scratch.placeholder().map(Placeholder::stem);
        let ctx = RewriteContext {
            temp_dir: &temp_dir,
            output_root: out_dir.as_deref().unwrap_or(&temp_dir),
            placeholder_stem: placeholder_stem.as_deref(),
            config: &self.config,
        };
        let collected = collect_artifacts(&ctx)?;
        for artifact in &collected {
            self.observer.on_artifact(artifact);
        }
        artifacts.extend(collected);

        run_result
    }
}
