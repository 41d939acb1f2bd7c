#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use tspipe::{Config, Invocation, Registry};
use tspipe_cli::args::CliArgs;
use tspipe_cli::output;
use tspipe_cli::reporter::{EXIT_INVOCATION_ERROR, EXIT_SUCCESS, Reporter};

fn main() -> Result<()> {
    // Initialize tracing if TSPIPE_LOG or RUST_LOG is set.
    tspipe::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;

    let base = match args.config.as_ref() {
        Some(path) => Config::load(&cwd.join(path))
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::default(),
    };
    let config = args.apply_to(base);
    let dest = args.destination(&config, &cwd);
    let sources = args.sources(&cwd);

    let color = !args.no_color && std::io::stderr().is_terminal();
    colored::control::set_override(color);
    let reporter = Arc::new(Reporter::new(color));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let started = Instant::now();
    let completion = runtime.block_on(async {
        let registry = Registry::global();
        let interrupt = {
            let registry = registry.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, aborting");
                    registry.abort_all(|| debug!("abort complete"));
                }
            })
        };

        let completion = Invocation::new(sources, config)
            .with_registry(registry)
            .with_observer(reporter.clone())
            .run(&cwd)
            .await;
        interrupt.abort();
        completion
    });

    let mut written = 0;
    for artifact in &completion.artifacts {
        if args.dry_run {
            eprintln!("{}", reporter.format_written(artifact));
            written += 1;
            continue;
        }
        match output::write_artifact(&dest, artifact) {
            Ok(path) => {
                debug!(path = %path.display(), "wrote artifact");
                written += 1;
            }
            Err(err) => {
                eprintln!("{err:#}");
                std::process::exit(EXIT_INVOCATION_ERROR);
            }
        }
    }

    eprintln!(
        "{}",
        reporter.summary(written, &completion.result, started.elapsed())
    );

    let code = reporter.exit_code(&completion.result);
    if code != EXIT_SUCCESS {
        std::process::exit(code);
    }
    Ok(())
}
