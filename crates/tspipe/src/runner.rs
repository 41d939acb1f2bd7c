//! Running the compiler process and relaying its output.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::Error;
use crate::events::Observer;

/// How the compiler process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    /// Non-zero exit; `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// The process could not be started or waited on. The cause has already
    /// been reported through [`Observer::on_error`].
    Errored,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `<program> @<argument_file>` in `cwd`.
///
/// Output lines reach the observer as they are read. Returns once the
/// process has exited and both streams are drained. There is no timeout.
pub async fn run(
    program: &Path,
    argument_file: &Path,
    cwd: &Path,
    observer: Arc<dyn Observer>,
) -> RunOutcome {
    let mut command = Command::new(program);
    command
        .arg(format!("@{}", argument_file.display()))
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = %program.display(), args = %argument_file.display(), "spawning compiler");
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(source) => {
            observer.on_error(&Error::Process {
                program: program.to_path_buf(),
                source,
            });
            return RunOutcome::Errored;
        }
    };

    let mut relays = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        relays.push(tokio::spawn(relay_lines(stdout, Stream::Stdout, observer.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        relays.push(tokio::spawn(relay_lines(stderr, Stream::Stderr, observer.clone())));
    }

    let status = child.wait().await;
    for relay in relays {
        if let Err(err) = relay.await {
            warn!(error = %err, "output relay task failed");
        }
    }

    match status {
        Ok(status) if status.success() => RunOutcome::Succeeded,
        Ok(status) => {
            debug!(code = ?status.code(), "compiler failed");
            RunOutcome::Failed {
                code: status.code(),
            }
        }
        Err(source) => {
            observer.on_error(&Error::Process {
                program: program.to_path_buf(),
                source,
            });
            RunOutcome::Errored
        }
    }
}

async fn relay_lines<R>(reader: R, stream: Stream, observer: Arc<dyn Observer>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']);
                match stream {
                    Stream::Stdout => observer.on_stdout(line),
                    Stream::Stderr => observer.on_stderr(line),
                }
            }
            Err(err) => {
                warn!(?stream, error = %err, "failed to read compiler output");
                break;
            }
        }
    }
}
