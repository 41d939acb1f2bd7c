use colored::Colorize;
use std::sync::Mutex;
use std::time::Duration;

use tspipe::{Artifact, Error, Observer};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_INVOCATION_ERROR: i32 = 1;
pub const EXIT_COMPILER_FAILED: i32 = 2;

/// Prints compiler output as it arrives and keeps out-of-band errors for the summary.
pub struct Reporter {
    color: bool,
    errors: Mutex<Vec<String>>,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter {
            color,
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn paint(&self, text: &str, style: fn(&str) -> colored::ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_stderr(&self, line: &str) -> String {
        format!("{} {line}", self.paint("tsc:", |s| s.yellow()))
    }

    pub fn format_written(&self, artifact: &Artifact) -> String {
        format!("{} {}", self.paint("wrote", |s| s.green()), artifact.relative())
    }

    /// Process exit code for `result`. An out-of-band error such as a
    /// compiler that never started fails the run even when `result` is `Ok`.
    pub fn exit_code(&self, result: &tspipe::Result<()>) -> i32 {
        match result {
            Err(Error::ProcessFailed { .. }) => EXIT_COMPILER_FAILED,
            Err(_) => EXIT_INVOCATION_ERROR,
            Ok(()) if !self.errors().is_empty() => EXIT_INVOCATION_ERROR,
            Ok(()) => EXIT_SUCCESS,
        }
    }

    /// One-line result for the whole run.
    pub fn summary(&self, written: usize, result: &tspipe::Result<()>, elapsed: Duration) -> String {
        let files = if written == 1 { "file" } else { "files" };
        let timing = format!("in {:.2}s", elapsed.as_secs_f64());
        match result {
            Ok(()) if self.errors().is_empty() => format!(
                "{} {written} {files} {timing}",
                self.paint("Compiled", |s| s.green().bold())
            ),
            Ok(()) => format!(
                "{} {written} {files} {timing} with {} error(s)",
                self.paint("Finished", |s| s.yellow().bold()),
                self.errors().len()
            ),
            Err(err) => format!(
                "{} {err} ({written} {files} {timing})",
                self.paint("Failed:", |s| s.red().bold())
            ),
        }
    }
}

#[allow(clippy::print_stderr)]
impl Observer for Reporter {
    fn on_stdout(&self, line: &str) {
        println!("{line}");
    }

    fn on_stderr(&self, line: &str) {
        eprintln!("{}", self.format_stderr(line));
    }

    fn on_error(&self, error: &Error) {
        eprintln!("{} {error}", self.paint("error:", |s| s.red().bold()));
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(error.to_string());
    }
}
