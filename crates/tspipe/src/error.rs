use std::path::PathBuf;

/// Errors produced while running an invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("compilation aborted")]
    Aborted,

    #[error("failed to create temporary directory under {}", .root.display())]
    TempDir {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to create placeholder file in {}; set `keepTree: false` to disable directory structure preservation",
        .dir.display()
    )]
    Placeholder {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write compiler argument file")]
    ArgumentFile {
        #[source]
        source: std::io::Error,
    },

    #[error("{}", describe_exit(.code))]
    ProcessFailed { code: Option<i32> },

    #[error("failed to run {}", .program.display())]
    Process {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read compiler output {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid source map {}", .path.display())]
    SourceMap {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("path filter: {0}")]
    Filter(String),

    #[error("configuration: {0}")]
    Config(String),
}

impl Error {
    /// Exit code of the compiler when this is a process failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::ProcessFailed { code } => *code,
            _ => None,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("tsc exited with code {code}"),
        None => "tsc was terminated by a signal".to_string(),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
