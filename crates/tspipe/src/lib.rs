//! Runs an external TypeScript compiler for a build pipeline and
//! republishes what it emitted.
//!
//! An [`Invocation`] writes the compiler's arguments to a response file,
//! lets `tsc` emit into a private temporary directory, then collects the
//! emitted scripts, source maps and declaration files as [`Artifact`]s
//! placed under the configured output directory.

pub mod args;
pub mod artifact;
pub mod compiler;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod invocation;
pub mod paths;
pub mod registry;
pub mod rewrite;
pub mod runner;
pub mod tracing_config;
pub mod workspace;

pub use args::SourceFile;
pub use artifact::{Artifact, ArtifactKind};
pub use config::{Config, SearchLocation};
pub use error::{Error, Result};
pub use events::{Observer, TracingObserver};
pub use filter::{FilterDecision, PathFilter};
pub use invocation::{Completion, Invocation};
pub use registry::Registry;
