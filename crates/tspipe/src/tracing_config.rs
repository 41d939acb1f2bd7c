//! Opt-in diagnostics for the `tspipe` library and binary.
//!
//! Nothing is installed unless `TSPIPE_LOG` or `RUST_LOG` holds a filter
//! directive. Compiler output lines are logged under the `tspipe::tsc`
//! target, stage transitions under the module targets (`tspipe::invocation`,
//! `tspipe::rewrite`, ...).
//!
//! `TSPIPE_LOG_FORMAT` picks the layout: `text` (default), `tree` for nested
//! spans, or `json` for log shippers.
//!
//! ```bash
//! TSPIPE_LOG=tspipe::tsc=info tspipe src/*.ts
//! TSPIPE_LOG=tspipe=debug TSPIPE_LOG_FORMAT=json tspipe --outDir build src/*.ts
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Unrecognised values fall back to [`LogFormat::Text`].
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

fn filter_directive() -> Option<String> {
    std::env::var("TSPIPE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
}

/// Install the global subscriber on stderr, if a filter is configured.
pub fn init_tracing() {
    let Some(directive) = filter_directive() else {
        return;
    };
    let filter = EnvFilter::builder().parse_lossy(directive);
    let format = LogFormat::parse(&std::env::var("TSPIPE_LOG_FORMAT").unwrap_or_default());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Tree => registry
            .with(
                tracing_tree::HierarchicalLayer::default()
                    .with_indent_amount(2)
                    .with_targets(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse(" Tree "), LogFormat::Tree);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }
}
