//! Compiler command-line assembly and the response file format it is passed in.

use std::path::{Path, PathBuf};

use crate::config::{Config, non_empty};
use crate::error::{Error, Result};
use crate::paths;

/// Only this compiler release accepts `--suppressImplicitAnyIndexErrors`.
pub const SUPPRESS_INDEX_ERRORS_VERSION: &str = "1.0.1";

/// Input file handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Directory the file's relative path is measured from.
    pub base: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        SourceFile {
            path: path.into(),
            base: base.into(),
        }
    }
}

/// Build the ordered compiler argument list.
pub fn build_arguments(
    config: &Config,
    version: &str,
    temp_destination: Option<&Path>,
    sources: &[SourceFile],
    placeholder: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(module) = config.effective_module() {
        push_value(&mut args, "--module", &module);
    }
    if let Some(target) = non_empty(config.target.as_deref()) {
        push_value(&mut args, "--target", &target.to_uppercase());
    }
    if let Some(map_root) = non_empty(config.map_root.as_deref()) {
        push_value(&mut args, "--mapRoot", map_root);
    }
    if let Some(source_root) = non_empty(config.source_root.as_deref()) {
        push_value(&mut args, "--sourceRoot", source_root);
    }

    let flags = [
        (config.allowbool, "--allowbool"),
        (config.allowimportmodule, "--allowimportmodule"),
        (
            config.suppress_implicit_any_index_errors && version == SUPPRESS_INDEX_ERRORS_VERSION,
            "--suppressImplicitAnyIndexErrors",
        ),
        (config.declaration, "--declaration"),
        (config.no_implicit_any, "--noImplicitAny"),
        (config.no_resolve, "--noResolve"),
        (config.remove_comments, "--removeComments"),
        (config.sourcemap, "--sourcemap"),
        (config.no_lib, "--noLib"),
        (config.emit_decorator_metadata, "--emitDecoratorMetadata"),
    ];
    args.extend(
        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, flag)| flag.to_string()),
    );

    args.extend(config.additional_tsc_parameters.iter().cloned());

    match temp_destination {
        Some(temp) => {
            push_value(&mut args, "--outDir", &temp.to_string_lossy());
            if let Some(out) = non_empty(config.out.as_deref()) {
                push_value(&mut args, "--out", &paths::resolve(temp, out).to_string_lossy());
            }
        }
        None => {
            if let Some(out) = non_empty(config.out.as_deref()) {
                push_value(&mut args, "--out", out);
            }
        }
    }

    args.extend(
        sources
            .iter()
            .map(|source| source.path.to_string_lossy().into_owned()),
    );
    if let Some(placeholder) = placeholder {
        args.push(placeholder.to_string_lossy().into_owned());
    }

    args
}

fn push_value(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

/// Render arguments as a response file: one double-quoted argument per line.
///
/// tsc ends a quoted argument at the next `"` and has no escape syntax, so an
/// argument containing `"` is rejected.
pub fn render_argument_file(args: &[String]) -> Result<String> {
    let mut out = String::new();
    for arg in args {
        if arg.contains('"') {
            return Err(Error::Config(format!(
                "compiler argument cannot contain a double quote: {arg}"
            )));
        }
        out.push('"');
        out.push_str(arg);
        out.push_str("\"\n");
    }
    Ok(out)
}

/// Split a response file line into arguments, respecting quoted strings.
///
/// Quotes are stripped from the resulting tokens. Unquoted regions are split
/// on whitespace.
pub fn split_argument_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quote: Option<char> = None;

    for ch in line.chars() {
        match in_quote {
            Some(q) if ch == q => in_quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => in_quote = Some(ch),
            None if ch.is_ascii_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Parse a whole response file back into its arguments.
pub fn parse_argument_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(split_argument_line)
        .collect()
}
