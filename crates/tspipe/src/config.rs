use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::filter::PathFilter;

/// Accepts both `true` and `"true"` for boolean options.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(false),
        Some(BoolOrString::Bool(b)) => Ok(b),
        Some(BoolOrString::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{}'. Expected true, false, 'true', or 'false'",
                s
            ))),
        },
    }
}

fn default_true() -> bool {
    true
}

fn default_search() -> Vec<SearchLocation> {
    vec![SearchLocation::Cwd, SearchLocation::Shell]
}

/// Where to look for the compiler when no explicit path is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchLocation {
    /// `<cwd>/node_modules/.bin/tsc`
    Cwd,
    /// First `tsc` on `PATH`.
    Shell,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub out: Option<String>,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default)]
    pub map_root: Option<String>,
    #[serde(default)]
    pub source_root: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub allowbool: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub allowimportmodule: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub suppress_implicit_any_index_errors: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub declaration: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub no_implicit_any: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub no_resolve: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub remove_comments: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub sourcemap: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub no_lib: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub emit_decorator_metadata: bool,
    #[serde(default)]
    pub additional_tsc_parameters: Vec<String>,

    /// Publish nothing when the compiler fails.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub safe: bool,
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,
    /// Reproduce the first source's directory structure in the output.
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub keep_tree: bool,
    #[serde(default)]
    pub path_filter: Option<PathFilter>,

    #[serde(default)]
    pub tsc_path: Option<PathBuf>,
    #[serde(default = "default_search")]
    pub tsc_search: Vec<SearchLocation>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module: None,
            target: None,
            out: None,
            out_dir: None,
            map_root: None,
            source_root: None,
            allowbool: false,
            allowimportmodule: false,
            suppress_implicit_any_index_errors: false,
            declaration: false,
            no_implicit_any: false,
            no_resolve: false,
            remove_comments: false,
            sourcemap: false,
            no_lib: false,
            emit_decorator_metadata: false,
            additional_tsc_parameters: Vec::new(),
            safe: false,
            tmp_dir: None,
            keep_tree: true,
            path_filter: None,
            tsc_path: None,
            tsc_search: default_search(),
        }
    }
}

impl Config {
    /// Parse a JSON config. Line and block comments are allowed.
    pub fn from_json(source: &str) -> Result<Config> {
        let stripped = strip_jsonc(source);
        serde_json::from_str(&stripped).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Config> {
        let source = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("failed to read {}: {err}", path.display())))?;
        Config::from_json(&source).map_err(|err| match err {
            Error::Config(message) => Error::Config(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    /// Module kind passed to the compiler.
    ///
    /// Falls back to `commonjs` unless the target emits native modules.
    pub fn effective_module(&self) -> Option<String> {
        if let Some(module) = non_empty(self.module.as_deref()) {
            return Some(module.to_lowercase());
        }
        match non_empty(self.target.as_deref()) {
            Some(target) if target_has_native_modules(target) => None,
            _ => Some("commonjs".to_string()),
        }
    }

    /// Root directory for temporary output.
    pub fn temp_root(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Configured output directory resolved against `cwd`.
    pub fn resolved_out_dir(&self, cwd: &Path) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                cwd.join(dir)
            }
        })
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn target_has_native_modules(target: &str) -> bool {
    let normalized = target.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "es3" | "es5" => false,
        "es6" | "esnext" => true,
        other => other
            .strip_prefix("es")
            .and_then(|year| year.parse::<u32>().ok())
            .is_some_and(|year| year >= 2015),
    }
}

fn strip_jsonc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match (ch, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}
