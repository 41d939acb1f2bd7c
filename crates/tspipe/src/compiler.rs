//! Finding the compiler executable and asking it for its version.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::config::{Config, SearchLocation};
use crate::error::{Error, Result};

#[cfg(windows)]
const EXECUTABLE_NAMES: &[&str] = &["tsc.cmd", "tsc.exe", "tsc"];
#[cfg(not(windows))]
const EXECUTABLE_NAMES: &[&str] = &["tsc"];

/// Resolve the compiler to run for `config`.
pub fn locate(config: &Config, cwd: &Path) -> Result<PathBuf> {
    if let Some(path) = config.tsc_path.as_ref() {
        let path = if path.is_absolute() || path.components().count() > 1 {
            cwd.join(path)
        } else {
            // A bare name like `tsc` is looked up on PATH by the OS.
            path.clone()
        };
        debug!(path = %path.display(), "using configured compiler");
        return Ok(path);
    }

    let mut searched = Vec::new();
    for location in &config.tsc_search {
        let candidates: Vec<PathBuf> = match location {
            SearchLocation::Cwd => {
                let bin = cwd.join("node_modules").join(".bin");
                EXECUTABLE_NAMES.iter().map(|name| bin.join(name)).collect()
            }
            SearchLocation::Shell => std::env::var_os("PATH")
                .map(|paths| {
                    std::env::split_paths(&paths)
                        .flat_map(|dir| EXECUTABLE_NAMES.iter().map(move |name| dir.join(name)))
                        .collect()
                })
                .unwrap_or_default(),
        };

        if let Some(found) = candidates.iter().find(|candidate| candidate.is_file()) {
            debug!(path = %found.display(), ?location, "found compiler");
            return Ok(found.clone());
        }
        searched.push(format!("{location:?}").to_lowercase());
    }

    Err(Error::Config(format!(
        "tsc not found (searched: {}); set `tscPath` to the compiler executable",
        if searched.is_empty() {
            "nothing".to_string()
        } else {
            searched.join(", ")
        }
    )))
}

/// Extract `X.Y.Z` from `tsc --version` output.
pub fn parse_version(output: &str) -> Option<String> {
    static VERSION_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Version\s+(\d+\.\d+\.\d+\S*)").expect("valid regex"));

    VERSION_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Run `<program> --version` and parse the result.
pub async fn detect_version(program: &Path) -> Result<String> {
    let output = tokio::process::Command::new(program)
        .arg("--version")
        .output()
        .await
        .map_err(|source| Error::Process {
            program: program.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = parse_version(&stdout).ok_or_else(|| {
        Error::Config(format!(
            "could not determine compiler version from {}: {}",
            program.display(),
            stdout.trim()
        ))
    })?;
    debug!(%version, "detected compiler version");
    Ok(version)
}

static VERSIONS: Lazy<Mutex<HashMap<PathBuf, String>>> = Lazy::new(Default::default);

/// [`detect_version`], remembered per executable for the life of the process.
pub async fn version(program: &Path) -> Result<String> {
    let cached = VERSIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(program)
        .cloned();
    if let Some(version) = cached {
        return Ok(version);
    }

    let version = detect_version(program).await?;
    VERSIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(program.to_path_buf(), version.clone());
    Ok(version)
}
