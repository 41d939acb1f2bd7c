//! Scratch state owned by a single invocation.
//!
//! Everything created here is removed by [`Workspace::cleanup`], or on drop
//! if cleanup never ran.

use std::io::Write;
use std::path::Path;
use tempfile::{TempDir, TempPath};
use tracing::{debug, warn};

use crate::args::SourceFile;
use crate::config::{Config, non_empty};
use crate::error::{Error, Result};

const TEMP_DIR_PREFIX: &str = "tspipe-";
const PLACEHOLDER_PREFIX: &str = ".tspipe-tmp-";
const ARGUMENT_FILE_PREFIX: &str = "tspipe-args-";

/// Create a uniquely named directory under `root`.
pub fn create_temp_dir(root: &Path) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir_in(root)
        .map_err(|source| Error::TempDir {
            root: root.to_path_buf(),
            source,
        })?;
    debug!(path = %dir.path().display(), "created temporary output directory");
    Ok(dir)
}

/// Empty source file that makes the compiler keep the directory layout
/// below the first source's base directory.
#[derive(Debug)]
pub struct Placeholder {
    path: TempPath,
}

impl Placeholder {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without the `.ts` extension; its emitted output shares it.
    pub fn stem(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.strip_suffix(".ts").map(str::to_string).unwrap_or(name)
    }

    fn close(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Create the placeholder if structure preservation applies.
pub fn create_placeholder(sources: &[SourceFile], config: &Config) -> Result<Option<Placeholder>> {
    if !config.keep_tree || non_empty(config.out.as_deref()).is_some() {
        return Ok(None);
    }
    let Some(first) = sources.first() else {
        return Ok(None);
    };

    let dir = &first.base;
    let file = tempfile::Builder::new()
        .prefix(PLACEHOLDER_PREFIX)
        .suffix(".ts")
        .tempfile_in(dir)
        .map_err(|source| Error::Placeholder {
            dir: dir.clone(),
            source,
        })?;
    let placeholder = Placeholder {
        path: file.into_temp_path(),
    };
    debug!(path = %placeholder.path().display(), "created placeholder source");
    Ok(Some(placeholder))
}

/// Write the response file the compiler is started with.
pub fn create_argument_file(root: &Path, contents: &str) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(ARGUMENT_FILE_PREFIX)
        .suffix(".txt")
        .tempfile_in(root)
        .map_err(|source| Error::ArgumentFile { source })?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|source| Error::ArgumentFile { source })?;
    Ok(file.into_temp_path())
}

/// Temporary resources of one invocation.
#[derive(Debug, Default)]
pub struct Workspace {
    temp_dir: Option<TempDir>,
    placeholder: Option<Placeholder>,
    argument_file: Option<TempPath>,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace::default()
    }

    pub fn set_temp_dir(&mut self, dir: TempDir) -> &Path {
        self.temp_dir.insert(dir).path()
    }

    pub fn set_placeholder(&mut self, placeholder: Placeholder) -> &Placeholder {
        self.placeholder.insert(placeholder)
    }

    pub fn set_argument_file(&mut self, path: TempPath) -> &Path {
        self.argument_file.insert(path)
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    /// Remove everything that was created. Failures are logged, not returned.
    pub fn cleanup(&mut self) {
        if let Some(path) = self.argument_file.take() {
            let shown = path.to_path_buf();
            if let Err(err) = path.close() {
                warn!(path = %shown.display(), error = %err, "failed to remove argument file");
            }
        }
        if let Some(placeholder) = self.placeholder.take() {
            let shown = placeholder.path().to_path_buf();
            if let Err(err) = placeholder.close() {
                warn!(path = %shown.display(), error = %err, "failed to remove placeholder");
            }
        }
        if let Some(dir) = self.temp_dir.take() {
            let shown = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                warn!(path = %shown.display(), error = %err, "failed to remove temporary directory");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}
