use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use tspipe::Artifact;

/// Where `artifact` lands under `dest`.
pub fn destination_path(dest: &Path, artifact: &Artifact) -> PathBuf {
    dest.join(artifact.relative())
}

/// Write `artifact` under `dest`, creating parent directories as needed.
pub fn write_artifact(dest: &Path, artifact: &Artifact) -> Result<PathBuf> {
    let path = destination_path(dest, artifact);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(&path, &artifact.contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
