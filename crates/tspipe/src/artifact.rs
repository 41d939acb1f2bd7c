use std::path::{Path, PathBuf};

/// Kind of file emitted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Script,
    SourceMap,
    Declaration,
}

impl ArtifactKind {
    const SUFFIXES: [(&'static str, ArtifactKind); 3] = [
        (".js.map", ArtifactKind::SourceMap),
        (".d.ts", ArtifactKind::Declaration),
        (".js", ArtifactKind::Script),
    ];

    /// Classify a file name, returning the kind and the name without its suffix.
    pub fn classify(file_name: &str) -> Option<(ArtifactKind, &str)> {
        Self::SUFFIXES.iter().find_map(|(suffix, kind)| {
            file_name
                .strip_suffix(suffix)
                .filter(|stem| !stem.is_empty())
                .map(|stem| (*kind, stem))
        })
    }
}

/// One file emitted by the compiler, ready to be handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Directory the artifact's relative path is taken from.
    pub base: PathBuf,
    /// Final absolute path.
    pub path: PathBuf,
    /// Where the compiler wrote the file.
    pub original_path: PathBuf,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(base: PathBuf, path: PathBuf, contents: Vec<u8>) -> Self {
        Artifact {
            base,
            original_path: path.clone(),
            path,
            contents,
        }
    }

    pub fn kind(&self) -> Option<ArtifactKind> {
        let name = self.path.file_name()?.to_str()?;
        ArtifactKind::classify(name).map(|(kind, _)| kind)
    }

    /// Path relative to `base`, with forward slashes.
    pub fn relative(&self) -> String {
        let relative = self.path.strip_prefix(&self.base).unwrap_or(&self.path);
        to_slash(relative)
    }

    pub fn contents_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
