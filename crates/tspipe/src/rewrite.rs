//! Collecting compiler output from the temporary directory.
//!
//! Each emitted file is given its final path under the output root, passed
//! through the path filter, and has the relative paths it embeds (source map
//! `sources`, declaration `reference` comments) recomputed for that path.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::artifact::{Artifact, ArtifactKind, to_slash};
use crate::config::{Config, non_empty};
use crate::error::{Error, Result};
use crate::filter::FilterDecision;
use crate::paths;

#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Directory the compiler wrote to.
    pub temp_dir: &'a Path,
    /// Configured output directory, or `temp_dir` itself.
    pub output_root: &'a Path,
    /// Emitted files with this stem came from the placeholder.
    pub placeholder_stem: Option<&'a str>,
    pub config: &'a Config,
}

impl RewriteContext<'_> {
    fn rewrites_source_maps(&self) -> bool {
        self.config.sourcemap && non_empty(self.config.source_root.as_deref()).is_none()
    }

    fn rewrites_references(&self) -> bool {
        self.config.declaration && self.config.out_dir.is_some()
    }
}

/// Gather every emitted artifact, in file name order.
pub fn collect_artifacts(ctx: &RewriteContext<'_>) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(ctx.temp_dir).sort_by_file_name() {
        let entry = entry.map_err(|err| Error::Output {
            path: err
                .path()
                .unwrap_or(ctx.temp_dir)
                .to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((_, stem)) = ArtifactKind::classify(name) else {
            continue;
        };
        if ctx.placeholder_stem == Some(stem) {
            trace!(path = %entry.path().display(), "skipping placeholder output");
            continue;
        }

        if let Some(artifact) = publish(ctx, entry.path())? {
            artifacts.push(artifact);
        }
    }

    debug!(count = artifacts.len(), "collected compiler output");
    Ok(artifacts)
}

fn publish(ctx: &RewriteContext<'_>, emitted: &Path) -> Result<Option<Artifact>> {
    let relative = emitted.strip_prefix(ctx.temp_dir).unwrap_or(emitted);
    let contents = std::fs::read(emitted).map_err(|source| Error::Output {
        path: emitted.to_path_buf(),
        source,
    })?;

    let mut artifact = Artifact {
        base: ctx.output_root.to_path_buf(),
        path: paths::resolve(ctx.output_root, relative),
        original_path: emitted.to_path_buf(),
        contents,
    };

    if let Some(filter) = ctx.config.path_filter.as_ref() {
        match filter.apply(&to_slash(relative), &artifact) {
            FilterDecision::Keep => {}
            FilterDecision::Drop => {
                trace!(path = %relative.display(), "dropped by path filter");
                return Ok(None);
            }
            FilterDecision::Rename(target) => {
                if target.is_empty() {
                    return Err(Error::Filter(format!(
                        "empty destination returned for {}",
                        to_slash(relative)
                    )));
                }
                artifact.path = paths::resolve(ctx.output_root, &target);
            }
            FilterDecision::Replace(replacement) => artifact = replacement,
        }
    }

    match artifact.kind() {
        Some(ArtifactKind::SourceMap) if ctx.rewrites_source_maps() => {
            rewrite_source_map(&mut artifact)?;
        }
        Some(ArtifactKind::Declaration) if ctx.rewrites_references() => {
            rewrite_references(&mut artifact)?;
        }
        _ => {}
    }

    Ok(Some(artifact))
}

fn old_and_new_dirs(artifact: &Artifact) -> (&Path, &Path) {
    let old_dir = artifact.original_path.parent().unwrap_or(Path::new(""));
    let new_dir = artifact.path.parent().unwrap_or(Path::new(""));
    (old_dir, new_dir)
}

/// Re-point every `sources` entry of a source map at its new location.
pub fn rewrite_source_map(artifact: &mut Artifact) -> Result<()> {
    let mut map: serde_json::Value =
        serde_json::from_slice(&artifact.contents).map_err(|source| Error::SourceMap {
            path: artifact.original_path.clone(),
            source,
        })?;

    let (old_dir, new_dir) = old_and_new_dirs(artifact);
    let mut changed = false;
    if let Some(serde_json::Value::Array(sources)) = map.get_mut("sources") {
        for source in sources.iter_mut() {
            if let serde_json::Value::String(path) = source {
                *path = paths::rebase_relative(path, old_dir, new_dir);
                changed = true;
            }
        }
    }

    if changed {
        artifact.contents = serde_json::to_vec(&map).map_err(|source| Error::SourceMap {
            path: artifact.original_path.clone(),
            source,
        })?;
    }
    Ok(())
}

static REFERENCE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<lead>///\s*<reference\s+path\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("valid regex")
});

/// Re-point `/// <reference path="..."/>` comments at their new location.
///
/// Fails with [`Error::Output`] when the declaration file is not UTF-8.
pub fn rewrite_references(artifact: &mut Artifact) -> Result<()> {
    let Some(text) = artifact.contents_str() else {
        warn!(path = %artifact.original_path.display(), "declaration file is not valid UTF-8");
        return Err(Error::Output {
            path: artifact.original_path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "declaration file is not valid UTF-8",
            ),
        });
    };

    let (old_dir, new_dir) = old_and_new_dirs(artifact);
    let rewritten = REFERENCE_PATH_RE.replace_all(text, |caps: &Captures<'_>| {
        let (quote, path) = match (caps.name("dq"), caps.name("sq")) {
            (Some(path), _) => ('"', path.as_str()),
            (None, Some(path)) => ('\'', path.as_str()),
            (None, None) => return caps[0].to_string(),
        };
        format!(
            "{}{quote}{}{quote}",
            &caps["lead"],
            paths::rebase_relative(path, old_dir, new_dir)
        )
    });

    if let std::borrow::Cow::Owned(rewritten) = rewritten {
        artifact.contents = rewritten.into_bytes();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PathFilter;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    fn relative_paths(artifacts: &[Artifact]) -> Vec<String> {
        artifacts.iter().map(Artifact::relative).collect()
    }

    #[test]
    fn test_collects_only_emitted_kinds() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.js"), "");
        write(&temp.path().join("a.js.map"), "{}");
        write(&temp.path().join("lib/b.d.ts"), "");
        write(&temp.path().join("notes.txt"), "");
        write(&temp.path().join("c.ts"), "");

        let config = Config::default();
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: temp.path(),
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(
            relative_paths(&artifacts),
            vec!["a.js", "a.js.map", "lib/b.d.ts"]
        );
        assert!(artifacts.iter().all(|a| a.path == a.original_path));
    }

    #[test]
    fn test_placeholder_output_is_excluded() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/.tspipe-tmp-abc.js"), "");
        write(&temp.path().join("src/.tspipe-tmp-abc.d.ts"), "");
        write(&temp.path().join("src/main.js"), "");

        let config = Config::default();
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: temp.path(),
            placeholder_stem: Some(".tspipe-tmp-abc"),
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(relative_paths(&artifacts), vec!["src/main.js"]);
    }

    #[test]
    fn test_output_root_relocates() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("lib/a.js"), "var a;");

        let config = Config::default();
        let out = PathBuf::from("/project/build");
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: &out,
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(artifacts[0].path, PathBuf::from("/project/build/lib/a.js"));
        assert_eq!(artifacts[0].original_path, temp.path().join("lib/a.js"));
        assert_eq!(artifacts[0].contents, b"var a;");
    }

    #[test]
    fn test_filter_rename_and_drop() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a/b.js"), "");
        write(&temp.path().join("a/skip.js"), "");

        let config = Config {
            path_filter: Some(PathFilter::function(|relative: &str, _: &Artifact| {
                match relative {
                    "a/b.js" => FilterDecision::Rename("flat/b.js".into()),
                    _ => FilterDecision::Drop,
                }
            })),
            ..Config::default()
        };
        let out = PathBuf::from("/out");
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: &out,
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].path, PathBuf::from("/out/flat/b.js"));
    }

    #[test]
    fn test_filter_replace() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.js"), "old");

        let config = Config {
            path_filter: Some(PathFilter::function(|_: &str, artifact: &Artifact| {
                let mut replacement = artifact.clone();
                replacement.contents = b"new".to_vec();
                FilterDecision::Replace(replacement)
            })),
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: temp.path(),
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(artifacts[0].contents, b"new");
    }

    #[test]
    fn test_filter_empty_rename_is_an_error() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.js"), "");

        let config = Config {
            path_filter: Some(PathFilter::function(|_: &str, _: &Artifact| String::new())),
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: temp.path(),
            placeholder_stem: None,
            config: &config,
        };
        assert!(matches!(collect_artifacts(&ctx), Err(Error::Filter(_))));
    }

    #[test]
    fn test_source_map_sources_are_rebased() {
        let temp = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let source = project.path().join("src/lib/a.ts");
        write(&source, "");

        let emitted = temp.path().join("lib/a.js.map");
        let original_ref = paths::relative(emitted.parent().unwrap(), &source);
        let map = serde_json::json!({
            "version": 3,
            "file": "a.js",
            "sources": [to_slash(&original_ref)],
            "mappings": "AAAA"
        });
        write(&emitted, &map.to_string());

        let out = project.path().join("build");
        let config = Config {
            sourcemap: true,
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: &out,
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        let rewritten: serde_json::Value = serde_json::from_slice(&artifacts[0].contents).unwrap();
        assert_eq!(rewritten["sources"][0], "../../src/lib/a.ts");
        assert_eq!(rewritten["file"], "a.js");

        let new_dir = artifacts[0].path.parent().unwrap();
        assert_eq!(
            paths::resolve(new_dir, rewritten["sources"][0].as_str().unwrap()),
            paths::normalize_path(&source)
        );
    }

    #[test]
    fn test_source_root_disables_map_rewrite() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.js.map"), r#"{"sources":["../x.ts"]}"#);

        let out = PathBuf::from("/elsewhere/out");
        let config = Config {
            sourcemap: true,
            source_root: Some("/src".into()),
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: &out,
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(artifacts[0].contents, br#"{"sources":["../x.ts"]}"#);
    }

    #[test]
    fn test_invalid_source_map_fails() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.js.map"), "not json");

        let config = Config {
            sourcemap: true,
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: temp.path(),
            placeholder_stem: None,
            config: &config,
        };
        assert!(matches!(
            collect_artifacts(&ctx),
            Err(Error::SourceMap { .. })
        ));
    }

    #[test]
    fn test_declaration_references_keep_quotes() {
        let mut artifact = Artifact {
            base: PathBuf::from("/project/build"),
            path: PathBuf::from("/project/build/lib/a.d.ts"),
            original_path: PathBuf::from("/tmp/t/lib/a.d.ts"),
            contents: concat!(
                "/// <reference path=\"../../../project/typings/node.d.ts\" />\n",
                "///<reference path='b.d.ts'/>\n",
                "declare var a: number;\n"
            )
            .as_bytes()
            .to_vec(),
        };
        rewrite_references(&mut artifact).unwrap();
        assert_eq!(
            artifact.contents_str().unwrap(),
            concat!(
                "/// <reference path=\"../../typings/node.d.ts\" />\n",
                "///<reference path='../../../tmp/t/lib/b.d.ts'/>\n",
                "declare var a: number;\n"
            )
        );
    }

    #[test]
    fn test_references_untouched_without_out_dir() {
        let temp = TempDir::new().unwrap();
        let text = "/// <reference path=\"x.d.ts\" />\n";
        write(&temp.path().join("a.d.ts"), text);

        let config = Config {
            declaration: true,
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: temp.path(),
            placeholder_stem: None,
            config: &config,
        };
        let artifacts = collect_artifacts(&ctx).unwrap();
        assert_eq!(artifacts[0].contents_str(), Some(text));
    }

    #[test]
    fn test_non_utf8_declaration_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.d.ts"), [0xff, 0xfe, b'x']).unwrap();
        let out = TempDir::new().unwrap();

        let config = Config {
            declaration: true,
            out_dir: Some(out.path().to_path_buf()),
            ..Config::default()
        };
        let ctx = RewriteContext {
            temp_dir: temp.path(),
            output_root: out.path(),
            placeholder_stem: None,
            config: &config,
        };
        let err = collect_artifacts(&ctx).unwrap_err();
        assert!(matches!(&err, Error::Output { path, .. } if path.ends_with("a.d.ts")));
    }
}
