//! Per-artifact destination filters.
//!
//! A filter sees each artifact's path relative to the output root and decides
//! whether to keep it, drop it, move it, or swap it for another artifact.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

use crate::artifact::Artifact;

/// Outcome of running a filter on one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Drop,
    /// New path relative to the output root.
    Rename(String),
    Replace(Artifact),
}

impl From<bool> for FilterDecision {
    fn from(keep: bool) -> Self {
        if keep {
            FilterDecision::Keep
        } else {
            FilterDecision::Drop
        }
    }
}

impl From<String> for FilterDecision {
    fn from(path: String) -> Self {
        FilterDecision::Rename(path)
    }
}

impl From<&str> for FilterDecision {
    fn from(path: &str) -> Self {
        FilterDecision::Rename(path.to_string())
    }
}

impl From<Option<String>> for FilterDecision {
    fn from(path: Option<String>) -> Self {
        path.map_or(FilterDecision::Keep, FilterDecision::Rename)
    }
}

pub type FilterFn = dyn Fn(&str, &Artifact) -> FilterDecision + Send + Sync;

#[derive(Clone)]
pub enum PathFilter {
    Function(Arc<FilterFn>),
    /// Ordered prefix replacements; the first matching prefix wins.
    Prefixes(IndexMap<String, String>),
}

impl PathFilter {
    pub fn function<F, D>(f: F) -> Self
    where
        F: Fn(&str, &Artifact) -> D + Send + Sync + 'static,
        D: Into<FilterDecision>,
    {
        PathFilter::Function(Arc::new(move |relative: &str, artifact: &Artifact| {
            f(relative, artifact).into()
        }))
    }

    pub fn prefixes<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        PathFilter::Prefixes(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn apply(&self, relative: &str, artifact: &Artifact) -> FilterDecision {
        match self {
            PathFilter::Function(f) => f(relative, artifact),
            PathFilter::Prefixes(map) => map
                .iter()
                .find_map(|(prefix, replacement)| replace_prefix(relative, prefix, replacement))
                .map_or(FilterDecision::Keep, FilterDecision::Rename),
        }
    }
}

/// Replace `prefix` at the start of `relative`, matching whole path segments only.
fn replace_prefix(relative: &str, prefix: &str, replacement: &str) -> Option<String> {
    let prefix = prefix.trim_end_matches('/');
    let replacement = replacement.trim_end_matches('/');
    if prefix.is_empty() {
        return None;
    }

    let rest = relative.strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    if replacement.is_empty() {
        Some(rest.trim_start_matches('/').to_string())
    } else {
        Some(format!("{replacement}{rest}"))
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFilter::Function(_) => f.write_str("PathFilter::Function(..)"),
            PathFilter::Prefixes(map) => f.debug_tuple("PathFilter::Prefixes").field(map).finish(),
        }
    }
}

impl<'de> Deserialize<'de> for PathFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        let serde_json::Value::Object(object) = value else {
            return Err(Error::custom(
                "pathFilter must be an object mapping path prefixes to replacements",
            ));
        };

        let mut map = IndexMap::with_capacity(object.len());
        for (prefix, replacement) in object {
            match replacement {
                serde_json::Value::String(replacement) => {
                    map.insert(prefix, replacement);
                }
                other => {
                    return Err(Error::custom(format!(
                        "pathFilter entry '{prefix}' must map to a string, found {other}"
                    )));
                }
            }
        }
        Ok(PathFilter::Prefixes(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn artifact(relative: &str) -> Artifact {
        Artifact::new(
            PathBuf::from("/out"),
            PathBuf::from("/out").join(relative),
            Vec::new(),
        )
    }

    #[test]
    fn test_prefix_mapping() {
        let filter = PathFilter::prefixes([("src", "out")]);
        assert_eq!(
            filter.apply("src/x.js", &artifact("src/x.js")),
            FilterDecision::Rename("out/x.js".into())
        );
        assert_eq!(
            filter.apply("lib/x.js", &artifact("lib/x.js")),
            FilterDecision::Keep
        );
    }

    #[test]
    fn test_prefix_matches_whole_segments() {
        let filter = PathFilter::prefixes([("src", "out")]);
        assert_eq!(
            filter.apply("srcfoo/x.js", &artifact("srcfoo/x.js")),
            FilterDecision::Keep
        );
    }

    #[test]
    fn test_first_matching_prefix_wins() {
        let filter = PathFilter::prefixes([("src/app", "app"), ("src", "lib")]);
        assert_eq!(
            filter.apply("src/app/main.js", &artifact("src/app/main.js")),
            FilterDecision::Rename("app/main.js".into())
        );

        let filter = PathFilter::prefixes([("src", "lib"), ("src/app", "app")]);
        assert_eq!(
            filter.apply("src/app/main.js", &artifact("src/app/main.js")),
            FilterDecision::Rename("lib/app/main.js".into())
        );
    }

    #[test]
    fn test_empty_replacement_strips_prefix() {
        let filter = PathFilter::prefixes([("src/", "")]);
        assert_eq!(
            filter.apply("src/a/b.js", &artifact("src/a/b.js")),
            FilterDecision::Rename("a/b.js".into())
        );
    }

    #[test]
    fn test_function_filter_conversions() {
        let filter = PathFilter::function(|relative: &str, _: &Artifact| !relative.starts_with("test/"));
        assert_eq!(
            filter.apply("test/a.js", &artifact("test/a.js")),
            FilterDecision::Drop
        );
        assert_eq!(filter.apply("a.js", &artifact("a.js")), FilterDecision::Keep);

        let filter = PathFilter::function(|relative: &str, _: &Artifact| format!("dist/{relative}"));
        assert_eq!(
            filter.apply("a/b.js", &artifact("a/b.js")),
            FilterDecision::Rename("dist/a/b.js".into())
        );
    }

    #[test]
    fn test_deserialize_prefix_object_keeps_order() {
        let filter: PathFilter = serde_json::from_str(r#"{"b": "x", "a": "y"}"#).unwrap();
        let PathFilter::Prefixes(map) = filter else {
            panic!("expected prefix filter");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_deserialize_rejects_other_shapes() {
        assert!(serde_json::from_str::<PathFilter>(r#"["src"]"#).is_err());
        assert!(serde_json::from_str::<PathFilter>(r#""src""#).is_err());
        assert!(serde_json::from_str::<PathFilter>(r#"{"src": 1}"#).is_err());
    }
}
