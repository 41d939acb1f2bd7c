use std::path::{Component, Path, PathBuf};

/// Lexically normalize `path`, folding `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            Component::RootDir | Component::Normal(_) | Component::Prefix(_) => {
                normalized.push(component.as_os_str());
            }
        }
    }

    normalized
}

/// Join `path` onto `base` unless it is already absolute, then normalize.
pub fn resolve(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    normalize_path(&base.join(path))
}

/// Relative path leading from directory `from` to `to`.
///
/// Both paths are normalized first; the result uses the platform separator.
pub fn relative(from: &Path, to: &Path) -> PathBuf {
    let from = normalize_path(from);
    let to = normalize_path(to);
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

/// Re-point a path written relative to `old_dir` so it is valid from `new_dir`.
pub fn rebase_relative(reference: &str, old_dir: &Path, new_dir: &Path) -> String {
    let target = resolve(old_dir, reference);
    relative(new_dir, &target)
        .to_string_lossy()
        .replace('\\', "/")
}
