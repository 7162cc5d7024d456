//! Home-relative paths for attached files.
//!
//! Paths are stored as `~/...` when they live below the home directory and
//! as absolute paths otherwise. They are expanded again before use.

use directories::BaseDirs;
use std::path::{Component, Path, PathBuf};

fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Normalise `path` to an absolute path, abbreviated to `~/...` if possible.
pub fn abbreviate(path: &str) -> String {
    let home = home_dir();
    let expanded = expand_home(Path::new(path));
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    };
    let normalized = normalize(&absolute);

    if let Some(home) = home {
        if let Ok(rest) = normalized.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return Path::new("~").join(rest).to_string_lossy().into_owned();
        }
    }
    normalized.to_string_lossy().into_owned()
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate_under_home() {
        let Some(home) = home_dir() else { return };
        let inside = home.join("papers").join("./einstein.pdf");
        assert_eq!(
            abbreviate(&inside.to_string_lossy()),
            format!("~{}papers{}einstein.pdf", std::path::MAIN_SEPARATOR, std::path::MAIN_SEPARATOR)
        );
    }

    #[test]
    fn test_abbreviate_is_stable() {
        let once = abbreviate("~/papers/einstein.pdf");
        assert_eq!(abbreviate(&once), once);
    }

    #[test]
    fn test_expand_home_roundtrip() {
        let Some(home) = home_dir() else { return };
        assert_eq!(expand_home(Path::new("~/a.pdf")), home.join("a.pdf"));
        assert_eq!(expand_home(Path::new("/tmp/a.pdf")), PathBuf::from("/tmp/a.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_abbreviate_outside_home() {
        assert_eq!(abbreviate("/opt/../srv/papers/a.pdf"), "/srv/papers/a.pdf");
    }
}
