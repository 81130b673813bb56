//! Path normalization utilities.
//!
//! macOS stores file names in NFD (decomposed) form while exclusion lists
//! typed by users are usually NFC (composed). Both sides are normalized to
//! NFC before comparison so the same visual name matches.
//!
//! # Example
//!
//! ```
//! use fildup::scanner::path_utils::normalize_path_str;
//!
//! let nfc = "café.txt";
//! let nfd = "cafe\u{0301}.txt";
//! assert_eq!(normalize_path_str(nfc), normalize_path_str(nfd));
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;
use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Normalize a path string to NFC form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Normalize a path to NFC form.
///
/// Paths that are not valid UTF-8 are returned unchanged.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if !is_nfc(s) => PathBuf::from(normalize_path_str(s)),
        _ => path.to_path_buf(),
    }
}

/// Expand a leading `~` to the current user's home directory.
///
/// Paths without a leading `~` component, or systems without a home
/// directory, are returned unchanged.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Collapse `.` and `..` components lexically, without touching the
/// filesystem. `..` at the root stays at the root; leading `..` in a
/// relative path is kept.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Expand `~`, make the path absolute and collapse `.`/`..`, without
/// resolving symlinks.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn resolve_root(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(expand_tilde(path)).map(|p| clean_path(&p))
}

/// Path as a `/`-separated string, regardless of platform.
#[must_use]
pub fn to_slash_string(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_nfd_to_nfc() {
        let nfd = "cafe\u{0301}.txt";
        assert_eq!(normalize_path_str(nfd), "café.txt");
    }

    #[test]
    fn test_normalize_path_equalizes_forms() {
        let nfc = normalize_path(Path::new("/photos/café"));
        let nfd = normalize_path(Path::new("/photos/cafe\u{0301}"));
        assert_eq!(nfc, nfd);
    }

    #[test]
    fn test_normalize_ascii_unchanged() {
        let path = Path::new("/usr/local/bin");
        assert_eq!(normalize_path(path), path);
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/music"));
        if let Some(dirs) = BaseDirs::new() {
            assert_eq!(expanded, dirs.home_dir().join("music"));
        }
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(expand_tilde(Path::new("/abs/~/x")), Path::new("/abs/~/x"));
        assert_eq!(expand_tilde(Path::new("rel/x")), Path::new("rel/x"));
        assert_eq!(expand_tilde(Path::new("~user/x")), Path::new("~user/x"));
    }

    #[test]
    fn test_resolve_root_is_absolute() {
        let resolved = resolve_root(Path::new("some/dir")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/dir"));
    }

    #[test]
    fn test_resolve_root_collapses_parent_components() {
        let resolved = resolve_root(Path::new("/data/sub/../archive/./x")).unwrap();
        assert_eq!(resolved, Path::new("/data/archive/x"));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/a/b/../c")), Path::new("/a/c"));
        assert_eq!(clean_path(Path::new("/../a")), Path::new("/a"));
        assert_eq!(clean_path(Path::new("a/../../b")), Path::new("../b"));
        assert_eq!(clean_path(Path::new("./a/.")), Path::new("a"));
        assert_eq!(clean_path(Path::new("a/..")), Path::new("."));
    }
}
