//! Inclusion rules applied during traversal.
//!
//! - [`HiddenMatch`]: recognizes hidden entries and application bundles
//! - [`ExcludePredicate`]: caller-supplied exclusion test
//! - [`ExclusionList`]: exclusion predicate loaded from a text file

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::path_utils::{clean_path, expand_tilde, normalize_path, to_slash_string};

/// Suffix of application bundle directories (macOS `.app`).
const BUNDLE_SUFFIX: &str = ".app";

/// How hidden entries and application bundles are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum HiddenMatch {
    /// Test each path component below the scan root: names starting with
    /// `.` are hidden, directories whose name ends in `.app` are bundles.
    #[default]
    Component,
    /// Test the full path string for the substrings `/.` and `.app/`.
    ///
    /// A scan root that itself lives under a hidden directory matches
    /// everything.
    Substring,
}

impl HiddenMatch {
    /// Whether `path`, found while walking `root`, is hidden or belongs to
    /// an application bundle.
    #[must_use]
    pub fn is_hidden(self, root: &Path, path: &Path, is_dir: bool) -> bool {
        match self {
            Self::Component => component_match(root, path, is_dir),
            Self::Substring => substring_match(path, is_dir),
        }
    }
}

fn component_match(root: &Path, path: &Path, is_dir: bool) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let names: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect();

    let last = names.len().saturating_sub(1);
    names.iter().enumerate().any(|(i, name)| {
        name.starts_with('.') || ((i < last || is_dir) && name.ends_with(BUNDLE_SUFFIX))
    })
}

fn substring_match(path: &Path, is_dir: bool) -> bool {
    let mut s = to_slash_string(path);
    if is_dir {
        s.push('/');
    }
    s.contains("/.") || s.contains(".app/")
}

/// Caller-supplied test for paths that must be skipped.
///
/// Directories for which this returns `true` are not descended into.
pub trait ExcludePredicate: Send + Sync {
    /// Whether `path` is excluded.
    fn is_excluded(&self, path: &Path) -> bool;
}

impl<F> ExcludePredicate for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_excluded(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Errors loading an exclusion list.
#[derive(thiserror::Error, Debug)]
pub enum ExclusionError {
    /// The exclusion file could not be read.
    #[error("Failed to read exclusion file {path}: {source}")]
    Read {
        /// Exclusion file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A list of excluded paths.
///
/// A path is excluded when it equals an entry or lies beneath one.
/// Matching is component-wise, so `/data/raw` excludes `/data/raw/a.bin`
/// but not `/data/rawfile`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    entries: Vec<PathBuf>,
}

impl ExclusionList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from entries. Relative entries resolve against `base`.
    pub fn from_entries<I, P>(entries: I, base: &Path) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut list = Self::new();
        for entry in entries {
            list.push(entry.as_ref(), base);
        }
        list
    }

    /// Parse exclusion file content: one path per line, blank lines and
    /// lines starting with `#` are ignored.
    #[must_use]
    pub fn parse(content: &str, base: &Path) -> Self {
        Self::from_entries(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
            base,
        )
    }

    /// Load an exclusion file.
    ///
    /// # Errors
    ///
    /// Returns [`ExclusionError::Read`] if the file cannot be read.
    pub fn load(file: &Path, base: &Path) -> Result<Self, ExclusionError> {
        let content = fs::read_to_string(file).map_err(|source| ExclusionError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let list = Self::parse(&content, base);
        log::debug!(
            "Loaded {} exclusion entries from {}",
            list.len(),
            file.display()
        );
        Ok(list)
    }

    /// Add one entry.
    pub fn push(&mut self, entry: &Path, base: &Path) {
        let expanded = expand_tilde(entry);
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            base.join(expanded)
        };
        self.entries.push(normalize_path(&clean_path(&resolved)));
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The resolved entries.
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}

impl ExcludePredicate for ExclusionList {
    fn is_excluded(&self, path: &Path) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let path = normalize_path(&clean_path(path));
        self.entries.iter().any(|entry| path.starts_with(entry))
    }
}
