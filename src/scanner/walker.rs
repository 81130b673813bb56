//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and yielding the files that pass every inclusion rule. The walk is
//! lazy and single-threaded; children are visited in file-name order so
//! two walks over an unchanged tree yield the same sequence.
//!
//! # Features
//!
//! - Symlinks are never followed and never yielded
//! - Hidden entries and application bundles are pruned (see [`HiddenMatch`])
//! - Caller-supplied exclusion predicate, applied before descending
//! - Minimum size filter (inclusive)
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use fildup::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```
//!
//! [`HiddenMatch`]: super::HiddenMatch

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::path_utils::clean_path;
use super::{ExcludePredicate, FileEntry, ScanError, WalkerConfig};

/// Directory walker for file discovery.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional exclusion predicate
    exclusions: Option<Arc<dyn ExcludePredicate>>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("exclusions", &self.exclusions.as_ref().map(|_| "<predicate>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// `.` and `..` components are collapsed so yielded paths never carry
    /// them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fildup::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: clean_path(path),
            config,
            exclusions: None,
            shutdown_flag: None,
        }
    }

    /// Set the exclusion predicate.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: Arc<dyn ExcludePredicate>) -> Self {
        self.exclusions = Some(exclusions);
        self
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root path being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Whether an entry (file or directory) is rejected before it is
    /// yielded or descended into.
    fn is_rejected(&self, entry: &DirEntry) -> bool {
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            log::trace!("Skipping symlink: {}", path.display());
            return true;
        }

        if self
            .config
            .hidden_match
            .is_hidden(&self.root, path, file_type.is_dir())
        {
            log::trace!("Skipping hidden entry: {}", path.display());
            return true;
        }

        if self
            .exclusions
            .as_ref()
            .is_some_and(|e| e.is_excluded(path))
        {
            log::trace!("Skipping excluded entry: {}", path.display());
            return true;
        }

        false
    }

    /// Walk the directory tree, yielding accepted files.
    ///
    /// Returns a lazy, one-shot iterator. Traversal errors are yielded as
    /// [`ScanError`] values rather than stopping iteration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fildup::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !self.is_rejected(entry))
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |result| match result {
                Ok(entry) => self.process_entry(entry),
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    /// Turn an accepted walk entry into a `FileEntry` if it is a regular
    /// file large enough to matter.
    fn process_entry(&self, entry: DirEntry) -> Option<Result<FileEntry, ScanError>> {
        if entry.depth() == 0 || !entry.file_type().is_file() {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => return Some(Err(self.handle_walk_error(e))),
        };

        let size = metadata.len();
        if size < self.config.min_size {
            log::trace!(
                "Skipping file below minimum size ({} < {}): {}",
                size,
                self.config.min_size,
                entry.path().display()
            );
            return None;
        }

        Some(Ok(FileEntry::new(entry.into_path(), size)))
    }

    /// Convert a walkdir error into a `ScanError` and log it.
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        let err = if error.loop_ancestor().is_some() {
            ScanError::Loop(path)
        } else {
            match error.into_io_error() {
                Some(io_err) => ScanError::from_io(&path, io_err),
                None => ScanError::Io {
                    path,
                    source: io::Error::other("directory walk failed"),
                },
            }
        };

        log::warn!("Skipping unreadable entry: {}", err);
        err
    }
}
