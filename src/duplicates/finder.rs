//! Duplicate finder implementation with two-phase detection.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Phase 1 - Size grouping**: walk the tree and classify every
//!    accepted file by size. Files with a unique size cannot have a
//!    duplicate and are never read.
//! 2. **Phase 2 - Checksum**: digest every member of every size group and
//!    classify by digest in a fresh [`Classifier`]. Groups that survive are
//!    the result.
//!
//! Hashing runs on the calling thread by default. With `io_threads > 1`,
//! each size group is digested on a bounded rayon pool; results are folded
//! into the classifier by the calling thread only.
//!
//! # Example
//!
//! ```no_run
//! use fildup::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! for group in &groups {
//!     println!("{}: {} copies", group.digest, group.len());
//! }
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::{Classifier, DuplicateGroup};
use crate::progress::{ProgressCallback, PHASE_CHECKSUM, PHASE_WALKING};
use crate::scanner::{
    ContentDigest, ExcludePredicate, FileEntry, HashAlgorithm, HashError, Hasher, ScanError,
    Walker, WalkerConfig,
};

/// Threshold for logging large files.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024; // 100MB

/// What to do when a file cannot be hashed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashErrorPolicy {
    /// Abort the run on the first hashing error.
    #[default]
    FailFast,
    /// Log the error, record it in the summary, and keep going.
    SkipAndContinue,
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of threads used for hashing. `1` hashes on the calling thread.
    pub io_threads: usize,
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Hashing error policy.
    pub error_policy: HashErrorPolicy,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional exclusion predicate.
    pub exclusions: Option<Arc<dyn ExcludePredicate>>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("algorithm", &self.algorithm)
            .field("error_policy", &self.error_policy)
            .field("walker_config", &self.walker_config)
            .field("exclusions", &self.exclusions.as_ref().map(|_| "<predicate>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 1,
            algorithm: HashAlgorithm::default(),
            error_policy: HashErrorPolicy::default(),
            walker_config: WalkerConfig::default(),
            exclusions: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the hashing error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: HashErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Set the minimum file size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.walker_config.min_size = min_size;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the exclusion predicate.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: Arc<dyn ExcludePredicate>) -> Self {
        self.exclusions = Some(exclusions);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Number of files that passed the inclusion rules
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Number of files eliminated because their size was unique
    pub eliminated_by_size: usize,
    /// Number of files whose digest was computed
    pub hashed_files: usize,
    /// Total bytes read while hashing
    pub bytes_hashed: u64,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding one copy per group)
    pub duplicate_files: usize,
    /// Total space that removing duplicates would free
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Entries skipped during traversal
    pub scan_errors: Vec<ScanError>,
    /// Files skipped during hashing (lenient policy only)
    pub hash_errors: Vec<HashError>,
}

impl ScanSummary {
    /// Whether any entry was skipped because of an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.scan_errors.is_empty() || !self.hash_errors.is_empty()
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }

    fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A file could not be hashed under the fail-fast policy.
    #[error("Checksum failed: {0}")]
    Hash(#[from] HashError),
}

/// Duplicate finder that orchestrates the two-phase detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new().with_algorithm(config.algorithm);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find all duplicate files under `root`.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory (checked before walking)
    /// - A file cannot be hashed and the policy is [`HashErrorPolicy::FailFast`]
    /// - The scan is interrupted by shutdown signal
    pub fn find_duplicates(
        &self,
        root: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        if !root.exists() {
            return Err(FinderError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(FinderError::NotADirectory(root.to_path_buf()));
        }
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Starting duplicate scan of {}", root.display());

        let mut walker = Walker::new(root, self.config.walker_config.clone());
        if let Some(ref exclusions) = self.config.exclusions {
            walker = walker.with_exclusions(Arc::clone(exclusions));
        }
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        self.run(walker.walk())
    }

    /// Find duplicates among an already collected list of files.
    ///
    /// Inclusion rules are not re-applied.
    ///
    /// # Errors
    ///
    /// Same as [`find_duplicates`](Self::find_duplicates), minus the root checks.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<FileEntry>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        self.run(files.into_iter().map(Ok))
    }

    fn run<I>(&self, files: I) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError>
    where
        I: Iterator<Item = Result<FileEntry, ScanError>>,
    {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        let by_size = self.group_by_size(files, &mut summary)?;
        log::info!(
            "Phase 1 complete: {} files ({}) → {} size groups, {} candidates",
            summary.total_files,
            summary.total_size_display(),
            by_size.group_count(),
            by_size.grouped_len()
        );

        let by_digest = self.group_by_digest(by_size, &mut summary)?;

        let groups: Vec<DuplicateGroup> = by_digest
            .into_duplicates()
            .into_iter()
            .map(|(digest, files)| {
                let size = files.first().map_or(0, |f| f.size);
                let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path).collect();
                log::debug!(
                    "Duplicate group {}: {} files, {} bytes each",
                    digest,
                    paths.len(),
                    size
                );
                DuplicateGroup::new(digest, size, paths)
            })
            .collect();

        summary.record_groups(&groups);
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Phase 1: classify every accepted file by size.
    fn group_by_size<I>(
        &self,
        files: I,
        summary: &mut ScanSummary,
    ) -> Result<Classifier<u64, PathBuf>, FinderError>
    where
        I: Iterator<Item = Result<FileEntry, ScanError>>,
    {
        let callback = self.config.progress_callback.as_deref();
        if let Some(cb) = callback {
            cb.on_phase_start(PHASE_WALKING, 0);
        }

        let mut by_size = Classifier::new();
        for result in files {
            match result {
                Ok(file) => {
                    summary.total_files += 1;
                    summary.total_size += file.size;
                    if let Some(cb) = callback {
                        cb.on_progress(summary.total_files, &file.path.to_string_lossy());
                    }
                    by_size.classify(file.size, file.path);
                }
                Err(e) => summary.scan_errors.push(e),
            }
        }

        if let Some(cb) = callback {
            cb.on_phase_end(PHASE_WALKING);
        }

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        summary.eliminated_by_size = by_size.unique_len();
        Ok(by_size)
    }

    /// Phase 2: digest every member of every size group and classify by
    /// digest.
    fn group_by_digest(
        &self,
        by_size: Classifier<u64, PathBuf>,
        summary: &mut ScanSummary,
    ) -> Result<Classifier<ContentDigest, FileEntry>, FinderError> {
        let mut by_digest = Classifier::new();
        let total = by_size.grouped_len();
        if total == 0 {
            log::info!("No files share a size, nothing to checksum");
            return Ok(by_digest);
        }

        log::info!(
            "Phase 2: Computing {} checksums for {} files",
            self.hasher.algorithm(),
            total
        );

        let callback = self.config.progress_callback.as_deref();
        if let Some(cb) = callback {
            cb.on_phase_start(PHASE_CHECKSUM, total);
        }

        let pool = self.build_pool();
        let mut processed = 0;

        for (size, paths) in by_size.into_duplicates() {
            if self.config.is_shutdown_requested() {
                return Err(FinderError::Interrupted);
            }
            if size > LARGE_FILE_THRESHOLD {
                log::debug!(
                    "Hashing {} large files ({} each)",
                    paths.len(),
                    ByteSize(size)
                );
            }

            for (path, result) in self.digest_paths(pool.as_ref(), paths) {
                processed += 1;
                if let Some(cb) = callback {
                    cb.on_progress(processed, &path.to_string_lossy());
                }

                match result {
                    Ok(digest) => {
                        summary.hashed_files += 1;
                        summary.bytes_hashed += size;
                        by_digest.classify(digest, FileEntry::new(path, size));
                    }
                    Err(HashError::Interrupted(_)) => return Err(FinderError::Interrupted),
                    Err(e) => match self.config.error_policy {
                        HashErrorPolicy::FailFast => {
                            log::error!("Aborting scan: {}", e);
                            return Err(FinderError::Hash(e));
                        }
                        HashErrorPolicy::SkipAndContinue => {
                            log::warn!("Skipping unreadable file: {}", e);
                            summary.hash_errors.push(e);
                        }
                    },
                }
            }
        }

        if let Some(cb) = callback {
            cb.on_phase_end(PHASE_CHECKSUM);
        }

        Ok(by_digest)
    }

    /// Build the hashing pool, or `None` to hash on the calling thread.
    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        if self.config.io_threads <= 1 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create hashing thread pool, hashing sequentially: {}", e);
                None
            }
        }
    }

    /// Digest one size group, preserving input order.
    ///
    /// Under the fail-fast policy, output stops at the first error. On the
    /// pool, files still queued or mid-read when it happens are dropped.
    fn digest_paths(
        &self,
        pool: Option<&rayon::ThreadPool>,
        paths: Vec<PathBuf>,
    ) -> Vec<(PathBuf, Result<ContentDigest, HashError>)> {
        let fail_fast = self.config.error_policy == HashErrorPolicy::FailFast;

        let Some(pool) = pool else {
            let mut results = Vec::with_capacity(paths.len());
            for path in paths {
                let result = self.hasher.digest(&path);
                let failed = result.is_err();
                results.push((path, result));
                if failed && fail_fast {
                    break;
                }
            }
            return results;
        };

        // Under fail-fast the first error cancels queued files and stops
        // in-flight reads at their next block.
        let cancelled = Arc::new(AtomicBool::new(false));
        let hasher = if fail_fast {
            self.hasher.clone().with_cancel_flag(Arc::clone(&cancelled))
        } else {
            self.hasher.clone()
        };
        let results: Vec<(PathBuf, Option<Result<ContentDigest, HashError>>)> = pool.install(|| {
            paths
                .into_par_iter()
                .map(|path| {
                    if cancelled.load(Ordering::SeqCst) {
                        return (path, None);
                    }
                    match hasher.digest(&path) {
                        Err(HashError::Cancelled(_)) => (path, None),
                        result => {
                            if result.is_err() && fail_fast {
                                cancelled.store(true, Ordering::SeqCst);
                            }
                            (path, Some(result))
                        }
                    }
                })
                .collect()
        });

        results
            .into_iter()
            .filter_map(|(path, result)| result.map(|r| (path, r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn finder(min_size: u64) -> DuplicateFinder {
        DuplicateFinder::new(FinderConfig::default().with_min_size(min_size))
    }

    #[test]
    fn test_finder_config_defaults() {
        let config = FinderConfig::default();
        assert_eq!(config.io_threads, 1);
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.error_policy, HashErrorPolicy::FailFast);
        assert_eq!(config.walker_config.min_size, 10_000);
    }

    #[test]
    fn test_finder_config_io_threads_at_least_one() {
        assert_eq!(FinderConfig::default().with_io_threads(0).io_threads, 1);
    }

    #[test]
    fn test_rejects_missing_root() {
        let err = finder(0)
            .find_duplicates(Path::new("/nonexistent/root/98765"))
            .unwrap_err();
        assert!(matches!(err, FinderError::PathNotFound(_)));
    }

    #[test]
    fn test_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "f", b"x");

        let err = finder(0).find_duplicates(&file).unwrap_err();
        assert!(matches!(err, FinderError::NotADirectory(_)));
    }

    #[test]
    fn test_unique_sizes_are_never_hashed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", b"1");
        write(dir.path(), "b", b"22");
        write(dir.path(), "c", b"333");

        let (groups, summary) = finder(0).find_duplicates(dir.path()).unwrap();
        assert!(groups.is_empty());
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.eliminated_by_size, 3);
        assert_eq!(summary.hashed_files, 0);
    }

    #[test]
    fn test_summary_accounting() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", &[7u8; 64]);
        write(dir.path(), "b", &[7u8; 64]);
        write(dir.path(), "c", &[7u8; 64]);
        write(dir.path(), "d", &[8u8; 64]);

        let (groups, summary) = finder(0).find_duplicates(dir.path()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(summary.hashed_files, 4);
        assert_eq!(summary.bytes_hashed, 256);
        assert_eq!(summary.duplicate_groups, 1);
        assert_eq!(summary.duplicate_files, 2);
        assert_eq!(summary.reclaimable_space, 128);
        assert!(!summary.has_errors());
    }

    #[test]
    fn test_from_files_missing_file_fails_fast() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a", b"same");
        let gone = dir.path().join("gone");

        let err = finder(0)
            .find_duplicates_from_files(vec![FileEntry::new(a, 4), FileEntry::new(gone.clone(), 4)])
            .unwrap_err();
        match err {
            FinderError::Hash(e) => assert_eq!(e.path(), gone),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_files_lenient_skips_missing_file() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a", b"same");
        let b = write(dir.path(), "b", b"same");
        let gone = dir.path().join("gone");

        let finder = DuplicateFinder::new(
            FinderConfig::default().with_error_policy(HashErrorPolicy::SkipAndContinue),
        );
        let (groups, summary) = finder
            .find_duplicates_from_files(vec![
                FileEntry::new(a.clone(), 4),
                FileEntry::new(gone, 4),
                FileEntry::new(b.clone(), 4),
            ])
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths, vec![a, b]);
        assert_eq!(summary.hash_errors.len(), 1);
        assert!(summary.has_errors());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        for i in 0..12 {
            let content = vec![(i % 3) as u8; 128];
            write(dir.path(), &format!("f{i:02}"), &content);
        }

        let (sequential, _) = finder(0).find_duplicates(dir.path()).unwrap();
        let parallel = DuplicateFinder::new(
            FinderConfig::default().with_min_size(0).with_io_threads(4),
        );
        let (parallel, _) = parallel.find_duplicates(dir.path()).unwrap();

        assert_eq!(sequential.len(), 3);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parallel_fail_fast_stops_remaining_files() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("a_gone");
        let mut paths = vec![gone.clone()];
        for i in 0..64 {
            paths.push(write(dir.path(), &format!("f{i:02}"), &vec![b'z'; 256 * 1024]));
        }
        let total = paths.len();

        let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(2));
        let pool = finder.build_pool().unwrap();
        let results = finder.digest_paths(Some(&pool), paths);

        assert!(results.len() < total);
        assert!(results
            .iter()
            .any(|(p, r)| p == &gone && matches!(r, Err(HashError::NotFound(_)))));
        assert!(results
            .iter()
            .all(|(_, r)| !matches!(r, Err(HashError::Cancelled(_)))));
    }

    #[test]
    fn test_parallel_lenient_hashes_every_file() {
        let dir = TempDir::new().unwrap();
        let mut paths = vec![dir.path().join("a_gone")];
        for i in 0..8 {
            paths.push(write(dir.path(), &format!("f{i}"), &[3u8; 512]));
        }

        let finder = DuplicateFinder::new(
            FinderConfig::default()
                .with_io_threads(2)
                .with_error_policy(HashErrorPolicy::SkipAndContinue),
        );
        let pool = finder.build_pool().unwrap();
        let results = finder.digest_paths(Some(&pool), paths);

        assert_eq!(results.len(), 9);
        assert_eq!(results.iter().filter(|(_, r)| r.is_ok()).count(), 8);
    }

    #[test]
    fn test_shutdown_before_scan() {
        let dir = TempDir::new().unwrap();
        let finder = DuplicateFinder::new(
            FinderConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true))),
        );

        let err = finder.find_duplicates(dir.path()).unwrap_err();
        assert!(matches!(err, FinderError::Interrupted));
    }

    #[test]
    fn test_reclaimable_display() {
        let summary = ScanSummary {
            reclaimable_space: 2048,
            ..Default::default()
        };
        assert!(!summary.reclaimable_display().is_empty());
    }
}
