//! Streaming file hasher.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing content digests
//! of files using memory-efficient streaming. Files are read in
//! [`BLOCK_SIZE`] blocks and fed into an incremental hash state, so memory
//! use does not depend on file size.
//!
//! BLAKE3 is the default algorithm. SHA-256 and SHA-512 are available for
//! output that must match `sha256sum`-style tooling.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};

use super::HashError;

/// Size of each read while streaming a file (64 KiB).
///
/// Only affects throughput, never the resulting digest.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (256-bit)
    #[default]
    Blake3,
    /// SHA-256
    Sha256,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Length of the hex-encoded digest in characters.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Blake3 | Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Lowercase hexadecimal digest of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Wrap a hex string, normalizing it to lowercase.
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        let mut hex = hex.into();
        hex.make_ascii_lowercase();
        Self(hex)
    }

    /// The digest as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Incremental hash state for one of the supported algorithms.
enum DigestState {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> ContentDigest {
        let hex = match self {
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Sha512(h) => format!("{:x}", h.finalize()),
        };
        ContentDigest(hex)
    }
}

/// Digest of in-memory data.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> ContentDigest {
    let mut state = DigestState::new(algorithm);
    state.update(data);
    state.finalize()
}

/// Streaming file hasher.
///
/// Cheap to clone; share one per pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    shutdown_flag: Option<Arc<AtomicBool>>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Hasher {
    /// Create a hasher using the default algorithm (BLAKE3).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the shutdown flag. It is checked before every block read.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set a cancel flag, checked before every block read like the shutdown
    /// flag. A cancelled digest returns [`HashError::Cancelled`].
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Compute the digest of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails
    /// partway through. A partial digest is never returned.
    pub fn digest(&self, path: &Path) -> Result<ContentDigest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.stream(file, path)
    }

    /// Compute the digest of everything `reader` yields.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if a read fails.
    pub fn digest_reader<R: Read>(&self, reader: R) -> Result<ContentDigest, HashError> {
        self.stream(reader, Path::new("<reader>"))
    }

    fn stream<R: Read>(&self, mut reader: R, path: &Path) -> Result<ContentDigest, HashError> {
        let mut state = DigestState::new(self.algorithm);
        let mut buf = vec![0u8; BLOCK_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            if self.is_cancelled() {
                return Err(HashError::Cancelled(path.to_path_buf()));
            }
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            state.update(&buf[..read]);
        }

        Ok(state.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const ABC_SHA512: &str = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
                              2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";

    /// Reader that yields some bytes, then fails.
    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other("read failed partway"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(b'z');
            self.remaining -= n;
            Ok(n)
        }
    }

    /// Reader that reports EINTR once before delegating.
    struct InterruptOnce<R> {
        inner: R,
        interrupted: bool,
    }

    impl<R: Read> Read for InterruptOnce<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_known_sha_vectors() {
        assert_eq!(hash_bytes(HashAlgorithm::Sha256, b"abc").as_str(), ABC_SHA256);
        assert_eq!(hash_bytes(HashAlgorithm::Sha512, b"abc").as_str(), ABC_SHA512);
    }

    #[test]
    fn test_blake3_matches_reference() {
        let expected = blake3::hash(b"abc").to_hex().to_string();
        assert_eq!(hash_bytes(HashAlgorithm::Blake3, b"abc").as_str(), expected);
    }

    #[test]
    fn test_digest_is_lowercase_hex_of_expected_length() {
        for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256, HashAlgorithm::Sha512] {
            let digest = hash_bytes(algorithm, b"some content");
            assert_eq!(digest.as_str().len(), algorithm.hex_len());
            assert!(digest
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_file_digest_spanning_many_blocks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..(BLOCK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
            let hasher = Hasher::new().with_algorithm(algorithm);
            assert_eq!(hasher.digest(&path).unwrap(), hash_bytes(algorithm, &content));
        }
    }

    #[test]
    fn test_empty_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let hasher = Hasher::new().with_algorithm(HashAlgorithm::Sha256);
        assert_eq!(
            hasher.digest(&path).unwrap().as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.bin");

        let err = Hasher::new().digest(&path).unwrap_err();
        assert!(matches!(err, HashError::NotFound(ref p) if p == &path));
    }

    #[test]
    fn test_read_failure_propagates() {
        let err = Hasher::new()
            .digest_reader(FailingReader {
                remaining: BLOCK_SIZE + 5,
            })
            .unwrap_err();
        assert!(matches!(err, HashError::Io { .. }));
        assert!(err.to_string().contains("read failed partway"));
    }

    #[test]
    fn test_eintr_is_retried() {
        let reader = InterruptOnce {
            inner: &b"abc"[..],
            interrupted: false,
        };
        let digest = Hasher::new()
            .with_algorithm(HashAlgorithm::Sha256)
            .digest_reader(reader)
            .unwrap();
        assert_eq!(digest.as_str(), ABC_SHA256);
    }

    #[test]
    fn test_shutdown_flag_interrupts() {
        let flag = Arc::new(AtomicBool::new(true));
        let hasher = Hasher::new().with_shutdown_flag(flag);

        let err = hasher.digest_reader(&b"abc"[..]).unwrap_err();
        assert!(matches!(err, HashError::Interrupted(_)));
    }

    /// Reader over endless data that counts its reads and raises a flag
    /// after the first one.
    struct CancelAfterFirstRead {
        flag: Arc<AtomicBool>,
        reads: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Read for CancelAfterFirstRead {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.flag.store(true, Ordering::SeqCst);
            buf.fill(b'q');
            Ok(buf.len())
        }
    }

    #[test]
    fn test_cancel_flag_stops_read_in_progress() {
        let flag = Arc::new(AtomicBool::new(false));
        let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hasher = Hasher::new().with_cancel_flag(Arc::clone(&flag));

        let err = hasher
            .digest_reader(CancelAfterFirstRead {
                flag,
                reads: Arc::clone(&reads),
            })
            .unwrap_err();

        assert!(matches!(err, HashError::Cancelled(_)));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_flag_before_open_reads_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"content").unwrap();

        let hasher = Hasher::new().with_cancel_flag(Arc::new(AtomicBool::new(true)));
        let err = hasher.digest(&path).unwrap_err();
        assert!(matches!(err, HashError::Cancelled(ref p) if p == &path));
    }

    #[test]
    fn test_content_digest_normalizes_case() {
        let digest = ContentDigest::new("ABCdef");
        assert_eq!(digest.as_str(), "abcdef");
        assert_eq!(digest.to_string(), "abcdef");
    }

    #[test]
    fn test_algorithm_display() {
        assert_eq!(HashAlgorithm::Blake3.to_string(), "blake3");
        assert_eq!(HashAlgorithm::Sha256.to_string(), "sha256");
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Blake3);
    }
}
