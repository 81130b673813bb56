//! Two-bucket classification and duplicate groups.
//!
//! # Overview
//!
//! [`Classifier`] separates a stream of `(key, value)` pairs into values
//! whose key has been seen once ("unique") and groups of values sharing a
//! key ("duplicates"). The same structure drives both pipeline passes: keyed
//! by file size, then by content digest.
//!
//! Groups are kept in promotion order and values within a group in arrival
//! order, so a fixed input sequence always yields the same output.
//!
//! # Example
//!
//! ```
//! use fildup::duplicates::{Classifier, Placement};
//!
//! let mut sizes = Classifier::new();
//! assert_eq!(sizes.classify(1024_u64, "/a.bin"), Placement::Unique);
//! assert_eq!(sizes.classify(2048_u64, "/b.bin"), Placement::Unique);
//! assert_eq!(sizes.classify(1024_u64, "/c.bin"), Placement::Promoted);
//!
//! let groups = sizes.into_duplicates();
//! assert_eq!(groups, vec![(1024, vec!["/a.bin", "/c.bin"])]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::ContentDigest;

/// Where [`Classifier::classify`] placed a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First value seen for its key.
    Unique,
    /// Second value for its key; the key now has a duplicate group.
    Promoted,
    /// Third or later value, appended to an existing group.
    Appended,
}

/// Accumulator separating unique keys from duplicate groups.
///
/// On promotion the key's unique entry moves into the new group, so a key
/// is never in both buckets. Only the duplicate groups are meant to be read
/// as results.
#[derive(Debug, Clone)]
pub struct Classifier<K, V> {
    unique: HashMap<K, V>,
    index: HashMap<K, usize>,
    duplicates: Vec<(K, Vec<V>)>,
}

impl<K, V> Default for Classifier<K, V> {
    fn default() -> Self {
        Self {
            unique: HashMap::new(),
            index: HashMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<K, V> Classifier<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation.
    pub fn classify(&mut self, key: K, value: V) -> Placement {
        if let Some(&idx) = self.index.get(&key) {
            self.duplicates[idx].1.push(value);
            return Placement::Appended;
        }

        match self.unique.remove(&key) {
            Some(first) => {
                self.index.insert(key.clone(), self.duplicates.len());
                self.duplicates.push((key, vec![first, value]));
                Placement::Promoted
            }
            None => {
                self.unique.insert(key, value);
                Placement::Unique
            }
        }
    }

    /// Values sharing `key`, if it has been promoted.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.index
            .get(key)
            .map(|&idx| self.duplicates[idx].1.as_slice())
    }

    /// Whether `key` has been seen exactly once.
    #[must_use]
    pub fn is_unique(&self, key: &K) -> bool {
        self.unique.contains_key(key)
    }

    /// Duplicate groups in promotion order.
    pub fn duplicates(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.duplicates.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of keys seen exactly once.
    #[must_use]
    pub fn unique_len(&self) -> usize {
        self.unique.len()
    }

    /// Number of duplicate groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.duplicates.len()
    }

    /// Total number of values held in duplicate groups.
    #[must_use]
    pub fn grouped_len(&self) -> usize {
        self.duplicates.iter().map(|(_, v)| v.len()).sum()
    }

    /// Consume the classifier, returning the duplicate groups in promotion
    /// order.
    #[must_use]
    pub fn into_duplicates(self) -> Vec<(K, Vec<V>)> {
        self.duplicates
    }
}

impl<K, V> Extend<(K, V)> for Classifier<K, V>
where
    K: Eq + Hash + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.classify(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Classifier<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut classifier = Self::new();
        classifier.extend(iter);
        classifier
    }
}

/// Confirmed group of files with identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Digest shared by every file in the group
    pub digest: ContentDigest,
    /// File size in bytes (shared by all files)
    pub size: u64,
    /// Files in first-seen order; always at least two
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(digest: ContentDigest, size: u64, paths: Vec<PathBuf>) -> Self {
        debug_assert!(paths.len() >= 2, "duplicate group needs two or more files");
        Self {
            digest,
            size,
            paths,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `path` is a member of this group.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Number of copies beyond the first.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Bytes that removing every copy but one would free.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }
}
