//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Two-bucket classification of `(key, value)` pairs ([`Classifier`])
//! - Size-based file grouping (Phase 1)
//! - Content digest comparison (Phase 2)
//! - Confirmed duplicate groups ([`DuplicateGroup`])

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, HashErrorPolicy, ScanSummary};
pub use groups::{Classifier, DuplicateGroup, Placement};
