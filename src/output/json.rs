//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "digest": "af1349b9...",
//!       "size": 1024,
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "total_size": 1048576,
//!     "eliminated_by_size": 80,
//!     "hashed_files": 20,
//!     "bytes_hashed": 20480,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "reclaimable_space": 10240,
//!     "scan_duration_ms": 1234,
//!     "errors": [],
//!     "exit_code": 0,
//!     "exit_code_name": "FD000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Lowercase hexadecimal digest
    pub digest: String,
    /// File size in bytes
    pub size: u64,
    /// Paths of every file in the group, in first-seen order
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            digest: group.digest.to_string(),
            size: group.size,
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files that passed the inclusion rules
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Files dropped because no other file had their size
    pub eliminated_by_size: usize,
    /// Files whose digest was computed
    pub hashed_files: usize,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Duplicate files, not counting one copy per group
    pub duplicate_files: usize,
    /// Bytes that removing the duplicates would free
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Messages for every entry skipped because of an error
    pub errors: Vec<String>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        let errors = summary
            .scan_errors
            .iter()
            .map(ToString::to_string)
            .chain(summary.hash_errors.iter().map(ToString::to_string))
            .collect();

        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            eliminated_by_size: summary.eliminated_by_size,
            hashed_files: summary.hashed_files,
            bytes_hashed: summary.bytes_hashed,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            errors,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups in result order
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use fildup::duplicates::{DuplicateGroup, ScanSummary};
    /// use fildup::error::ExitCode;
    /// use fildup::output::json::JsonOutput;
    /// use fildup::scanner::ContentDigest;
    /// use std::path::PathBuf;
    ///
    /// let groups = vec![DuplicateGroup::new(
    ///     ContentDigest::new("ab12"),
    ///     1024,
    ///     vec![PathBuf::from("/file1.txt"), PathBuf::from("/file2.txt")],
    /// )];
    ///
    /// let output = JsonOutput::new(&groups, &ScanSummary::default(), ExitCode::Success);
    /// assert_eq!(output.duplicates.len(), 1);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups.iter().map(JsonDuplicateGroup::from).collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{ContentDigest, HashError, ScanError};
    use std::path::PathBuf;
    use std::time::Duration;

    fn sample_groups() -> Vec<DuplicateGroup> {
        vec![DuplicateGroup::new(
            ContentDigest::new("DEADBEEF"),
            1000,
            vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")],
        )]
    }

    #[test]
    fn test_json_shape() {
        let output = JsonOutput::new(&sample_groups(), &ScanSummary::default(), ExitCode::Success);
        let value: serde_json::Value =
            serde_json::from_str(&output.to_json_pretty().unwrap()).unwrap();

        let group = &value["duplicates"][0];
        assert_eq!(group["digest"], "deadbeef");
        assert_eq!(group["size"], 1000);
        assert_eq!(group["files"][1], "/data/b");
        assert_eq!(value["summary"]["exit_code_name"], "FD000");
    }

    #[test]
    fn test_json_summary_fields() {
        let summary = ScanSummary {
            total_files: 4,
            total_size: 3005,
            eliminated_by_size: 1,
            hashed_files: 3,
            bytes_hashed: 3000,
            duplicate_groups: 1,
            duplicate_files: 1,
            reclaimable_space: 1000,
            scan_duration: Duration::from_millis(42),
            scan_errors: vec![ScanError::PermissionDenied(PathBuf::from("/locked"))],
            hash_errors: vec![HashError::NotFound(PathBuf::from("/gone"))],
        };

        let json = JsonSummary::from_scan_summary(&summary, ExitCode::PartialSuccess);
        assert_eq!(json.total_files, 4);
        assert_eq!(json.eliminated_by_size, 1);
        assert_eq!(json.bytes_hashed, 3000);
        assert_eq!(json.scan_duration_ms, 42);
        assert_eq!(json.exit_code, 3);
        assert_eq!(
            json.errors,
            vec!["Permission denied: /locked", "File not found: /gone"]
        );
    }

    #[test]
    fn test_write_to_ends_with_newline() {
        let mut buf = Vec::new();
        JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates)
            .write_to(&mut buf)
            .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"duplicates\": []"));
    }
}
