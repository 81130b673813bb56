//! Command-line interface definitions for fildup.
//!
//! Every option can also come from an environment variable where noted, so
//! there is no configuration file.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates under the current directory
//! fildup
//!
//! # Smaller threshold, JSON output for scripting
//! fildup ~/Downloads --min-size 1KiB --output json
//!
//! # Four hashing threads, keep going past unreadable files
//! fildup /srv/media --io-threads 4 --lenient
//! ```

use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

use crate::scanner::{HashAlgorithm, HiddenMatch, DEFAULT_MIN_SIZE};

/// Find files with identical content.
///
/// Files are grouped by size first; only files sharing a size are read and
/// checksummed.
#[derive(Debug, Parser)]
#[command(name = "fildup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Do not draw progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Scan options
    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Options controlling what is scanned and how.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan for duplicates
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Minimum file size to consider (e.g., 10000, 4KiB, 1MB)
    ///
    /// Files of exactly this size are included.
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(
        long,
        value_name = "SIZE",
        value_parser = parse_size,
        default_value_t = DEFAULT_MIN_SIZE,
        allow_hyphen_values = true,
        env = "FILDUP_MIN_SIZE"
    )]
    pub min_size: u64,

    /// File listing paths to exclude, one per line
    ///
    /// Relative entries resolve against the scanned directory. Lines
    /// starting with # are ignored.
    #[arg(long, value_name = "FILE", env = "FILDUP_EXCLUDE_FILE")]
    pub exclude_file: Option<PathBuf>,

    /// Digest algorithm
    #[arg(
        long,
        value_enum,
        default_value_t = HashAlgorithm::Blake3,
        env = "FILDUP_ALGORITHM"
    )]
    pub algorithm: HashAlgorithm,

    /// How hidden entries and .app bundles are recognized
    #[arg(long, value_enum, default_value_t = HiddenMatch::Component)]
    pub hidden_match: HiddenMatch,

    /// Number of threads used for hashing
    ///
    /// 1 hashes on the main thread. Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: u16,

    /// Skip files that cannot be read while hashing instead of aborting
    #[arg(long)]
    pub lenient: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Digest, underline, then one path per line for each group
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use fildup::cli::parse_size;
///
/// assert_eq!(parse_size("10000").unwrap(), 10_000);
/// assert_eq!(parse_size("4KiB").unwrap(), 4096);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert!(parse_size("-1").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, negative, not a number, or has
/// an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err(format!("Size cannot be negative: '{s}'"));
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    // Whole numbers stay exact; only fractions go through f64.
    if let Ok(whole) = num_str.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Size too large: '{s}'"));
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;
    Ok((num * multiplier as f64) as u64)
}
