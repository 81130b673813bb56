//! fildup - duplicate file finder
//!
//! Finds files with identical content under a directory tree. Files are
//! grouped by size first, so only files that share a size are ever read;
//! those are checksummed (BLAKE3 by default) and grouped by digest.
//!
//! # Library usage
//!
//! ```no_run
//! use fildup::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_min_size(1));
//! let (groups, summary) = finder.find_duplicates(Path::new("/data")).unwrap();
//! for group in &groups {
//!     println!("{} ({} files)", group.digest, group.len());
//! }
//! println!("{} reclaimable", summary.reclaimable_display());
//! ```

pub mod cli;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, HashErrorPolicy, ScanSummary};
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::path_utils::{expand_tilde, resolve_root};
use crate::scanner::{ExclusionList, WalkerConfig};

/// Run a scan with parsed arguments, writing the report to stdout.
///
/// # Errors
///
/// Returns an error for invalid configuration, a failed or interrupted
/// scan, or a report that cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_app_with_writer(cli, &mut out)
}

/// Run a scan with parsed arguments, writing the report to `writer`.
///
/// # Errors
///
/// Same as [`run_app`].
pub fn run_app_with_writer<W: Write>(cli: Cli, writer: &mut W) -> anyhow::Result<ExitCode> {
    let args = cli.scan;

    let root = resolve_root(&args.path)
        .with_context(|| format!("Cannot resolve path {}", args.path.display()))?;
    log::debug!(
        "Resolved scan root: {} (algorithm: {}, report: {})",
        root.display(),
        args.algorithm,
        args.output
    );

    let mut config = FinderConfig::default()
        .with_walker_config(
            WalkerConfig::default()
                .with_min_size(args.min_size)
                .with_hidden_match(args.hidden_match),
        )
        .with_algorithm(args.algorithm)
        .with_io_threads(usize::from(args.io_threads));

    if args.lenient {
        config = config.with_error_policy(HashErrorPolicy::SkipAndContinue);
    }

    if let Some(ref file) = args.exclude_file {
        let exclusions = ExclusionList::load(&expand_tilde(file), &root)
            .context("Invalid exclusion list")?;
        config = config.with_exclusions(Arc::new(exclusions));
    }

    let handler = signal::install_handler()?;
    config = config.with_shutdown_flag(handler.get_flag());

    let show_progress = !cli.quiet && !cli.no_progress && io::stderr().is_terminal();
    config = config.with_progress_callback(Arc::new(Progress::new(!show_progress)));

    let finder = DuplicateFinder::new(config);
    let (groups, summary) = finder
        .find_duplicates(&root)
        .context("Duplicate scan failed")?;

    let exit_code = exit_code_for(&groups, &summary);
    write_report(args.output, &groups, &summary, exit_code, writer)
        .context("Failed to write report")?;

    log::info!(
        "{} files ({}), {} hashed, {} duplicate groups, {} reclaimable in {:.2?}",
        summary.total_files,
        summary.total_size_display(),
        summary.hashed_files,
        summary.duplicate_groups,
        summary.reclaimable_display(),
        summary.scan_duration
    );
    if summary.has_errors() {
        log::warn!(
            "{} entries skipped because of errors",
            summary.scan_errors.len() + summary.hash_errors.len()
        );
    }

    Ok(exit_code)
}

/// Skipped entries take precedence: a partial scan never reports a clean
/// "no duplicates".
fn exit_code_for(groups: &[DuplicateGroup], summary: &ScanSummary) -> ExitCode {
    if summary.has_errors() {
        ExitCode::PartialSuccess
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn write_report<W: Write>(
    format: OutputFormat,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
    exit_code: ExitCode,
    writer: &mut W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => TextOutput::new(groups).write_to(writer)?,
        OutputFormat::Json => JsonOutput::new(groups, summary, exit_code).write_to(writer)?,
        OutputFormat::Csv => CsvOutput::new(groups).write_to(writer)?,
    }
    Ok(())
}
