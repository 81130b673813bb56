//! Output formatters for duplicate scan results.
//!
//! - [`TextOutput`]: human-readable listing, one block per group
//! - [`JsonOutput`]: JSON for automation and scripting
//! - [`CsvOutput`]: one row per file for spreadsheet import
//!
//! Groups are written in the order the finder returned them.
//!
//! # Example
//!
//! ```no_run
//! use fildup::duplicates::DuplicateFinder;
//! use fildup::output::TextOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, _summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! TextOutput::new(&groups).write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
