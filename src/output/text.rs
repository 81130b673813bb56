//! Plain text report.
//!
//! Each group is printed as its digest, a line of dashes as wide as the
//! digest, one member path per line, then a blank line:
//!
//! ```text
//! 3f4a...e1
//! ---------
//! /data/a.bin
//! /data/copy/a.bin
//!
//! ```

use std::io::{self, Write};

use crate::duplicates::DuplicateGroup;

/// Text formatter.
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> TextOutput<'a> {
    /// Create a text formatter over `groups`.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write every group to `writer`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in self.groups {
            let digest = group.digest.as_str();
            writeln!(writer, "{}", digest)?;
            writeln!(writer, "{}", "-".repeat(digest.len()))?;
            for path in &group.paths {
                writeln!(writer, "{}", path.display())?;
            }
            writeln!(writer)?;
        }
        writer.flush()
    }
}
