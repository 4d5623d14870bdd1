//! Plain-text duplicate report.
//!
//! ```text
//! Found 1 sets of duplicates...
//! 3 files (w/ same hash):
//!     /data/a (100 bytes)
//!     /data/b (100 bytes)
//!     /data/c (100 bytes)
//! 200 bytes in 3 files (wasted) [200 B]
//! ```
//!
//! Byte counts are exact; the bracketed total is the `bytesize` rendering.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::session::SessionReport;

/// Text renderer for a [`SessionReport`].
#[derive(Debug)]
pub struct TextOutput<'a> {
    report: &'a SessionReport,
}

impl<'a> TextOutput<'a> {
    /// Wrap `report` for rendering.
    #[must_use]
    pub fn new(report: &'a SessionReport) -> Self {
        Self { report }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let groups = &self.report.groups;
        writeln!(writer, "Found {} sets of duplicates...", groups.len())?;

        for group in groups {
            writeln!(writer, "{} files (w/ same hash):", group.len())?;
            for path in &group.files {
                writeln!(writer, "\t{} ({} bytes)", path.display(), group.size)?;
            }
        }

        let stats = &self.report.stats;
        writeln!(
            writer,
            "{} bytes in {} files (wasted) [{}]",
            stats.wasted_bytes,
            stats.files_in_groups,
            ByteSize::b(stats.wasted_bytes)
        )?;
        Ok(())
    }

    /// Render the report to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Vec<u8> writes cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
