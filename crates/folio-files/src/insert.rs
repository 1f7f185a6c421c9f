//! Line-addressed insertion
//!
//! Used when a textual match is hopeless: the caller names a 1-based line and
//! places content before it, after it, or in its place. Valid line numbers
//! run from 1 to one past the last line; the latter always appends.

use std::path::Path;

use tracing::debug;

use crate::edit::{read_document, EditEngine};
use crate::error::FileError;
use crate::models::{EditOutcome, EditResult, EditStrategy, InsertMode};

/// Pure line splicing over in-memory content
pub struct LineInserter;

impl LineInserter {
    /// Splices `payload` into `content` at `line_number`
    ///
    /// The payload is treated as whole lines: a trailing newline is added
    /// when missing. Appending after a final line that lacks a newline gives
    /// that line one first. `Replace` keeps the replaced line's own
    /// terminator (`\r\n`, `\n` or none), so CRLF files stay CRLF and an
    /// unterminated last line stays unterminated.
    pub fn splice(
        content: &str,
        line_number: usize,
        payload: &str,
        mode: InsertMode,
    ) -> Result<String, FileError> {
        let line_count = content.split_inclusive('\n').count();
        if line_number == 0 || line_number - 1 > line_count {
            return Err(FileError::OutOfRange {
                line_number,
                line_count,
            });
        }
        let index = line_number - 1;

        let mut block = payload.to_string();
        if !block.ends_with('\n') {
            block.push('\n');
        }

        let mut out = String::with_capacity(content.len() + block.len() + 1);

        if index == line_count {
            out.push_str(content);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            return Ok(out);
        }

        for (i, line) in content.split_inclusive('\n').enumerate() {
            if i != index {
                out.push_str(line);
                continue;
            }
            match mode {
                InsertMode::Before => {
                    out.push_str(&block);
                    out.push_str(line);
                }
                InsertMode::After => {
                    out.push_str(line);
                    if !line.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&block);
                }
                InsertMode::Replace => {
                    let body = block.strip_suffix('\n').unwrap_or(&block);
                    let body = body.strip_suffix('\r').unwrap_or(body);
                    out.push_str(body);
                    out.push_str(line_terminator(line));
                }
            }
        }

        Ok(out)
    }

    /// 1-based line where the first payload line lands
    pub fn landing_line(line_count: usize, line_number: usize, mode: InsertMode) -> usize {
        if line_number > line_count {
            return line_count + 1;
        }
        match mode {
            InsertMode::Before | InsertMode::Replace => line_number,
            InsertMode::After => line_number + 1,
        }
    }
}

fn line_terminator(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

impl EditEngine {
    /// Inserts content at a line, defaulting the payload to the buffer
    ///
    /// Out-of-range line numbers fail before anything is written.
    pub fn insert_at_line(
        &mut self,
        path: &Path,
        line_number: usize,
        payload: Option<&str>,
        mode: InsertMode,
    ) -> Result<EditResult, FileError> {
        let payload = match payload {
            Some(payload) => payload.to_string(),
            None => self.buffer.get_or_require()?.to_string(),
        };

        self.ensure_unmodified(path)?;
        let content = read_document(path)?;
        let line_count = content.split_inclusive('\n').count();

        let updated = LineInserter::splice(&content, line_number, &payload, mode)?;
        let landed = LineInserter::landing_line(line_count, line_number, mode);
        let total_lines = updated.lines().count();
        let first_line = payload.lines().next().unwrap_or_default().to_string();

        self.commit(path, updated)?;
        debug!(
            "Inserted {} bytes at line {} of {} ({:?})",
            payload.len(),
            landed,
            path.display(),
            mode
        );

        Ok(EditResult::new(
            EditOutcome::Applied,
            EditStrategy::LineInsert,
            format!(
                "Inserted {} line(s) at line {}",
                payload.lines().count().max(1),
                landed
            ),
        )
        .at_line(landed, first_line)
        .with_total_lines(total_lines))
    }
}
