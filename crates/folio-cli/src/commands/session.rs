// JSON-lines session mode
//
// Each stdin line is one serialized `Operation`; each stdout line is either
// `{"ok": <output>}` or `{"error": {...}}`. All lines share one session, so
// snapshots and the content buffer carry over between calls.

use std::io::{BufRead, Write};

use folio_files::{FileError, Operation, OperationOutput};
use serde::Serialize;
use tracing::{info, warn};

use super::CommandContext;
use crate::error::CliResult;

/// One reply line
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionReply {
    Ok(OperationOutput),
    Error(SessionError),
}

/// Error payload of a reply line
#[derive(Debug, Serialize)]
pub struct SessionError {
    /// Stable error name
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Diff for refused edits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl SessionError {
    fn from_file_error(err: &FileError) -> Self {
        let diff = match err {
            FileError::ExternalModification { diff, .. } => Some(diff.clone()),
            _ => None,
        };
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            diff,
        }
    }

    fn malformed(err: &serde_json::Error) -> Self {
        Self {
            kind: "malformed_request".to_string(),
            message: err.to_string(),
            diff: None,
        }
    }
}

/// Counts for a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Non-blank request lines
    pub requests: usize,
    /// Requests answered with an error
    pub failures: usize,
}

/// Runs the JSON-lines loop until end of input
#[derive(Debug, Default)]
pub struct SessionCommand;

impl SessionCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(
        &self,
        ctx: &mut CommandContext,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> CliResult<SessionSummary> {
        let mut summary = SessionSummary::default();
        let mut line = String::new();

        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let request = line.trim();
            if request.is_empty() {
                continue;
            }
            summary.requests += 1;

            let reply = Self::handle(ctx, request);
            if let SessionReply::Error(err) = &reply {
                summary.failures += 1;
                warn!(kind = %err.kind, "Session request failed");
            }

            serde_json::to_writer(&mut *out, &reply)?;
            writeln!(out)?;
            out.flush()?;
        }

        info!(
            requests = summary.requests,
            failures = summary.failures,
            "Session ended"
        );
        Ok(summary)
    }

    fn handle(ctx: &mut CommandContext, request: &str) -> SessionReply {
        let operation: Operation = match serde_json::from_str(request) {
            Ok(operation) => operation,
            Err(err) => return SessionReply::Error(SessionError::malformed(&err)),
        };
        match ctx.session.execute(operation) {
            Ok(output) => SessionReply::Ok(output),
            Err(err) => SessionReply::Error(SessionError::from_file_error(&err)),
        }
    }
}
