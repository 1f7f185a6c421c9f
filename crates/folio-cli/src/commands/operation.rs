// One-shot operation execution

use std::io::Write;

use folio_files::{
    ContentValidator, DelimiterValidator, DocumentFormat, Operation, OperationOutput,
};
use tracing::debug;

use super::CommandContext;
use crate::error::{CliError, CliResult};

/// Runs a single operation and prints its result
pub struct OperationCommand {
    operation: Operation,
    validate: bool,
}

impl OperationCommand {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            validate: false,
        }
    }

    /// Check document structure after an applied edit
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn execute(&self, ctx: &mut CommandContext, out: &mut dyn Write) -> CliResult<()> {
        let output = ctx.session.execute(self.operation.clone())?;

        if ctx.json {
            serde_json::to_writer_pretty(&mut *out, &output)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", ctx.style.operation(&output))?;
        }

        if self.validate {
            self.validate_result(ctx, &output, out)?;
        }
        Ok(())
    }

    fn validate_result(
        &self,
        ctx: &CommandContext,
        output: &OperationOutput,
        out: &mut dyn Write,
    ) -> CliResult<()> {
        let applied = matches!(output, OperationOutput::Edit(result) if result.is_applied());
        let Some(raw) = edited_path(&self.operation).filter(|_| applied) else {
            debug!("Nothing applied, skipping validation");
            return Ok(());
        };

        let path = ctx.session.resolve(raw)?;
        let content = std::fs::read_to_string(&path)?;
        let format = DocumentFormat::from_path(&path);
        let report = DelimiterValidator.validate(&content, format);
        debug!(format = %format, valid = report.valid, "Validated {}", path.display());

        if ctx.json {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", ctx.style.validation(&report))?;
        }

        if report.valid {
            Ok(())
        } else {
            Err(CliError::ValidationFailed {
                path,
                errors: report.errors,
            })
        }
    }
}

fn edited_path(operation: &Operation) -> Option<&str> {
    match operation {
        Operation::Edit { path, .. }
        | Operation::EditMany { path, .. }
        | Operation::EditFromBuffer { path, .. }
        | Operation::InsertAtLine { path, .. } => Some(path),
        _ => None,
    }
}
