// CLI error types and user-facing messages

use std::path::PathBuf;

use folio_config::ConfigError;
use folio_files::FileError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed for {path}: {}", .errors.join("; "))]
    ValidationFailed { path: PathBuf, errors: Vec<String> },
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'folio --help' for usage information.",
                    message
                )
            }
            CliError::Io(e) => format!("File operation failed: {}", e),
            CliError::Config(msg) => {
                format!(
                    "Configuration error: {}\n\nRun 'folio config show' to inspect the effective settings.",
                    msg
                )
            }
            CliError::File(FileError::ExternalModification { path, diff }) => {
                format!(
                    "{} changed on disk since it was last read.\n\n{}\nRead the file again before editing it.",
                    path.display(),
                    diff
                )
            }
            CliError::File(FileError::BufferEmpty) => {
                "The content buffer is empty.\n\nBuffered operations only carry over within 'folio session'.".to_string()
            }
            CliError::File(e) => e.to_string(),
            CliError::Json(e) => format!("Malformed JSON: {}", e),
            CliError::ValidationFailed { path, errors } => {
                let mut message = format!("The edit to {} left the document invalid:", path.display());
                for error in errors {
                    message.push_str(&format!("\n  • {}", error));
                }
                message
            }
        }
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument { .. } | CliError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }
}

pub type CliResult<T> = Result<T, CliError>;
