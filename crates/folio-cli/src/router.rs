// Command routing and dispatch

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use folio_config::AppConfig;
use folio_files::{AuxGroup, EditChange, InsertMode, Operation};

use crate::commands::{
    build_session, load_config, CommandContext, ConfigAction, ConfigCommand, OperationCommand,
    SessionCommand,
};
use crate::error::{CliError, CliResult};
use crate::output::OutputStyle;

/// Folio - change-aware editing for LaTeX and Markdown documents
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(bin_name = "folio")]
#[command(about = "Change-aware editing for LaTeX and Markdown documents")]
#[command(
    long_about = "Folio edits text documents by exact match, refuses to write over changes made by\nother programs, recovers failed edits through a content buffer, and soft-deletes\nfiles into a hidden archive that can be restored later.\n\nQuick Start:\n  • folio read paper.tex\n  • folio edit paper.tex 'old text' 'new text'\n  • folio archive draft_old.tex\n  • folio session        JSON-lines mode keeping state between calls"
)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: ~/.config/folio/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory relative paths resolve against
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show a line-numbered window of a document
    Read {
        /// Document path
        path: String,

        /// First line to show, 1-based
        #[arg(short, long)]
        offset: Option<usize>,

        /// Number of lines to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Replace literal text
    Edit {
        /// Document path
        path: String,

        /// Exact text to find
        needle: String,

        /// Text to put in its place
        replacement: String,

        /// Occurrences the needle must have
        #[arg(short = 'n', long, default_value_t = 1)]
        expected: usize,

        /// Check document structure after an applied edit
        #[arg(long)]
        validate: bool,
    },

    /// Apply several replacements read as a JSON array from stdin, all or nothing
    EditMany {
        /// Document path
        path: String,

        /// Check document structure after the edit
        #[arg(long)]
        validate: bool,
    },

    /// Retry an edit from the content buffer
    EditFromBuffer {
        /// Document path
        path: String,

        /// Text to find (default: start of the replacement)
        #[arg(long)]
        needle: Option<String>,

        /// Replacement (default: the buffer)
        #[arg(long)]
        replacement: Option<String>,

        /// Fuzzy match threshold between 0 and 1
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Check document structure after an applied edit
        #[arg(long)]
        validate: bool,
    },

    /// Insert content at a line
    Insert {
        /// Document path
        path: String,

        /// Target line, 1-based
        line_number: usize,

        /// Content to insert (default: the buffer)
        #[arg(short, long)]
        content: Option<String>,

        /// Placement: before, after or replace
        #[arg(short, long, default_value = "after")]
        mode: InsertMode,

        /// Check document structure after the insertion
        #[arg(long)]
        validate: bool,
    },

    /// Report whether a document changed on disk
    Status {
        /// Document path
        path: String,
    },

    /// Move a document into the hidden archive
    Archive {
        /// Document path
        path: String,

        /// Why the document was archived
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Bring an archived document back
    Restore {
        /// Archived file
        archive_path: String,

        /// Where to restore (default: the recorded original location)
        #[arg(long = "to", value_name = "PATH")]
        to: Option<String>,
    },

    /// List archived documents of a directory
    List {
        /// Directory owning the archive
        #[arg(default_value = ".")]
        directory: String,
    },

    /// Show live and archived versions of a document
    Versions {
        /// File whose versions are listed
        filename: String,

        /// Directory to search
        #[arg(short, long, default_value = ".")]
        directory: String,
    },

    /// Archive every file matching a glob
    Clean {
        /// Directory to clean
        #[arg(default_value = ".")]
        directory: String,

        /// Glob pattern (default: the configured cleanup pattern)
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Move a document, archiving whatever occupies the destination
    Move {
        /// Document to move
        source: String,

        /// New path, or a directory (trailing '/') to move into
        destination: String,
    },

    /// Archive LaTeX build files (.aux, .log, .toc, ...)
    CleanAux {
        /// A .tex source or a directory of them
        #[arg(default_value = ".")]
        path: String,

        /// Archive .bbl, .bcf and .run.xml as well
        #[arg(long)]
        remove_bibliography: bool,
    },

    /// Delete build files so the next LaTeX run regenerates them
    RefreshAux {
        /// The .tex source
        path: String,

        /// Which files: toc, bib, idx or all
        #[arg(short, long, default_value = "all")]
        types: AuxGroup,
    },

    /// List build files beside a LaTeX source
    ListAux {
        /// The .tex source
        path: String,
    },

    /// Run a JSON array of operations from stdin after validating all of them
    Batch {
        /// Validate without running anything
        #[arg(long)]
        dry_run: bool,

        /// Stop at the first failing step
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Read JSON operations from stdin, one per line, sharing one session
    Session,

    /// Inspect and initialize configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigSubcommand>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// The session operation for one-shot subcommands, with the validation flag
    pub fn operation(&self) -> Option<(Operation, bool)> {
        let pair = match self.clone() {
            Commands::Read {
                path,
                offset,
                limit,
            } => (
                Operation::Read {
                    path,
                    offset,
                    limit,
                },
                false,
            ),
            Commands::Edit {
                path,
                needle,
                replacement,
                expected,
                validate,
            } => (
                Operation::Edit {
                    path,
                    needle,
                    replacement,
                    expected_occurrences: expected,
                },
                validate,
            ),
            Commands::EditFromBuffer {
                path,
                needle,
                replacement,
                threshold,
                validate,
            } => (
                Operation::EditFromBuffer {
                    path,
                    needle,
                    replacement,
                    fuzzy_threshold: threshold,
                },
                validate,
            ),
            Commands::Insert {
                path,
                line_number,
                content,
                mode,
                validate,
            } => (
                Operation::InsertAtLine {
                    path,
                    line_number,
                    content,
                    mode,
                },
                validate,
            ),
            Commands::Status { path } => (Operation::Status { path }, false),
            Commands::Archive { path, reason } => (Operation::Archive { path, reason }, false),
            Commands::Restore { archive_path, to } => (
                Operation::Restore {
                    archive_path,
                    restore_path: to,
                },
                false,
            ),
            Commands::List { directory } => (Operation::ListArchived { directory }, false),
            Commands::Versions {
                filename,
                directory,
            } => (
                Operation::FindVersions {
                    filename,
                    directory,
                },
                false,
            ),
            Commands::Clean { directory, pattern } => {
                (Operation::CleanWorkspace { directory, pattern }, false)
            }
            Commands::Move {
                source,
                destination,
            } => (
                Operation::Move {
                    source,
                    destination,
                },
                false,
            ),
            Commands::CleanAux {
                path,
                remove_bibliography,
            } => (
                Operation::CleanAux {
                    path,
                    keep_bibliography: !remove_bibliography,
                },
                false,
            ),
            Commands::RefreshAux { path, types } => (Operation::RefreshAux { path, types }, false),
            Commands::ListAux { path } => (Operation::ListAux { path }, false),
            Commands::EditMany { .. }
            | Commands::Batch { .. }
            | Commands::Session
            | Commands::Config { .. } => return None,
        };
        Some(pair)
    }

    /// The operation for subcommands whose payload arrives as JSON on stdin
    pub fn operation_from_input(
        &self,
        input: &mut dyn BufRead,
    ) -> CliResult<Option<(Operation, bool)>> {
        let pair = match self {
            Commands::EditMany { path, validate } => {
                let changes: Vec<EditChange> = read_json(input, "a JSON array of changes")?;
                (
                    Operation::EditMany {
                        path: path.clone(),
                        changes,
                    },
                    *validate,
                )
            }
            Commands::Batch {
                dry_run,
                stop_on_error,
            } => {
                let steps: Vec<Operation> = read_json(input, "a JSON array of operations")?;
                (
                    Operation::Batch {
                        steps,
                        dry_run: *dry_run,
                        stop_on_error: *stop_on_error,
                    },
                    false,
                )
            }
            _ => return Ok(None),
        };
        Ok(Some(pair))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    input: &mut dyn BufRead,
    expected: &str,
) -> CliResult<T> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    serde_json::from_str(&text).map_err(|e| CliError::InvalidArgument {
        message: format!("stdin must hold {}: {}", expected, e),
    })
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and route to appropriate handler
    pub fn route() -> CliResult<()> {
        let cli = Cli::parse();
        let (manager, config) = load_config(cli.config.as_deref())?;

        crate::logging::init_logging(cli.verbose, cli.quiet, &config.logging.level);

        if let Commands::Config { action } = &cli.command {
            let action = match action {
                Some(ConfigSubcommand::Show) | None => ConfigAction::Show,
                Some(ConfigSubcommand::Path) => ConfigAction::Path,
                Some(ConfigSubcommand::Init { force }) => ConfigAction::Init {
                    force: *force,
                },
            };
            let style = OutputStyle::default();
            let stdout = io::stdout();
            return ConfigCommand::new(action).execute(
                &manager,
                &config,
                &style,
                cli.json,
                &mut stdout.lock(),
            );
        }

        let stdin = io::stdin();
        let stdout = io::stdout();
        Self::execute(&cli, &config, &mut stdin.lock(), &mut stdout.lock())
    }

    /// Execute a session-backed command against the given streams
    pub fn execute(
        cli: &Cli,
        config: &AppConfig,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> CliResult<()> {
        let mut ctx = CommandContext {
            session: build_session(config, cli.root.as_deref()),
            style: OutputStyle::default(),
            json: cli.json,
        };

        if let Commands::Session = cli.command {
            SessionCommand::new().execute(&mut ctx, input, output)?;
            return Ok(());
        }

        let operation = match cli.command.operation() {
            Some(pair) => Some(pair),
            None => cli.command.operation_from_input(input)?,
        };
        match operation {
            Some((operation, validate)) => OperationCommand::new(operation)
                .with_validation(validate)
                .execute(&mut ctx, output),
            None => Ok(()),
        }
    }
}
