// Logging and verbosity control

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::Level;

/// Global verbosity level
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    /// Quiet mode - errors only
    Quiet = 0,
    /// Normal mode - configured level
    Normal = 1,
    /// Verbose mode - debug output
    Verbose = 2,
    /// Very verbose mode - trace output
    VeryVerbose = 3,
}

impl VerbosityLevel {
    /// Get the current verbosity level
    pub fn current() -> Self {
        match VERBOSITY.load(Ordering::Relaxed) {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Normal,
            2 => VerbosityLevel::Verbose,
            _ => VerbosityLevel::VeryVerbose,
        }
    }

    /// Set the verbosity level
    pub fn set(level: Self) {
        VERBOSITY.store(level as u8, Ordering::Relaxed);
    }

    /// Level from command-line flags; `quiet` wins over any `-v`
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => VerbosityLevel::Quiet,
            (false, 0) => VerbosityLevel::Normal,
            (false, 1) => VerbosityLevel::Verbose,
            (false, _) => VerbosityLevel::VeryVerbose,
        }
    }

    /// Tracing level for this verbosity; `Normal` defers to configuration
    pub fn tracing_level(&self, configured: Level) -> Level {
        match self {
            VerbosityLevel::Quiet => Level::ERROR,
            VerbosityLevel::Normal => configured,
            VerbosityLevel::Verbose => Level::DEBUG,
            VerbosityLevel::VeryVerbose => Level::TRACE,
        }
    }

    /// Check if we should output at this level
    pub fn should_output(&self) -> bool {
        self <= &Self::current()
    }
}

/// Parse a configured level name, falling back to INFO
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging based on CLI flags and the configured level
///
/// Log lines go to stderr so stdout stays clean for results and the
/// JSON-lines session protocol.
pub fn init_logging(verbose: u8, quiet: bool, configured_level: &str) {
    let verbosity = VerbosityLevel::from_flags(verbose, quiet);
    VerbosityLevel::set(verbosity);

    let level = verbosity.tracing_level(parse_level(configured_level));
    let debug = verbosity >= VerbosityLevel::VeryVerbose;

    // A subscriber may already be installed by an embedding process
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_file(debug)
        .with_line_number(debug)
        .with_writer(std::io::stderr)
        .try_init();
}
