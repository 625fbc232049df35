//! Shared plumbing for the instrumentkit binaries: log initialization and the
//! exit-code mapping every binary uses to turn a `Result` into a process
//! exit status.

use std::fs::File;
use std::path::PathBuf;

use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger};

/// Failures a binary's `run()` can surface, mapped onto this process's exit
/// codes: 1 configuration error, 2 bind failure, 3 fatal runtime error.
#[derive(Debug)]
pub enum CliError {
    Config(String),
    Bind(std::io::Error),
    Runtime(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {msg}"),
            CliError::Bind(e) => write!(f, "bind failure: {e}"),
            CliError::Runtime(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::Bind(_) => 2,
            CliError::Runtime(_) => 3,
        }
    }
}

impl From<instrumentkit_core::CoreError> for CliError {
    fn from(e: instrumentkit_core::CoreError) -> Self {
        CliError::Config(e.to_string())
    }
}

/// Run `body`, logging and exiting with the matching process exit code on
/// failure rather than panicking or letting the error escape as a backtrace.
pub fn main_with_exit_code(body: impl FnOnce() -> Result<(), CliError>) -> ! {
    match body() {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            log::error!("{e}");
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Initialize logging: a file logger under the user's config directory plus
/// a terminal logger, since every instrumentkit binary is a headless
/// process with nothing else to gate the terminal logger behind.
pub fn init_logging(program: &str, verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if let Some(log_path) = log_file_path(program) {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(file) = File::create(&log_path) {
            loggers.push(WriteLogger::new(level, Config::default(), file));
        }
    }

    let _ = CombinedLogger::init(loggers);
    log::info!("{program} starting (log level: {level:?})");
}

fn log_file_path(program: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("instrumentkit").join(format!("{program}.log")))
}
