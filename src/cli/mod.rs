//! CLI module for the BabelTest adapter
//!
//! ## Commands
//!
//! - `serve` (default) - Read commands from stdin, write results to stdout
//! - `targets` - List every invocable dotted path of the linked codebase
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use babeltest_core::Registry;
use clap::{Args, Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use crate::adapter::{self, AdapterState};
use crate::config::{self, AdapterConfig};
use crate::logging::DebugSwitch;
use crate::version::BABELTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// BabelTest adapter for Rust codebases
#[derive(Parser, Debug)]
#[command(name = "babeltest-adapter")]
#[command(version = BABELTEST_VERSION)]
#[command(about = "Executes BabelTest commands against a linked Rust codebase", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Flags for the default `serve` action
    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve newline-delimited JSON commands on stdin/stdout
    Serve(ServeArgs),

    /// List every invocable target path
    Targets,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Base directory for relative paths (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    /// Factory directory, relative to the project root
    #[arg(long = "factories", value_name = "DIR")]
    pub factories: Option<PathBuf>,

    /// Instance lifecycle: shared, per_test or per_suite
    #[arg(long, value_name = "MODE")]
    pub lifecycle: Option<String>,

    /// Default per-test timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Trace at debug level on stderr
    #[arg(long)]
    pub debug: bool,

    /// Return target stdout/stderr in each result's `logs`
    #[arg(long)]
    pub capture_output: bool,
}

impl ServeArgs {
    /// Layer the flags over the default config.
    pub fn to_config(&self) -> CliResult<AdapterConfig> {
        let mut config = AdapterConfig::default()
            .with_timeout_ms(self.timeout_ms)
            .with_debug(self.debug)
            .with_capture_output(self.capture_output);
        if let Some(root) = &self.project_root {
            config = config.with_project_root(root.clone());
        }
        if let Some(dir) = &self.factories {
            config = config.with_factories_path(dir.clone());
        }
        if let Some(name) = &self.lifecycle {
            let mode = config::parse_lifecycle(name).map_err(|e| CliError::failure(format!("Error: {e}")))?;
            config = config.with_lifecycle(mode);
        }
        Ok(config)
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run(switch: DebugSwitch) {
    let cli = Cli::parse();

    match execute(cli, switch) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli, switch: DebugSwitch) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Serve(args)) => serve(&args, switch),
        Some(Command::Targets) => list_targets(&babeltest_example::registry()),
        None => serve(&cli.serve, switch),
    }
}

fn serve(args: &ServeArgs, switch: DebugSwitch) -> CliResult<ExitCode> {
    let config = args.to_config()?;
    if config.debug {
        switch.set_debug(true);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {e}")))?;

    let registry = babeltest_example::registry();
    info!(types = registry.len(), version = BABELTEST_VERSION, "adapter ready");
    let mut state = AdapterState::new(registry, config).with_debug_switch(switch);

    runtime
        .block_on(async {
            let stdin = BufReader::new(tokio::io::stdin());
            adapter::serve(&mut state, stdin, tokio::io::stdout()).await
        })
        .map_err(|e| CliError::failure(format!("Error: protocol stream failed: {e}")))?;

    Ok(ExitCode::SUCCESS)
}

fn list_targets(registry: &Registry) -> CliResult<ExitCode> {
    let mut out = std::io::stdout().lock();
    for target in registry.targets() {
        writeln!(out, "{target}").map_err(|e| CliError::failure(format!("Error writing targets: {e}")))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Tests
// ============================================================================
