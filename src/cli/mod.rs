//! CLI module for the Vyn test harness
//!
//! ## Usage
//!
//! - `vyn-harness` - run every `*.vyn` fixture under `test/units`
//! - `vyn-harness --category parser` - run only fixtures tagged `parser`
//! - `vyn-harness --pattern "test1*.vyn" -vv` - narrow the selection, show captured streams
//! - `vyn-harness --list -f closure` - list matching fixtures without running them
//! - `vyn-harness --json results.json` - also write the structured report
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use crate::config::{ConfigOverrides, DEFAULT_PATTERN, HarnessConfig};
use crate::runner::evaluator::VerdictPolicy;
use crate::version::HARNESS_VERSION;

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
    /// Create a new CLI error with a message and exit code.
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

    /// Render a diagnostic (code, message, help) as a failure.
    pub fn diagnostic<D>(err: D) -> Self
    where
        D: miette::Diagnostic + Send + Sync + 'static,
    {
        Self::failure(format!("{:?}", miette::Report::new(err)))
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

/// Directive-driven conformance harness for the Vyn compiler
#[derive(Parser, Debug)]
#[command(name = "vyn-harness")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Vyn test harness", long_about = None)]
pub struct Cli {
    /// Path to vyn executable (defaults to <repo>/build/vyn)
    #[arg(long = "compiler", visible_alias = "vyn", value_name = "PATH", env = "VYN_COMPILER")]
    pub compiler: Option<PathBuf>,

    /// Directory containing test files (defaults to <repo>/test/units)
    #[arg(long = "test-dir", value_name = "DIR", env = "VYN_TEST_DIR")]
    pub test_dir: Option<PathBuf>,

    /// File pattern for test files
    #[arg(long, value_name = "GLOB", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Increase verbosity (-v details, -vv captured streams)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only run tests in this category
    #[arg(long, value_name = "TAG")]
    pub category: Option<String>,

    /// Only run tests matching this string in name or description
    #[arg(short = 'f', long, value_name = "TEXT")]
    pub filter: Option<String>,

    /// Save results to JSON file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// List available tests without running them
    #[arg(short, long)]
    pub list: bool,

    /// How a `fail` expectation matches the exit status
    #[arg(long = "exit-policy", value_enum, default_value_t = VerdictPolicy::NonZero)]
    pub exit_policy: VerdictPolicy,

    /// Run up to N fixtures at once
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Kill the compiler after SECS seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Stop on first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,
}

impl Cli {
    /// Convert parsed flags into configuration overrides.
    pub fn overrides(&self) -> CliResult<ConfigOverrides> {
        let timeout = match self.timeout {
            Some(secs) if secs.is_finite() && secs > 0.0 => match Duration::try_from_secs_f64(secs) {
                Ok(timeout) => Some(timeout),
                Err(e) => {
                    return Err(CliError::failure(format!("Error: --timeout {secs} is out of range: {e}")));
                }
            },
            Some(secs) => {
                return Err(CliError::failure(format!(
                    "Error: --timeout must be a positive number of seconds, got {secs}"
                )));
            }
            None => None,
        };

        Ok(ConfigOverrides {
            compiler: self.compiler.clone(),
            fixture_dir: self.test_dir.clone(),
            pattern: Some(self.pattern.clone()),
            category: self.category.clone(),
            filter: self.filter.clone(),
            policy: Some(self.exit_policy),
            jobs: Some(self.jobs),
            timeout,
            stop_on_fail: self.stop_on_fail,
            verbosity: self.verbose,
        })
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
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

/// Resolve configuration and dispatch to the requested command.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let overrides = cli.overrides()?;
    let cwd = env::current_dir().map_err(|e| CliError::failure(format!("Error: cannot read current directory: {e}")))?;
    let config = HarnessConfig::resolve(overrides, &cwd).map_err(CliError::diagnostic)?;

    if cli.list {
        commands::list_fixtures(&config)
    } else {
        commands::run_fixtures(&config, cli.json.as_deref())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::try_parse_from(["vyn-harness"]).unwrap();
        assert_eq!(cli.pattern, "*.vyn");
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.exit_policy, VerdictPolicy::NonZero);
        assert_eq!(cli.jobs, 1);
        assert!(!cli.list);
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn test_cli_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "vyn-harness",
            "--vyn",
            "out/vyn",
            "--test-dir",
            "units",
            "--category",
            "parser",
            "-vv",
            "--json",
            "results.json",
            "--exit-policy",
            "exact",
            "-j",
            "4",
            "--timeout",
            "2.5",
            "-x",
        ])
        .unwrap();
        assert_eq!(cli.compiler.as_deref(), Some(std::path::Path::new("out/vyn")));
        assert_eq!(cli.category.as_deref(), Some("parser"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.exit_policy, VerdictPolicy::ExactCode);

        let overrides = cli.overrides().unwrap();
        assert_eq!(overrides.jobs, Some(4));
        assert_eq!(overrides.timeout, Some(Duration::from_millis(2500)));
        assert!(overrides.stop_on_fail);
        assert_eq!(overrides.verbosity, 2);
    }

    #[test]
    fn test_cli_parse_list_with_filter() {
        let cli = Cli::try_parse_from(["vyn-harness", "-l", "-f", "closure"]).unwrap();
        assert!(cli.list);
        assert_eq!(cli.filter.as_deref(), Some("closure"));
    }

    #[test]
    fn test_cli_rejects_non_positive_timeout() {
        let cli = Cli::try_parse_from(["vyn-harness", "--timeout", "0"]).unwrap();
        assert!(cli.overrides().is_err());
    }

    #[test]
    fn test_cli_rejects_out_of_range_timeout() {
        let cli = Cli::try_parse_from(["vyn-harness", "--timeout", "1e30"]).unwrap();
        let err = cli.overrides().unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("--timeout"));
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["vyn-harness", "--exit-policy", "strict"]).is_err());
    }
}
