//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;

use crate::config::HarnessConfig;
use crate::runner::executor::ProcessExecutor;
use crate::runner::interfaces::GlobDiscovery;
use crate::runner::report::{ConsoleReporter, Reporter, format_listing};
use crate::runner::{collect_cases, run_cases};

use super::{CliError, CliResult, ExitCode};

/// Print the selected fixtures' metadata without running anything.
pub fn list_fixtures(config: &HarnessConfig) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(config.verbosity);
    reporter.on_session_start(config);

    let cases = collect_cases(config, &GlobDiscovery, &mut reporter).map_err(CliError::diagnostic)?;
    println!("{}", format_listing(&cases));
    Ok(ExitCode::SUCCESS)
}

/// Run the selected fixtures, print results and optionally persist the JSON report.
///
/// Exits with 1 when any verdict is false.
pub fn run_fixtures(config: &HarnessConfig, json: Option<&Path>) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(config.verbosity);
    reporter.on_session_start(config);

    let cases = collect_cases(config, &GlobDiscovery, &mut reporter).map_err(CliError::diagnostic)?;

    let executor = ProcessExecutor::new(&config.compiler).with_timeout(config.timeout);
    let report = run_cases(cases, config, &executor, &mut reporter);

    if let Some(path) = json {
        let written = report.write_json(path).map_err(CliError::diagnostic)?;
        if config.verbosity > 0 {
            println!("Results saved to {}", written.display());
        }
    }

    if report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}
