#![forbid(unsafe_code)]
//! Vyn conformance test harness
//!
//! Discovers `.vyn` fixtures, reads the `// @key: value` directives at the top of each one, runs the compiler
//! under test with the mode flag those directives select, and judges the outcome against the declared
//! expectations.
//!
//! ## Layout
//!
//! - [`case`] - the test case descriptor
//! - [`directives`] - fixture header parsing
//! - [`config`] - one-shot configuration resolution
//! - [`runner`] - discovery, execution, verdicts and the run report
//! - [`cli`] - the `vyn-harness` command line
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Per-fixture failures**: never an `Err`. Unreadable fixtures, launch failures and timeouts are recorded as
//!   failing outcomes so the rest of the run continues.

pub mod case;
pub mod cli;
pub mod config;
pub mod directives;
pub mod runner;
pub mod version;

pub use case::{ExecutionMode, Expectation, TestCase};
pub use config::{ConfigError, ConfigOverrides, HarnessConfig};
pub use runner::evaluator::{Verdict, VerdictPolicy, evaluate};
pub use runner::executor::{ProcessExecutor, ProcessOutput, Termination};
pub use runner::interfaces::{CompilerExecutor, FixtureDiscovery, GlobDiscovery, HarnessError};
pub use runner::report::{ConsoleReporter, ExecutionOutcome, Reporter, RunReport, TestRecord};
pub use runner::{Selection, collect_cases, execute_case, run_cases};
