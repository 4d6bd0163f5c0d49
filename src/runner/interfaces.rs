//! Runner I/O boundary interfaces
//!
//! This module defines the trait seams for the two operations that touch the outside world:
//! - Fixture discovery (filesystem scan)
//! - Compiler execution (child process + output capture)
//!
//! The orchestration in [`super`] only talks to these traits, so tests can swap in scripted executors and the
//! defaults stay small.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use super::executor::ProcessOutput;
use crate::case::TestCase;

/// Errors that occur while preparing or persisting a run.
///
/// Per-fixture problems never show up here: they are recorded as failing outcomes instead.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("invalid fixture pattern '{pattern}': {message}")]
    #[diagnostic(code(vyn_harness::discovery::pattern), help("patterns use glob syntax, e.g. 'test1*.vyn'"))]
    Pattern { pattern: String, message: String },

    #[error("failed to serialize report: {0}")]
    #[diagnostic(code(vyn_harness::report::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(vyn_harness::io))]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Fixture Discovery Interface
// ============================================================================

/// Find fixture files.
pub trait FixtureDiscovery {
    /// All files below `dir` (recursively) whose name matches `pattern`, sorted.
    fn discover(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, HarnessError>;
}

/// Recursive glob discovery (`<dir>/**/<pattern>`).
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobDiscovery;

impl FixtureDiscovery for GlobDiscovery {
    fn discover(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, HarnessError> {
        glob::Pattern::new(pattern).map_err(|e| HarnessError::Pattern {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;

        let base = glob::Pattern::escape(&dir.to_string_lossy());
        let full = format!("{base}/**/{pattern}");

        let entries = glob::glob(&full).map_err(|e| HarnessError::Pattern {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("skipping unreadable path during discovery: {e}"),
            }
        }
        files.sort();
        Ok(files)
    }
}

// ============================================================================
// Compiler Executor Interface
// ============================================================================

/// Run the compiler under test against one fixture.
///
/// Implementations must not fail: launch problems are folded into the returned [`ProcessOutput`].
/// `Sync` lets the runner share one executor across worker threads.
pub trait CompilerExecutor: Sync {
    fn execute(&self, case: &TestCase) -> ProcessOutput;
}
