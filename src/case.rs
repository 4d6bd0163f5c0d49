//! Test case model
//!
//! A [`TestCase`] is the typed descriptor for one fixture: who it is (filename, name, description, categories),
//! what it expects (exit status class, stream substrings) and how deep the compiler should run it.
//!
//! Descriptors are produced by [`crate::directives`] and are read-only for every later stage.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Name used when a fixture has no `@test` directive.
pub const DEFAULT_NAME: &str = "Unnamed test";

/// Category used when a fixture has no `@category` directive.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Value that disables an `@expect-error` / `@expect-output` check.
pub const NOT_APPLICABLE: &str = "n/a";

/// Whether the compiler is expected to accept or reject the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    #[default]
    Pass,
    Fail,
}

impl Expectation {
    pub fn as_str(self) -> &'static str {
        match self {
            Expectation::Pass => "pass",
            Expectation::Fail => "fail",
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How deep the compiler runs a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Full pipeline, no mode flag.
    #[default]
    Full,
    ParseOnly,
    SemanticOnly,
}

impl ExecutionMode {
    /// The compiler flag selecting this mode, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            ExecutionMode::Full => None,
            ExecutionMode::ParseOnly => Some("--parse-only"),
            ExecutionMode::SemanticOnly => Some("--semantic-only"),
        }
    }
}

/// Descriptor for a single fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    filename: PathBuf,
    pub name: String,
    pub description: String,
    pub category: Vec<String>,
    pub expect: Expectation,
    /// The `@expect` text when it was neither `pass` nor `fail`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expect_raw: Option<String>,
    pub expect_error: Option<String>,
    pub expect_output: Option<String>,
    /// Advisory only: recorded and reported, never evaluated.
    pub expect_return: Option<String>,
    pub parse_only: bool,
    pub semantic_only: bool,
}

impl TestCase {
    /// A descriptor carrying only defaults.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            name: DEFAULT_NAME.to_string(),
            description: String::new(),
            category: vec![DEFAULT_CATEGORY.to_string()],
            expect: Expectation::Pass,
            expect_raw: None,
            expect_error: None,
            expect_output: None,
            expect_return: None,
            parse_only: false,
            semantic_only: false,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Resolved execution depth. `parse_only` wins when both flags are set.
    pub fn mode(&self) -> ExecutionMode {
        if self.parse_only {
            ExecutionMode::ParseOnly
        } else if self.semantic_only {
            ExecutionMode::SemanticOnly
        } else {
            ExecutionMode::Full
        }
    }

    /// Substring required on stderr, or `None` when the check is disabled.
    ///
    /// Only meaningful for `@expect: fail` fixtures.
    pub fn required_error(&self) -> Option<&str> {
        if self.expect != Expectation::Fail {
            return None;
        }
        active(self.expect_error.as_deref())
    }

    /// Substring required on stdout, or `None` when the check is disabled.
    pub fn required_output(&self) -> Option<&str> {
        active(self.expect_output.as_deref())
    }

    pub fn in_category(&self, tag: &str) -> bool {
        self.category.iter().any(|c| c == tag)
    }
}

fn active(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != NOT_APPLICABLE)
}
