//! Fixture directive parser
//!
//! Fixtures carry their metadata in a header of comment lines:
//!
//! ```text
//! // @test: Let binding
//! // @category: parser, statements
//! // @expect: fail
//! // @expect-error: "unexpected token"
//! let x = ;
//! ```
//!
//! Parsing happens in two steps:
//!
//! 1. [`scan`] walks the leading comment block and collects raw `key -> value` pairs into a [`DirectiveMap`].
//!    The header ends at the first line that is neither blank nor a comment.
//! 2. [`decode`] turns the map into a [`TestCase`], applying defaults for anything absent or malformed.
//!
//! Neither step can fail. The only fallible operation is reading the fixture ([`load`]); [`load_or_default`]
//! degrades that failure to a default descriptor plus a warning so the fixture still shows up in the run.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::case::{Expectation, TestCase};

/// Comment marker that introduces a directive line.
pub const COMMENT_MARKER: &str = "//";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Errors raised while loading a fixture.
#[derive(Debug, Error, Diagnostic)]
pub enum DirectiveError {
    #[error("cannot read fixture {}: {source}", path.display())]
    #[diagnostic(code(vyn_harness::directives::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directive keys understood by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectiveKey {
    Test,
    Description,
    Category,
    Expect,
    ExpectError,
    ExpectOutput,
    ExpectReturn,
    ParseOnly,
    SemanticOnly,
}

impl DirectiveKey {
    pub const ALL: [DirectiveKey; 9] = [
        DirectiveKey::Test,
        DirectiveKey::Description,
        DirectiveKey::Category,
        DirectiveKey::Expect,
        DirectiveKey::ExpectError,
        DirectiveKey::ExpectOutput,
        DirectiveKey::ExpectReturn,
        DirectiveKey::ParseOnly,
        DirectiveKey::SemanticOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKey::Test => "test",
            DirectiveKey::Description => "description",
            DirectiveKey::Category => "category",
            DirectiveKey::Expect => "expect",
            DirectiveKey::ExpectError => "expect-error",
            DirectiveKey::ExpectOutput => "expect-output",
            DirectiveKey::ExpectReturn => "expect-return",
            DirectiveKey::ParseOnly => "parse-only",
            DirectiveKey::SemanticOnly => "semantic-only",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Raw directive values in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveMap {
    entries: Vec<(DirectiveKey, String)>,
    unknown: Vec<String>,
}

impl DirectiveMap {
    /// First value recorded for `key`. Later repeats are ignored.
    pub fn get(&self, key: DirectiveKey) -> Option<&str> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys that looked like directives but are not recognized.
    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown
    }
}

/// Collect raw directives from the fixture header.
pub fn scan(source: &str) -> DirectiveMap {
    let mut map = DirectiveMap::default();
    let source = source.strip_prefix(BYTE_ORDER_MARK).unwrap_or(source);

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix(COMMENT_MARKER) else {
            break;
        };
        let Some((name, value)) = split_directive(comment) else {
            continue;
        };
        match DirectiveKey::from_name(name) {
            Some(key) => map.entries.push((key, value)),
            None => map.unknown.push(name.to_string()),
        }
    }

    map
}

/// Split `@key: value` out of a comment body.
fn split_directive(comment: &str) -> Option<(&str, String)> {
    let body = comment.trim_start().strip_prefix('@')?;
    let (name, value) = body.split_once(':')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    Some((name, unquote(value.trim()).to_string()))
}

/// Strip one pair of surrounding double quotes.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// `true`, `yes` and `1` (any case) are affirmative; anything else is not.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

/// Build a descriptor from raw directives, falling back to defaults.
pub fn decode(filename: impl Into<PathBuf>, map: &DirectiveMap) -> TestCase {
    let mut case = TestCase::new(filename);

    for name in map.unknown_keys() {
        tracing::debug!(file = %case.filename().display(), directive = %name, "ignoring unknown directive");
    }

    if let Some(name) = non_empty(map.get(DirectiveKey::Test)) {
        case.name = name.to_string();
    }
    if let Some(description) = non_empty(map.get(DirectiveKey::Description)) {
        case.description = description.to_string();
    }
    if let Some(raw) = map.get(DirectiveKey::Category) {
        let tags: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if !tags.is_empty() {
            case.category = tags;
        }
    }
    if let Some(raw) = non_empty(map.get(DirectiveKey::Expect)) {
        match raw.to_ascii_lowercase().as_str() {
            "pass" => case.expect = Expectation::Pass,
            "fail" => case.expect = Expectation::Fail,
            other => {
                tracing::warn!(
                    file = %case.filename().display(),
                    value = %other,
                    "unrecognized @expect value, assuming pass"
                );
                case.expect_raw = Some(raw.to_string());
            }
        }
    }

    case.expect_error = non_empty(map.get(DirectiveKey::ExpectError)).map(str::to_string);
    case.expect_output = non_empty(map.get(DirectiveKey::ExpectOutput)).map(str::to_string);
    case.expect_return = non_empty(map.get(DirectiveKey::ExpectReturn)).map(str::to_string);
    case.parse_only = map.get(DirectiveKey::ParseOnly).is_some_and(parse_flag);
    case.semantic_only = map.get(DirectiveKey::SemanticOnly).is_some_and(parse_flag);

    case
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse fixture text that has already been read.
pub fn parse_source(filename: impl Into<PathBuf>, source: &str) -> TestCase {
    decode(filename, &scan(source))
}

/// Read and parse a fixture.
pub fn load(path: &Path) -> Result<TestCase, DirectiveError> {
    let source = fs::read_to_string(path).map_err(|source| DirectiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_source(path, &source))
}

/// Read and parse a fixture, degrading read failures to a default descriptor.
///
/// The failure is reported as a warning; the returned case is still run so it surfaces as a FAIL.
pub fn load_or_default(path: &Path) -> TestCase {
    match load(path) {
        Ok(case) => case,
        Err(e) => {
            tracing::warn!("error parsing test directives: {e}");
            TestCase::new(path)
        }
    }
}
