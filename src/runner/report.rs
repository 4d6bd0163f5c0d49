//! Run report and reporters
//!
//! ## RunReport
//!
//! [`RunReport`] is the single aggregate of a harness invocation: every (descriptor, outcome) pair in discovery
//! order plus the pass/fail tallies. Records are append-only; presentation reads them, never rewrites them.
//! The whole report serializes to the JSON layout written by `--json`.
//!
//! ## Reporter Trait
//!
//! Console output goes through the [`Reporter`] trait so the runner stays free of printing. [`ConsoleReporter`]
//! is the default; tests plug in collectors.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::evaluator::Verdict;
use super::executor::ProcessOutput;
use super::interfaces::HarnessError;
use crate::case::TestCase;
use crate::config::HarnessConfig;

/// Finalized result of running one fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    #[serde(serialize_with = "serialize_secs")]
    pub execution_time: Duration,
    pub command: String,
    /// Why the verdict is false; empty on success
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl ExecutionOutcome {
    pub fn new(output: ProcessOutput, verdict: &Verdict) -> Self {
        Self {
            success: verdict.passed(),
            stdout: output.stdout,
            stderr: output.stderr,
            return_code: output.return_code,
            execution_time: output.duration,
            command: output.command,
            failures: verdict.mismatches.iter().map(ToString::to_string).collect(),
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// One fixture's descriptor and outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub test: TestCase,
    pub result: ExecutionOutcome,
}

impl TestRecord {
    pub fn passed(&self) -> bool {
        self.result.success
    }
}

/// Aggregate of one harness invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    records: Vec<TestRecord>,
    passed: usize,
    failed: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished fixture and return the stored record.
    pub fn record(&mut self, test: TestCase, result: ExecutionOutcome) -> &TestRecord {
        if result.success {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.records.push(TestRecord { test, result });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Pretty-printed JSON array of `{ "test": ..., "result": ... }` objects.
    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Write the JSON report. Relative paths are taken from the current working directory.
    ///
    /// Returns the absolute path written.
    pub fn write_json(&self, path: &Path) -> Result<PathBuf, HarnessError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

// ============================================================================
// Reporter Trait
// ============================================================================

/// Observer for run progress.
pub trait Reporter {
    /// Called once before discovery
    fn on_session_start(&mut self, _config: &HarnessConfig) {}

    /// Called after discovery and selection
    fn on_collection_complete(&mut self, _discovered: usize, _selected: usize) {}

    /// Called as each fixture's record lands, in discovery order
    fn on_test_complete(&mut self, record: &TestRecord);

    /// Called once after the last fixture
    fn on_run_complete(&mut self, report: &RunReport);
}

/// Plain-text console reporter.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbosity: u8,
    fixture_dir: Option<PathBuf>,
}

impl ConsoleReporter {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            fixture_dir: None,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_session_start(&mut self, config: &HarnessConfig) {
        self.fixture_dir = Some(config.fixture_dir.clone());
        if self.verbosity > 0 {
            if let Some(root) = &config.repo_root {
                println!("Vyn repository root: {}", root.display());
            }
            println!("Using Vyn executable: {}", config.compiler.display());
            println!("Using test directory: {}", config.fixture_dir.display());
        }
    }

    fn on_collection_complete(&mut self, discovered: usize, _selected: usize) {
        if self.verbosity > 0 {
            let dir = self.fixture_dir.as_deref().unwrap_or(Path::new("."));
            println!("Found {} test files in {}", discovered, dir.display());
        }
    }

    fn on_test_complete(&mut self, record: &TestRecord) {
        println!("{}", format_record(record, self.verbosity));
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        println!();
        println!("{}", format_summary(report));
    }
}

fn status_label(passed: bool) -> &'static str {
    if passed { "PASS" } else { "FAIL" }
}

/// One fixture's result line, or a detail block when `verbosity > 0`.
///
/// Captured streams are included for failures, and for every fixture at `verbosity >= 2`.
pub fn format_record(record: &TestRecord, verbosity: u8) -> String {
    let test = &record.test;
    let result = &record.result;
    let status = status_label(result.success);

    if verbosity == 0 {
        return format!("{status}: {}", test.name);
    }

    let mut lines = vec![
        format!("{status}: {} [{}]", test.name, test.category.join(", ")),
        format!("File: {}", test.filename().display()),
        format!("Description: {}", test.description),
        expected_line(test),
        format!("Return code: {}", result.return_code),
        format!("Time: {:.4}s", result.execution_time.as_secs_f64()),
    ];
    if let Some(expected) = &test.expect_return {
        lines.push(format!("Expected return (advisory): {expected}"));
    }
    for failure in &result.failures {
        lines.push(format!("Reason: {failure}"));
    }

    if !result.success || verbosity > 1 {
        let stdout = result.stdout.trim_end();
        if !stdout.is_empty() {
            lines.push("-- Standard Output --".to_string());
            lines.push(stdout.to_string());
        }
        let stderr = result.stderr.trim_end();
        if !stderr.is_empty() {
            lines.push("-- Standard Error --".to_string());
            lines.push(stderr.to_string());
        }
    }

    lines.join("\n")
}

fn expected_line(test: &TestCase) -> String {
    match &test.expect_raw {
        Some(raw) => format!("Expected: {} (unrecognized @expect value \"{raw}\")", test.expect),
        None => format!("Expected: {}", test.expect),
    }
}

/// `Ran N tests` followed by the pass/fail counts.
pub fn format_summary(report: &RunReport) -> String {
    format!(
        "Ran {} tests\nPassed: {}\nFailed: {}",
        report.total(),
        report.passed(),
        report.failed()
    )
}

/// Listing shown by `--list`.
pub fn format_listing(cases: &[TestCase]) -> String {
    let mut out = format!("Found {} tests matching criteria:", cases.len());
    for case in cases {
        out.push('\n');
        out.push_str(&format!(
            "{} - {} [{}]",
            case.name,
            case.description,
            case.category.join(", ")
        ));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::case::Expectation;
    use crate::runner::evaluator::Mismatch;

    fn outcome(success: bool, return_code: i32, stdout: &str, stderr: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            success,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            return_code,
            execution_time: Duration::from_millis(12),
            command: "build/vyn units/let.vyn".to_string(),
            failures: Vec::new(),
        }
    }

    fn let_case() -> TestCase {
        let mut case = TestCase::new("units/let.vyn");
        case.name = "Let binding".to_string();
        case.description = "binds an integer".to_string();
        case.category = vec!["parser".to_string(), "statements".to_string()];
        case
    }

    #[test]
    fn test_record_updates_counts() {
        let mut report = RunReport::new();
        report.record(let_case(), outcome(true, 0, "", ""));
        report.record(let_case(), outcome(false, 1, "", ""));
        report.record(let_case(), outcome(true, 0, "", ""));

        assert_eq!(report.total(), 3);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_empty_report_passes() {
        let report = RunReport::new();
        assert!(report.all_passed());
        assert_eq!(format_summary(&report), "Ran 0 tests\nPassed: 0\nFailed: 0");
    }

    #[test]
    fn test_outcome_carries_mismatches() {
        let verdict = Verdict {
            mismatches: vec![Mismatch::MissingError("unexpected token".to_string())],
        };
        let output = ProcessOutput::exited("vyn t.vyn", 1, "", "parse error");
        let outcome = ExecutionOutcome::new(output, &verdict);
        assert!(!outcome.success);
        assert_eq!(outcome.failures, vec!["stderr does not contain \"unexpected token\"".to_string()]);
    }

    #[test]
    fn test_format_quiet_line() {
        let record = TestRecord {
            test: let_case(),
            result: outcome(true, 0, "", ""),
        };
        insta::assert_snapshot!(format_record(&record, 0), @"PASS: Let binding");
    }

    #[test]
    fn test_format_verbose_passing_hides_streams() {
        let record = TestRecord {
            test: let_case(),
            result: outcome(true, 0, "ok\n", ""),
        };
        insta::assert_snapshot!(format_record(&record, 1), @r"
        PASS: Let binding [parser, statements]
        File: units/let.vyn
        Description: binds an integer
        Expected: pass
        Return code: 0
        Time: 0.0120s
        ");
    }

    #[test]
    fn test_format_verbose_failure_shows_streams() {
        let mut test = let_case();
        test.expect = Expectation::Fail;
        let mut result = outcome(false, 1, "", "parse error\n");
        result.failures = vec!["stderr does not contain \"unexpected token\"".to_string()];
        let record = TestRecord { test, result };

        insta::assert_snapshot!(format_record(&record, 1), @r#"
        FAIL: Let binding [parser, statements]
        File: units/let.vyn
        Description: binds an integer
        Expected: fail
        Return code: 1
        Time: 0.0120s
        Reason: stderr does not contain "unexpected token"
        -- Standard Error --
        parse error
        "#);
    }

    #[test]
    fn test_unrecognized_expect_is_reported() {
        let mut test = let_case();
        test.expect_raw = Some("maybe".to_string());
        let mut report = RunReport::new();
        let record = report.record(test, outcome(true, 0, "", ""));

        insta::assert_snapshot!(format_record(record, 1), @r#"
        PASS: Let binding [parser, statements]
        File: units/let.vyn
        Description: binds an integer
        Expected: pass (unrecognized @expect value "maybe")
        Return code: 0
        Time: 0.0120s
        "#);

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value[0]["test"]["expect"], "pass");
        assert_eq!(value[0]["test"]["expect_raw"], "maybe");
    }

    #[test]
    fn test_format_very_verbose_shows_streams_on_pass() {
        let record = TestRecord {
            test: let_case(),
            result: outcome(true, 0, "ok\n", ""),
        };
        let text = format_record(&record, 2);
        assert!(text.ends_with("-- Standard Output --\nok"));
    }

    #[test]
    fn test_format_listing() {
        let mut other = TestCase::new("units/fn.vyn");
        other.name = "Function".to_string();
        insta::assert_snapshot!(format_listing(&[let_case(), other]), @r"
        Found 2 tests matching criteria:
        Let binding - binds an integer [parser, statements]
        Function -  [uncategorized]
        ");
    }

    #[test]
    fn test_json_layout() {
        let mut report = RunReport::new();
        report.record(let_case(), outcome(true, 0, "", ""));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        let entry = &value[0];
        assert_eq!(entry["test"]["filename"], "units/let.vyn");
        assert_eq!(entry["test"]["name"], "Let binding");
        assert_eq!(entry["test"]["category"][1], "statements");
        assert_eq!(entry["test"]["expect"], "pass");
        assert_eq!(entry["test"]["parse_only"], false);
        assert_eq!(entry["result"]["success"], true);
        assert_eq!(entry["result"]["return_code"], 0);
        assert_eq!(entry["result"]["execution_time"], 0.012);
        assert!(entry["result"].get("failures").is_none());
        assert!(entry["test"].get("expect_raw").is_none());
    }

    #[test]
    fn test_write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut report = RunReport::new();
        report.record(let_case(), outcome(false, 1, "", ""));

        let written = report.write_json(&path).unwrap();
        assert_eq!(written, path);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));
    }
}
