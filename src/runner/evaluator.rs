//! Verdicts
//!
//! Compares a [`ProcessOutput`] against a [`TestCase`]'s expectations:
//!
//! 1. The exit status must match the expectation under the active [`VerdictPolicy`].
//! 2. If `@expect-output` is set (and not `n/a`), stdout must contain it.
//! 3. If the fixture expects failure and `@expect-error` is set (and not `n/a`), stderr must contain it.
//!
//! Substring checks are exact and case-sensitive. `@expect-return` is never checked.
//! A compiler that never completed (launch failure, timeout) fails regardless of expectation.

use std::fmt;

use crate::case::{Expectation, TestCase};

use super::executor::{ProcessOutput, Termination};

/// How a `fail` expectation is matched against the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum VerdictPolicy {
    /// `pass` needs status 0, `fail` needs any non-zero status.
    #[default]
    #[value(name = "nonzero")]
    NonZero,
    /// `pass` needs status 0, `fail` needs exactly status 1.
    #[value(name = "exact")]
    ExactCode,
}

impl VerdictPolicy {
    pub fn accepts(self, expect: Expectation, return_code: i32) -> bool {
        match (expect, self) {
            (Expectation::Pass, _) => return_code == 0,
            (Expectation::Fail, VerdictPolicy::NonZero) => return_code != 0,
            (Expectation::Fail, VerdictPolicy::ExactCode) => return_code == 1,
        }
    }

    fn describe(self, expect: Expectation) -> &'static str {
        match (expect, self) {
            (Expectation::Pass, _) => "exit status 0",
            (Expectation::Fail, VerdictPolicy::NonZero) => "a non-zero exit status",
            (Expectation::Fail, VerdictPolicy::ExactCode) => "exit status 1",
        }
    }
}

/// One reason a verdict is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    NotCompleted(Termination),
    ExitStatus { expected: &'static str, actual: i32 },
    MissingOutput(String),
    MissingError(String),
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::NotCompleted(Termination::TimedOut) => write!(f, "compiler timed out"),
            Mismatch::NotCompleted(_) => write!(f, "compiler could not be run"),
            Mismatch::ExitStatus { expected, actual } => write!(f, "expected {expected}, got {actual}"),
            Mismatch::MissingOutput(s) => write!(f, "stdout does not contain {s:?}"),
            Mismatch::MissingError(s) => write!(f, "stderr does not contain {s:?}"),
        }
    }
}

/// Outcome of comparing a run with its expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub mismatches: Vec<Mismatch>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Judge one run.
pub fn evaluate(case: &TestCase, output: &ProcessOutput, policy: VerdictPolicy) -> Verdict {
    if !output.termination.completed() {
        return Verdict {
            mismatches: vec![Mismatch::NotCompleted(output.termination)],
        };
    }

    let mut mismatches = Vec::new();

    if !policy.accepts(case.expect, output.return_code) {
        mismatches.push(Mismatch::ExitStatus {
            expected: policy.describe(case.expect),
            actual: output.return_code,
        });
    }
    if let Some(needle) = case.required_output() {
        if !output.stdout.contains(needle) {
            mismatches.push(Mismatch::MissingOutput(needle.to_string()));
        }
    }
    if let Some(needle) = case.required_error() {
        if !output.stderr.contains(needle) {
            mismatches.push(Mismatch::MissingError(needle.to_string()));
        }
    }

    Verdict { mismatches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    fn failing_case(error: Option<&str>) -> TestCase {
        let mut case = TestCase::new("t.vyn");
        case.expect = Expectation::Fail;
        case.expect_error = error.map(str::to_string);
        case
    }

    #[test]
    fn test_pass_expectation_needs_zero() {
        let case = TestCase::new("t.vyn");
        assert!(evaluate(&case, &ProcessOutput::exited("vyn", 0, "", ""), VerdictPolicy::NonZero).passed());
        let verdict = evaluate(&case, &ProcessOutput::exited("vyn", 1, "", ""), VerdictPolicy::NonZero);
        assert!(!verdict.passed());
        assert_eq!(verdict.mismatches[0].to_string(), "expected exit status 0, got 1");
    }

    #[test]
    fn test_expected_error_matches() {
        let case = failing_case(Some("unexpected token"));
        let output = ProcessOutput::exited("vyn", 1, "", "unexpected token at line 1");
        assert!(evaluate(&case, &output, VerdictPolicy::NonZero).passed());
    }

    #[test]
    fn test_expected_error_missing() {
        let case = failing_case(Some("unexpected token"));
        let output = ProcessOutput::exited("vyn", 1, "", "parse error");
        let verdict = evaluate(&case, &output, VerdictPolicy::NonZero);
        assert_eq!(verdict.mismatches, vec![Mismatch::MissingError("unexpected token".to_string())]);
    }

    #[test]
    fn test_expected_error_needs_nonzero_exit() {
        let case = failing_case(Some("unexpected token"));
        let output = ProcessOutput::exited("vyn", 0, "", "unexpected token");
        assert!(!evaluate(&case, &output, VerdictPolicy::NonZero).passed());
    }

    #[test]
    fn test_substring_checks_are_case_sensitive() {
        let case = failing_case(Some("Unexpected"));
        let output = ProcessOutput::exited("vyn", 1, "", "unexpected token");
        assert!(!evaluate(&case, &output, VerdictPolicy::NonZero).passed());
    }

    #[test]
    fn test_policies_diverge_on_status_two() {
        let case = failing_case(None);
        let output = ProcessOutput::exited("vyn", 2, "", "");
        assert!(evaluate(&case, &output, VerdictPolicy::NonZero).passed());

        let verdict = evaluate(&case, &output, VerdictPolicy::ExactCode);
        assert_eq!(verdict.mismatches[0].to_string(), "expected exit status 1, got 2");
    }

    #[test]
    fn test_expected_output_checked_for_any_expectation() {
        let mut case = TestCase::new("t.vyn");
        case.expect_output = Some("42".to_string());
        assert!(evaluate(&case, &ProcessOutput::exited("vyn", 0, "answer: 42\n", ""), VerdictPolicy::NonZero).passed());
        assert!(!evaluate(&case, &ProcessOutput::exited("vyn", 0, "answer: 41\n", ""), VerdictPolicy::NonZero).passed());
    }

    #[test]
    fn test_expect_return_is_not_evaluated() {
        let mut case = TestCase::new("t.vyn");
        case.expect_return = Some("7".to_string());
        assert!(evaluate(&case, &ProcessOutput::exited("vyn", 0, "", ""), VerdictPolicy::NonZero).passed());
    }

    #[test]
    fn test_launch_failure_fails_even_for_fail_expectation() {
        let case = failing_case(None);
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file or directory");
        let output = ProcessOutput::launch_failure("vyn t.vyn", &err, Duration::ZERO);
        let verdict = evaluate(&case, &output, VerdictPolicy::NonZero);
        assert_eq!(verdict.mismatches, vec![Mismatch::NotCompleted(Termination::LaunchFailed)]);
    }

    #[test]
    fn test_signal_death_counts_as_nonzero() {
        let case = failing_case(None);
        let mut output = ProcessOutput::exited("vyn", -11, "", "");
        output.termination = Termination::Signaled(11);
        assert!(evaluate(&case, &output, VerdictPolicy::NonZero).passed());
        assert!(!evaluate(&case, &output, VerdictPolicy::ExactCode).passed());
    }
}
