//! Fixture runner
//!
//! Data flows leaf-first through the submodules:
//!
//! ```text
//! discovery -> directives -> executor -> evaluator -> report
//! ```
//!
//! - [`collect_cases`] discovers fixture paths, parses each into a [`TestCase`] and applies the selection filters.
//! - [`run_cases`] executes the selection and folds every verdict into a [`RunReport`], which it returns.
//!
//! Fixtures share no state, so with `jobs > 1` they run on scoped worker threads. Records still reach the
//! reporter and the report in discovery order.

pub mod evaluator;
pub mod executor;
pub mod interfaces;
pub mod report;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use crate::case::TestCase;
use crate::config::HarnessConfig;
use crate::directives;

use evaluator::VerdictPolicy;
use interfaces::{CompilerExecutor, FixtureDiscovery, HarnessError};
use report::{ExecutionOutcome, Reporter, RunReport};

/// Which discovered fixtures take part in the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Exact category tag
    pub category: Option<String>,
    /// Case-insensitive substring of the name or description
    pub filter: Option<String>,
}

impl Selection {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            category: config.category.clone(),
            filter: config.filter.clone(),
        }
    }

    pub fn matches(&self, case: &TestCase) -> bool {
        if let Some(tag) = self.category.as_deref().filter(|t| !t.is_empty()) {
            if !case.in_category(tag) {
                return false;
            }
        }
        if let Some(text) = self.filter.as_deref().filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            if !case.name.to_lowercase().contains(&needle) && !case.description.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Discover, parse and select fixtures.
///
/// Only an invalid pattern or a failed directory walk is an error; unreadable fixtures come back as default
/// descriptors so they still run and fail visibly.
#[tracing::instrument(skip_all, fields(dir = %config.fixture_dir.display(), pattern = %config.pattern))]
pub fn collect_cases(
    config: &HarnessConfig,
    discovery: &dyn FixtureDiscovery,
    reporter: &mut dyn Reporter,
) -> Result<Vec<TestCase>, HarnessError> {
    let files = discovery.discover(&config.fixture_dir, &config.pattern)?;
    let selection = Selection::from_config(config);

    let cases: Vec<TestCase> = files
        .iter()
        .map(|path| directives::load_or_default(path))
        .filter(|case| selection.matches(case))
        .collect();

    tracing::debug!(discovered = files.len(), selected = cases.len(), "collected fixtures");
    reporter.on_collection_complete(files.len(), cases.len());
    Ok(cases)
}

/// Run one fixture and judge it.
pub fn execute_case(case: &TestCase, executor: &dyn CompilerExecutor, policy: VerdictPolicy) -> ExecutionOutcome {
    let output = executor.execute(case);
    let verdict = evaluator::evaluate(case, &output, policy);
    ExecutionOutcome::new(output, &verdict)
}

/// Run every selected fixture and return the finished report.
#[tracing::instrument(skip_all, fields(count = cases.len(), jobs = config.jobs))]
pub fn run_cases<E: CompilerExecutor>(
    cases: Vec<TestCase>,
    config: &HarnessConfig,
    executor: &E,
    reporter: &mut dyn Reporter,
) -> RunReport {
    let report = if config.jobs > 1 && cases.len() > 1 {
        run_parallel(cases, config, executor, reporter)
    } else {
        run_sequential(cases, config, executor, reporter)
    };
    reporter.on_run_complete(&report);
    report
}

fn run_sequential<E: CompilerExecutor>(
    cases: Vec<TestCase>,
    config: &HarnessConfig,
    executor: &E,
    reporter: &mut dyn Reporter,
) -> RunReport {
    let mut report = RunReport::new();
    for case in cases {
        let outcome = execute_case(&case, executor, config.policy);
        let record = report.record(case, outcome);
        reporter.on_test_complete(record);
        if config.stop_on_fail && !record.passed() {
            tracing::info!("stopping after first failure");
            break;
        }
    }
    report
}

fn run_parallel<E: CompilerExecutor>(
    cases: Vec<TestCase>,
    config: &HarnessConfig,
    executor: &E,
    reporter: &mut dyn Reporter,
) -> RunReport {
    let workers = config.jobs.min(cases.len());
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, ExecutionOutcome)>();
    let policy = config.policy;

    let mut report = RunReport::new();
    let mut slots: Vec<Option<TestCase>> = cases.iter().cloned().map(Some).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (cases, next, stop) = (&cases, &next, &stop);
            scope.spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(case) = cases.get(idx) else { break };
                    if tx.send((idx, execute_case(case, executor, policy))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        // Completion order is arbitrary; release records strictly by index.
        let mut pending: BTreeMap<usize, ExecutionOutcome> = BTreeMap::new();
        let mut emit = 0;
        'recv: for (idx, outcome) in rx.iter() {
            pending.insert(idx, outcome);
            while let Some(outcome) = pending.remove(&emit) {
                let Some(case) = slots[emit].take() else { break };
                emit += 1;
                let record = report.record(case, outcome);
                reporter.on_test_complete(record);
                if config.stop_on_fail && !record.passed() {
                    tracing::info!("stopping after first failure");
                    stop.store(true, Ordering::Relaxed);
                    break 'recv;
                }
            }
        }
    });

    report
}
