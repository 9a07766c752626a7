use std::{cmp::Ordering, collections::BTreeMap};

use serde::Deserialize;
use sqlsync_core::{
    DatabaseAdapter, Schema, SourceId, Version, diff_schemas, read_schema_from_catalog,
};

const CURRENT_SOURCE: &str = "current.sql";
const DESIRED_SOURCE: &str = "desired.sql";

/// One reconciliation case: `current` is the schema file before the run,
/// `desired` the DDL the database holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestCase {
    pub current: String,
    pub desired: String,
    /// Exact file text after reconciliation.
    pub expected: Option<String>,
    /// Whether the file is expected to change at all.
    pub changed: Option<bool>,
    pub error: Option<String>,
    pub min_version: Option<String>,
    /// Only run against the parsed `desired` text, never a live database.
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Core(#[from] sqlsync_core::Error),
    /// The message carries serde_yaml's `at line L column C` suffix.
    #[error("invalid testcase yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Assertion(String),
}

impl From<sqlsync_core::ContractViolation> for RunnerError {
    fn from(value: sqlsync_core::ContractViolation) -> Self {
        Self::Core(value.into())
    }
}

pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

pub fn load_test_cases_from_str(yaml: &str) -> RunnerResult<BTreeMap<String, TestCase>> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Reconciles `current` against `desired` parsed as a plain schema file.
pub fn run_offline_test(test: &TestCase) -> TestResult {
    into_test_result(evaluate_expected_error(test, run_offline_test_flow(test)))
}

/// Seeds the database behind `adapter` with `desired` and reconciles
/// `current` against its catalog.
pub fn run_online_test(
    adapter: &dyn DatabaseAdapter,
    server_version: &Version,
    test: &TestCase,
) -> TestResult {
    if test.offline {
        return TestResult::Skipped("offline-only testcase".to_string());
    }
    match version_skip_reason(test, server_version) {
        Ok(Some(reason)) => TestResult::Skipped(reason),
        Ok(None) => into_test_result(evaluate_expected_error(
            test,
            run_online_test_flow(adapter, test),
        )),
        Err(error) => TestResult::Failed(error.to_string()),
    }
}

fn into_test_result(execution_result: RunnerResult<()>) -> TestResult {
    match execution_result {
        Ok(()) => TestResult::Passed,
        Err(error) => TestResult::Failed(error.to_string()),
    }
}

fn run_offline_test_flow(test: &TestCase) -> RunnerResult<()> {
    let mut desired = Schema::new();
    desired.load_source(DESIRED_SOURCE, &test.desired)?;
    reconcile_and_check(test, &desired)
}

fn run_online_test_flow(adapter: &dyn DatabaseAdapter, test: &TestCase) -> RunnerResult<()> {
    if !test.desired.trim().is_empty() {
        adapter.run(&test.desired)?;
    }
    let desired = read_schema_from_catalog(adapter)?;
    reconcile_and_check(test, &desired)
}

fn reconcile_and_check(test: &TestCase, desired: &Schema) -> RunnerResult<()> {
    let source = SourceId::new(CURRENT_SOURCE);
    let mut current = Schema::new();
    current.load_source(source.clone(), &test.current)?;

    let changed = current.update_schema(desired, |_| source.clone())?;
    if let Some(expected) = test.changed
        && expected != changed
    {
        return Err(runner_assertion_error(format!(
            "expected changed: {expected}, but got: {changed}"
        )));
    }

    let rendered = current.render_source(&source).unwrap_or_default();
    if let Some(expected) = test.expected.as_deref()
        && expected != rendered
    {
        return Err(runner_assertion_error(format!(
            "rendered file mismatch\n--- expected\n{expected}\n--- actual\n{rendered}"
        )));
    }

    assert_idempotency(&rendered, desired)
}

/// The rewritten file must reload cleanly and need no further edits.
fn assert_idempotency(rendered: &str, desired: &Schema) -> RunnerResult<()> {
    let mut reloaded = Schema::new();
    reloaded
        .load_source(CURRENT_SOURCE, rendered)
        .map_err(|error| {
            runner_assertion_error(format!("rewritten file does not parse: {error}"))
        })?;

    let edits = diff_schemas(&reloaded, desired)?;
    if edits.is_empty() {
        return Ok(());
    }
    let pending: Vec<String> = edits
        .iter()
        .map(|edit| format!("{} {}", edit.tag(), edit.target()))
        .collect();
    Err(runner_assertion_error(format!(
        "rewritten file is not idempotent, still needs: {}",
        pending.join(", ")
    )))
}

fn evaluate_expected_error(
    test: &TestCase,
    execution_result: RunnerResult<()>,
) -> RunnerResult<()> {
    let Some(expected_error) = test.error.as_deref() else {
        return execution_result;
    };

    match execution_result {
        Ok(()) => Err(runner_assertion_error(format!(
            "expected error: {expected_error}, but got no error"
        ))),
        Err(actual_error) => {
            let actual_error = actual_error.to_string();
            if actual_error.trim() == expected_error.trim() {
                Ok(())
            } else {
                Err(runner_assertion_error(format!(
                    "expected error: {expected_error}, but got: {actual_error}"
                )))
            }
        }
    }
}

fn version_skip_reason(test: &TestCase, version: &Version) -> RunnerResult<Option<String>> {
    let Some(min_version) = test
        .min_version
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };

    if compare_version_against_requirement(version, min_version)? == Ordering::Less {
        return Ok(Some(format!(
            "Version '{version}' is smaller than min_version '{min_version}'"
        )));
    }
    Ok(None)
}

fn compare_version_against_requirement(
    version: &Version,
    requirement: &str,
) -> RunnerResult<Ordering> {
    let expected = requirement
        .split('.')
        .map(|segment| parse_version_segment(requirement, segment))
        .collect::<RunnerResult<Vec<u16>>>()?;
    let actual = [version.major, version.minor, version.patch];

    for (actual, expected) in actual.iter().zip(&expected) {
        match actual.cmp(expected) {
            Ordering::Equal => continue,
            ordering => return Ok(ordering),
        }
    }
    Ok(Ordering::Equal)
}

fn parse_version_segment(requirement: &str, segment: &str) -> RunnerResult<u16> {
    let digits: String = segment
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(runner_assertion_error(format!(
            "invalid version requirement '{requirement}': no numeric prefix in segment '{segment}'"
        )));
    }

    digits.parse::<u16>().map_err(|_| {
        runner_assertion_error(format!(
            "invalid version requirement '{requirement}': segment '{segment}' is out of range"
        ))
    })
}

fn runner_assertion_error(message: impl Into<String>) -> RunnerError {
    RunnerError::Assertion(message.into())
}
