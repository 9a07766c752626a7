use sqlsync_testkit::{TestCase, TestResult, load_test_cases_from_str, run_offline_test};

const RECONCILE_CASES: &str = include_str!("testdata/reconcile.yml");

#[test]
fn every_reconcile_case_passes_offline() {
    let cases = load_test_cases_from_str(RECONCILE_CASES)
        .unwrap_or_else(|error| panic!("failed to load reconcile cases: {error}"));
    assert!(!cases.is_empty());

    let failures: Vec<String> = cases
        .iter()
        .filter_map(|(name, case)| match run_offline_test(case) {
            TestResult::Passed => None,
            other => Some(format!("{name}: {other:?}")),
        })
        .collect();

    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
}

#[test]
fn mismatched_expected_text_fails_with_both_texts() {
    let case = TestCase {
        current: "CREATE TABLE a (x);\n".to_string(),
        desired: "CREATE TABLE a (x INT);".to_string(),
        expected: Some("CREATE TABLE a (x);\n".to_string()),
        ..TestCase::default()
    };

    let TestResult::Failed(message) = run_offline_test(&case) else {
        panic!("a wrong expectation must fail");
    };
    assert!(message.contains("rendered file mismatch"), "{message}");
    assert!(message.contains("CREATE TABLE a (x INT);\n"), "{message}");
}

#[test]
fn wrong_changed_flag_fails() {
    let case = TestCase {
        current: "CREATE TABLE a (x);".to_string(),
        desired: "CREATE TABLE a (x);".to_string(),
        changed: Some(true),
        ..TestCase::default()
    };

    assert_eq!(
        run_offline_test(&case),
        TestResult::Failed("expected changed: true, but got: false".to_string())
    );
}

#[test]
fn expected_error_that_never_happens_fails() {
    let case = TestCase {
        current: "CREATE TABLE a (x);".to_string(),
        desired: "CREATE TABLE a (x);".to_string(),
        error: Some("boom".to_string()),
        ..TestCase::default()
    };

    assert_eq!(
        run_offline_test(&case),
        TestResult::Failed("expected error: boom, but got no error".to_string())
    );
}

#[test]
fn rewrite_that_does_not_reparse_is_reported() {
    // The appended table lands after a statement that lacks its `;`.
    let case = TestCase {
        current: "CREATE TABLE a (x)".to_string(),
        desired: "CREATE TABLE a (x);\nCREATE TABLE b (y);".to_string(),
        ..TestCase::default()
    };

    let TestResult::Failed(message) = run_offline_test(&case) else {
        panic!("an unparseable rewrite must fail");
    };
    assert!(
        message.starts_with("rewritten file does not parse: "),
        "{message}"
    );
}

#[test]
fn duplicate_objects_in_desired_surface_the_contract_error() {
    let case = TestCase {
        current: String::new(),
        desired: "CREATE TABLE a (x);\nCREATE TABLE a (y);".to_string(),
        error: Some("object already exists: table/a".to_string()),
        ..TestCase::default()
    };

    assert_eq!(run_offline_test(&case), TestResult::Passed);
}
