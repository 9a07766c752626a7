use std::{error::Error as StdError, fmt, io};

use sqlsync_core::{
    ContractViolation, Error, ExecutionError, ObjectKind, ParseError, SourceId, SourceLocation,
};

#[test]
fn source_location_displays_line_and_column() {
    let location = SourceLocation {
        line: 12,
        column: 4,
    };

    assert_eq!(location.to_string(), "line 12, column 4");
}

#[test]
fn syntax_error_renders_caret_under_column() {
    let error = ParseError::Syntax {
        message: "Expected opening parenthesis".to_string(),
        location: SourceLocation { line: 1, column: 5 },
        line_text: "abc def".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Expected opening parenthesis\nat line 1, column 5:\n  abc def\n      ^"
    );
    assert_eq!(
        error.location(),
        Some(SourceLocation { line: 1, column: 5 })
    );
}

#[test]
fn catalog_parse_errors_carry_no_location() {
    let error = ParseError::UnknownObjectKind {
        kind: "shadow".to_string(),
    };

    assert_eq!(error.location(), None);
    assert_eq!(error.to_string(), "unknown catalog object type `shadow`");
}

#[test]
fn contract_violations_name_the_offending_object() {
    let cases = [
        (
            ContractViolation::DuplicateObject {
                kind: ObjectKind::Index,
                name: "users_name".to_string(),
            },
            "object already exists: index/users_name",
        ),
        (
            ContractViolation::SourceMismatch {
                source_id: SourceId::new("schema.sql"),
            },
            "source `schema.sql` is already registered with a different token buffer",
        ),
        (
            ContractViolation::UnknownSource {
                source_id: SourceId::new("orphan.sql"),
            },
            "source `orphan.sql` has no registered token buffer",
        ),
        (
            ContractViolation::ObjectMismatch {
                left: "table/a".to_string(),
                right: "view/a".to_string(),
            },
            "cannot update table/a with view/a: object kinds and names must match",
        ),
        (
            ContractViolation::PendingChanges { count: 2 },
            "schema has 2 pending changed source(s); take them before updating again",
        ),
        (
            ContractViolation::MissingObject {
                kind: ObjectKind::Trigger,
                name: "audit".to_string(),
            },
            "object trigger/audit is not part of this schema",
        ),
    ];

    for (violation, expected) in cases {
        assert_eq!(violation.to_string(), expected);
    }
}

#[test]
fn stage_errors_convert_into_top_level_error() {
    let parse: Error = ParseError::UnknownObjectKind {
        kind: "x".to_string(),
    }
    .into();
    let contract: Error = ContractViolation::PendingChanges { count: 1 }.into();
    let execute: Error = ExecutionError::statement_failed(
        "  SELECT 1;\n",
        io::Error::other("disk I/O error"),
    )
    .into();

    assert!(matches!(parse, Error::Parse(_)));
    assert!(matches!(contract, Error::Contract(_)));
    assert!(matches!(execute, Error::Execute(_)));
    assert_eq!(
        execute.to_string(),
        "statement failed: SELECT 1;: disk I/O error"
    );
}

#[test]
fn execution_error_exposes_driver_source() {
    let error = ExecutionError::statement_failed("SELECT 1", Driver("no such table: t"));

    let source = error.source().expect("driver error is kept as source");
    assert_eq!(source.to_string(), "no such table: t");
}

#[derive(Debug)]
struct Driver(&'static str);

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl StdError for Driver {}
