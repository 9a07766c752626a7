#[path = "support/fake_adapter.rs"]
mod fake_adapter;

use fake_adapter::{FakeAdapter, catalog_row};
use sqlsync_core::{
    CATALOG_QUERY, DatabaseAdapter, Error, ExecutionError, ObjectKind, ParseError, SourceId,
    parse_catalog_row, read_schema_from_catalog, render_tokens, schema_from_catalog_rows,
};

fn sample_rows() -> Vec<sqlsync_core::CatalogRow> {
    vec![
        catalog_row(
            "table",
            "users",
            "users",
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        ),
        catalog_row(
            "index",
            "users_name",
            "users",
            "CREATE INDEX users_name ON users (name)",
        ),
        catalog_row("view", "user_names", "user_names", "CREATE VIEW user_names AS SELECT name FROM users"),
        catalog_row(
            "trigger",
            "users_touch",
            "users",
            "CREATE TRIGGER users_touch AFTER UPDATE ON users BEGIN\n  SELECT 1;\nEND",
        ),
    ]
}

#[test]
fn reads_every_catalog_row_through_select_all() {
    let adapter = FakeAdapter::with_rows(sample_rows());

    let schema = read_schema_from_catalog(&adapter).expect("catalog schema");

    assert_eq!(adapter.queries(), vec![CATALOG_QUERY.to_string()]);
    assert!(adapter.executed_sql().is_empty());
    let keys: Vec<_> = schema.objects().map(|object| object.describe()).collect();
    assert_eq!(
        keys,
        vec![
            "table/users",
            "index/users_name",
            "view/user_names",
            "trigger/users_touch",
        ]
    );
}

#[test]
fn each_row_gets_its_own_synthetic_source() {
    let schema = schema_from_catalog_rows(sample_rows()).expect("catalog schema");

    let sources: Vec<_> = schema.sources().map(SourceId::as_str).collect();
    assert_eq!(
        sources,
        vec![
            "<catalog>/table/users",
            "<catalog>/index/users_name",
            "<catalog>/view/user_names",
            "<catalog>/trigger/users_touch",
        ]
    );
}

#[test]
fn missing_terminator_is_appended_to_buffer_and_range() {
    let row = catalog_row("table", "t", "t", "CREATE TABLE t (a INT)\n");
    let parsed = parse_catalog_row(&row).expect("parse row");

    assert_eq!(render_tokens(&parsed.tokens), "CREATE TABLE t (a INT);\n");
    let object = &parsed.objects[0];
    assert_eq!(
        render_tokens(&parsed.tokens[object.range().clone()]),
        "CREATE TABLE t (a INT);"
    );
    assert_eq!(object.kind, ObjectKind::Table);
    assert_eq!(object.source, SourceId::new("<catalog>/table/t"));
    assert_eq!(object.buffer, parsed.buffer);
}

#[test]
fn existing_terminator_is_kept_as_is() {
    let row = catalog_row("table", "t", "t", "CREATE TABLE t (a INT);");
    let parsed = parse_catalog_row(&row).expect("parse row");

    assert_eq!(render_tokens(&parsed.tokens), "CREATE TABLE t (a INT);");
    assert_eq!(parsed.objects[0].range(), &(0..12));
}

#[test]
fn trigger_body_is_one_statement() {
    let schema = schema_from_catalog_rows(sample_rows()).expect("catalog schema");
    let trigger = schema
        .get(ObjectKind::Trigger, "users_touch")
        .expect("trigger");

    assert_eq!(
        render_tokens(schema.object_tokens(trigger).expect("trigger tokens")),
        "CREATE TRIGGER users_touch AFTER UPDATE ON users BEGIN\n  SELECT 1;\nEND;"
    );
}

#[test]
fn rows_without_sql_are_skipped() {
    let rows = vec![
        catalog_row("table", "t", "t", "CREATE TABLE t (a)"),
        catalog_row("index", "sqlite_autoindex_t_1", "t", "  "),
    ];

    let schema = schema_from_catalog_rows(rows).expect("catalog schema");

    assert_eq!(schema.len(), 1);
}

#[test]
fn unknown_object_type_is_a_parse_error() {
    let row = catalog_row("shadow", "x", "x", "CREATE TABLE x (a)");

    assert!(matches!(
        parse_catalog_row(&row),
        Err(Error::Parse(ParseError::UnknownObjectKind { ref kind })) if kind == "shadow"
    ));
}

#[test]
fn more_than_one_statement_is_rejected() {
    let row = catalog_row(
        "table",
        "a",
        "a",
        "CREATE TABLE a (x); CREATE TABLE b (y)",
    );

    let error = parse_catalog_row(&row).expect_err("two statements");

    assert!(matches!(
        error,
        Error::Parse(ParseError::StatementCount { found: 2, .. })
    ));
    assert_eq!(
        error.to_string(),
        "catalog definition of `table/a` parsed to 2 statements, expected exactly one"
    );
}

#[test]
fn catalog_sql_outside_the_grammar_is_a_parse_error() {
    let row = catalog_row(
        "table",
        "t",
        "t",
        "CREATE TABLE t (a INT, UNIQUE (a))",
    );

    let error = read_schema_from_catalog(&FakeAdapter::with_rows(vec![row]))
        .expect_err("table constraint");

    assert!(matches!(error, Error::Parse(ParseError::Syntax { .. })));
}

#[test]
fn select_failure_propagates_unchanged() {
    let adapter = FakeAdapter::default();
    adapter.set_fail_select("database is locked");

    let error = read_schema_from_catalog(&adapter).expect_err("select should fail");

    match error {
        Error::Execute(ExecutionError::StatementFailed { sql, source }) => {
            assert!(sql.starts_with("SELECT type, name, tbl_name, sql"));
            assert_eq!(source.to_string(), "database is locked");
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn boxed_adapter_closes_once() {
    let adapter = FakeAdapter::with_rows(sample_rows());
    let boxed: Box<dyn DatabaseAdapter> = Box::new(adapter.clone());

    let schema = read_schema_from_catalog(boxed.as_ref()).expect("catalog schema");
    boxed.close().expect("close");

    assert_eq!(schema.len(), 4);
    assert_eq!(adapter.close_count(), 1);
}
