use std::collections::BTreeMap;

use sqlsync_core::{
    CATALOG_QUERY, ConnectionConfig, Error, ExecutionError, ObjectKind, read_schema_from_catalog,
    render_tokens,
};
use sqlsync_sqlite::{MINIMUM_VERSION, SqliteAdapter, connect};

fn in_memory_connection() -> ConnectionConfig {
    ConnectionConfig::new(":memory:")
}

fn with_version_override(version: &str) -> ConnectionConfig {
    let mut extra = BTreeMap::new();
    extra.insert("sqlite.server_version".to_string(), version.to_string());
    ConnectionConfig {
        database: ":memory:".to_string(),
        extra,
    }
}

#[test]
fn catalog_is_read_in_type_then_table_order() {
    let adapter = connect(&in_memory_connection()).expect("connect should succeed");
    adapter
        .run(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE audit_log (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL);
             CREATE VIEW users_view AS SELECT id, name FROM users;
             CREATE INDEX idx_users_name ON users(name);
             CREATE TRIGGER users_insert_audit AFTER INSERT ON users BEGIN
               INSERT INTO audit_log(user_id) VALUES (NEW.id);
             END;",
        )
        .expect("create schema");

    let schema = read_schema_from_catalog(adapter.as_ref()).expect("read catalog");
    let keys: Vec<_> = schema.objects().map(|object| object.describe()).collect();

    assert_eq!(
        keys,
        vec![
            "table/audit_log",
            "table/users",
            "index/idx_users_name",
            "view/users_view",
            "trigger/users_insert_audit",
        ]
    );
    adapter.close().expect("close");
}

#[test]
fn catalog_definitions_gain_a_terminator() {
    let adapter = connect(&in_memory_connection()).expect("connect should succeed");
    adapter
        .run("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .expect("create table");

    let schema = read_schema_from_catalog(adapter.as_ref()).expect("read catalog");
    let users = schema.get(ObjectKind::Table, "users").expect("users");

    assert_eq!(
        render_tokens(schema.object_tokens(users).expect("users tokens")),
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);"
    );
}

#[test]
fn only_internal_sqlite_objects_are_filtered_by_name() {
    let adapter = connect(&in_memory_connection()).expect("connect should succeed");
    adapter
        .run(
            "CREATE TABLE sqliteusers (id INTEGER);
             CREATE TABLE sqlite1 (id INTEGER);
             CREATE TABLE counters (id INTEGER PRIMARY KEY AUTOINCREMENT);
             INSERT INTO counters DEFAULT VALUES;",
        )
        .expect("create schema");

    let schema = read_schema_from_catalog(adapter.as_ref()).expect("read catalog");
    let keys: Vec<_> = schema.objects().map(|object| object.describe()).collect();

    assert_eq!(
        keys,
        vec!["table/counters", "table/sqlite1", "table/sqliteusers"]
    );
    adapter.close().expect("close");
}

#[test]
fn automatic_indexes_without_sql_are_skipped() {
    let adapter = connect(&in_memory_connection()).expect("connect should succeed");
    adapter
        .run("CREATE TABLE t (code TEXT UNIQUE)")
        .expect("create table");

    let rows = adapter
        .select_all("SELECT type, name, tbl_name, sql FROM sqlite_schema ORDER BY name")
        .expect("select all");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].object_type, "table");
    assert_eq!(rows[0].name, "t");
    assert_eq!(rows[0].tbl_name, "t");
}

#[test]
fn failed_statement_keeps_sql_and_driver_message() {
    let adapter = connect(&in_memory_connection()).expect("connect should succeed");

    let error = adapter
        .run("INSERT INTO missing VALUES (1)")
        .expect_err("table does not exist");

    match error {
        Error::Execute(ExecutionError::StatementFailed { sql, source }) => {
            assert_eq!(sql, "INSERT INTO missing VALUES (1)");
            assert!(source.to_string().contains("no such table"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn malformed_select_is_an_execution_error() {
    let adapter = connect(&in_memory_connection()).expect("connect should succeed");

    assert!(matches!(
        adapter.select_all("SELECT FROM"),
        Err(Error::Execute(_))
    ));
}

#[test]
fn reports_the_library_version() {
    let adapter = SqliteAdapter::open(&in_memory_connection()).expect("open should succeed");

    assert!(adapter.server_version() >= &MINIMUM_VERSION);
}

#[test]
fn version_override_replaces_the_queried_version() {
    let adapter = SqliteAdapter::open(&with_version_override("3.40.1")).expect("open");

    assert_eq!(adapter.server_version().to_string(), "3.40.1");
}

#[test]
fn rejects_versions_without_sqlite_schema() {
    let error = match SqliteAdapter::open(&with_version_override("3.31.1")) {
        Ok(_) => panic!("old versions should be rejected"),
        Err(error) => error,
    };

    assert!(error.to_string().contains("requires 3.33+"));
}

#[test]
fn rejects_unparseable_version_override() {
    let error = match SqliteAdapter::open(&with_version_override("latest")) {
        Ok(_) => panic!("invalid versions should be rejected"),
        Err(error) => error,
    };

    assert!(
        error
            .to_string()
            .contains("failed to parse sqlite server version string: `latest`")
    );
}

#[test]
fn file_database_persists_across_connections() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("app.db");
    let config = ConnectionConfig::new(path.to_string_lossy());

    let adapter = connect(&config).expect("first connection");
    adapter
        .run("CREATE TABLE notes (body TEXT)")
        .expect("create table");
    adapter.close().expect("close first connection");

    let adapter = connect(&config).expect("second connection");
    let rows = adapter.select_all(CATALOG_QUERY).expect("read catalog");
    adapter.close().expect("close second connection");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sql, "CREATE TABLE notes (body TEXT)");
}
