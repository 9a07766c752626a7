use std::{
    error::Error as StdError,
    io,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, Row};
use sqlsync_core::{
    CatalogRow, ConnectionConfig, DatabaseAdapter, ExecutionError, Result, Version,
};
use tracing::{debug, trace};

use crate::queries::{CLOSE_SQL, CONNECT_SQL, SHOW_SERVER_VERSION_QUERY};

/// `sqlite_schema` is only recognized from 3.33.0 on.
pub const MINIMUM_VERSION: Version = Version {
    major: 3,
    minor: 33,
    patch: 0,
};
const SERVER_VERSION_OVERRIDE_KEY: &str = "sqlite.server_version";
const POISONED_CONNECTION_MESSAGE: &str = "sqlite connection state was poisoned";

/// A single SQLite connection behind the [`DatabaseAdapter`] contract.
pub struct SqliteAdapter {
    connection: Mutex<Connection>,
    server_version: Version,
}

/// Opens `config.database` and returns it as a boxed adapter.
pub fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
    Ok(Box::new(SqliteAdapter::open(config)?))
}

impl SqliteAdapter {
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        if let Some(raw_version) = config.extra.get(SERVER_VERSION_OVERRIDE_KEY) {
            let version = parse_server_version(raw_version)
                .ok_or_else(|| invalid_server_version_error(raw_version))?;
            ensure_minimum_version(&version, raw_version)?;
        }

        let connection = Connection::open(config.database.as_str())
            .map_err(|source| execution_error(CONNECT_SQL, source))?;

        let server_version_raw =
            if let Some(raw_version) = config.extra.get(SERVER_VERSION_OVERRIDE_KEY) {
                raw_version.clone()
            } else {
                query_server_version(&connection)?
            };
        let server_version = parse_server_version(&server_version_raw)
            .ok_or_else(|| invalid_server_version_error(&server_version_raw))?;
        ensure_minimum_version(&server_version, &server_version_raw)?;

        debug!(
            database = %config.database,
            version = %server_version,
            "opened sqlite connection"
        );
        Ok(Self {
            connection: Mutex::new(connection),
            server_version,
        })
    }

    #[must_use]
    pub fn server_version(&self) -> &Version {
        &self.server_version
    }

    fn lock_connection(&self, sql: &str) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| execution_error(sql, io::Error::other(POISONED_CONNECTION_MESSAGE)))
    }
}

impl DatabaseAdapter for SqliteAdapter {
    fn run(&self, sql: &str) -> Result<()> {
        trace!(sql, "run");
        let connection = self.lock_connection(sql)?;
        connection
            .execute_batch(sql)
            .map_err(|source| execution_error(sql, source))
    }

    /// Expects the `type, name, tbl_name, sql` column layout of
    /// `sqlite_schema`. Rows with a NULL `sql` are dropped.
    fn select_all(&self, sql: &str) -> Result<Vec<CatalogRow>> {
        trace!(sql, "select_all");
        let connection = self.lock_connection(sql)?;
        let mut statement = connection
            .prepare(sql)
            .map_err(|source| execution_error(sql, source))?;
        let mut rows = statement
            .query([])
            .map_err(|source| execution_error(sql, source))?;

        let mut values = Vec::new();
        while let Some(row) = rows.next().map_err(|source| execution_error(sql, source))? {
            if let Some(value) =
                catalog_row(row).map_err(|source| execution_error(sql, source))?
            {
                values.push(value);
            }
        }

        Ok(values)
    }

    fn close(self: Box<Self>) -> Result<()> {
        let Self { connection, .. } = *self;
        let connection = connection
            .into_inner()
            .map_err(|_| execution_error(CLOSE_SQL, io::Error::other(POISONED_CONNECTION_MESSAGE)))?;
        connection
            .close()
            .map_err(|(_, source)| execution_error(CLOSE_SQL, source))
    }
}

fn catalog_row(row: &Row<'_>) -> rusqlite::Result<Option<CatalogRow>> {
    let Some(sql) = row.get::<_, Option<String>>(3)? else {
        return Ok(None);
    };
    Ok(Some(CatalogRow {
        object_type: row.get(0)?,
        name: row.get(1)?,
        tbl_name: row.get(2)?,
        sql,
    }))
}

/// Parses strings such as `3.45.1`, `3.46`, or `3.45.1 2024-01-30`.
pub fn parse_server_version(raw: &str) -> Option<Version> {
    let mut parts = raw.split_whitespace().next()?.split('.');
    let major = parse_version_component(parts.next()?)?;
    let minor = parts.next().and_then(parse_version_component).unwrap_or(0);
    let patch = parts.next().and_then(parse_version_component).unwrap_or(0);

    Some(Version {
        major,
        minor,
        patch,
    })
}

fn query_server_version(connection: &Connection) -> Result<String> {
    connection
        .query_row(SHOW_SERVER_VERSION_QUERY, [], |row| row.get(0))
        .map_err(|source| execution_error(SHOW_SERVER_VERSION_QUERY, source))
}

fn parse_version_component(raw: &str) -> Option<u16> {
    let digits = raw
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u16>().ok()
}

fn ensure_minimum_version(version: &Version, raw_version: &str) -> Result<()> {
    if (version.major, version.minor) >= (MINIMUM_VERSION.major, MINIMUM_VERSION.minor) {
        return Ok(());
    }

    Err(execution_error(
        SHOW_SERVER_VERSION_QUERY,
        io::Error::other(format!(
            "sqlite server version `{raw_version}` is not supported; requires {}.{}+",
            MINIMUM_VERSION.major, MINIMUM_VERSION.minor
        )),
    ))
}

fn invalid_server_version_error(raw_version: &str) -> sqlsync_core::Error {
    execution_error(
        SHOW_SERVER_VERSION_QUERY,
        io::Error::other(format!(
            "failed to parse sqlite server version string: `{raw_version}`"
        )),
    )
}

fn execution_error<E>(sql: &str, source: E) -> sqlsync_core::Error
where
    E: StdError + Send + Sync + 'static,
{
    ExecutionError::statement_failed(sql, source).into()
}
