use std::{cell::RefCell, error::Error as StdError, fmt, rc::Rc};

use sqlsync_core::{CatalogRow, DatabaseAdapter, ExecutionError, Result};

#[derive(Debug, Default)]
struct FakeAdapterState {
    catalog_rows: Vec<CatalogRow>,
    queries: Vec<String>,
    executed_sql: Vec<String>,
    close_count: usize,
    fail_select: Option<String>,
}

/// In-memory adapter. Clones share state, so a test can keep one handle
/// while the other is boxed and closed.
#[derive(Debug, Default, Clone)]
pub struct FakeAdapter {
    state: Rc<RefCell<FakeAdapterState>>,
}

#[allow(dead_code)]
impl FakeAdapter {
    pub fn with_rows(rows: Vec<CatalogRow>) -> Self {
        let adapter = Self::default();
        adapter.state.borrow_mut().catalog_rows = rows;
        adapter
    }

    pub fn set_fail_select(&self, message: impl Into<String>) {
        self.state.borrow_mut().fail_select = Some(message.into());
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.borrow().queries.clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state.borrow().executed_sql.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.borrow().close_count
    }
}

#[allow(dead_code)]
pub fn catalog_row(object_type: &str, name: &str, tbl_name: &str, sql: &str) -> CatalogRow {
    CatalogRow {
        object_type: object_type.to_string(),
        name: name.to_string(),
        tbl_name: tbl_name.to_string(),
        sql: sql.to_string(),
    }
}

impl DatabaseAdapter for FakeAdapter {
    fn run(&self, sql: &str) -> Result<()> {
        self.state.borrow_mut().executed_sql.push(sql.to_string());
        Ok(())
    }

    fn select_all(&self, sql: &str) -> Result<Vec<CatalogRow>> {
        let mut state = self.state.borrow_mut();
        state.queries.push(sql.to_string());
        if let Some(message) = &state.fail_select {
            return Err(ExecutionError::statement_failed(sql, FakeSourceError(message.clone())).into());
        }
        Ok(state.catalog_rows.clone())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.state.borrow_mut().close_count += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct FakeSourceError(String);

impl fmt::Display for FakeSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for FakeSourceError {}
