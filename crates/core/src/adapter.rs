use crate::Result;

/// A row of the SQLite schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    /// `table`, `index`, `view`, or `trigger`.
    pub object_type: String,
    pub name: String,
    /// Table the object belongs to; equal to `name` for tables and views.
    pub tbl_name: String,
    pub sql: String,
}

/// Request/response access to a database. The core only reads the catalog
/// through [`DatabaseAdapter::select_all`] and never issues DDL.
pub trait DatabaseAdapter {
    fn run(&self, sql: &str) -> Result<()>;
    fn select_all(&self, sql: &str) -> Result<Vec<CatalogRow>>;
    fn close(self: Box<Self>) -> Result<()>;
}
