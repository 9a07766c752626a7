mod adapter;
mod ast;
mod catalog;
mod config;
mod diff;
mod error;
mod parser;
mod schema;
mod token;

pub use adapter::{CatalogRow, DatabaseAdapter};
pub use ast::{
    ColumnConstraint, ColumnConstraintKind, ColumnDef, ConflictClause, CreateTable,
    ForeignKeyClause, GeneratedStorage, Location, SortOrder, Statement, TableConstraint,
    TableOption, TypeName, UnknownStatement,
};
pub use catalog::{
    CATALOG_QUERY, parse_catalog_row, read_schema_from_catalog, schema_from_catalog_rows,
};
pub use config::{ConnectionConfig, Version};
pub use diff::{SchemaEdit, diff_schemas, significant_tokens_equal};
pub use error::{
    ContractViolation, Error, ExecutionError, ParseError, Result, SourceLocation,
};
pub use parser::{parse, parse_tokens};
pub use schema::{
    BufferId, ObjectKey, ObjectKind, ParsedSource, Schema, SchemaObject, SourceId,
    classify_statement,
};
pub use token::{Token, TokenKind, render_tokens, tokenize, unquote};
