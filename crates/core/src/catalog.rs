use tracing::{debug, warn};

use crate::{
    CatalogRow, DatabaseAdapter, ObjectKind, ParseError, ParsedSource, Result, Schema,
    SchemaObject, SourceId,
    ast::Statement,
    parser::parse,
    schema::BufferId,
    token::{Token, TokenKind},
};

// See https://www.sqlite.org/schematab.html. Internal objects and automatic
// indexes (NULL sql) are skipped.
pub const CATALOG_QUERY: &str = r#"
SELECT type, name, tbl_name, sql
FROM sqlite_schema
WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
ORDER BY CASE type
    WHEN 'table' THEN 0
    WHEN 'index' THEN 1
    WHEN 'view' THEN 2
    ELSE 3
  END, tbl_name ASC, name ASC;
"#;

/// Reads the live schema through `adapter` into a schema with one synthetic
/// source per catalog row.
pub fn read_schema_from_catalog(adapter: &dyn DatabaseAdapter) -> Result<Schema> {
    let rows = adapter.select_all(CATALOG_QUERY)?;
    debug!(rows = rows.len(), "read catalog rows");
    schema_from_catalog_rows(rows)
}

pub fn schema_from_catalog_rows(rows: impl IntoIterator<Item = CatalogRow>) -> Result<Schema> {
    let mut schema = Schema::new();
    for row in rows {
        if row.sql.trim().is_empty() {
            warn!(name = %row.name, "skipping catalog row without sql");
            continue;
        }
        let parsed = parse_catalog_row(&row)?;
        schema.add_source(parsed)?;
    }
    Ok(schema)
}

/// Parses one catalog row into a single-object source. A missing trailing
/// `;` is added to both the buffer and the statement range.
pub fn parse_catalog_row(row: &CatalogRow) -> Result<ParsedSource> {
    let kind = ObjectKind::from_catalog_type(&row.object_type).ok_or_else(|| {
        ParseError::UnknownObjectKind {
            kind: row.object_type.clone(),
        }
    })?;

    let (mut tokens, statements) = parse(&row.sql)?;
    let mut statement = match <[Statement; 1]>::try_from(statements) {
        Ok([statement]) => statement,
        Err(statements) => {
            return Err(ParseError::StatementCount {
                object: format!("{kind}/{}", row.name),
                found: statements.len(),
            }
            .into());
        }
    };

    let end = statement.range().end;
    let terminated = end > 0 && tokens[end - 1].is_punct(";");
    if !terminated {
        tokens.insert(end, Token::new(TokenKind::Punctuation, ";"));
        statement.extend_end(1);
    }

    let source = SourceId::catalog(kind, &row.name);
    let buffer = BufferId::next();
    Ok(ParsedSource {
        source: source.clone(),
        buffer,
        tokens,
        objects: vec![SchemaObject {
            kind,
            name: row.name.clone(),
            statement,
            source,
            buffer,
        }],
    })
}
