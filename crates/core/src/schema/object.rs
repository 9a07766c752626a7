use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    ParseError,
    ast::{Location, Statement},
    parser::parse,
    token::{Token, unquote},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Table,
    Index,
    View,
    Trigger,
}

impl ObjectKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Index => "index",
            Self::View => "view",
            Self::Trigger => "trigger",
        }
    }

    /// Maps the `type` column of `sqlite_schema`.
    #[must_use]
    pub fn from_catalog_type(value: &str) -> Option<Self> {
        match value {
            "table" => Some(Self::Table),
            "index" => Some(Self::Index),
            "view" => Some(Self::View),
            "trigger" => Some(Self::Trigger),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one origin of SQL text: a file path, or a synthetic name for a
/// catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn catalog(kind: ObjectKind, name: &str) -> Self {
        Self(format!("<catalog>/{kind}/{name}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity of one tokenization of a source. Two parses of the same text get
/// different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

impl BufferId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// `(kind, name)`; unique within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A named schema object and the statement that defines it.
///
/// The object does not own any tokens: `statement.range()` indexes into the
/// buffer registered for `source` in the owning [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,
    pub statement: Statement,
    pub source: SourceId,
    pub buffer: BufferId,
}

impl SchemaObject {
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.kind, self.name.clone())
    }

    #[must_use]
    pub fn range(&self) -> &Location {
        self.statement.range()
    }

    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }
}

/// One tokenized source together with the schema objects parsed from it.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub source: SourceId,
    pub buffer: BufferId,
    pub tokens: Vec<Token>,
    pub objects: Vec<SchemaObject>,
}

impl ParsedSource {
    /// Parses `text` and classifies its statements. Statements that do not
    /// create a table, index, view, or trigger stay in the buffer but produce
    /// no object.
    pub fn parse(source: SourceId, text: &str) -> Result<Self, ParseError> {
        let (tokens, statements) = parse(text)?;
        let buffer = BufferId::next();
        let objects = statements
            .into_iter()
            .filter_map(|statement| {
                let (kind, name) = classify_statement(&statement)?;
                Some(SchemaObject {
                    kind,
                    name,
                    statement,
                    source: source.clone(),
                    buffer,
                })
            })
            .collect();

        Ok(Self {
            source,
            buffer,
            tokens,
            objects,
        })
    }
}

/// Determines which schema object, if any, a statement defines.
#[must_use]
pub fn classify_statement(statement: &Statement) -> Option<(ObjectKind, String)> {
    match statement {
        Statement::CreateTable(table) => Some((ObjectKind::Table, table.name.clone())),
        Statement::Unknown(unknown) => classify_create(&unknown.tokens),
    }
}

// CREATE [TEMP|TEMPORARY] [UNIQUE] (INDEX|VIEW|TRIGGER) [IF NOT EXISTS] name ['.' name]
fn classify_create(tokens: &[String]) -> Option<(ObjectKind, String)> {
    let mut words = tokens.iter().map(String::as_str).peekable();
    if !words.next()?.eq_ignore_ascii_case("CREATE") {
        return None;
    }
    words.next_if(|word| {
        word.eq_ignore_ascii_case("TEMP") || word.eq_ignore_ascii_case("TEMPORARY")
    });
    let unique = words
        .next_if(|word| word.eq_ignore_ascii_case("UNIQUE"))
        .is_some();

    let keyword = words.next()?.to_ascii_uppercase();
    let kind = match keyword.as_str() {
        "INDEX" => ObjectKind::Index,
        "VIEW" if !unique => ObjectKind::View,
        "TRIGGER" if !unique => ObjectKind::Trigger,
        _ => return None,
    };

    if words
        .next_if(|word| word.eq_ignore_ascii_case("IF"))
        .is_some()
    {
        words.next_if(|word| word.eq_ignore_ascii_case("NOT"))?;
        words.next_if(|word| word.eq_ignore_ascii_case("EXISTS"))?;
    }

    let mut name = object_name(words.next()?)?;
    if words.next_if_eq(&".").is_some() {
        name.push('.');
        name.push_str(&object_name(words.next()?)?);
    }
    Some((kind, name))
}

fn object_name(text: &str) -> Option<String> {
    if text.starts_with(['\'', '"']) {
        return unquote(text);
    }
    let is_word = !text.is_empty() && text.chars().all(|ch| ch.is_alphanumeric() || ch == '_');
    is_word.then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::{ObjectKind, classify_create};

    fn words(sql: &[&str]) -> Vec<String> {
        sql.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn classifies_unique_temp_index_with_schema() {
        let tokens = words(&[
            "CREATE", "TEMP", "UNIQUE", "INDEX", "IF", "NOT", "EXISTS", "main", ".", "idx", "ON",
            "t", "(", "a", ")", ";",
        ]);
        assert_eq!(
            classify_create(&tokens),
            Some((ObjectKind::Index, "main.idx".to_string()))
        );
    }

    #[test]
    fn classifies_quoted_view_name() {
        let tokens = words(&["create", "view", "\"user names\"", "AS", "SELECT", "1", ";"]);
        assert_eq!(
            classify_create(&tokens),
            Some((ObjectKind::View, "user names".to_string()))
        );
    }

    #[test]
    fn ignores_statements_that_define_no_object() {
        assert_eq!(classify_create(&words(&["PRAGMA", "foreign_keys", "=", "ON", ";"])), None);
        assert_eq!(classify_create(&words(&["CREATE", "UNIQUE", "VIEW", "v"])), None);
        assert_eq!(
            classify_create(&words(&["CREATE", "VIRTUAL", "TABLE", "docs", "USING", "fts5"])),
            None
        );
        assert_eq!(classify_create(&words(&["CREATE", "INDEX", "("])), None);
    }
}
