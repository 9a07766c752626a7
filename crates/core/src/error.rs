use std::{error::Error as StdError, fmt};

use crate::{ObjectKind, SourceId};

pub type Result<T> = std::result::Result<T, Error>;

/// 1-based position inside a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Execute(#[from] ExecutionError),
}

/// Input text that falls outside the supported grammar subset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{message}\nat {location}:\n  {line_text}\n  {caret}", caret = caret_line(.location))]
    Syntax {
        message: String,
        location: SourceLocation,
        line_text: String,
    },
    #[error("catalog definition of `{object}` parsed to {found} statements, expected exactly one")]
    StatementCount { object: String, found: usize },
    #[error("unknown catalog object type `{kind}`")]
    UnknownObjectKind { kind: String },
}

impl ParseError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::Syntax { location, .. } => Some(*location),
            Self::StatementCount { .. } | Self::UnknownObjectKind { .. } => None,
        }
    }
}

fn caret_line(location: &SourceLocation) -> String {
    format!("{}^", " ".repeat(location.column.saturating_sub(1)))
}

/// A broken internal invariant. These are programming errors: callers abort
/// the current reconciliation instead of attempting a repair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("object already exists: {kind}/{name}")]
    DuplicateObject { kind: ObjectKind, name: String },
    #[error("source `{source_id}` is already registered with a different token buffer")]
    SourceMismatch { source_id: SourceId },
    #[error("source `{source_id}` has no registered token buffer")]
    UnknownSource { source_id: SourceId },
    #[error("cannot update {left} with {right}: object kinds and names must match")]
    ObjectMismatch { left: String, right: String },
    #[error("schema has {count} pending changed source(s); take them before updating again")]
    PendingChanges { count: usize },
    #[error("object {kind}/{name} is not part of this schema")]
    MissingObject { kind: ObjectKind, name: String },
}

/// Failure reported by a database adapter while running a statement.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("statement failed: {sql}: {source}")]
    StatementFailed {
        sql: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ExecutionError {
    pub fn statement_failed<E>(sql: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::StatementFailed {
            sql: sql.into().trim().to_string(),
            source: Box::new(source),
        }
    }
}
