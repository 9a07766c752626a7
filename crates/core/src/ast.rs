use std::{fmt, ops::Range};

/// Half-open range of indices into one token buffer.
pub type Location = Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable(CreateTable),
    Unknown(UnknownStatement),
}

impl Statement {
    #[must_use]
    pub fn range(&self) -> &Location {
        match self {
            Self::CreateTable(table) => &table.range,
            Self::Unknown(unknown) => &unknown.range,
        }
    }

    pub(crate) fn extend_end(&mut self, by: usize) {
        match self {
            Self::CreateTable(table) => table.range.end += by,
            Self::Unknown(unknown) => unknown.range.end += by,
        }
    }

    /// Moves every recorded range so that index `0` maps to `base`.
    #[must_use]
    pub(crate) fn rebased(&self, from: usize, base: usize) -> Self {
        let mut statement = self.clone();
        let shift = |range: &mut Location| {
            range.start = range.start - from + base;
            range.end = range.end - from + base;
        };
        match &mut statement {
            Self::CreateTable(table) => {
                shift(&mut table.range);
                for column in &mut table.columns {
                    shift(&mut column.range);
                    if let Some(type_name) = &mut column.type_name {
                        shift(&mut type_name.range);
                    }
                    for constraint in &mut column.constraints {
                        shift(&mut constraint.range);
                    }
                }
                for option in &mut table.options {
                    shift(&mut option.range);
                }
            }
            Self::Unknown(unknown) => shift(&mut unknown.range),
        }
        statement
    }
}

/// `CREATE TABLE` in the structurally supported subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub options: Vec<TableOption>,
    pub range: Location,
}

/// Any statement the parser does not model, kept as its significant token
/// texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatement {
    pub tokens: Vec<String>,
    pub range: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: Option<TypeName>,
    pub constraints: Vec<ColumnConstraint>,
    pub range: Location,
}

/// Declared column type. Arguments are raw expression text and are never
/// evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub name: String,
    pub arg1: Option<String>,
    pub arg2: Option<String>,
    pub range: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConstraint {
    /// Set by a leading `CONSTRAINT <name>`.
    pub name: Option<String>,
    pub kind: ColumnConstraintKind,
    pub range: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnConstraintKind {
    PrimaryKey {
        order: Option<SortOrder>,
        conflict: Option<ConflictClause>,
        autoincrement: bool,
    },
    NotNull {
        conflict: Option<ConflictClause>,
    },
    Null {
        conflict: Option<ConflictClause>,
    },
    Unique {
        conflict: Option<ConflictClause>,
    },
    Check {
        expr: String,
    },
    Default {
        value: String,
    },
    Collate {
        collation: String,
    },
    References(ForeignKeyClause),
    Generated {
        expr: String,
        storage: Option<GeneratedStorage>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyClause {
    pub table: String,
    pub columns: Vec<String>,
    /// `ON DELETE ...`, `MATCH ...`, `DEFERRABLE ...` clauses, upper-cased and
    /// space-joined.
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedStorage {
    Stored,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictClause {
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,
}

impl ConflictClause {
    pub(crate) const ALL: [Self; 5] = [
        Self::Rollback,
        Self::Abort,
        Self::Fail,
        Self::Ignore,
        Self::Replace,
    ];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Rollback => "ROLLBACK",
            Self::Abort => "ABORT",
            Self::Fail => "FAIL",
            Self::Ignore => "IGNORE",
            Self::Replace => "REPLACE",
        }
    }
}

impl fmt::Display for ConflictClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ON CONFLICT {}", self.keyword())
    }
}

/// Table-level constraints are not parsed yet, so this type has no values and
/// `CreateTable::constraints` is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableConstraint {}

/// `WITHOUT ROWID` or `STRICT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOption {
    pub text: String,
    pub range: Location,
}
