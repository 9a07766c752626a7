mod apply;
mod compare;

use tracing::trace;

pub use compare::significant_tokens_equal;

use crate::{
    ContractViolation, Schema, SchemaObject, Token,
    token::{render_tokens, tokenize},
};

/// One change needed to bring a current schema in line with a desired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaEdit {
    Add {
        new_object: SchemaObject,
    },
    Modify {
        old_object: SchemaObject,
        new_object: SchemaObject,
    },
    Remove {
        old_object: SchemaObject,
    },
}

impl SchemaEdit {
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Modify { .. } => "modify",
            Self::Remove { .. } => "remove",
        }
    }

    /// The object the edit is about, as `kind/name`.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::Add { new_object } | Self::Modify { new_object, .. } => new_object.describe(),
            Self::Remove { old_object } => old_object.describe(),
        }
    }
}

/// Computes the edits that turn `current` into `desired` without mutating
/// either schema.
///
/// Adds and modifies follow `desired`'s order; removals follow `current`'s
/// order and come last.
pub fn diff_schemas(
    current: &Schema,
    desired: &Schema,
) -> Result<Vec<SchemaEdit>, ContractViolation> {
    let mut edits = Vec::new();

    for (key, new_object) in &desired.objects {
        let Some(old_object) = current.objects.get(key) else {
            edits.push(SchemaEdit::Add {
                new_object: new_object.clone(),
            });
            continue;
        };

        if objects_differ(current, old_object, desired, new_object)? {
            edits.push(SchemaEdit::Modify {
                old_object: old_object.clone(),
                new_object: new_object.clone(),
            });
        } else {
            trace!(object = %key, "unchanged");
        }
    }

    for (key, old_object) in &current.objects {
        if !desired.objects.contains_key(key) {
            edits.push(SchemaEdit::Remove {
                old_object: old_object.clone(),
            });
        }
    }

    Ok(edits)
}

/// Decides whether `old_object` must be rewritten to match `new_object`.
pub(crate) fn objects_differ(
    current: &Schema,
    old_object: &SchemaObject,
    desired: &Schema,
    new_object: &SchemaObject,
) -> Result<bool, ContractViolation> {
    if old_object.kind != new_object.kind || old_object.name != new_object.name {
        return Err(ContractViolation::ObjectMismatch {
            left: old_object.describe(),
            right: new_object.describe(),
        });
    }

    let old_tokens = relexed(current.object_tokens(old_object)?);
    let new_tokens = relexed(desired.object_tokens(new_object)?);
    Ok(!significant_tokens_equal(
        without_terminator(&old_tokens),
        without_terminator(&new_tokens),
    ))
}

/// Tokenizes the rendered range again. A modified definition occupies a
/// single slot holding the whole new text, which has to be split back into
/// tokens before it can be compared.
fn relexed(tokens: &[Token]) -> Vec<Token> {
    tokenize(&render_tokens(tokens))
}

/// Drops the statement's terminating `;`: a definition at the end of a file
/// may omit it while catalog definitions always carry one.
fn without_terminator(tokens: &[Token]) -> &[Token] {
    match tokens.iter().rposition(Token::is_significant) {
        Some(last) if tokens[last].is_punct(";") => &tokens[..last],
        _ => tokens,
    }
}
