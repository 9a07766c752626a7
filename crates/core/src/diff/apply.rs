use tracing::{debug, info};

use super::{SchemaEdit, diff_schemas};
use crate::{
    ContractViolation, Schema, SchemaObject, SourceId,
    schema::{BufferId, SourceBuffer},
    token::{Token, TokenKind, render_tokens},
};

const ADD_SEPARATOR: &str = "\n\n";

impl Schema {
    /// Rewrites this schema's buffers so that its objects match `desired`.
    /// Returns `true` when any source changed; the changed sources are
    /// available through [`Schema::changed_sources`].
    ///
    /// `placement` chooses the source a brand-new object is appended to.
    ///
    /// A modified definition is stored as a single token carrying the new
    /// text. Comparison splits it again, so the schema can be reconciled
    /// once more after [`Schema::take_changed_sources`]. The object's parsed
    /// statement keeps describing the text it was loaded from.
    pub fn update_schema<F>(
        &mut self,
        desired: &Schema,
        placement: F,
    ) -> Result<bool, ContractViolation>
    where
        F: FnMut(&SchemaObject) -> SourceId,
    {
        self.ensure_no_pending_changes()?;
        let edits = diff_schemas(self, desired)?;
        let changed = self.apply_edits(desired, &edits, placement)?;
        info!(
            edits = edits.len(),
            changed_sources = self.changed_sources.len(),
            "schema reconciled"
        );
        Ok(changed)
    }

    /// Applies edits computed by [`diff_schemas`](crate::diff_schemas) against
    /// `desired`. Every edit touches only token text or appends to a buffer
    /// tail, so ranges held by other objects stay valid in any order.
    pub fn apply_edits<F>(
        &mut self,
        desired: &Schema,
        edits: &[SchemaEdit],
        mut placement: F,
    ) -> Result<bool, ContractViolation>
    where
        F: FnMut(&SchemaObject) -> SourceId,
    {
        self.ensure_no_pending_changes()?;

        for edit in edits {
            match edit {
                SchemaEdit::Add { new_object } => {
                    let target = placement(new_object);
                    self.add_from(desired, new_object, target)?;
                }
                SchemaEdit::Modify {
                    old_object,
                    new_object,
                } => {
                    if old_object.key() != new_object.key() {
                        return Err(ContractViolation::ObjectMismatch {
                            left: old_object.describe(),
                            right: new_object.describe(),
                        });
                    }
                    let text = render_tokens(desired.object_tokens(new_object)?);
                    self.replace_definition(old_object, text)?;
                }
                SchemaEdit::Remove { old_object } => self.remove_definition(old_object)?,
            }
            debug!(edit = edit.tag(), object = %edit.target(), "applied schema edit");
        }

        Ok(self.has_pending_changes())
    }

    fn ensure_no_pending_changes(&self) -> Result<(), ContractViolation> {
        if self.changed_sources.is_empty() {
            Ok(())
        } else {
            Err(ContractViolation::PendingChanges {
                count: self.changed_sources.len(),
            })
        }
    }

    /// Appends `new_object`'s definition to `target` and registers a copy of
    /// the object pointing at the appended tokens.
    fn add_from(
        &mut self,
        desired: &Schema,
        new_object: &SchemaObject,
        target: SourceId,
    ) -> Result<(), ContractViolation> {
        let key = new_object.key();
        if self.objects.contains_key(&key) {
            return Err(ContractViolation::DuplicateObject {
                kind: new_object.kind,
                name: new_object.name.clone(),
            });
        }
        let definition = desired.object_tokens(new_object)?;

        let (buffer, base) = match self.sources.get_mut(&target) {
            Some(buffer) => {
                buffer
                    .tokens
                    .push(Token::new(TokenKind::Whitespace, ADD_SEPARATOR));
                let base = buffer.tokens.len();
                buffer.tokens.extend_from_slice(definition);
                (buffer.id, base)
            }
            None => {
                let id = BufferId::next();
                self.sources.insert(
                    target.clone(),
                    SourceBuffer {
                        id,
                        tokens: definition.to_vec(),
                    },
                );
                (id, 0)
            }
        };

        let object = SchemaObject {
            kind: new_object.kind,
            name: new_object.name.clone(),
            statement: new_object
                .statement
                .rebased(new_object.range().start, base),
            source: target.clone(),
            buffer,
        };
        self.add_object(object)?;
        self.changed_sources.insert(target);
        Ok(())
    }

    /// Blanks the object's range and puts `text` into its first slot.
    fn replace_definition(
        &mut self,
        old_object: &SchemaObject,
        text: String,
    ) -> Result<(), ContractViolation> {
        let tokens = self.object_tokens_mut(old_object)?;
        clear_tokens(tokens);
        if let Some(first) = tokens.first_mut() {
            first.text = text;
        }
        self.changed_sources.insert(old_object.source.clone());
        Ok(())
    }

    fn remove_definition(&mut self, old_object: &SchemaObject) -> Result<(), ContractViolation> {
        clear_tokens(self.object_tokens_mut(old_object)?);
        self.objects.shift_remove(&old_object.key());
        self.changed_sources.insert(old_object.source.clone());
        Ok(())
    }

    /// Resolves the tokens of an object registered in this schema.
    fn object_tokens_mut(
        &mut self,
        object: &SchemaObject,
    ) -> Result<&mut [Token], ContractViolation> {
        let registered = self
            .objects
            .get(&object.key())
            .ok_or_else(|| ContractViolation::MissingObject {
                kind: object.kind,
                name: object.name.clone(),
            })?;
        if registered.source != object.source || registered.buffer != object.buffer {
            return Err(ContractViolation::SourceMismatch {
                source_id: object.source.clone(),
            });
        }

        let range = registered.range().clone();
        let buffer = self
            .sources
            .get_mut(&object.source)
            .filter(|buffer| buffer.id == object.buffer)
            .ok_or_else(|| ContractViolation::SourceMismatch {
                source_id: object.source.clone(),
            })?;
        buffer
            .tokens
            .get_mut(range)
            .ok_or_else(|| ContractViolation::SourceMismatch {
                source_id: object.source.clone(),
            })
    }
}

fn clear_tokens(tokens: &mut [Token]) {
    for token in tokens {
        token.text.clear();
    }
}
