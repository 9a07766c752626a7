mod object;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

pub use object::{
    BufferId, ObjectKey, ObjectKind, ParsedSource, SchemaObject, SourceId, classify_statement,
};

use crate::{
    ContractViolation, Result,
    token::{Token, render_tokens},
};

#[derive(Debug)]
pub(crate) struct SourceBuffer {
    pub(crate) id: BufferId,
    pub(crate) tokens: Vec<Token>,
}

/// An ordered collection of schema objects drawn from one or more sources.
///
/// The schema owns one token buffer per source. Objects address their
/// definition as a range of that buffer, so an edit made through one object
/// is visible to every object of the same source.
#[derive(Debug, Default)]
pub struct Schema {
    pub(crate) sources: IndexMap<SourceId, SourceBuffer>,
    pub(crate) objects: IndexMap<ObjectKey, SchemaObject>,
    pub(crate) changed_sources: IndexSet<SourceId>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` as the content of `source` and registers it.
    pub fn load_source(&mut self, source: impl Into<SourceId>, text: &str) -> Result<usize> {
        let parsed = ParsedSource::parse(source.into(), text)?;
        Ok(self.add_source(parsed)?)
    }

    /// Registers a parsed source and all of its objects. Returns the number of
    /// objects added.
    ///
    /// Nothing is registered when any object key is already taken.
    pub fn add_source(
        &mut self,
        parsed: ParsedSource,
    ) -> std::result::Result<usize, ContractViolation> {
        let mut seen = IndexSet::with_capacity(parsed.objects.len());
        for object in &parsed.objects {
            let key = object.key();
            if self.objects.contains_key(&key) || !seen.insert(key) {
                return Err(ContractViolation::DuplicateObject {
                    kind: object.kind,
                    name: object.name.clone(),
                });
            }
        }

        self.register_buffer(parsed.source.clone(), parsed.buffer, parsed.tokens)?;
        let count = parsed.objects.len();
        for object in parsed.objects {
            self.add_object(object)?;
        }
        debug!(source = %parsed.source, objects = count, "registered source");
        Ok(count)
    }

    /// Registers one object. Its source must already be registered with the
    /// very buffer the object was parsed from.
    pub fn add_object(
        &mut self,
        object: SchemaObject,
    ) -> std::result::Result<(), ContractViolation> {
        let key = object.key();
        if self.objects.contains_key(&key) {
            return Err(ContractViolation::DuplicateObject {
                kind: object.kind,
                name: object.name,
            });
        }

        match self.sources.get(&object.source) {
            None => {
                return Err(ContractViolation::UnknownSource {
                    source_id: object.source,
                });
            }
            Some(buffer) if buffer.id != object.buffer => {
                return Err(ContractViolation::SourceMismatch {
                    source_id: object.source,
                });
            }
            Some(_) => {}
        }

        self.objects.insert(key, object);
        Ok(())
    }

    pub(crate) fn register_buffer(
        &mut self,
        source: SourceId,
        id: BufferId,
        tokens: Vec<Token>,
    ) -> std::result::Result<(), ContractViolation> {
        match self.sources.get(&source) {
            Some(existing) if existing.id != id => {
                Err(ContractViolation::SourceMismatch { source_id: source })
            }
            Some(_) => Ok(()),
            None => {
                self.sources.insert(source, SourceBuffer { id, tokens });
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, kind: ObjectKind, name: &str) -> Option<&SchemaObject> {
        self.objects.get(&ObjectKey::new(kind, name))
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &SchemaObject> {
        self.objects.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Registered sources in registration order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceId> {
        self.sources.keys()
    }

    #[must_use]
    pub fn tokens(&self, source: &SourceId) -> Option<&[Token]> {
        self.sources.get(source).map(|buffer| buffer.tokens.as_slice())
    }

    /// Serializes a source buffer back to text.
    #[must_use]
    pub fn render_source(&self, source: &SourceId) -> Option<String> {
        self.tokens(source).map(render_tokens)
    }

    /// The tokens of an object's definition.
    pub fn object_tokens(
        &self,
        object: &SchemaObject,
    ) -> std::result::Result<&[Token], ContractViolation> {
        let buffer = self
            .sources
            .get(&object.source)
            .ok_or_else(|| ContractViolation::UnknownSource {
                source_id: object.source.clone(),
            })?;
        if buffer.id != object.buffer {
            return Err(ContractViolation::SourceMismatch {
                source_id: object.source.clone(),
            });
        }
        let range = object.range();
        buffer
            .tokens
            .get(range.clone())
            .ok_or_else(|| ContractViolation::SourceMismatch {
                source_id: object.source.clone(),
            })
    }

    /// Sources modified by the last reconciliation and not yet taken.
    #[must_use]
    pub fn changed_sources(&self) -> Vec<&SourceId> {
        self.changed_sources.iter().collect()
    }

    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.changed_sources.is_empty()
    }

    /// Drains the changed-source set, allowing the schema to be reconciled
    /// again.
    pub fn take_changed_sources(&mut self) -> Vec<SourceId> {
        self.changed_sources.drain(..).collect()
    }
}
