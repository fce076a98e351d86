//! Document Index: per-document declaration tables.
//!
//! Each document gets one [`DocumentSlot`] holding its last successfully
//! parsed tree and three lookup tables. A slot is replaced wholesale on every
//! successful parse and left untouched when parsing fails, so lookups keep
//! answering from the last good version of a document while it is being
//! edited into shape.

use std::collections::BTreeMap;
use std::sync::Arc;

use querynav_syntax::LineIndex;
use querynav_types::{FileUri, Location, OffsetRange};

use crate::engine::LanguageEngine;

/// The kind of name a token is tried as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenClass {
    /// Type-like declarations (object/interface/input/enum/union/scalar, SQL relations)
    Type,
    /// Fragments, or named SQL routines and objects
    Fragment,
    /// Members qualified by their owning type
    Field,
}

impl TokenClass {
    /// Resolution priority: a name that is both a type and a fragment is a type.
    pub const ORDER: [Self; 3] = [Self::Type, Self::Fragment, Self::Field];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Fragment => "fragment",
            Self::Field => "field",
        }
    }
}

/// A declared name, where it lives, and its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Name as written; fields are `Type.field`
    pub name: String,
    pub location: Location,
    pub offsets: OffsetRange,
}

/// The three lookup tables of one document, keyed by normalized name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationTables {
    types: BTreeMap<String, Declaration>,
    fragments: BTreeMap<String, Declaration>,
    fields: BTreeMap<String, Declaration>,
}

impl DeclarationTables {
    #[must_use]
    pub fn table(&self, class: TokenClass) -> &BTreeMap<String, Declaration> {
        match class {
            TokenClass::Type => &self.types,
            TokenClass::Fragment => &self.fragments,
            TokenClass::Field => &self.fields,
        }
    }

    fn table_mut(&mut self, class: TokenClass) -> &mut BTreeMap<String, Declaration> {
        match class {
            TokenClass::Type => &mut self.types,
            TokenClass::Fragment => &mut self.fragments,
            TokenClass::Field => &mut self.fields,
        }
    }

    #[must_use]
    pub fn lookup(&self, class: TokenClass, key: &str) -> Option<&Declaration> {
        self.table(class).get(key)
    }

    #[must_use]
    pub fn lookup_type(&self, key: &str) -> Option<&Declaration> {
        self.lookup(TokenClass::Type, key)
    }

    #[must_use]
    pub fn lookup_fragment(&self, key: &str) -> Option<&Declaration> {
        self.lookup(TokenClass::Fragment, key)
    }

    /// Look up a qualified `Type.field` key.
    #[must_use]
    pub fn lookup_field(&self, key: &str) -> Option<&Declaration> {
        self.lookup(TokenClass::Field, key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len() + self.fragments.len() + self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a declaration, returning the one it replaced.
    fn insert(&mut self, class: TokenClass, key: String, declaration: Declaration) -> Option<Declaration> {
        self.table_mut(class).insert(key, declaration)
    }
}

/// Everything the index keeps for one document.
#[derive(Debug)]
pub struct DocumentSlot<T> {
    pub tree: Arc<T>,
    pub line_index: Arc<LineIndex>,
    pub tables: DeclarationTables,
}

impl<T> DocumentSlot<T> {
    /// Extract declarations from a parsed tree in one pass.
    pub fn build<E>(engine: &E, file: &FileUri, text: &str, tree: T) -> Self
    where
        E: LanguageEngine<Tree = T>,
    {
        let line_index = LineIndex::new(text);
        let mut tables = DeclarationTables::default();

        for site in engine.extract_declarations(&tree) {
            let key = engine.normalize_name(&site.name).into_owned();
            let declaration = Declaration {
                location: Location::new(file.clone(), line_index.offset_range_to_range(site.range)),
                offsets: site.range,
                name: site.name,
            };
            if let Some(previous) = tables.insert(site.class, key, declaration) {
                tracing::debug!(
                    file = %file,
                    class = site.class.as_str(),
                    name = %previous.name,
                    "Duplicate declaration, keeping the last one"
                );
            }
        }

        Self {
            tree: Arc::new(tree),
            line_index: Arc::new(line_index),
            tables,
        }
    }
}

/// Document identifier to slot, for one language engine.
///
/// Cloning is cheap: slots are shared behind `Arc`s and only the map itself
/// is copied when a snapshot is mutated.
#[derive(Debug)]
pub struct DocumentIndex<T> {
    slots: BTreeMap<FileUri, Arc<DocumentSlot<T>>>,
}

impl<T> Default for DocumentIndex<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T> Clone for DocumentIndex<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<T> DocumentIndex<T> {
    /// Re-parse `text` and replace the slot for `file`.
    ///
    /// Returns `false` if the text did not parse; the previous slot, if any,
    /// is kept unchanged.
    pub fn update<E>(&mut self, engine: &E, file: &FileUri, text: &str) -> bool
    where
        E: LanguageEngine<Tree = T>,
    {
        let tree = match engine.parse(text) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(
                    file = %file,
                    language = engine.language().as_str(),
                    error = %e,
                    "Parse failed, keeping previous declarations"
                );
                return false;
            }
        };

        let slot = DocumentSlot::build(engine, file, text, tree);
        tracing::debug!(file = %file, declarations = slot.tables.len(), "Indexed document");
        self.slots.insert(file.clone(), Arc::new(slot));
        true
    }

    #[must_use]
    pub fn slot(&self, file: &FileUri) -> Option<&Arc<DocumentSlot<T>>> {
        self.slots.get(file)
    }

    /// Every slot, ordered by document identifier.
    pub fn slots(&self) -> impl Iterator<Item = (&FileUri, &Arc<DocumentSlot<T>>)> {
        self.slots.iter()
    }

    #[must_use]
    pub fn contains(&self, file: &FileUri) -> bool {
        self.slots.contains_key(file)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
