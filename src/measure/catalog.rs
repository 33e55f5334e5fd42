//! Corpus-wide catalog of attribute paths
//!
//! The catalog is discovered empirically by walking every document, the same
//! way the measurer walks them. It plays the role of a pre-computed plan: the
//! measurer consults it to report the paths a document lacks.

use crate::document::Document;
use crate::path::AttributePath;
use std::collections::BTreeSet;

/// Distinct attribute paths seen across a corpus, in path order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCatalog {
    paths: BTreeSet<AttributePath>,
}

impl PathCatalog {
    pub fn new() -> Self {
        PathCatalog::default()
    }

    /// Build a catalog from every document of a corpus
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut catalog = PathCatalog::new();
        for document in documents {
            catalog.add_document(document);
        }
        catalog
    }

    /// Union the paths of one more document into the catalog
    pub fn add_document(&mut self, document: &Document) {
        self.visit(document, AttributePath::root());
    }

    fn visit(&mut self, value: &Document, path: AttributePath) {
        match value {
            // Values outside the model have no measurable shape
            Document::Opaque { .. } => return,
            Document::Scalar(_) => {}
            Document::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.visit(item, path.child_index(index));
                }
            }
            Document::Mapping(members) => {
                for (key, member) in members {
                    self.visit(member, path.child_key(key));
                }
            }
        }

        self.paths.insert(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &AttributePath) -> bool {
        self.paths.contains(path)
    }

    /// Depth of a catalogued path, `None` if the corpus never contained it
    pub fn depth_of(&self, path: &AttributePath) -> Option<usize> {
        self.paths.get(path).map(AttributePath::depth)
    }

    /// Catalogued paths paired with their depth
    pub fn iter(&self) -> impl Iterator<Item = (&AttributePath, usize)> + '_ {
        self.paths.iter().map(|path| (path, path.depth()))
    }

    pub fn max_depth(&self) -> usize {
        self.paths.iter().map(AttributePath::depth).max().unwrap_or(0)
    }
}
