//! Page import between lopdf documents
//!
//! A page is copied as its dictionary plus everything reachable from it,
//! except the `/Parent` link which is re-pointed at the output's page tree.
//! Objects already copied for an earlier page are shared, so fonts and
//! images used on every page are written once.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 3] = [b"Resources", b"Rotate", b"CropBox"];

/// Guards against cyclic `/Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Totals for one importer, returned by [`PageImporter::finish`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub pages_imported: usize,
    pub objects_copied: usize,
    pub shared_hits: usize,
    /// Links to pages outside the import that were written as null
    pub dangling_pages: usize,
}

/// Copies pages of one source document into one output document
#[derive(Debug, Default)]
pub struct PageImporter {
    /// Source object id to output object id
    id_map: BTreeMap<ObjectId, ObjectId>,
    /// Output ids handed out for source pages that are referenced but not
    /// yet imported
    reserved_pages: BTreeSet<ObjectId>,
    pending: VecDeque<(ObjectId, ObjectId)>,
    stats: ImportStats,
}

impl PageImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports one page and returns its id in `target`.
    ///
    /// `media_box` replaces the page's own geometry; `parent` becomes its
    /// `/Parent`.
    #[instrument(skip(self, target, source, source_pages, media_box))]
    pub fn import(
        &mut self,
        target: &mut Document,
        source: &Document,
        source_pages: &BTreeSet<ObjectId>,
        page_id: ObjectId,
        parent: ObjectId,
        media_box: Object,
    ) -> Result<ObjectId> {
        let page = source
            .get_dictionary(page_id)
            .map_err(|e| Error::Codec(format!("page {:?} unreadable: {}", page_id, e)))?;

        let new_page_id = match self.id_map.get(&page_id) {
            Some(&reserved) => {
                self.reserved_pages.remove(&reserved);
                reserved
            }
            None => {
                let id = target.new_object_id();
                self.id_map.insert(page_id, id);
                id
            }
        };

        let mut copied = Dictionary::new();
        for (key, value) in page.iter() {
            if key.as_slice() == b"Parent" || key.as_slice() == b"MediaBox" {
                continue;
            }
            copied.set(key.clone(), self.copy_object(target, source_pages, value));
        }

        for key in INHERITABLE {
            if copied.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page_id, key) {
                copied.set(key.to_vec(), self.copy_object(target, source_pages, &value));
            }
        }

        copied.set("Parent", Object::Reference(parent));
        copied.set("MediaBox", media_box);
        target.objects.insert(new_page_id, Object::Dictionary(copied));

        self.drain_pending(target, source, source_pages);
        self.stats.pages_imported += 1;
        debug!(?page_id, ?new_page_id, copied = self.stats.objects_copied, "Page imported");
        Ok(new_page_id)
    }

    /// Nulls out ids reserved for pages that never got imported
    pub fn finish(&mut self, target: &mut Document) -> ImportStats {
        for id in std::mem::take(&mut self.reserved_pages) {
            target.objects.insert(id, Object::Null);
            self.stats.dangling_pages += 1;
        }
        self.stats
    }

    fn drain_pending(&mut self, target: &mut Document, source: &Document, source_pages: &BTreeSet<ObjectId>) {
        while let Some((source_id, target_id)) = self.pending.pop_front() {
            let copied = match source.get_object(source_id) {
                Ok(object) => self.copy_object(target, source_pages, object),
                Err(_) => Object::Null,
            };
            target.objects.insert(target_id, copied);
            self.stats.objects_copied += 1;
        }
    }

    fn map_reference(&mut self, target: &mut Document, source_pages: &BTreeSet<ObjectId>, id: ObjectId) -> ObjectId {
        if let Some(&mapped) = self.id_map.get(&id) {
            self.stats.shared_hits += 1;
            return mapped;
        }

        let mapped = target.new_object_id();
        self.id_map.insert(id, mapped);
        if source_pages.contains(&id) {
            // Links to other pages resolve once those pages are imported
            self.reserved_pages.insert(mapped);
        } else {
            self.pending.push_back((id, mapped));
        }
        mapped
    }

    fn copy_object(&mut self, target: &mut Document, source_pages: &BTreeSet<ObjectId>, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.map_reference(target, source_pages, *id)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(target, source_pages, item))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, source_pages, dict)),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.copy_dictionary(target, source_pages, &stream.dict);
                stream.dict.set("Length", stream.content.len() as i64);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, target: &mut Document, source_pages: &BTreeSet<ObjectId>, dict: &Dictionary) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            copied.set(key.clone(), self.copy_object(target, source_pages, value));
        }
        copied
    }
}

/// Looks up `key` on the page, then on each ancestor
pub fn inherited_attribute(document: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    None
}
