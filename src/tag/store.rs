//! Tag stores and scoped open-document guards
//!
//! A store hands out [`OpenTag`] guards. While a guard is alive the document
//! is registered as open; dropping the guard releases it on every exit path.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use super::document::{TagDocument, TagReference};
use crate::error::{Error, Result};

/// Registry of documents currently held open
#[derive(Debug, Default)]
pub struct OpenTags {
    keys: RefCell<HashSet<String>>,
}

impl OpenTags {
    fn acquire(&self, reference: &TagReference) -> Result<String> {
        let key = reference.key();
        if !self.keys.borrow_mut().insert(key.clone()) {
            return Err(Error::DocumentLocked(reference.to_string()));
        }
        Ok(key)
    }

    fn release(&self, key: &str) {
        self.keys.borrow_mut().remove(key);
    }

    pub fn is_open(&self, reference: &TagReference) -> bool {
        self.keys.borrow().contains(&reference.key())
    }

    pub fn count(&self) -> usize {
        self.keys.borrow().len()
    }
}

/// Backing storage for tag documents
pub trait TagStore {
    fn exists(&self, reference: &TagReference) -> bool;

    /// Read a document without registering it as open
    fn load(&self, reference: &TagReference) -> Result<TagDocument>;

    /// Persist a document
    fn store(&self, document: &TagDocument) -> Result<()>;

    fn open_tags(&self) -> &OpenTags;

    /// Open a document for the lifetime of the returned guard
    fn open(&self, reference: &TagReference) -> Result<OpenTag<'_, Self>>
    where
        Self: Sized,
    {
        if !self.exists(reference) {
            return Err(Error::DocumentNotFound(reference.to_string()));
        }
        let key = self.open_tags().acquire(reference)?;
        match self.load(reference) {
            Ok(document) => Ok(OpenTag {
                store: self,
                key,
                document,
            }),
            Err(e) => {
                self.open_tags().release(&key);
                Err(e)
            }
        }
    }
}

/// An open document; released when dropped
pub struct OpenTag<'s, S: TagStore> {
    store: &'s S,
    key: String,
    document: TagDocument,
}

impl<'s, S: TagStore> OpenTag<'s, S> {
    pub fn save(&self) -> Result<()> {
        tracing::debug!("Saving {}", self.document.reference);
        self.store.store(&self.document)
    }
}

impl<S: TagStore> Deref for OpenTag<'_, S> {
    type Target = TagDocument;

    fn deref(&self) -> &TagDocument {
        &self.document
    }
}

impl<S: TagStore> DerefMut for OpenTag<'_, S> {
    fn deref_mut(&mut self) -> &mut TagDocument {
        &mut self.document
    }
}

impl<S: TagStore> Drop for OpenTag<'_, S> {
    fn drop(&mut self) {
        self.store.open_tags().release(&self.key);
    }
}

/// Store keeping documents in memory
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    documents: RefCell<HashMap<String, TagDocument>>,
    open: OpenTags,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: TagDocument) {
        self.documents
            .borrow_mut()
            .insert(document.reference.key(), document);
    }

    /// Snapshot of a stored document
    pub fn get(&self, reference: &TagReference) -> Option<TagDocument> {
        self.documents.borrow().get(&reference.key()).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.borrow().is_empty()
    }
}

impl TagStore for MemoryTagStore {
    fn exists(&self, reference: &TagReference) -> bool {
        self.documents.borrow().contains_key(&reference.key())
    }

    fn load(&self, reference: &TagReference) -> Result<TagDocument> {
        self.get(reference)
            .ok_or_else(|| Error::DocumentNotFound(reference.to_string()))
    }

    fn store(&self, document: &TagDocument) -> Result<()> {
        self.insert(document.clone());
        Ok(())
    }

    fn open_tags(&self) -> &OpenTags {
        &self.open
    }
}

/// Store keeping each document as a JSON file under a tags directory
///
/// `objects\scenery\tree\tree` of group `scenery` lives at
/// `<root>/objects/scenery/tree/tree.scenery.json`.
#[derive(Debug)]
pub struct FileTagStore {
    root: PathBuf,
    open: OpenTags,
}

impl FileTagStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: OpenTags::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, reference: &TagReference) -> PathBuf {
        let mut path = self.root.clone();
        for part in reference.path.split(['\\', '/']).filter(|p| !matches!(*p, "" | "." | "..")) {
            path.push(part);
        }
        let file_name = format!(
            "{}.{}.json",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            reference.group
        );
        path.set_file_name(file_name);
        path
    }
}

impl TagStore for FileTagStore {
    fn exists(&self, reference: &TagReference) -> bool {
        self.path_for(reference).is_file()
    }

    fn load(&self, reference: &TagReference) -> Result<TagDocument> {
        let path = self.path_for(reference);
        let text = fs::read_to_string(&path)?;
        let document: TagDocument = serde_json::from_str(&text)?;
        Ok(document)
    }

    fn store(&self, document: &TagDocument) -> Result<()> {
        let path = self.path_for(&document.reference);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(document)?)?;
        Ok(())
    }

    fn open_tags(&self) -> &OpenTags {
        &self.open
    }
}
