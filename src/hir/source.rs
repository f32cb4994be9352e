//! URI ↔ FileId bookkeeping for open documents.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::FileId;

/// Assigns stable `FileId`s to document URIs.
///
/// Ids are handed out monotonically and never reused, even after
/// [`FileSet::remove`].
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    uri_to_id: IndexMap<Arc<str>, FileId>,
    id_to_uri: IndexMap<FileId, Arc<str>>,
    next_id: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the `FileId` for a URI.
    pub fn file_id(&self, uri: &str) -> FileId {
        // Fast path: read lock
        if let Some(&id) = self.inner.read().uri_to_id.get(uri) {
            return id;
        }

        let mut inner = self.inner.write();
        if let Some(&id) = inner.uri_to_id.get(uri) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        let uri: Arc<str> = Arc::from(uri);
        inner.uri_to_id.insert(uri.clone(), id);
        inner.id_to_uri.insert(id, uri);
        id
    }

    pub fn lookup(&self, uri: &str) -> Option<FileId> {
        self.inner.read().uri_to_id.get(uri).copied()
    }

    pub fn uri(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().id_to_uri.get(&file).cloned()
    }

    pub fn remove(&self, file: FileId) -> Option<Arc<str>> {
        let mut inner = self.inner.write();
        let uri = inner.id_to_uri.swap_remove(&file)?;
        inner.uri_to_id.swap_remove(&uri);
        Some(uri)
    }

    /// Forget every URI. Ids keep counting up from where they were.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.uri_to_id.clear();
        inner.id_to_uri.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().uri_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
