//! Local Store Adapter - the durable slot mirroring the catalog.
//!
//! A slot holds one JSON array of books. Absent or unreadable content loads
//! as `None`; callers treat that as an empty catalog.

use crate::error::StorageError;
use shelf_engine::{BookRecord, CatalogSnapshot};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

/// A single string-keyed slot holding the persisted catalog.
pub trait LocalStore: Send + Sync {
    /// Read the catalog. Missing or malformed content yields `None`.
    fn load(&self) -> Option<Vec<BookRecord>>;

    /// Overwrite the slot with `books`.
    fn save(&self, books: &[BookRecord]) -> Result<(), StorageError>;
}

fn decode(raw: &str, origin: &str) -> Option<Vec<BookRecord>> {
    match CatalogSnapshot::from_json(raw) {
        Ok(snapshot) => Some(snapshot.into_books()),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Ignoring malformed catalog slot");
            None
        }
    }
}

fn encode(books: &[BookRecord]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(books)?)
}

/// A slot stored as `<dir>/<key>.json`.
///
/// Saves write a temporary sibling first and rename it over the slot, so a
/// reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStore for FileStore {
    fn load(&self) -> Option<Vec<BookRecord>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw, &self.path.display().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read catalog slot");
                None
            }
        }
    }

    fn save(&self, books: &[BookRecord]) -> Result<(), StorageError> {
        let json = encode(books)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), books = books.len(), "Saved catalog");
        Ok(())
    }
}

/// An in-process slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with raw content, valid or not.
    pub fn with_contents(raw: impl Into<String>) -> Self {
        let store = Self::default();
        *store.lock() = Some(raw.into());
        store
    }

    /// Raw slot content.
    pub fn contents(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStore for MemoryStore {
    fn load(&self) -> Option<Vec<BookRecord>> {
        let raw = self.lock().clone()?;
        decode(&raw, "memory")
    }

    fn save(&self, books: &[BookRecord]) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        *self.lock() = Some(encode(books)?);
        Ok(())
    }
}
