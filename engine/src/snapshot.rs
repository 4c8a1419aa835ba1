//! Snapshot of the catalog contents.
//!
//! A snapshot is both the rollback point captured before a mutation and the
//! shape written to the persisted slot: a bare JSON array of books, with no
//! envelope or version field.

use crate::{error::Result, BookId, BookRecord, Error};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An ordered, point-in-time copy of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogSnapshot {
    books: Vec<BookRecord>,
}

impl CatalogSnapshot {
    /// Wrap a list of books, rejecting duplicate ids.
    pub fn new(books: Vec<BookRecord>) -> Result<Self> {
        if let Some(id) = first_duplicate(&books) {
            return Err(Error::InvalidSnapshot(format!("duplicate book id: {id}")));
        }
        Ok(Self { books })
    }

    pub(crate) fn capture(books: &[BookRecord]) -> Self {
        Self {
            books: books.to_vec(),
        }
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn into_books(self) -> Vec<BookRecord> {
        self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from the persisted JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let books: Vec<BookRecord> =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        Self::new(books)
    }
}

fn first_duplicate(books: &[BookRecord]) -> Option<&BookId> {
    let mut seen = HashSet::with_capacity(books.len());
    books.iter().map(|b| &b.id).find(|id| !seen.insert(*id))
}
