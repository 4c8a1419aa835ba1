//! Mapping of placeholder seed items into catalog records.

use crate::{BookId, BookRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How many seed items become books on bootstrap.
pub const DEFAULT_SEED_LIMIT: usize = 12;

/// Author given to every seeded book.
pub const SEED_AUTHOR: &str = "Unknown author";

/// A generic `{id, title, body}` item as served by the placeholder API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl From<SeedItem> for BookRecord {
    fn from(item: SeedItem) -> Self {
        let record = BookRecord::new(BookId::Num(item.id), item.title, SEED_AUTHOR);
        if item.body.is_empty() {
            record
        } else {
            record.with_description(item.body)
        }
    }
}

/// Map the first `limit` seed items into records. Items repeating an earlier
/// id are skipped.
pub fn seed_books(items: Vec<SeedItem>, limit: usize) -> Vec<BookRecord> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id))
        .take(limit)
        .map(BookRecord::from)
        .collect()
}
