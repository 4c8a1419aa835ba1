//! Paginated and filtered views over the catalog.

use crate::BookRecord;
use serde::{Deserialize, Serialize};

/// Number of books shown per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 3;

/// Position of the current page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    /// Zero-based page index
    pub page: usize,
    /// Books per page, at least one
    pub page_size: usize,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    /// Number of pages needed for `total` books. An empty catalog has one
    /// (empty) page.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Advance if another page exists. Returns whether the cursor moved.
    pub fn next(&mut self, total: usize) -> bool {
        if (self.page + 1) * self.page_size < total {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page if possible. Returns whether the cursor moved.
    pub fn prev(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `page` if it exists for `total` books. Returns whether it did.
    pub fn seek(&mut self, page: usize, total: usize) -> bool {
        if page < self.page_count(total) {
            self.page = page;
            true
        } else {
            false
        }
    }

    /// Pull the cursor back onto the last page after the catalog shrank.
    pub fn clamp(&mut self, total: usize) {
        self.page = self.page.min(self.page_count(total) - 1);
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }
}

/// A materialized window of the catalog, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Books in display order
    pub items: Vec<BookRecord>,
    /// Zero-based page index (always 0 for search results)
    pub page: usize,
    /// Total number of pages
    pub page_count: usize,
    /// Number of books matching before slicing
    pub total: usize,
    /// Search term that produced this listing, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count
    }
}

/// Slice the page the cursor points at.
pub fn paginate(books: &[BookRecord], cursor: &PageCursor) -> Listing {
    let start = (cursor.page * cursor.page_size).min(books.len());
    let end = (start + cursor.page_size).min(books.len());

    Listing {
        items: books[start..end].to_vec(),
        page: cursor.page,
        page_count: cursor.page_count(books.len()),
        total: books.len(),
        query: None,
    }
}

/// Books whose title contains `term`, ignoring case. Only the first `limit`
/// matches are returned; `total` counts all of them.
pub fn search(books: &[BookRecord], term: &str, limit: usize) -> Listing {
    let needle = term.trim().to_lowercase();
    let matches: Vec<&BookRecord> = books
        .iter()
        .filter(|b| b.title.to_lowercase().contains(&needle))
        .collect();

    Listing {
        items: matches.iter().take(limit).map(|b| (*b).clone()).collect(),
        page: 0,
        page_count: 1,
        total: matches.len(),
        query: Some(term.trim().to_string()),
    }
}
