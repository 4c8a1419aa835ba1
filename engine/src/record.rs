//! Record types for the catalog.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Genre assigned to a record when none is given.
pub const DEFAULT_GENRE: &str = "Other";

/// Identifier of a book.
///
/// Seed items and server-assigned ids are numeric; ids synthesized on the
/// client may be arbitrary text. Both forms round-trip through JSON as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookId {
    Num(u64),
    Text(String),
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookId::Num(n) => write!(f, "{n}"),
            BookId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for BookId {
    fn from(n: u64) -> Self {
        BookId::Num(n)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        BookId::Text(s.to_string())
    }
}

impl From<String> for BookId {
    fn from(s: String) -> Self {
        BookId::Text(s)
    }
}

impl FromStr for BookId {
    type Err = std::convert::Infallible;

    /// Digits parse as a numeric id, anything else is kept as text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<u64>()
            .map(BookId::Num)
            .unwrap_or_else(|_| BookId::Text(s.to_string())))
    }
}

fn default_genre() -> String {
    DEFAULT_GENRE.to_string()
}

fn genre_or_default(genre: Option<String>) -> String {
    match genre {
        Some(g) if !g.trim().is_empty() => g,
        _ => default_genre(),
    }
}

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    /// Unique identifier
    pub id: BookId,
    /// Title, at least three characters once validated
    pub title: String,
    /// Author, possibly empty depending on the validation policy
    #[serde(default)]
    pub author: String,
    /// Publication year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Genre, never empty
    #[serde(default = "default_genre")]
    pub genre: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BookRecord {
    /// Create a record with only the required fields set.
    pub fn new(id: impl Into<BookId>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            year: None,
            genre: default_genre(),
            description: None,
        }
    }

    /// Builder-style year setter.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Builder-style genre setter.
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre_or_default(Some(genre.into()));
        self
    }

    /// Builder-style description setter.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A book that has not been assigned an id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BookDraft {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Turn the draft into a record with the given id, defaulting the genre.
    pub fn into_record(self, id: BookId) -> BookRecord {
        BookRecord {
            id,
            title: self.title,
            author: self.author,
            year: self.year,
            genre: genre_or_default(self.genre),
            description: self.description,
        }
    }
}

/// A partial update to a book.
///
/// `None` leaves a field untouched. For the optional fields `year` and
/// `description`, `Some(None)` clears the value and serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub year: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub description: Option<Option<String>>,
}

/// Maps a present field (including `null`) to `Some`, so that a missing field
/// and an explicit `null` stay distinguishable.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BookChanges {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = Some(year);
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// True if no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.year.is_none()
            && self.genre.is_none()
            && self.description.is_none()
    }

    /// Merge these changes into a record. Absent fields are preserved.
    pub fn apply_to(&self, record: &mut BookRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(author) = &self.author {
            record.author = author.clone();
        }
        if let Some(year) = self.year {
            record.year = year;
        }
        if let Some(genre) = &self.genre {
            record.genre = genre_or_default(Some(genre.clone()));
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
    }
}

impl From<BookDraft> for BookChanges {
    /// A full form submission expressed as changes: every field is present.
    fn from(draft: BookDraft) -> Self {
        Self {
            title: Some(draft.title),
            author: Some(draft.author),
            year: Some(draft.year),
            genre: Some(genre_or_default(draft.genre)),
            description: Some(draft.description),
        }
    }
}
