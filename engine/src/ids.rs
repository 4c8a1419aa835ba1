//! Id generation for locally created records.
//!
//! The store never invents ids itself; it asks an injected [`IdGenerator`].
//! Ids drawn here are provisional until the remote mirror acknowledges the
//! create, at which point the store may swap in a server-assigned id.

use crate::BookId;

/// Produces ids for newly created records.
pub trait IdGenerator: Send {
    /// Draw the next id. Collisions must be improbable; the store redraws
    /// if one happens anyway.
    fn next_id(&mut self) -> BookId;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> BookId + Send,
{
    fn next_id(&mut self) -> BookId {
        self()
    }
}

/// Deterministic ids: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug, Clone)]
pub struct SequenceIds {
    prefix: String,
    counter: u64,
}

impl SequenceIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl Default for SequenceIds {
    fn default() -> Self {
        Self::new("local")
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&mut self) -> BookId {
        self.counter += 1;
        BookId::Text(format!("{}-{}", self.prefix, self.counter))
    }
}
