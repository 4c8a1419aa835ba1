//! Store - the in-memory catalog state machine.
//!
//! The store owns the canonical, most-recent-first list of books together
//! with the page cursor and edit target. Mutations are split in two: a
//! synchronous `begin_*` call applies the change optimistically and returns a
//! [`Pending`] ticket, and a later [`CatalogStore::commit`] or
//! [`CatalogStore::rollback`] settles it once the remote mirror has answered.
//!
//! A record with an unsettled mutation is in flight; further updates or
//! deletes of that record are rejected until the ticket is settled.

use crate::{
    error::Result,
    mutation::{Mutation, MutationKind, Outcome, Pending, Reconciliation, Ticket},
    snapshot::CatalogSnapshot,
    validate::{ValidationPolicy, Validator},
    view::{self, Listing, PageCursor},
    BookChanges, BookDraft, BookId, BookRecord, Error, IdGenerator,
};
use std::collections::BTreeMap;

/// How many times a colliding id is redrawn before giving up.
pub const MAX_ID_ATTEMPTS: usize = 16;

/// How to undo a single mutation without touching the rest of the catalog.
#[derive(Debug, Clone)]
enum Undo {
    /// Drop the record that was optimistically created.
    Remove(BookId),
    /// Put back the record as it was before an update.
    Restore(BookRecord),
    /// Re-insert a deleted record under its former order key.
    Reinsert { rank: u64, record: BookRecord },
}

/// Bookkeeping for a mutation whose remote outcome is not known yet.
#[derive(Debug, Clone)]
struct InFlight {
    kind: MutationKind,
    id: BookId,
    snapshot: CatalogSnapshot,
    /// Order keys matching `snapshot`
    ranks: Vec<u64>,
    undo: Undo,
    /// Whether the record was loaded into the edit form when the mutation began
    was_edit_target: bool,
    /// Catalog revision right after the optimistic apply
    applied_revision: u64,
}

/// The catalog state store.
#[derive(Debug, Clone)]
pub struct CatalogStore<V = ValidationPolicy> {
    /// Books, most recent first
    books: Vec<BookRecord>,
    /// Order key of each book, parallel to `books` and strictly descending
    ranks: Vec<u64>,
    next_rank: u64,
    /// Field rules checked before every create or update
    validator: V,
    /// Current page window
    cursor: PageCursor,
    /// Record loaded into the edit form, if any
    edit_target: Option<BookId>,
    /// Unsettled mutations by ticket
    in_flight: BTreeMap<Ticket, InFlight>,
    next_ticket: Ticket,
    /// Bumped on every change to `books`
    revision: u64,
}

impl Default for CatalogStore<ValidationPolicy> {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}

impl<V: Validator> CatalogStore<V> {
    /// Create an empty store.
    pub fn new(validator: V) -> Self {
        Self {
            books: Vec::new(),
            ranks: Vec::new(),
            next_rank: 1,
            validator,
            cursor: PageCursor::default(),
            edit_target: None,
            in_flight: BTreeMap::new(),
            next_ticket: 1,
            revision: 0,
        }
    }

    /// Builder-style page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.cursor = PageCursor::new(page_size);
        self
    }

    /// All books, most recent first.
    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    /// Get a book by id.
    pub fn get(&self, id: &BookId) -> Option<&BookRecord> {
        self.books.iter().find(|b| &b.id == id)
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Counter that changes whenever the book list changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Copy of the current book list.
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::capture(&self.books)
    }

    /// Replace the whole catalog, as done on bootstrap and refresh.
    ///
    /// Refused while any mutation is in flight, since settling it afterwards
    /// would resurrect or clobber records from the old catalog.
    pub fn replace_all(&mut self, books: Vec<BookRecord>) -> Result<()> {
        if !self.in_flight.is_empty() {
            return Err(Error::Busy(self.in_flight.len()));
        }
        let snapshot = CatalogSnapshot::new(books)?;
        self.books = snapshot.into_books();
        let count = self.books.len() as u64;
        self.ranks = (1..=count).rev().collect();
        self.next_rank = count + 1;
        self.cursor.reset();
        self.edit_target = None;
        self.touch();
        Ok(())
    }

    /// Optimistically prepend a new book.
    ///
    /// The draft is validated first; on failure nothing changes. The id comes
    /// from `ids` and is redrawn if it is already taken.
    pub fn begin_create(
        &mut self,
        draft: BookDraft,
        ids: &mut dyn IdGenerator,
    ) -> Result<Pending> {
        let id = self.fresh_id(ids)?;
        let record = draft.into_record(id.clone());
        self.validator.validate(&record)?;

        let restore_point = (self.snapshot(), self.ranks.clone());
        self.books.insert(0, record.clone());
        self.ranks.insert(0, self.next_rank);
        self.next_rank += 1;
        self.touch();

        let ticket = self.track(
            MutationKind::Create,
            id.clone(),
            restore_point,
            Undo::Remove(id),
        );
        Ok(Pending {
            ticket,
            mutation: Mutation::Create { record },
        })
    }

    /// Optimistically merge `changes` into the book with `id`.
    ///
    /// Returns `Ok(None)` without touching anything if no such book exists.
    /// A book with an unsettled mutation is rejected even if that mutation
    /// removed it.
    pub fn begin_update(&mut self, id: &BookId, changes: BookChanges) -> Result<Option<Pending>> {
        self.ensure_idle(id)?;
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let previous = self.books[index].clone();
        let mut updated = previous.clone();
        changes.apply_to(&mut updated);
        self.validator.validate(&updated)?;

        let restore_point = (self.snapshot(), self.ranks.clone());
        self.books[index] = updated;
        self.touch();

        let ticket = self.track(
            MutationKind::Update,
            id.clone(),
            restore_point,
            Undo::Restore(previous),
        );
        Ok(Some(Pending {
            ticket,
            mutation: Mutation::Update {
                id: id.clone(),
                changes,
            },
        }))
    }

    /// Optimistically remove the book with `id`.
    ///
    /// Returns `Ok(None)` without touching anything if no such book exists.
    pub fn begin_delete(&mut self, id: &BookId) -> Result<Option<Pending>> {
        self.ensure_idle(id)?;
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let restore_point = (self.snapshot(), self.ranks.clone());
        let record = self.books.remove(index);
        let rank = self.ranks.remove(index);
        self.cursor.clamp(self.books.len());
        self.touch();

        let ticket = self.track(
            MutationKind::Delete,
            id.clone(),
            restore_point,
            Undo::Reinsert { rank, record },
        );
        // Given back by `rollback` if the remote refuses the delete.
        if self.edit_target.as_ref() == Some(id) {
            self.edit_target = None;
        }
        Ok(Some(Pending {
            ticket,
            mutation: Mutation::Delete { id: id.clone() },
        }))
    }

    /// Settle a mutation the remote acknowledged.
    ///
    /// For creates, a `server_id` different from the provisional id replaces
    /// it in place, unless another record already uses that id.
    pub fn commit(&mut self, ticket: Ticket, server_id: Option<BookId>) -> Result<Outcome> {
        let entry = self
            .in_flight
            .remove(&ticket)
            .ok_or(Error::UnknownTicket(ticket))?;

        let mut id = entry.id;
        let mut reconciliation = None;

        if entry.kind == MutationKind::Create {
            if let Some(server_id) = server_id.filter(|s| s != &id) {
                if self.contains(&server_id) || self.is_in_flight(&server_id) {
                    reconciliation = Some(Reconciliation::Conflict { server_id });
                } else if let Some(index) = self.position(&id) {
                    self.books[index].id = server_id.clone();
                    if self.edit_target.as_ref() == Some(&id) {
                        self.edit_target = Some(server_id.clone());
                    }
                    self.touch();
                    let provisional = std::mem::replace(&mut id, server_id);
                    reconciliation = Some(Reconciliation::Replaced { provisional });
                }
            }
        }

        Ok(Outcome::Committed {
            kind: entry.kind,
            id,
            reconciliation,
        })
    }

    /// Settle a mutation the remote rejected, restoring the pre-mutation state.
    ///
    /// If nothing else changed the catalog since the optimistic apply, the
    /// full snapshot is restored. Otherwise only this mutation's own record is
    /// reverted, so interleaved changes to other records survive. A deleted
    /// record goes back between the same neighbours it had before, whatever
    /// was created or deleted in the meantime.
    ///
    /// A rolled-back delete of the book in the edit form makes it the edit
    /// target again; a rolled-back create stops being one.
    pub fn rollback(&mut self, ticket: Ticket) -> Result<Outcome> {
        let entry = self
            .in_flight
            .remove(&ticket)
            .ok_or(Error::UnknownTicket(ticket))?;

        if self.revision == entry.applied_revision {
            self.books = entry.snapshot.into_books();
            self.ranks = entry.ranks;
        } else {
            self.undo(entry.undo);
        }

        match entry.kind {
            MutationKind::Create if self.edit_target.as_ref() == Some(&entry.id) => {
                self.edit_target = None;
            }
            MutationKind::Delete if entry.was_edit_target && self.edit_target.is_none() => {
                self.edit_target = Some(entry.id.clone());
            }
            _ => {}
        }
        self.cursor.clamp(self.books.len());
        self.touch();

        Ok(Outcome::RolledBack {
            kind: entry.kind,
            id: entry.id,
        })
    }

    /// Whether a mutation on `id` is awaiting its remote outcome.
    pub fn is_in_flight(&self, id: &BookId) -> bool {
        self.in_flight.values().any(|e| &e.id == id)
    }

    /// Number of unsettled mutations.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// The current page cursor.
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Materialize the page the cursor points at.
    pub fn page(&self) -> Listing {
        view::paginate(&self.books, &self.cursor)
    }

    /// Move to the next page. Returns whether the cursor moved.
    pub fn next_page(&mut self) -> bool {
        self.cursor.next(self.books.len())
    }

    /// Move to the previous page. Returns whether the cursor moved.
    pub fn prev_page(&mut self) -> bool {
        self.cursor.prev()
    }

    /// Jump to the zero-based `page`. Out-of-range pages leave the cursor
    /// where it is and return `false`.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.cursor.seek(page, self.books.len())
    }

    /// Title search limited to one page of results.
    pub fn search(&self, term: &str) -> Listing {
        view::search(&self.books, term, self.cursor.page_size)
    }

    /// Load a book into the edit form. Returns the book, or `None` (and
    /// leaves the target unchanged) if it does not exist.
    pub fn set_edit_target(&mut self, id: &BookId) -> Option<&BookRecord> {
        let index = self.position(id)?;
        self.edit_target = Some(id.clone());
        Some(&self.books[index])
    }

    pub fn clear_edit_target(&mut self) {
        self.edit_target = None;
    }

    pub fn edit_target(&self) -> Option<&BookId> {
        self.edit_target.as_ref()
    }

    fn position(&self, id: &BookId) -> Option<usize> {
        self.books.iter().position(|b| &b.id == id)
    }

    fn ensure_idle(&self, id: &BookId) -> Result<()> {
        if self.is_in_flight(id) {
            Err(Error::MutationInFlight(id.clone()))
        } else {
            Ok(())
        }
    }

    fn fresh_id(&self, ids: &mut dyn IdGenerator) -> Result<BookId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ids.next_id();
            if !self.contains(&id) && !self.is_in_flight(&id) {
                return Ok(id);
            }
        }
        Err(Error::IdExhausted(MAX_ID_ATTEMPTS))
    }

    fn track(
        &mut self,
        kind: MutationKind,
        id: BookId,
        (snapshot, ranks): (CatalogSnapshot, Vec<u64>),
        undo: Undo,
    ) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let was_edit_target = self.edit_target.as_ref() == Some(&id);
        self.in_flight.insert(
            ticket,
            InFlight {
                kind,
                id,
                snapshot,
                ranks,
                undo,
                was_edit_target,
                applied_revision: self.revision,
            },
        );
        ticket
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Remove(id) => {
                if let Some(index) = self.position(&id) {
                    self.books.remove(index);
                    self.ranks.remove(index);
                }
            }
            Undo::Restore(previous) => {
                if let Some(index) = self.position(&previous.id) {
                    self.books[index] = previous;
                }
            }
            Undo::Reinsert { rank, record } => {
                if !self.contains(&record.id) {
                    let index = self.ranks.partition_point(|r| *r > rank);
                    self.books.insert(index, record);
                    self.ranks.insert(index, rank);
                }
            }
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
