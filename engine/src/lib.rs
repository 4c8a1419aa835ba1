//! # Shelf Engine
//!
//! The optimistic state machine behind the Shelf book catalog.
//!
//! This crate holds the catalog logic: records, validation, id generation,
//! and the two-phase mutation protocol that keeps a local collection
//! responsive while a best-effort remote mirror confirms or rejects each
//! change.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or clocks
//! - **Local first**: The in-memory catalog is the source of truth; the remote
//!   mirror never drives it forward
//! - **Two-phase mutations**: Apply now, settle later
//! - **Testable**: Pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`BookRecord`] has an id, title, author, optional year, genre (defaulting
//! to `"Other"`) and optional description. Ids are numeric for seeded and
//! server-assigned records and free text for client-generated ones.
//!
//! ### Mutations
//!
//! - [`CatalogStore::begin_create`] prepends a [`BookDraft`] under an id drawn
//!   from an [`IdGenerator`]
//! - [`CatalogStore::begin_update`] merges [`BookChanges`] into a record
//! - [`CatalogStore::begin_delete`] removes a record
//!
//! Each returns a [`Pending`] ticket. Once the remote mirror answers, call
//! [`CatalogStore::commit`] (optionally with a server-assigned id, which
//! replaces the provisional one) or [`CatalogStore::rollback`].
//!
//! ## Quick Start
//!
//! ```rust
//! use shelf_engine::{BookDraft, BookId, CatalogStore, SequenceIds};
//!
//! let mut store = CatalogStore::default();
//! let mut ids = SequenceIds::new("tmp");
//!
//! // 1. Apply optimistically
//! let pending = store
//!     .begin_create(BookDraft::new("New Book", "A"), &mut ids)
//!     .unwrap();
//! assert_eq!(store.len(), 1);
//!
//! // 2. The remote accepted it and assigned id 42
//! let outcome = store.commit(pending.ticket, Some(BookId::Num(42))).unwrap();
//! assert!(outcome.is_committed());
//! assert_eq!(store.books()[0].id, BookId::Num(42));
//! ```
//!
//! ## Persistence
//!
//! [`CatalogStore::snapshot`] yields a [`CatalogSnapshot`], whose JSON form is
//! a bare array of books. Writing it anywhere is the caller's job.

pub mod error;
pub mod ids;
pub mod mutation;
pub mod record;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod validate;
pub mod view;

// Re-export main types at crate root
pub use error::Error;
pub use ids::{IdGenerator, SequenceIds};
pub use mutation::{Mutation, MutationKind, Outcome, Pending, Reconciliation, Ticket};
pub use record::{BookChanges, BookDraft, BookId, BookRecord, DEFAULT_GENRE};
pub use seed::{seed_books, SeedItem, DEFAULT_SEED_LIMIT, SEED_AUTHOR};
pub use snapshot::CatalogSnapshot;
pub use store::{CatalogStore, MAX_ID_ATTEMPTS};
pub use validate::{FieldIssue, ValidationPolicy, Validator};
pub use view::{Listing, PageCursor, DEFAULT_PAGE_SIZE};
