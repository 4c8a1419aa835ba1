//! Catalog Service - drives the store through the optimistic protocol.
//!
//! Every mutation runs in two steps. Under the store lock the change is
//! applied, persisted and published. The lock is then released while the
//! remote mirror is awaited, and re-taken to commit or roll back. Other
//! intents proceed while a mirror call is outstanding.

use crate::{
    config::Config,
    error::{MirrorError, Result},
    local::{FileStore, LocalStore},
    remote::{Ack, HttpMirror, RemoteMirror},
};
use shelf_engine::{
    seed_books, BookChanges, BookDraft, BookId, BookRecord, CatalogSnapshot, CatalogStore,
    IdGenerator, Listing, Mutation, Outcome, Pending, Reconciliation, DEFAULT_SEED_LIMIT,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// How the catalog was populated on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Loaded from the local slot
    Restored(usize),
    /// Seeded from the remote
    Seeded(usize),
    /// The local slot was empty and the seed could not be fetched
    Unavailable(String),
}

struct State {
    store: CatalogStore,
    ids: Box<dyn IdGenerator>,
}

/// The single owner of catalog state.
pub struct CatalogService {
    state: Mutex<State>,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteMirror>,
    seed_limit: usize,
    updates: watch::Sender<Listing>,
}

impl CatalogService {
    pub fn new(
        store: CatalogStore,
        ids: Box<dyn IdGenerator>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteMirror>,
    ) -> Self {
        let (updates, _) = watch::channel(store.page());
        Self {
            state: Mutex::new(State { store, ids }),
            local,
            remote,
            seed_limit: DEFAULT_SEED_LIMIT,
            updates,
        }
    }

    /// A service over the file slot and HTTP mirror named by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = CatalogStore::new(config.policy.clone()).with_page_size(config.page_size);
        let local = FileStore::new(&config.data_dir, &config.store_key);
        let remote = HttpMirror::new(config.api_url.clone(), config.http_timeout)?;

        tracing::debug!(
            slot = %local.path().display(),
            api_url = %remote.base_url(),
            "Catalog service configured"
        );

        Ok(Self::new(
            store,
            config.id_policy.generator(),
            Arc::new(local),
            Arc::new(remote),
        )
        .with_seed_limit(config.seed_limit))
    }

    /// Builder-style seed limit.
    pub fn with_seed_limit(mut self, seed_limit: usize) -> Self {
        self.seed_limit = seed_limit;
        self
    }

    /// Receive the current page after every change.
    pub fn subscribe(&self) -> watch::Receiver<Listing> {
        self.updates.subscribe()
    }

    /// Populate the catalog from the local slot, or from the remote seed if
    /// the slot is empty.
    pub async fn initialize(&self) -> Result<Bootstrap> {
        if let Some(books) = self.local.load().filter(|books| !books.is_empty()) {
            let mut state = self.state.lock().await;
            let count = books.len();
            state.store.replace_all(books)?;
            self.publish(&state.store);
            tracing::info!(books = count, "Restored catalog from local store");
            return Ok(Bootstrap::Restored(count));
        }

        match self.remote.fetch_seed().await {
            Ok(items) => {
                let mut state = self.state.lock().await;
                state.store.replace_all(seed_books(items, self.seed_limit))?;
                self.persist(&state.store);
                self.publish(&state.store);
                tracing::info!(books = state.store.len(), "Seeded catalog from remote");
                Ok(Bootstrap::Seeded(state.store.len()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch seed; starting empty");
                Ok(Bootstrap::Unavailable(e.to_string()))
            }
        }
    }

    /// Replace the catalog with a fresh seed. Refused while any mutation is
    /// in flight; on a fetch failure the catalog is left as it was.
    pub async fn refresh(&self) -> Result<usize> {
        {
            let state = self.state.lock().await;
            let in_flight = state.store.in_flight_count();
            if in_flight > 0 {
                return Err(shelf_engine::Error::Busy(in_flight).into());
            }
        }

        let items = self.remote.fetch_seed().await?;

        let mut state = self.state.lock().await;
        state.store.replace_all(seed_books(items, self.seed_limit))?;
        self.persist(&state.store);
        self.publish(&state.store);
        tracing::info!(books = state.store.len(), "Refreshed catalog from remote");
        Ok(state.store.len())
    }

    /// Create a book, then mirror it.
    pub async fn create(&self, draft: BookDraft) -> Result<Outcome> {
        let pending = {
            let mut state = self.state.lock().await;
            let State { store, ids } = &mut *state;
            let pending = store.begin_create(draft, ids.as_mut())?;
            self.applied(store, &pending);
            pending
        };
        self.settle(pending).await
    }

    /// Merge changes into a book, then mirror them. Unknown ids are a no-op.
    pub async fn update(&self, id: &BookId, changes: BookChanges) -> Result<Outcome> {
        let pending = {
            let mut state = self.state.lock().await;
            let Some(pending) = state.store.begin_update(id, changes)? else {
                tracing::debug!(%id, "Update of unknown book ignored");
                return Ok(Outcome::NoOp);
            };
            self.applied(&state.store, &pending);
            pending
        };
        self.settle(pending).await
    }

    /// Remove a book, then mirror the removal. Unknown ids are a no-op.
    pub async fn delete(&self, id: &BookId) -> Result<Outcome> {
        let pending = {
            let mut state = self.state.lock().await;
            let Some(pending) = state.store.begin_delete(id)? else {
                tracing::debug!(%id, "Delete of unknown book ignored");
                return Ok(Outcome::NoOp);
            };
            self.applied(&state.store, &pending);
            pending
        };
        self.settle(pending).await
    }

    pub async fn books(&self) -> Vec<BookRecord> {
        self.state.lock().await.store.books().to_vec()
    }

    pub async fn get(&self, id: &BookId) -> Option<BookRecord> {
        self.state.lock().await.store.get(id).cloned()
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.state.lock().await.store.snapshot()
    }

    pub async fn is_in_flight(&self, id: &BookId) -> bool {
        self.state.lock().await.store.is_in_flight(id)
    }

    /// The page the cursor points at.
    pub async fn page(&self) -> Listing {
        self.state.lock().await.store.page()
    }

    pub async fn next_page(&self) -> Listing {
        let mut state = self.state.lock().await;
        state.store.next_page();
        self.publish(&state.store);
        state.store.page()
    }

    pub async fn prev_page(&self) -> Listing {
        let mut state = self.state.lock().await;
        state.store.prev_page();
        self.publish(&state.store);
        state.store.page()
    }

    /// Jump to the zero-based `page`, or `None` if the catalog has no such page.
    pub async fn go_to_page(&self, page: usize) -> Option<Listing> {
        let mut state = self.state.lock().await;
        if !state.store.go_to_page(page) {
            return None;
        }
        self.publish(&state.store);
        Some(state.store.page())
    }

    /// Title search; an empty term yields the current page.
    pub async fn search(&self, term: &str) -> Listing {
        let state = self.state.lock().await;
        if term.trim().is_empty() {
            state.store.page()
        } else {
            state.store.search(term)
        }
    }

    /// Load a book into the edit form.
    pub async fn edit(&self, id: &BookId) -> Option<BookRecord> {
        let mut state = self.state.lock().await;
        state.store.set_edit_target(id).cloned()
    }

    pub async fn clear_edit_target(&self) {
        self.state.lock().await.store.clear_edit_target();
    }

    pub async fn edit_target(&self) -> Option<BookId> {
        self.state.lock().await.store.edit_target().cloned()
    }

    async fn mirror(&self, mutation: &Mutation) -> std::result::Result<Ack, MirrorError> {
        match mutation {
            Mutation::Create { record } => self.remote.mirror_create(record).await,
            Mutation::Update { id, changes } => self.remote.mirror_update(id, changes).await,
            Mutation::Delete { id } => self.remote.mirror_delete(id).await,
        }
    }

    async fn settle(&self, pending: Pending) -> Result<Outcome> {
        let result = self.mirror(&pending.mutation).await;

        let mut state = self.state.lock().await;
        let outcome = match result {
            Ok(ack) => state.store.commit(pending.ticket, ack.server_id)?,
            Err(e) => {
                tracing::warn!(
                    kind = %pending.kind(),
                    id = %pending.id(),
                    error = %e,
                    "Remote rejected change; rolling back"
                );
                state.store.rollback(pending.ticket)?
            }
        };

        if let Outcome::Committed {
            id,
            reconciliation: Some(reconciliation),
            ..
        } = &outcome
        {
            match reconciliation {
                Reconciliation::Replaced { provisional } => {
                    tracing::info!(%provisional, server_id = %id, "Adopted server id");
                }
                Reconciliation::Conflict { server_id } => {
                    tracing::warn!(%id, %server_id, "Server id already in use; keeping local id");
                }
            }
        }

        self.persist(&state.store);
        self.publish(&state.store);
        Ok(outcome)
    }

    fn applied(&self, store: &CatalogStore, pending: &Pending) {
        tracing::debug!(
            kind = %pending.kind(),
            id = %pending.id(),
            ticket = pending.ticket,
            "Applied change locally"
        );
        self.persist(store);
        self.publish(store);
    }

    fn persist(&self, store: &CatalogStore) {
        if let Err(e) = self.local.save(store.books()) {
            tracing::error!(error = %e, "Failed to persist catalog");
        }
    }

    fn publish(&self, store: &CatalogStore) {
        self.updates.send_replace(store.page());
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("seed_limit", &self.seed_limit)
            .finish_non_exhaustive()
    }
}
