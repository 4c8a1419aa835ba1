//! Shared test doubles for the client integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use shelf_client::{Ack, CatalogService, MemoryStore, MirrorError, RemoteMirror};
use shelf_engine::{
    BookChanges, BookId, BookRecord, CatalogStore, SeedItem, SequenceIds, ValidationPolicy,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// A mirror whose answers are scripted by the test.
#[derive(Default)]
pub struct ScriptedMirror {
    seed: Mutex<Option<Vec<SeedItem>>>,
    server_ids: Mutex<VecDeque<BookId>>,
    failing: AtomicBool,
    calls: Mutex<Vec<String>>,
    held_deletes: Option<Arc<Semaphore>>,
}

pub fn seed_items(n: u64) -> Vec<SeedItem> {
    (1..=n)
        .map(|id| SeedItem {
            id,
            title: format!("Seed title {id}"),
            body: format!("Seed body {id}"),
        })
        .collect()
}

impl ScriptedMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(self, items: Vec<SeedItem>) -> Self {
        *self.seed.lock().unwrap() = Some(items);
        self
    }

    /// Deletes wait for a permit on the returned semaphore.
    pub fn with_held_deletes(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.held_deletes = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn queue_server_id(&self, id: impl Into<BookId>) {
        self.server_ids.lock().unwrap().push_back(id.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), MirrorError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            Err(MirrorError::Status {
                status: 500,
                body: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteMirror for ScriptedMirror {
    async fn fetch_seed(&self) -> Result<Vec<SeedItem>, MirrorError> {
        self.calls.lock().unwrap().push("fetch".to_string());
        self.seed
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MirrorError::Decode("no seed scripted".to_string()))
    }

    async fn mirror_create(&self, record: &BookRecord) -> Result<Ack, MirrorError> {
        self.record(format!("create {}", record.id))?;
        Ok(Ack {
            server_id: self.server_ids.lock().unwrap().pop_front(),
        })
    }

    async fn mirror_update(
        &self,
        id: &BookId,
        _changes: &BookChanges,
    ) -> Result<Ack, MirrorError> {
        self.record(format!("update {id}"))?;
        Ok(Ack::default())
    }

    async fn mirror_delete(&self, id: &BookId) -> Result<Ack, MirrorError> {
        if let Some(gate) = &self.held_deletes {
            gate.acquire().await.unwrap().forget();
        }
        self.record(format!("delete {id}"))?;
        Ok(Ack::default())
    }
}

/// Policy accepting one-letter titles and empty authors.
pub fn permissive_policy() -> ValidationPolicy {
    let mut policy = ValidationPolicy::default().lenient_author();
    policy.title_min_len = 1;
    policy
}

pub fn service_with(
    policy: ValidationPolicy,
    local: &MemoryStore,
    mirror: &Arc<ScriptedMirror>,
) -> CatalogService {
    CatalogService::new(
        CatalogStore::new(policy),
        Box::new(SequenceIds::new("tmp")),
        Arc::new(local.clone()),
        Arc::clone(mirror) as Arc<dyn RemoteMirror>,
    )
}

pub fn service(local: &MemoryStore, mirror: &Arc<ScriptedMirror>) -> CatalogService {
    service_with(ValidationPolicy::default(), local, mirror)
}

/// Books currently held in the slot.
pub fn persisted(local: &MemoryStore) -> Vec<BookRecord> {
    serde_json::from_str(&local.contents().unwrap_or_else(|| "[]".to_string())).unwrap()
}
