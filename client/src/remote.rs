//! Remote Mirror Client - best-effort copies of local changes.
//!
//! The remote is never the source of truth. A mirror call either
//! acknowledges a change (optionally assigning an id to a created book) or
//! fails, and the catalog service rolls the change back on failure. Calls are
//! made once; there are no retries.

use crate::error::MirrorError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use shelf_engine::{BookChanges, BookId, BookRecord, SeedItem};
use std::time::Duration;

/// Acknowledgement of a mirrored change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Id assigned by the remote to a created book
    pub server_id: Option<BookId>,
}

/// The remote collection.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Fetch the generic items used to seed an empty catalog.
    async fn fetch_seed(&self) -> Result<Vec<SeedItem>, MirrorError>;

    async fn mirror_create(&self, record: &BookRecord) -> Result<Ack, MirrorError>;

    async fn mirror_update(&self, id: &BookId, changes: &BookChanges)
        -> Result<Ack, MirrorError>;

    async fn mirror_delete(&self, id: &BookId) -> Result<Ack, MirrorError>;
}

/// Body of a create response; only the id matters.
#[derive(Debug, Deserialize)]
struct Created {
    #[serde(default)]
    id: Option<BookId>,
}

/// Mirror over a JSON REST collection (`GET`/`POST` on the base URL,
/// `PUT`/`DELETE` on `{base}/{id}`).
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: Client,
    base_url: String,
}

impl HttpMirror {
    /// Create a mirror for the collection at `base_url`.
    ///
    /// Without a timeout a request waits as long as the transport allows.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, MirrorError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: &BookId) -> String {
        format!("{}/{id}", self.base_url)
    }

    async fn check(response: Response) -> Result<Response, MirrorError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(MirrorError::Status { status, body })
        }
    }
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    async fn fetch_seed(&self) -> Result<Vec<SeedItem>, MirrorError> {
        let response = self.client.get(&self.base_url).send().await?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| MirrorError::Decode(e.to_string()))
    }

    async fn mirror_create(&self, record: &BookRecord) -> Result<Ack, MirrorError> {
        let response = self.client.post(&self.base_url).json(record).send().await?;
        let response = Self::check(response).await?;
        let created: Created = response
            .json()
            .await
            .map_err(|e| MirrorError::Decode(e.to_string()))?;

        tracing::debug!(provisional = %record.id, server_id = ?created.id, "Create mirrored");
        Ok(Ack {
            server_id: created.id,
        })
    }

    async fn mirror_update(
        &self,
        id: &BookId,
        changes: &BookChanges,
    ) -> Result<Ack, MirrorError> {
        let response = self
            .client
            .put(self.item_url(id))
            .json(changes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(Ack::default())
    }

    async fn mirror_delete(&self, id: &BookId) -> Result<Ack, MirrorError> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        Self::check(response).await?;
        Ok(Ack::default())
    }
}
