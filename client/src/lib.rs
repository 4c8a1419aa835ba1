//! # Shelf Client
//!
//! The IO edge of the Shelf book catalog: the local slot, the remote
//! mirror, the async [`CatalogService`] that runs every change through the
//! optimistic protocol, and the intent [`Controller`] in front of it.
//!
//! ## Configuration
//!
//! Settings come from the environment (a `.env` file is honored by the
//! binary):
//!
//! - `SHELF_API_URL` - remote collection (default: the public placeholder)
//! - `SHELF_DATA_DIR` / `SHELF_STORE_KEY` - where the catalog slot lives
//! - `SHELF_SEED_LIMIT`, `SHELF_PAGE_SIZE`
//! - `SHELF_YEAR_MIN`, `SHELF_YEAR_MAX`, `SHELF_AUTHOR_REQUIRED`
//! - `SHELF_ID_POLICY` - `uuid` or `timestamp`
//! - `SHELF_HTTP_TIMEOUT_SECS`
//! - `HOST`, `PORT` - bind address for the mock API

pub mod config;
pub mod error;
pub mod ids;
pub mod local;
pub mod mock;
pub mod presenter;
pub mod remote;
pub mod service;

pub use config::{Config, ConfigError, IdPolicy};
pub use error::{ClientError, MirrorError, Result, StorageError};
pub use ids::{TimestampIds, UuidIds};
pub use local::{FileStore, LocalStore, MemoryStore};
pub use mock::MockApi;
pub use presenter::{
    Controller, FormInput, Intent, Notice, NoticeLevel, PresentationSink, TextSink,
};
pub use remote::{Ack, HttpMirror, RemoteMirror};
pub use service::{Bootstrap, CatalogService};
