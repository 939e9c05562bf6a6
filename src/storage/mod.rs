//! Key-value persistence port for rules and the session.
//!
//! Values are opaque strings (serialized JSON). Every write replaces the whole value.

pub mod file;
pub mod memory;
pub mod postgres;

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, eyre::Result<Option<String>>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, eyre::Result<()>>;

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, eyre::Result<()>>;
}

/// Build the configured backend. Postgres connects and runs migrations.
pub async fn open(config: &StorageConfig) -> eyre::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| eyre::eyre!("File storage requires 'storage.path'"))?;
            Arc::new(FileStore::new(path))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| eyre::eyre!("Postgres storage requires 'storage.database_url'"))?;
            Arc::new(PgStore::connect(url, config.max_connections).await?)
        }
    };

    tracing::info!(backend = ?config.backend, "Storage backend ready");
    Ok(store)
}
