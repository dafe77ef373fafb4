//! Persistence layer: the secure and general key-value stores.

pub mod keys;
pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StoreContext, read_or_none, write_logged};

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;

/// Open the secure and general stores the configuration asks for.
pub async fn open(config: &AppConfig) -> Result<StoreContext> {
    if config.in_memory {
        tracing::info!("Using in-memory stores");
        return Ok(StoreContext::new(
            Arc::new(MemoryStore::new("secure")),
            Arc::new(MemoryStore::new("general")),
        ));
    }
    tracing::info!(path = %config.db_path.display(), "Opening libSQL stores");
    Ok(LibSqlStore::open_local(&config.db_path).await?)
}
