//! libSQL backend: durable `KeyValueStore` implementation.
//!
//! A single database file holds both stores; rows are partitioned by a
//! `namespace` column (`secure` / `general`). Values are opaque strings.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use super::traits::{KeyValueStore, StoreContext};
use crate::error::StoreError;

/// Namespace for the credential-grade store.
pub const SECURE_NAMESPACE: &str = "secure";
/// Namespace for the bulk store.
pub const GENERAL_NAMESPACE: &str = "general";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_store (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
);
";

/// One namespace of a libSQL-backed key-value table.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Arc<Connection>,
    namespace: String,
}

impl LibSqlStore {
    /// Open (or create) a local database file and return both stores over it.
    pub async fn open_local(path: &Path) -> Result<StoreContext, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let ctx = Self::pair(db).await?;
        info!(path = %path.display(), "Key-value database opened");
        Ok(ctx)
    }

    /// Both stores over an in-memory database (for tests).
    pub async fn open_memory() -> Result<StoreContext, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;
        Self::pair(db).await
    }

    async fn pair(db: LibSqlDatabase) -> Result<StoreContext, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create kv_store table: {e}")))?;

        let db = Arc::new(db);
        let conn = Arc::new(conn);
        let secure = Self {
            db: Arc::clone(&db),
            conn: Arc::clone(&conn),
            namespace: SECURE_NAMESPACE.to_string(),
        };
        let general = Self {
            db,
            conn,
            namespace: GENERAL_NAMESPACE.to_string(),
        };
        Ok(StoreContext::new(Arc::new(secure), Arc::new(general)))
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl KeyValueStore for LibSqlStore {
    fn name(&self) -> &str {
        &self.namespace
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2",
                params![self.namespace.as_str(), key],
            )
            .await
            .map_err(|e| StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row.get(0).map_err(|e| StoreError::Read {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO kv_store (namespace, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (namespace, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![self.namespace.as_str(), key, value, now],
            )
            .await
            .map_err(|e| StoreError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(store = %self.namespace, key, "Stored item");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "DELETE FROM kv_store WHERE namespace = ?1 AND key = ?2",
                params![self.namespace.as_str(), key],
            )
            .await
            .map_err(|e| StoreError::Delete {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
