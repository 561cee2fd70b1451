//! Local state: one resource identity per logical resource address.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::identity::ResourceIdentity;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A persisted address → identity mapping.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StateEntry {
    pub address: String,
    pub resource_id: ResourceIdentity,
    pub updated_at: String,
}

/// Persistence for resource identities between invocations.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, address: &str) -> Result<Option<ResourceIdentity>>;

    /// Insert or replace the identity recorded for `address`.
    async fn put(&self, address: &str, id: &ResourceIdentity) -> Result<()>;

    /// Forget `address`. Returns whether an entry existed; clearing twice is fine.
    async fn clear(&self, address: &str) -> Result<bool>;

    /// Forget `address` only while it still records `id`.
    async fn clear_if(&self, address: &str, id: &ResourceIdentity) -> Result<bool>;

    async fn list(&self) -> Result<Vec<StateEntry>>;
}

/// SQLite-backed state store
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn new(state_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(state_dir).await?;
        let db_path = state_dir.join("state.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                address TEXT PRIMARY KEY,
                resource_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, address: &str) -> Result<Option<ResourceIdentity>> {
        let row = sqlx::query("SELECT resource_id FROM resources WHERE address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| ResourceIdentity::new(r.get::<String, _>("resource_id"))))
    }

    async fn put(&self, address: &str, id: &ResourceIdentity) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO resources (address, resource_id, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                resource_id = excluded.resource_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(address)
        .bind(id.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, address: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE address = ?")
            .bind(address)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_if(&self, address: &str, id: &ResourceIdentity) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE address = ? AND resource_id = ?")
            .bind(address)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<StateEntry>> {
        let rows = sqlx::query(
            "SELECT address, resource_id, updated_at FROM resources ORDER BY address",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StateEntry {
                address: r.get("address"),
                resource_id: ResourceIdentity::new(r.get::<String, _>("resource_id")),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_store() -> (SqliteStateStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStateStore::new(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_get_clear() {
        let (store, _dir) = setup_store().await;
        let id = ResourceIdentity::new("/subscriptions/s/resourceGroups/rg/x/y");

        assert_eq!(store.get("web").await.unwrap(), None);

        store.put("web", &id).await.unwrap();
        assert_eq!(store.get("web").await.unwrap(), Some(id));

        assert!(store.clear("web").await.unwrap());
        assert_eq!(store.get("web").await.unwrap(), None);

        // Idempotent
        assert!(!store.clear("web").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_if_only_matches_recorded_identity() {
        let (store, _dir) = setup_store().await;
        let live = ResourceIdentity::new("/live");
        store.put("web", &live).await.unwrap();

        assert!(!store.clear_if("web", &ResourceIdentity::new("/stale")).await.unwrap());
        assert_eq!(store.get("web").await.unwrap(), Some(live.clone()));

        assert!(store.clear_if("web", &live).await.unwrap());
        assert_eq!(store.get("web").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let (store, _dir) = setup_store().await;

        store.put("web", &ResourceIdentity::new("/old")).await.unwrap();
        store.put("web", &ResourceIdentity::new("/new")).await.unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource_id.as_str(), "/new");
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStateStore::new(dir.path()).await.unwrap();
            store.put("a", &ResourceIdentity::new("/a")).await.unwrap();
            store.put("b", &ResourceIdentity::new("/b")).await.unwrap();
        }

        let store = SqliteStateStore::new(dir.path()).await.unwrap();
        let addresses: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.address)
            .collect();
        assert_eq!(addresses, vec!["a", "b"]);
    }
}
