//! Domain repository — SQLite-backed CRUD over domain identity.
//!
//! One table keyed by id, secondary indexes on name and created_at. The
//! pool is bounded by the operator-supplied settings; the in-memory mode
//! pins the pool to a single connection (each SQLite memory connection is
//! its own database).

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{PersistError, PersistResult};

/// The persisted slice of a domain. Everything else (members, tags, head)
/// is runtime state and rebuilds from heartbeats.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DomainRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Connection pool sizing. Zero `max_open` falls back to the default of 10;
/// zero `max_lifetime_secs` means connections never age out.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_open: u32,
    pub max_idle: u32,
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: 10,
            max_idle: 5,
            max_lifetime_secs: 0,
        }
    }
}

/// SQLite-backed domain repository.
#[derive(Clone)]
pub struct DomainRepo {
    pool: SqlitePool,
}

impl DomainRepo {
    /// Open (or create) the database at `path` and initialize the schema.
    pub async fn open(path: &Path, settings: PoolSettings) -> PersistResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let connect = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let max_open = if settings.max_open == 0 { 10 } else { settings.max_open };
        let mut pool_opts = SqlitePoolOptions::new()
            .max_connections(max_open)
            .min_connections(settings.max_idle.min(max_open));
        if settings.max_lifetime_secs > 0 {
            pool_opts = pool_opts.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
        }

        let pool = pool_opts.connect_with(connect).await?;
        let repo = Self { pool };
        repo.init_schema().await?;

        info!(path = %path.display(), max_open, "domain repository opened");
        Ok(repo)
    }

    /// Ephemeral in-memory repository (for tests).
    pub async fn open_in_memory() -> PersistResult<Self> {
        let connect = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;
        debug!("in-memory domain repository opened");
        Ok(repo)
    }

    async fn init_schema(&self) -> PersistResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS domains (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_domains_name ON domains(name)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_domains_created_at ON domains(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new domain row.
    pub async fn create_domain(&self, record: &DomainRecord) -> PersistResult<()> {
        sqlx::query(
            "INSERT INTO domains (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %record.id, name = %record.name, "domain persisted");
        Ok(())
    }

    /// Update name, description and updated_at of an existing row.
    pub async fn update_domain(&self, record: &DomainRecord) -> PersistResult<()> {
        let result = sqlx::query(
            "UPDATE domains SET name = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistError::NotFound(record.id.clone()));
        }
        debug!(id = %record.id, "domain updated in database");
        Ok(())
    }

    /// Delete a row by id.
    pub async fn delete_domain(&self, id: &str) -> PersistResult<()> {
        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistError::NotFound(id.to_string()));
        }
        debug!(%id, "domain deleted from database");
        Ok(())
    }

    /// Fetch one row by id.
    pub async fn get_domain(&self, id: &str) -> PersistResult<Option<DomainRecord>> {
        let record = sqlx::query_as::<_, DomainRecord>(
            "SELECT id, name, description, created_at, updated_at FROM domains WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Fetch every row, newest first.
    pub async fn get_all_domains(&self) -> PersistResult<Vec<DomainRecord>> {
        let records = sqlx::query_as::<_, DomainRecord>(
            "SELECT id, name, description, created_at, updated_at FROM domains
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Close the pool. Outstanding connections drain before returning.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> DomainRecord {
        let now = Utc::now();
        DomainRecord {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let rec = record("domain.a", "prod");
        repo.create_domain(&rec).await.unwrap();

        let back = repo.get_domain("domain.a").await.unwrap().unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.name, "prod");
        assert_eq!(back.created_at, rec.created_at);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let repo = DomainRepo::open_in_memory().await.unwrap();
        assert!(repo.get_domain("domain.ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let rec = record("domain.a", "prod");
        repo.create_domain(&rec).await.unwrap();
        assert!(repo.create_domain(&rec).await.is_err());
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let err = repo.update_domain(&record("domain.ghost", "x")).await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_rewrites_name_and_description() {
        let repo = DomainRepo::open_in_memory().await.unwrap();
        let mut rec = record("domain.a", "prod");
        repo.create_domain(&rec).await.unwrap();

        rec.name = "staging".to_string();
        rec.description = "renamed".to_string();
        rec.updated_at = Utc::now();
        repo.update_domain(&rec).await.unwrap();

        let back = repo.get_domain("domain.a").await.unwrap().unwrap();
        assert_eq!(back.name, "staging");
        assert_eq!(back.description, "renamed");
    }

    #[tokio::test]
    async fn delete_then_get_is_none() {
        let repo = DomainRepo::open_in_memory().await.unwrap();
        repo.create_domain(&record("domain.a", "prod")).await.unwrap();
        repo.delete_domain("domain.a").await.unwrap();

        assert!(repo.get_domain("domain.a").await.unwrap().is_none());
        let err = repo.delete_domain("domain.a").await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_all_orders_newest_first() {
        let repo = DomainRepo::open_in_memory().await.unwrap();

        let mut old = record("domain.old", "old");
        old.created_at = Utc::now() - chrono::Duration::seconds(60);
        repo.create_domain(&old).await.unwrap();
        repo.create_domain(&record("domain.new", "new")).await.unwrap();

        let all = repo.get_all_domains().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "domain.new");
        assert_eq!(all[1].id, "domain.old");
    }
}
