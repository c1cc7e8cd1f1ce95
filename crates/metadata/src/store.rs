//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{IdentityRepo, UploadRepo};
use crate::tables::TableNames;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: UploadRepo + IdentityRepo + Send + Sync {
    /// Create tables if they do not exist.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    tables: TableNames,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite database and run migrations.
    pub async fn new(path: impl AsRef<Path>, tables: TableNames) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetadataError::Config(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // One connection serializes writers, so every merge transaction runs alone.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool, tables };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "opened SQLite metadata store");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    fn schema_sql(&self) -> String {
        let uploads = self.tables.uploads();
        let identities = self.tables.identities();
        let images = self.tables.identity_images();
        format!(
            r#"
CREATE TABLE IF NOT EXISTS {uploads} (
    upload_id BLOB PRIMARY KEY,
    file_name TEXT NOT NULL,
    url TEXT NOT NULL,
    extension TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS {identities} (
    identity_id TEXT PRIMARY KEY,
    display_name TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- seq preserves append order across concurrent merges
CREATE TABLE IF NOT EXISTS {images} (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id TEXT NOT NULL REFERENCES {identities}(identity_id),
    image_url TEXT NOT NULL,
    added_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_{images}_identity ON {images}(identity_id, seq);
"#
        )
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(&self.schema_sql()).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl UploadRepo for SqliteStore {
        async fn create_upload(&self, upload: &UploadRow) -> MetadataResult<()> {
            sqlx::query(&format!(
                "INSERT INTO {} (upload_id, file_name, url, extension, created_at) VALUES (?, ?, ?, ?, ?)",
                self.tables.uploads()
            ))
            .bind(upload.upload_id)
            .bind(&upload.file_name)
            .bind(&upload.url)
            .bind(&upload.extension)
            .bind(upload.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                MetadataError::from_insert(e, format!("upload_id {}", upload.upload_id))
            })?;
            Ok(())
        }

        async fn get_upload(&self, upload_id: Uuid) -> MetadataResult<Option<UploadRow>> {
            let row = sqlx::query_as::<_, UploadRow>(&format!(
                "SELECT upload_id, file_name, url, extension, created_at FROM {} WHERE upload_id = ?",
                self.tables.uploads()
            ))
            .bind(upload_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }
    }

    #[async_trait]
    impl IdentityRepo for SqliteStore {
        async fn merge_identity(
            &self,
            identity_id: &str,
            display_name: &str,
            image_url: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<IdentityRecord> {
            let identities = self.tables.identities();
            let images = self.tables.identity_images();

            // The upsert is the first statement, so the transaction takes the write lock
            // before anything is read back.
            let mut tx = self.pool.begin().await?;

            sqlx::query(&format!(
                r#"
                INSERT INTO {identities} (identity_id, display_name, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(identity_id) DO UPDATE SET
                    display_name = COALESCE({identities}.display_name, excluded.display_name),
                    updated_at = excluded.updated_at
                "#
            ))
            .bind(identity_id)
            .bind(display_name)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "INSERT INTO {images} (identity_id, image_url, added_at) VALUES (?, ?, ?)"
            ))
            .bind(identity_id)
            .bind(image_url)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query_as::<_, IdentityRow>(&format!(
                "SELECT identity_id, display_name, created_at, updated_at FROM {identities} WHERE identity_id = ?"
            ))
            .bind(identity_id)
            .fetch_one(&mut *tx)
            .await?;

            let urls: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT image_url FROM {images} WHERE identity_id = ? ORDER BY seq"
            ))
            .bind(identity_id)
            .fetch_all(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(row.with_urls(urls))
        }

        async fn get_identity(&self, identity_id: &str) -> MetadataResult<Option<IdentityRecord>> {
            let identities = self.tables.identities();
            let images = self.tables.identity_images();

            let Some(row) = sqlx::query_as::<_, IdentityRow>(&format!(
                "SELECT identity_id, display_name, created_at, updated_at FROM {identities} WHERE identity_id = ?"
            ))
            .bind(identity_id)
            .fetch_optional(&self.pool)
            .await?
            else {
                return Ok(None);
            };

            let urls: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT image_url FROM {images} WHERE identity_id = ? ORDER BY seq"
            ))
            .bind(identity_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(Some(row.with_urls(urls)))
        }

        async fn list_identities(&self, limit: u32) -> MetadataResult<Vec<IdentitySummaryRow>> {
            let identities = self.tables.identities();
            let images = self.tables.identity_images();
            let rows = sqlx::query_as::<_, IdentitySummaryRow>(&format!(
                r#"
                SELECT i.identity_id, i.display_name,
                       (SELECT COUNT(*) FROM {images} m WHERE m.identity_id = i.identity_id) AS image_count,
                       i.created_at, i.updated_at
                FROM {identities} i
                ORDER BY i.identity_id
                LIMIT ?
                "#
            ))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}
