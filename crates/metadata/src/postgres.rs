//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::*;
use crate::repos::{IdentityRepo, UploadRepo};
use crate::store::MetadataStore;
use crate::tables::TableNames;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;
use whoisit_core::config::PgSslMode;

fn schema_statements(tables: &TableNames) -> Vec<String> {
    let uploads = tables.uploads();
    let identities = tables.identities();
    vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS {uploads} (
                upload_id UUID PRIMARY KEY,
                file_name TEXT NOT NULL,
                url TEXT NOT NULL,
                extension TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {identities} (
                identity_id TEXT PRIMARY KEY,
                display_name TEXT,
                image_urls TEXT[] NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"#
        ),
    ]
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    tables: TableNames,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        tables: TableNames,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, tables, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, e.g. the password
    /// through an environment variable.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        tables: TableNames,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, tables, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        tables: TableNames,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool, tables };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements cannot hold more than one command.
        for statement in schema_statements(&self.tables) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UploadRepo for PostgresStore {
    async fn create_upload(&self, upload: &UploadRow) -> MetadataResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (upload_id, file_name, url, extension, created_at) VALUES ($1, $2, $3, $4, $5)",
            self.tables.uploads()
        ))
        .bind(upload.upload_id)
        .bind(&upload.file_name)
        .bind(&upload.url)
        .bind(&upload.extension)
        .bind(upload.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| MetadataError::from_insert(e, format!("upload_id {}", upload.upload_id)))?;
        Ok(())
    }

    async fn get_upload(&self, upload_id: Uuid) -> MetadataResult<Option<UploadRow>> {
        let row = sqlx::query_as::<_, UploadRow>(&format!(
            "SELECT upload_id, file_name, url, extension, created_at FROM {} WHERE upload_id = $1",
            self.tables.uploads()
        ))
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl IdentityRepo for PostgresStore {
    async fn merge_identity(
        &self,
        identity_id: &str,
        display_name: &str,
        image_url: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<IdentityRecord> {
        let identities = self.tables.identities();
        // Single statement: the conflicting row is locked for the update, so concurrent
        // merges serialize on it and each appends its own URL.
        let row = sqlx::query_as::<_, PgIdentityRow>(&format!(
            r#"
            INSERT INTO {identities} (identity_id, display_name, image_urls, created_at, updated_at)
            VALUES ($1, $2, ARRAY[$3::TEXT], $4, $4)
            ON CONFLICT (identity_id) DO UPDATE SET
                display_name = COALESCE({identities}.display_name, EXCLUDED.display_name),
                image_urls = {identities}.image_urls || EXCLUDED.image_urls,
                updated_at = EXCLUDED.updated_at
            RETURNING identity_id, display_name, image_urls, created_at, updated_at
            "#
        ))
        .bind(identity_id)
        .bind(display_name)
        .bind(image_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_identity(&self, identity_id: &str) -> MetadataResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, PgIdentityRow>(&format!(
            "SELECT identity_id, display_name, image_urls, created_at, updated_at FROM {} WHERE identity_id = $1",
            self.tables.identities()
        ))
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_identities(&self, limit: u32) -> MetadataResult<Vec<IdentitySummaryRow>> {
        let rows = sqlx::query_as::<_, IdentitySummaryRow>(&format!(
            r#"
            SELECT identity_id, display_name,
                   COALESCE(cardinality(image_urls), 0)::BIGINT AS image_count,
                   created_at, updated_at
            FROM {}
            ORDER BY identity_id
            LIMIT $1
            "#,
            self.tables.identities()
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
