//! Metadata store abstraction and implementations for whoisit.
//!
//! This crate holds the two keyed record stores of the pipeline:
//! - Upload records, one per stored image
//! - The identity index, one record per recognized identity, with an atomic
//!   create-or-append merge

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;
pub mod tables;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use repos::{IdentityRepo, UploadRepo};
pub use store::{MetadataStore, SqliteStore};
pub use tables::TableNames;

use std::sync::Arc;
use whoisit_core::config::{IndexConfig, MetadataConfig};

/// Create a metadata store from configuration.
pub async fn from_config(
    config: &MetadataConfig,
    index: &IndexConfig,
) -> MetadataResult<Arc<dyn MetadataStore>> {
    config.validate().map_err(MetadataError::Config)?;
    let tables = TableNames::from_config(index)?;

    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path, tables).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, tables, *max_connections, *statement_timeout_ms)
                    .await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    tables,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
