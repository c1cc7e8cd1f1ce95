//! Validated table names.

use crate::error::{MetadataError, MetadataResult};
use whoisit_core::config::IndexConfig;
use whoisit_core::validate_identifier;

/// Table names spliced into SQL. Construction validates every name, so the
/// formatted statements cannot carry injected SQL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    uploads: String,
    identities: String,
}

impl TableNames {
    pub fn new(upload_table: &str, identity_table: &str) -> MetadataResult<Self> {
        for name in [upload_table, identity_table] {
            validate_identifier(name).map_err(|e| MetadataError::Config(e.to_string()))?;
        }
        if upload_table == identity_table {
            return Err(MetadataError::Config(
                "upload and identity tables must differ".to_string(),
            ));
        }
        Ok(Self {
            uploads: upload_table.to_string(),
            identities: identity_table.to_string(),
        })
    }

    pub fn from_config(config: &IndexConfig) -> MetadataResult<Self> {
        Self::new(&config.upload_table, &config.identity_table)
    }

    pub fn uploads(&self) -> &str {
        &self.uploads
    }

    pub fn identities(&self) -> &str {
        &self.identities
    }

    /// Ordered image URLs per identity (SQLite only; PostgreSQL keeps an array column).
    pub fn identity_images(&self) -> String {
        format!("{}_images", self.identities)
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            uploads: "uploads".to_string(),
            identities: "identities".to_string(),
        }
    }
}
