//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One uploaded image. Written once by the upload handler, never updated.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UploadRow {
    pub upload_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub extension: String,
    pub created_at: OffsetDateTime,
}

/// A recognized identity and every image URL it was seen in, oldest first.
///
/// `display_name` is first-writer-wins; `image_urls` is append-only and may hold
/// duplicates when a notification is redelivered.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRecord {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Listing entry for an identity.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct IdentitySummaryRow {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub image_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Identity row without its image URLs (SQLite keeps those in a child table).
#[derive(Debug, Clone, FromRow)]
pub(crate) struct IdentityRow {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl IdentityRow {
    pub(crate) fn with_urls(self, image_urls: Vec<String>) -> IdentityRecord {
        IdentityRecord {
            identity_id: self.identity_id,
            display_name: self.display_name,
            image_urls,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL row with the URL array inline.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct PgIdentityRow {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<PgIdentityRow> for IdentityRecord {
    fn from(row: PgIdentityRow) -> Self {
        Self {
            identity_id: row.identity_id,
            display_name: row.display_name,
            image_urls: row.image_urls,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
