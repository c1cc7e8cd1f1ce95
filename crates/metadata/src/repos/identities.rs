//! Identity index repository.

use crate::error::MetadataResult;
use crate::models::{IdentityRecord, IdentitySummaryRow};
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for the per-identity image index.
#[async_trait]
pub trait IdentityRepo: Send + Sync {
    /// Atomically create or extend an identity record.
    ///
    /// Creates the record with `display_name` and `[image_url]` when absent. Otherwise
    /// appends `image_url` to the end of the URL list and sets `display_name` only if
    /// none is stored yet. The merge runs inside the store, so concurrent callers
    /// never lose each other's URLs. Returns the record after the update.
    async fn merge_identity(
        &self,
        identity_id: &str,
        display_name: &str,
        image_url: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<IdentityRecord>;

    /// Get an identity record by ID.
    async fn get_identity(&self, identity_id: &str) -> MetadataResult<Option<IdentityRecord>>;

    /// List identities ordered by ID.
    async fn list_identities(&self, limit: u32) -> MetadataResult<Vec<IdentitySummaryRow>>;
}
