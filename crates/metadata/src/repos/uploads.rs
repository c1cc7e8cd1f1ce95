//! Upload record repository.

use crate::error::MetadataResult;
use crate::models::UploadRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for upload records.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Insert a new upload record. Fails with `AlreadyExists` if the id is taken.
    async fn create_upload(&self, upload: &UploadRow) -> MetadataResult<()>;

    /// Get an upload record by ID.
    async fn get_upload(&self, upload_id: Uuid) -> MetadataResult<Option<UploadRow>>;
}
