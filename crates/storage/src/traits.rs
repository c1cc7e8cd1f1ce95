//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Object store abstraction for uploaded images.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Put an object atomically, replacing any existing object under `key`.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Static identifier of the backend type (e.g., "s3", "filesystem"), used in logs and
    /// metrics labels.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
