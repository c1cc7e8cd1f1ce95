//! Storage test utilities.

use async_trait::async_trait;
use bytes::Bytes;
use whoisit_storage::{ObjectStore, StorageError, StorageResult};

/// Object store whose writes always fail.
#[allow(dead_code)]
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::other("injected put failure")))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn health_check(&self) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::other("injected health failure")))
    }
}
