//! Object-created notifications for backends that cannot emit them natively.
//!
//! S3 buckets publish their own notifications. For the filesystem backend the store is
//! wrapped in a [`NotifyingStore`] that hands an [`ObjectCreatedEvent`] to a sink after
//! every successful write.

use crate::error::StorageResult;
use crate::traits::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{instrument, warn};
use whoisit_core::ObjectCreatedEvent;

/// Receiver of object-created notifications.
#[async_trait]
pub trait ObjectCreatedSink: Send + Sync + 'static {
    async fn publish(&self, event: ObjectCreatedEvent) -> StorageResult<()>;
}

/// Object store wrapper that publishes a notification after each put.
pub struct NotifyingStore {
    inner: Arc<dyn ObjectStore>,
    sink: Arc<dyn ObjectCreatedSink>,
    bucket: String,
    region: String,
}

impl NotifyingStore {
    /// `bucket` and `region` are stamped into each notification so consumers derive the
    /// same public URL as the upload handler.
    pub fn new(
        inner: Arc<dyn ObjectStore>,
        sink: Arc<dyn ObjectCreatedSink>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            sink,
            bucket: bucket.into(),
            region: region.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for NotifyingStore {
    /// A failed publish is logged and does not fail the write.
    #[instrument(skip(self, data), fields(backend = self.inner.backend_name(), size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let size = data.len() as u64;
        self.inner.put(key, data, content_type).await?;

        let event = ObjectCreatedEvent::for_object(&self.bucket, &self.region, key, size);
        if let Err(e) = self.sink.publish(event).await {
            warn!(key = %key, error = %e, "failed to publish object-created notification");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }
}
