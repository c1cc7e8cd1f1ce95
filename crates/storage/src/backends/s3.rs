//! S3 storage backend using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use std::time::Duration;
use tracing::instrument;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

fn map_s3_operation_error<E>(err: SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::S3(Box::new(err))
}

/// S3 object store writing images into a single bucket.
pub struct S3Backend {
    client: Client,
    bucket: String,
    public_read: bool,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("public_read", &self.public_read)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Wrap an already-configured client.
    ///
    /// With `public_read` set, every put carries the `public-read` canned ACL so the
    /// derived public URL is directly fetchable.
    pub fn new(client: Client, bucket: impl Into<String>, public_read: bool) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_read,
        }
    }

    /// Build the client from a shared AWS configuration.
    ///
    /// `force_path_style` uses `endpoint/bucket/key` addressing, which MinIO and
    /// LocalStack require.
    pub fn from_sdk_config(
        sdk_config: &SdkConfig,
        bucket: &str,
        force_path_style: bool,
        public_read: bool,
    ) -> StorageResult<Self> {
        if bucket.is_empty() {
            return Err(StorageError::Config("s3 bucket must not be empty".to_string()));
        }
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(force_path_style)
            .build();
        Ok(Self::new(Client::from_conf(s3_config), bucket, public_read))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn public_read(&self) -> bool {
        self.public_read
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(data.into());
        if self.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }
        request.send().await.map_err(map_s3_operation_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        let probe = async {
            self.client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .map_err(map_s3_operation_error)?;
            Ok(())
        };

        tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
            .await
            .map_err(|_| {
                StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "S3 health check timed out after 10 seconds",
                ))
            })?
    }
}
