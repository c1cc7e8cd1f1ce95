//! Object storage abstraction and backends for whoisit images.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait used by the upload handler
//! - Backends: S3 (public-read writes) and local filesystem
//! - [`NotifyingStore`], which emits object-created notifications for backends
//!   that cannot publish them natively

pub mod backends;
pub mod error;
pub mod notify;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use notify::{NotifyingStore, ObjectCreatedSink};
pub use traits::ObjectStore;

use aws_config::SdkConfig;
use std::sync::Arc;
use whoisit_core::config::{AwsConfig, ImagesConfig, StorageConfig};

/// Create an object store from configuration.
///
/// `sdk_config` is only consulted for the S3 backend.
pub async fn from_config(
    config: &StorageConfig,
    images: &ImagesConfig,
    aws: &AwsConfig,
    sdk_config: &SdkConfig,
) -> StorageResult<Arc<dyn ObjectStore>> {
    images.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 { public_read } => {
            let backend = S3Backend::from_sdk_config(
                sdk_config,
                &images.bucket,
                aws.force_path_style,
                *public_read,
            )?;
            Ok(Arc::new(backend))
        }
    }
}
