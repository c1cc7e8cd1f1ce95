//! Local filesystem storage backend.
//!
//! Objects are stored flat under the root directory, one file per key. Used for local
//! runs and tests; public URLs are still derived from the configured bucket.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

const TEMP_PREFIX: &str = ".tmp.";

/// Local filesystem object store.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a file directly under the root.
    ///
    /// Keys are a single path component. Separators, `.`/`..` and the temp-file prefix
    /// are rejected, and an existing symlink at the target is refused so writes never
    /// leave the root.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(key).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single || key.contains(['/', '\\']) || key.starts_with(TEMP_PREFIX) {
            return Err(StorageError::InvalidKey(format!(
                "key must be a single file name: {key:?}"
            )));
        }

        let path = self.root.join(key);
        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.file_type().is_symlink() => Err(StorageError::InvalidKey(format!(
                "refusing to follow symlink outside storage root: {key}"
            ))),
            Ok(_) => Ok(path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    /// The content type is implied by the key's extension and not stored.
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;

        // Temp file, fsync, rename: readers never observe a partial image
        let temp_path = self.root.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}
