//! Server test utilities.

use super::fixtures::FakeRecognizer;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use whoisit_core::config::{AppConfig, MetadataConfig, StorageConfig};
use whoisit_metadata::{MetadataStore, SqliteStore, TableNames};
use whoisit_server::{AppState, create_router};
use whoisit_storage::{FilesystemBackend, ObjectStore};

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub recognizer: Arc<FakeRecognizer>,
    pub storage_path: PathBuf,
    sqlite: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with filesystem storage and SQLite metadata.
    pub async fn new() -> Self {
        Self::build(|_| {}, None).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(modifier, None).await
    }

    /// Create a test server writing images to `storage`.
    pub async fn with_storage(storage: Arc<dyn ObjectStore>) -> Self {
        Self::build(|_| {}, Some(storage)).await
    }

    async fn build<F>(modifier: F, storage: Option<Arc<dyn ObjectStore>>) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("images");
        let db_path = temp_dir.path().join("metadata.db");

        let mut config = AppConfig::for_testing();
        config.storage = StorageConfig::Filesystem {
            path: storage_path.clone(),
        };
        config.metadata = MetadataConfig::Sqlite {
            path: db_path.clone(),
        };
        modifier(&mut config);

        let storage = match storage {
            Some(storage) => storage,
            None => Arc::new(
                FilesystemBackend::new(&storage_path)
                    .await
                    .expect("Failed to create storage backend"),
            ),
        };

        let tables = TableNames::from_config(&config.index).expect("Invalid table names");
        let sqlite = Arc::new(
            SqliteStore::new(&db_path, tables)
                .await
                .expect("Failed to create metadata store"),
        );
        let metadata: Arc<dyn MetadataStore> = sqlite.clone();

        let recognizer = Arc::new(FakeRecognizer::new());
        let state = AppState::new(config, storage, metadata, recognizer.clone());
        let router = create_router(state.clone());

        Self {
            router,
            state,
            recognizer,
            storage_path,
            sqlite,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Raw SQLite pool, for breaking the schema in failure tests.
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite.pool()
    }

    /// Names of the files currently in the image directory.
    pub fn stored_objects(&self) -> Vec<String> {
        match std::fs::read_dir(&self.storage_path) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Send a request and return the status and raw body.
    pub async fn request(&self, method: &str, uri: &str, body: Option<String>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(b) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(b)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a JSON request and parse a JSON response (`Null` when the body is not JSON).
    pub async fn json_request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|v| serde_json::to_string(&v).unwrap());
        let (status, text) = self.request(method, uri, body).await;
        let json = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, json)
    }
}
