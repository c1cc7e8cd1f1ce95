//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body in bytes. Images arrive base64-encoded,
    /// so this bounds the decoded image at roughly three quarters of the value.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Where uploaded images live and how their public URLs are formed.
///
/// Both fields are required; there is no sensible default bucket or region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Bucket name used for object writes and public URLs.
    pub bucket: String,
    /// Region used in public URLs and for AWS clients.
    pub region: String,
}

impl ImagesConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("images.bucket must not be empty".to_string());
        }
        if self.region.trim().is_empty() {
            return Err("images.region must not be empty".to_string());
        }
        Ok(())
    }
}

/// Shared settings for AWS service clients (S3, Rekognition, SQS).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Optional endpoint URL override (LocalStack, MinIO).
    pub endpoint: Option<String>,
    /// AWS access key ID. Falls back to the default credential chain if not set.
    /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
    pub access_key_id: Option<String>,
    /// AWS secret access key. Falls back to the default credential chain if not set.
    pub secret_access_key: Option<String>,
    /// Force path-style S3 URLs. Required for MinIO and LocalStack.
    #[serde(default)]
    pub force_path_style: bool,
}

impl AwsConfig {
    pub fn validate(&self) -> Result<(), String> {
        match (
            self.access_key_id.as_ref(),
            self.secret_access_key.as_ref(),
        ) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(
                "aws config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ),
        }
    }
}

/// Object storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage. Public URLs are still derived from `images`.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3 storage in the `images.bucket` bucket.
    S3 {
        /// Write objects with the public-read canned ACL.
        #[serde(default = "default_public_read")]
        public_read: bool,
    },
}

fn default_public_read() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::S3 {
            public_read: default_public_read(),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (local runs and tests).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields if both are provided.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        username: Option<String>,
        /// WARNING: Prefer WHOISIT_METADATA__PASSWORD over storing in config.
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds. PostgreSQL cancels queries past this.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/whoisit.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => {
                    Err("postgres config requires either 'url' or 'host' + 'database'".to_string())
                }
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Table names for the upload records and the identity index.
///
/// Both are required and are spliced into SQL, so they must be plain identifiers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub upload_table: String,
    pub identity_table: String,
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), String> {
        crate::validate_identifier(&self.upload_table)
            .map_err(|e| format!("index.upload_table: {e}"))?;
        crate::validate_identifier(&self.identity_table)
            .map_err(|e| format!("index.identity_table: {e}"))?;
        if self.upload_table == self.identity_table {
            return Err("index.upload_table and index.identity_table must differ".to_string());
        }
        Ok(())
    }
}

/// Source of object-created notifications for the analysis worker.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueConfig {
    /// No worker; notifications only arrive through `POST /v1/notifications`.
    #[default]
    Disabled,
    /// In-process queue fed by the storage layer after each upload.
    Local {
        /// Seconds a failed batch stays hidden before redelivery.
        #[serde(default = "default_local_redelivery_delay_secs")]
        redelivery_delay_secs: u64,
        /// Receives after which a failing message is dropped.
        #[serde(default = "default_local_max_receive_count")]
        max_receive_count: u32,
    },
    /// Amazon SQS queue subscribed to the bucket's notifications.
    Sqs {
        queue_url: String,
        /// Messages per receive call (1 to 10).
        #[serde(default = "default_sqs_max_messages")]
        max_messages: i32,
        /// Long-poll wait in seconds (0 to 20).
        #[serde(default = "default_sqs_wait_time_secs")]
        wait_time_secs: i32,
    },
}

fn default_local_redelivery_delay_secs() -> u64 {
    30
}

fn default_local_max_receive_count() -> u32 {
    5
}

fn default_sqs_max_messages() -> i32 {
    10
}

fn default_sqs_wait_time_secs() -> i32 {
    20
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            QueueConfig::Sqs {
                queue_url,
                max_messages,
                wait_time_secs,
            } => {
                if queue_url.trim().is_empty() {
                    return Err("queue.queue_url must not be empty".to_string());
                }
                if !(1..=10).contains(max_messages) {
                    return Err(format!(
                        "queue.max_messages must be between 1 and 10, got {max_messages}"
                    ));
                }
                if !(0..=20).contains(wait_time_secs) {
                    return Err(format!(
                        "queue.wait_time_secs must be between 0 and 20, got {wait_time_secs}"
                    ));
                }
                Ok(())
            }
            QueueConfig::Local {
                max_receive_count, ..
            } => {
                if *max_receive_count == 0 {
                    return Err("queue.max_receive_count must be at least 1".to_string());
                }
                Ok(())
            }
            QueueConfig::Disabled => Ok(()),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Bucket and region (required).
    pub images: ImagesConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Table names (required).
    pub index: IndexConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

impl AppConfig {
    /// Check every section, failing on the first invalid one.
    pub fn validate(&self) -> crate::Result<()> {
        self.images
            .validate()
            .and_then(|()| self.aws.validate())
            .and_then(|()| self.metadata.validate())
            .and_then(|()| self.index.validate())
            .and_then(|()| self.queue.validate())
            .map_err(crate::Error::Config)
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage, SQLite metadata,
    /// the `testbucket` bucket in `us-east-1` and no queue.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            images: ImagesConfig {
                bucket: "testbucket".to_string(),
                region: "us-east-1".to_string(),
            },
            aws: AwsConfig::default(),
            storage: StorageConfig::Filesystem {
                path: PathBuf::from("./data/images"),
            },
            metadata: MetadataConfig::default(),
            index: IndexConfig {
                upload_table: "uploads".to_string(),
                identity_table: "identities".to_string(),
            },
            queue: QueueConfig::Disabled,
        }
    }
}
