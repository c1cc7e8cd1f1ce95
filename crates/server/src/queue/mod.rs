//! Delivery of object-created notifications to the analysis worker.
//!
//! Delivery is at-least-once: a batch is acknowledged only after the analysis
//! handler succeeded on all of it, otherwise it is handed back for redelivery.

pub mod local;
pub mod sqs;

pub use local::LocalQueue;
pub use sqs::SqsQueue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One delivered message wrapping an object-created notification body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    #[serde(default)]
    pub message_id: String,
    /// Handle needed to delete the message. Absent for in-process delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_handle: Option<String>,
    #[serde(default)]
    pub body: String,
}

/// Queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("SQS error: {0}")]
    Sqs(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{failed} of {total} messages could not be acknowledged")]
    PartialAck { failed: usize, total: usize },

    #[error("queue closed")]
    Closed,

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Source of notification batches.
#[async_trait]
pub trait MessageQueue: Send + Sync + 'static {
    /// Wait for the next batch. May return an empty batch when a poll times out.
    async fn receive(&self) -> QueueResult<Vec<QueueMessage>>;

    /// Remove a fully processed batch.
    async fn ack(&self, messages: &[QueueMessage]) -> QueueResult<()>;

    /// Hand a failed batch back for redelivery.
    async fn nack(&self, messages: &[QueueMessage]) -> QueueResult<()>;

    fn backend_name(&self) -> &'static str;
}
