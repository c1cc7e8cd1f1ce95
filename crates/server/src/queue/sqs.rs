//! Amazon SQS consumer for bucket notifications.

use super::{MessageQueue, QueueError, QueueMessage, QueueResult};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::DeleteMessageBatchRequestEntry;
use tracing::{debug, instrument, warn};

/// `DeleteMessageBatch` accepts at most ten entries.
const MAX_DELETE_BATCH: usize = 10;

/// Long-polling SQS queue.
///
/// Nacked messages are left alone and reappear once their visibility timeout expires.
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    max_messages: i32,
    wait_time_secs: i32,
}

impl std::fmt::Debug for SqsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsQueue")
            .field("queue_url", &self.queue_url)
            .field("max_messages", &self.max_messages)
            .field("wait_time_secs", &self.wait_time_secs)
            .finish_non_exhaustive()
    }
}

impl SqsQueue {
    pub fn new(
        client: Client,
        queue_url: impl Into<String>,
        max_messages: i32,
        wait_time_secs: i32,
    ) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            max_messages: max_messages.clamp(1, 10),
            wait_time_secs: wait_time_secs.clamp(0, 20),
        }
    }

    pub fn from_sdk_config(
        sdk_config: &SdkConfig,
        queue_url: impl Into<String>,
        max_messages: i32,
        wait_time_secs: i32,
    ) -> Self {
        Self::new(
            Client::new(sdk_config),
            queue_url,
            max_messages,
            wait_time_secs,
        )
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

fn sqs_error<E>(err: E) -> QueueError
where
    E: std::error::Error + Send + Sync + 'static,
{
    QueueError::Sqs(Box::new(err))
}

/// Delete entries for messages that carry a receipt handle, identified by batch position.
fn delete_entries(messages: &[QueueMessage]) -> QueueResult<Vec<DeleteMessageBatchRequestEntry>> {
    messages
        .iter()
        .enumerate()
        .filter_map(|(i, message)| {
            let handle = message.receipt_handle.as_ref()?;
            Some(
                DeleteMessageBatchRequestEntry::builder()
                    .id(i.to_string())
                    .receipt_handle(handle)
                    .build()
                    .map_err(|e| QueueError::InvalidMessage(e.to_string())),
            )
        })
        .collect()
}

#[async_trait]
impl MessageQueue for SqsQueue {
    #[instrument(skip(self), fields(backend = "sqs", queue_url = %self.queue_url))]
    async fn receive(&self) -> QueueResult<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(self.wait_time_secs)
            .send()
            .await
            .map_err(sqs_error)?;

        let messages: Vec<QueueMessage> = output
            .messages()
            .iter()
            .map(|m| QueueMessage {
                message_id: m.message_id().unwrap_or_default().to_string(),
                receipt_handle: m.receipt_handle().map(str::to_string),
                body: m.body().unwrap_or_default().to_string(),
            })
            .collect();

        debug!(count = messages.len(), "received messages");
        Ok(messages)
    }

    #[instrument(skip(self, messages), fields(backend = "sqs", count = messages.len()))]
    async fn ack(&self, messages: &[QueueMessage]) -> QueueResult<()> {
        let entries = delete_entries(messages)?;
        let total = entries.len();
        let mut failed = 0;

        for chunk in entries.chunks(MAX_DELETE_BATCH) {
            let output = self
                .client
                .delete_message_batch()
                .queue_url(&self.queue_url)
                .set_entries(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(sqs_error)?;

            for entry in output.failed() {
                warn!(
                    id = %entry.id(),
                    code = %entry.code(),
                    message = ?entry.message(),
                    "failed to delete message"
                );
            }
            failed += output.failed().len();
        }

        if failed > 0 {
            return Err(QueueError::PartialAck { failed, total });
        }
        Ok(())
    }

    async fn nack(&self, messages: &[QueueMessage]) -> QueueResult<()> {
        debug!(
            count = messages.len(),
            "leaving messages for redelivery after visibility timeout"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqs"
    }
}
