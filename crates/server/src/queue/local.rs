//! In-process notification queue.
//!
//! Fed by [`NotifyingStore`](whoisit_storage::NotifyingStore) after each upload so a
//! single process can run the whole pipeline without SQS.

use super::{MessageQueue, QueueError, QueueMessage, QueueResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};
use uuid::Uuid;
use whoisit_core::ObjectCreatedEvent;
use whoisit_storage::{ObjectCreatedSink, StorageError, StorageResult};

/// Largest batch handed out by one receive.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Wait before a nacked batch becomes visible again.
pub const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_secs(30);

/// Receives after which a failing message is dropped.
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 5;

/// Unbounded in-memory queue.
///
/// A nacked batch is re-enqueued in order after the redelivery delay. A message
/// that has been received `max_receive_count` times is dropped on its next nack
/// and logged at error level.
pub struct LocalQueue {
    sender: UnboundedSender<QueueMessage>,
    receiver: Mutex<UnboundedReceiver<QueueMessage>>,
    batch_size: usize,
    redelivery_delay: Duration,
    max_receive_count: u32,
    receive_counts: StdMutex<HashMap<String, u32>>,
}

impl LocalQueue {
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            batch_size: batch_size.max(1),
            redelivery_delay: DEFAULT_REDELIVERY_DELAY,
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
            receive_counts: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_redelivery(mut self, delay: Duration, max_receive_count: u32) -> Self {
        self.redelivery_delay = delay;
        self.max_receive_count = max_receive_count.max(1);
        self
    }

    /// Enqueue a raw notification body.
    pub fn send(&self, body: String) -> QueueResult<String> {
        let message_id = Uuid::new_v4().to_string();
        self.sender
            .send(QueueMessage {
                message_id: message_id.clone(),
                receipt_handle: None,
                body,
            })
            .map_err(|_| QueueError::Closed)?;
        Ok(message_id)
    }

    fn counts(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.receive_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LocalQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for LocalQueue {
    async fn receive(&self) -> QueueResult<Vec<QueueMessage>> {
        let mut receiver = self.receiver.lock().await;
        let first = receiver.recv().await.ok_or(QueueError::Closed)?;

        let mut batch = vec![first];
        while batch.len() < self.batch_size {
            match receiver.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }

        let mut counts = self.counts();
        for message in &batch {
            *counts.entry(message.message_id.clone()).or_insert(0) += 1;
        }
        Ok(batch)
    }

    async fn ack(&self, messages: &[QueueMessage]) -> QueueResult<()> {
        let mut counts = self.counts();
        for message in messages {
            counts.remove(&message.message_id);
        }
        Ok(())
    }

    async fn nack(&self, messages: &[QueueMessage]) -> QueueResult<()> {
        let mut retry = Vec::with_capacity(messages.len());
        {
            let mut counts = self.counts();
            for message in messages {
                let received = counts.get(&message.message_id).copied().unwrap_or(0);
                if received >= self.max_receive_count {
                    counts.remove(&message.message_id);
                    error!(
                        message_id = %message.message_id,
                        receive_count = received,
                        body = %message.body,
                        "dropping message after repeated failures"
                    );
                } else {
                    retry.push(message.clone());
                }
            }
        }

        if retry.is_empty() {
            return Ok(());
        }

        let count = retry.len();
        let delay = self.redelivery_delay;
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            for message in retry {
                if sender.send(message).is_err() {
                    debug!("queue closed before redelivery");
                    return;
                }
            }
        });
        debug!(
            count,
            delay_secs = delay.as_secs_f64(),
            "scheduled redelivery"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[async_trait]
impl ObjectCreatedSink for LocalQueue {
    async fn publish(&self, event: ObjectCreatedEvent) -> StorageResult<()> {
        let body = event
            .to_json()
            .map_err(|e| StorageError::Notify(e.to_string()))?;
        let message_id = self
            .send(body)
            .map_err(|e| StorageError::Notify(e.to_string()))?;
        debug!(message_id = %message_id, "queued object-created notification");
        Ok(())
    }
}
