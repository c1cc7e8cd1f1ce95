//! Background loop feeding queued notifications to the analysis handler.

use crate::analysis::AnalysisHandler;
use crate::queue::{MessageQueue, QueueMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Pause after a failed receive before polling again.
pub const DEFAULT_RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

/// Drains a [`MessageQueue`] until cancelled.
pub struct AnalysisWorker {
    queue: Arc<dyn MessageQueue>,
    handler: Arc<AnalysisHandler>,
    receive_backoff: Duration,
}

impl AnalysisWorker {
    pub fn new(queue: Arc<dyn MessageQueue>, handler: Arc<AnalysisHandler>) -> Self {
        Self {
            queue,
            handler,
            receive_backoff: DEFAULT_RECEIVE_BACKOFF,
        }
    }

    pub fn with_receive_backoff(mut self, backoff: Duration) -> Self {
        self.receive_backoff = backoff;
        self
    }

    /// Run until `shutdown` is cancelled. A batch in flight is finished first.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(backend = self.queue.backend_name(), "analysis worker started");

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(messages) if messages.is_empty() => continue,
                Ok(messages) => self.process(&messages).await,
                Err(e) => {
                    warn!(
                        error = %e,
                        backoff_secs = self.receive_backoff.as_secs_f64(),
                        "failed to receive messages"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.receive_backoff) => {}
                    }
                }
            }
        }

        info!("analysis worker stopped");
    }

    async fn process(&self, messages: &[QueueMessage]) {
        match self.handler.handle_batch(messages).await {
            Ok(_) => {
                if let Err(e) = self.queue.ack(messages).await {
                    error!(error = %e, count = messages.len(), "failed to acknowledge batch");
                }
            }
            Err(err) => {
                warn!(error = %err, count = messages.len(), "batch failed, returning to queue");
                if let Err(e) = self.queue.nack(messages).await {
                    error!(error = %e, count = messages.len(), "failed to return batch to queue");
                }
            }
        }
    }
}
