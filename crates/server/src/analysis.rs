//! Analysis of stored images: recognition followed by identity index merges.
//!
//! A batch is all-or-nothing. The first recognition or merge failure aborts it and the
//! caller hands the whole batch back to the queue, so a retried batch may append a URL
//! that an earlier partial attempt already recorded.

use crate::metrics::{
    ANALYSIS_BATCH_DURATION, IDENTITIES_MERGED, OBJECTS_ANALYZED, UNRECOGNIZED_FACES,
    record_batch,
};
use crate::queue::QueueMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use whoisit_core::{ObjectCreatedEvent, public_url};
use whoisit_metadata::{MetadataError, MetadataStore};
use whoisit_recognition::{RecognitionError, Recognizer};

/// Counts for one successfully handled batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub messages: usize,
    pub objects: usize,
    pub identities_merged: usize,
    pub unrecognized_faces: usize,
}

/// Errors that fail a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("message {message_id}: {source}")]
    InvalidMessage {
        message_id: String,
        #[source]
        source: whoisit_core::Error,
    },

    #[error("recognition failed for s3://{bucket}/{key}: {source}")]
    Recognition {
        bucket: String,
        key: String,
        #[source]
        source: RecognitionError,
    },

    #[error("merge failed for identity {identity_id}: {source}")]
    Merge {
        identity_id: String,
        #[source]
        source: MetadataError,
    },
}

/// Consumes object-created notifications and updates the identity index.
pub struct AnalysisHandler {
    recognizer: Arc<dyn Recognizer>,
    metadata: Arc<dyn MetadataStore>,
    default_region: String,
}

impl AnalysisHandler {
    /// `default_region` is used in public URLs when a record carries no region.
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        metadata: Arc<dyn MetadataStore>,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            recognizer,
            metadata,
            default_region: default_region.into(),
        }
    }

    /// Recognize every object referenced by the batch and merge each match.
    ///
    /// Objects are handled in delivery order and identities in the order the
    /// recognizer returned them.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn handle_batch(
        &self,
        messages: &[QueueMessage],
    ) -> Result<BatchReport, AnalysisError> {
        let started = Instant::now();
        let result = self.process(messages).await;
        ANALYSIS_BATCH_DURATION.observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                record_batch("ok");
                info!(
                    messages = report.messages,
                    objects = report.objects,
                    identities_merged = report.identities_merged,
                    unrecognized_faces = report.unrecognized_faces,
                    "batch analyzed"
                );
            }
            Err(e) => {
                record_batch("failed");
                warn!(error = %e, "batch failed");
            }
        }
        result
    }

    async fn process(&self, messages: &[QueueMessage]) -> Result<BatchReport, AnalysisError> {
        let mut report = BatchReport {
            messages: messages.len(),
            ..BatchReport::default()
        };

        for message in messages {
            let event = ObjectCreatedEvent::from_json(&message.body).map_err(|source| {
                AnalysisError::InvalidMessage {
                    message_id: message.message_id.clone(),
                    source,
                }
            })?;

            if event.records.is_empty() {
                debug!(message_id = %message.message_id, "notification without records");
            }

            for record in &event.records {
                let image = record
                    .image_ref()
                    .map_err(|source| AnalysisError::InvalidMessage {
                        message_id: message.message_id.clone(),
                        source,
                    })?;

                let outcome = self.recognizer.recognize(&image).await.map_err(|source| {
                    AnalysisError::Recognition {
                        bucket: image.bucket.clone(),
                        key: image.key.clone(),
                        source,
                    }
                })?;
                report.objects += 1;
                OBJECTS_ANALYZED.inc();

                if outcome.unrecognized_faces > 0 {
                    debug!(
                        key = %image.key,
                        unrecognized_faces = outcome.unrecognized_faces,
                        "faces without a match"
                    );
                }
                report.unrecognized_faces += outcome.unrecognized_faces;
                UNRECOGNIZED_FACES.inc_by(outcome.unrecognized_faces as u64);

                let region = record.aws_region.as_deref().unwrap_or(&self.default_region);
                let url = public_url(&image.bucket, region, &image.key);

                for identity in &outcome.identities {
                    self.metadata
                        .merge_identity(
                            &identity.identity_id,
                            &identity.display_name,
                            &url,
                            OffsetDateTime::now_utc(),
                        )
                        .await
                        .map_err(|source| AnalysisError::Merge {
                            identity_id: identity.identity_id.clone(),
                            source,
                        })?;
                    debug!(
                        identity_id = %identity.identity_id,
                        confidence = ?identity.match_confidence,
                        url = %url,
                        "identity merged"
                    );
                    report.identities_merged += 1;
                    IDENTITIES_MERGED.inc();
                }
            }
        }

        Ok(report)
    }
}
