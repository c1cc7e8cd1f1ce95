//! Push delivery of notification batches.

use crate::analysis::BatchReport;
use crate::error::{ApiError, ApiResult, UNMARSHAL_MESSAGE};
use crate::queue::QueueMessage;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use serde::Deserialize;
use tracing::debug;

/// SQS-style event: `{"Records": [{"messageId", "receiptHandle", "body"}]}`.
#[derive(Debug, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueMessage>,
}

/// POST /v1/notifications - Analyze a batch delivered by the caller.
///
/// Any failure answers 500 so the caller redelivers the whole batch.
pub async fn receive_notifications(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<BatchReport>> {
    let batch: NotificationBatch = {
        let bytes = axum::body::to_bytes(req.into_body(), state.config.server.max_body_bytes)
            .await
            .map_err(|e| {
                debug!(error = %e, "failed to read notification body");
                ApiError::BadRequest(UNMARSHAL_MESSAGE.to_string())
            })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "invalid notification JSON");
            ApiError::BadRequest(UNMARSHAL_MESSAGE.to_string())
        })?
    };

    let report = state
        .analysis
        .handle_batch(&batch.records)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(report))
}
