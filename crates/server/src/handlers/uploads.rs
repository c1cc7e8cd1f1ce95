//! Upload record read endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use whoisit_core::ImageId;
use whoisit_metadata::models::UploadRow;

/// Upload record response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecordResponse {
    pub upload_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub extension: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UploadRow> for UploadRecordResponse {
    fn from(row: UploadRow) -> Self {
        Self {
            upload_id: row.upload_id,
            file_name: row.file_name,
            url: row.url,
            extension: row.extension,
            created_at: row.created_at,
        }
    }
}

/// GET /v1/uploads/{upload_id} - Get the record of one upload.
pub async fn get_upload(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> ApiResult<Json<UploadRecordResponse>> {
    let image_id = ImageId::parse(&upload_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let row = state
        .metadata
        .get_upload(*image_id.as_uuid())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload {upload_id}")))?;
    Ok(Json(row.into()))
}
