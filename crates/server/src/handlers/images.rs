//! Image upload handler.

use crate::error::{ApiError, ApiResult, UNMARSHAL_MESSAGE};
use crate::metrics::{METADATA_WRITE_FAILURES, UPLOAD_BYTES, UPLOADS_ACCEPTED, record_upload_error};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Request, State};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use whoisit_core::{ImageId, ImageUploadRequest, UploadResponse, public_url};
use whoisit_metadata::models::UploadRow;

/// POST /celeb - Store an uploaded image and return its public URL.
///
/// The upload record is written after the image; if that write fails the client still
/// gets the URL and the failure is only logged and counted.
pub async fn upload_image(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<UploadResponse>> {
    match store_image(&state, req).await {
        Ok(response) => {
            UPLOADS_ACCEPTED.inc();
            Ok(Json(response))
        }
        Err(e) => {
            record_upload_error(e.code());
            Err(e)
        }
    }
}

async fn store_image(state: &AppState, req: Request) -> ApiResult<UploadResponse> {
    let body: ImageUploadRequest = {
        let bytes = axum::body::to_bytes(req.into_body(), state.config.server.max_body_bytes)
            .await
            .map_err(|e| {
                debug!(error = %e, "failed to read upload body");
                ApiError::BadRequest(UNMARSHAL_MESSAGE.to_string())
            })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "invalid upload JSON");
            ApiError::BadRequest(UNMARSHAL_MESSAGE.to_string())
        })?
    };

    let extension = body
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let image = body.decode_image().map_err(|e| {
        warn!(file_name = %body.file_name, error = %e, "image payload is not valid base64");
        ApiError::Decode(e.to_string())
    })?;

    let image_id = ImageId::new();
    let key = image_id.object_key(extension);
    let size = image.len();

    state
        .storage
        .put(&key, Bytes::from(image), extension.content_type())
        .await
        .map_err(|e| {
            error!(key = %key, error = %e, "failed to store image");
            ApiError::UploadFailed(e)
        })?;
    UPLOAD_BYTES.inc_by(size as u64);

    let images = &state.config.images;
    let url = public_url(&images.bucket, &images.region, &key);

    let record = UploadRow {
        upload_id: *image_id.as_uuid(),
        file_name: body.file_name,
        url: url.clone(),
        extension: extension.as_str().to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    if let Err(e) = state.metadata.create_upload(&record).await {
        METADATA_WRITE_FAILURES.inc();
        error!(
            upload_id = %image_id,
            url = %url,
            error = %e,
            "failed to write upload record"
        );
    }

    info!(upload_id = %image_id, key = %key, size, "image uploaded");
    Ok(UploadResponse { url })
}
