//! Identity index read endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use whoisit_metadata::models::{IdentityRecord, IdentitySummaryRow};

/// Default page size for identity listings.
pub const DEFAULT_LIST_LIMIT: u32 = 100;
/// Largest accepted page size.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Identity record response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub identity_id: String,
    pub display_name: Option<String>,
    /// Oldest first; may contain duplicates.
    pub image_urls: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<IdentityRecord> for IdentityResponse {
    fn from(record: IdentityRecord) -> Self {
        Self {
            identity_id: record.identity_id,
            display_name: record.display_name,
            image_urls: record.image_urls,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Identity listing entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub image_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<IdentitySummaryRow> for IdentitySummary {
    fn from(row: IdentitySummaryRow) -> Self {
        Self {
            identity_id: row.identity_id,
            display_name: row.display_name,
            image_count: row.image_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListIdentitiesQuery {
    pub limit: Option<u32>,
}

/// GET /v1/identities/{identity_id} - Get one identity record.
pub async fn get_identity(
    State(state): State<AppState>,
    Path(identity_id): Path<String>,
) -> ApiResult<Json<IdentityResponse>> {
    let record = state
        .metadata
        .get_identity(&identity_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("identity {identity_id}")))?;
    Ok(Json(record.into()))
}

/// GET /v1/identities - List identities ordered by id.
pub async fn list_identities(
    State(state): State<AppState>,
    Query(query): Query<ListIdentitiesQuery>,
) -> ApiResult<Json<Vec<IdentitySummary>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let rows = state.metadata.list_identities(limit).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
