use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    /// Error responses carry a plain-text message, surfaced as-is.
    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, body);
        }
        serde_json::from_str(&body).with_context(|| format!("unexpected response body: {body}"))
    }

    pub async fn upload_image(&self, req: &UploadImageRequest) -> Result<UploadImageResponse> {
        let url = self.url("/celeb")?;
        self.send_json(self.http.post(url).json(req)).await
    }

    pub async fn get_identity(&self, identity_id: &str) -> Result<IdentityResponse> {
        let mut url = self.url("/v1/identities/")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("server URL cannot be a base"))?
            .pop_if_empty()
            .push(identity_id);
        self.send_json(self.http.get(url)).await
    }

    pub async fn list_identities(&self, limit: Option<u32>) -> Result<Vec<IdentitySummary>> {
        let mut url = self.url("/v1/identities")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        self.send_json(self.http.get(url)).await
    }

    pub async fn get_upload(&self, upload_id: &str) -> Result<UploadRecordResponse> {
        let url = self.url(&format!("/v1/uploads/{upload_id}"))?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.url("/v1/health")?;
        self.send_json(self.http.get(url)).await
    }
}

// =============================================================================
// Request/response types (mirrored from server handlers)
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    pub image_base64: String,
    pub file_name: String,
    pub extension: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadImageResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub image_count: i64,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecordResponse {
    pub upload_id: String,
    pub file_name: String,
    pub url: String,
    pub extension: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
