//! Image upload request types, validation and key derivation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Allowed image extensions. Matching is exact and case-sensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    Jpg,
    Png,
}

impl ImageExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    /// MIME type stored alongside the object.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl FromStr for ImageExtension {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "jpg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            other => Err(crate::Error::Validation(format!(
                "extension {other:?} is not one of jpg, png"
            ))),
        }
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /celeb`.
///
/// Missing fields deserialize as empty strings so they fail [`validate`](Self::validate)
/// rather than the JSON parse.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageUploadRequest {
    pub image_base64: String,
    pub file_name: String,
    pub extension: String,
}

impl ImageUploadRequest {
    /// Check required fields and the extension allow-list.
    pub fn validate(&self) -> crate::Result<ImageExtension> {
        if self.image_base64.is_empty() {
            return Err(crate::Error::Validation("imageBase64 is required".into()));
        }
        if self.file_name.is_empty() {
            return Err(crate::Error::Validation("fileName is required".into()));
        }
        if self.extension.is_empty() {
            return Err(crate::Error::Validation("extension is required".into()));
        }
        self.extension.parse()
    }

    /// Decode the image payload as standard (padded) base64.
    pub fn decode_image(&self) -> crate::Result<Vec<u8>> {
        Ok(STANDARD.decode(self.image_base64.as_bytes())?)
    }
}

/// Successful upload response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Generated identifier of an uploaded image.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Generate a new random image ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidImageId(format!("{s:?}: {e}")))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Object key for this image: `<uuid>.<ext>`.
    pub fn object_key(&self, extension: ImageExtension) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ImageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public URL of an object. Stored URLs depend on this exact format.
pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("http://{bucket}.s3-{region}.amazonaws.com/{key}")
}
