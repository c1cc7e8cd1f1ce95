//! Object-created notifications.
//!
//! The envelope mirrors the S3 event notification document: a `Records` array where each
//! record names a bucket and a URL-encoded object key.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Characters escaped when encoding object keys into a notification.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

const OBJECT_CREATED_PUT: &str = "ObjectCreated:Put";

/// One notification document. May carry several object records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreatedEvent {
    /// Absent on storage "test events", which carry no objects.
    #[serde(rename = "Records", default)]
    pub records: Vec<ObjectRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntity {
    /// URL-encoded key, `+` standing for a space.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Decoded reference to a stored image.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectCreatedEvent {
    /// Parse a notification body.
    pub fn from_json(body: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Build a single-record notification for an object that was just written.
    pub fn for_object(bucket: &str, region: &str, key: &str, size: u64) -> Self {
        Self {
            records: vec![ObjectRecord {
                aws_region: Some(region.to_string()),
                event_name: Some(OBJECT_CREATED_PUT.to_string()),
                s3: S3Entity {
                    bucket: BucketEntity {
                        name: bucket.to_string(),
                    },
                    object: ObjectEntity {
                        key: utf8_percent_encode(key, KEY_ENCODE_SET).to_string(),
                        size: Some(size),
                    },
                },
            }],
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ObjectRecord {
    /// Bucket and decoded key of the referenced object.
    pub fn image_ref(&self) -> crate::Result<ImageRef> {
        if self.s3.bucket.name.is_empty() {
            return Err(crate::Error::InvalidEvent("record has no bucket".into()));
        }
        let plus_decoded = self.s3.object.key.replace('+', " ");
        let key = percent_decode_str(&plus_decoded)
            .decode_utf8()
            .map_err(|e| crate::Error::InvalidEvent(format!("object key is not UTF-8: {e}")))?
            .into_owned();
        if key.is_empty() {
            return Err(crate::Error::InvalidEvent("record has no object key".into()));
        }
        Ok(ImageRef {
            bucket: self.s3.bucket.name.clone(),
            key,
        })
    }
}
