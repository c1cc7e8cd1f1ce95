//! Amazon Rekognition celebrity recognition backend.

use crate::error::{RecognitionError, RecognitionResult};
use crate::traits::{FaceBox, RecognitionOutcome, RecognizedIdentity, Recognizer};
use async_trait::async_trait;
use aws_sdk_rekognition::Client;
use aws_sdk_rekognition::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_rekognition::operation::recognize_celebrities::RecognizeCelebritiesOutput;
use aws_sdk_rekognition::types::{BoundingBox, Image, S3Object};
use tracing::{debug, instrument, warn};
use whoisit_core::ImageRef;

const INVALID_IMAGE_CODES: &[&str] = &[
    "InvalidS3ObjectException",
    "InvalidImageFormatException",
    "ImageTooLargeException",
];

const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
];

/// Recognizer backed by `RecognizeCelebrities`, reading the image straight from S3.
#[derive(Clone, Debug)]
pub struct RekognitionRecognizer {
    client: Client,
}

impl RekognitionRecognizer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

fn map_sdk_error<E>(err: SdkError<E>, key: &str) -> RecognitionError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.code().unwrap_or_default().to_string();
    let message = err.message().unwrap_or_default().to_string();
    if INVALID_IMAGE_CODES.contains(&code.as_str()) {
        return RecognitionError::InvalidImage {
            key: key.to_string(),
            code,
            message,
        };
    }
    if THROTTLING_CODES.contains(&code.as_str()) {
        return RecognitionError::Throttled(message);
    }
    RecognitionError::Service(Box::new(err))
}

fn face_box(bounding_box: &BoundingBox) -> Option<FaceBox> {
    Some(FaceBox {
        width: bounding_box.width()?,
        height: bounding_box.height()?,
        left: bounding_box.left()?,
        top: bounding_box.top()?,
    })
}

/// Convert a service response, keeping the service's order.
///
/// Matches without an id or a name cannot be indexed and are dropped with a warning.
pub(crate) fn outcome_from_output(output: &RecognizeCelebritiesOutput) -> RecognitionOutcome {
    let identities = output
        .celebrity_faces()
        .iter()
        .filter_map(|celebrity| {
            let (Some(id), Some(name)) = (celebrity.id(), celebrity.name()) else {
                warn!(
                    id = ?celebrity.id(),
                    name = ?celebrity.name(),
                    "skipping celebrity match without id or name"
                );
                return None;
            };
            if id.is_empty() {
                warn!(name = %name, "skipping celebrity match with empty id");
                return None;
            }
            Some(RecognizedIdentity {
                identity_id: id.to_string(),
                display_name: name.to_string(),
                match_confidence: celebrity.match_confidence(),
                bounding_box: celebrity
                    .face()
                    .and_then(|face| face.bounding_box())
                    .and_then(face_box),
            })
        })
        .collect();

    RecognitionOutcome {
        identities,
        unrecognized_faces: output.unrecognized_faces().len(),
    }
}

#[async_trait]
impl Recognizer for RekognitionRecognizer {
    #[instrument(skip(self), fields(backend = "rekognition", bucket = %image.bucket, key = %image.key))]
    async fn recognize(&self, image: &ImageRef) -> RecognitionResult<RecognitionOutcome> {
        let request_image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&image.bucket)
                    .name(&image.key)
                    .build(),
            )
            .build();

        let output = self
            .client
            .recognize_celebrities()
            .image(request_image)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &image.key))?;

        let outcome = outcome_from_output(&output);
        debug!(
            identities = outcome.identities.len(),
            unrecognized_faces = outcome.unrecognized_faces,
            "recognition complete"
        );
        Ok(outcome)
    }

    fn backend_name(&self) -> &'static str {
        "rekognition"
    }
}
