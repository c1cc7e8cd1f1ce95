//! Recognizer trait and result types.

use crate::error::RecognitionResult;
use async_trait::async_trait;
use whoisit_core::ImageRef;

/// Face position as ratios of the image dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub top: f32,
}

/// One face matched to a known identity.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedIdentity {
    /// Stable across calls for the same person.
    pub identity_id: String,
    pub display_name: String,
    pub match_confidence: Option<f32>,
    pub bounding_box: Option<FaceBox>,
}

/// Result of analyzing one image. Not persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecognitionOutcome {
    /// In the order returned by the service.
    pub identities: Vec<RecognizedIdentity>,
    /// Faces detected but not matched to any identity.
    pub unrecognized_faces: usize,
}

/// Recognition capability for stored images.
#[async_trait]
pub trait Recognizer: Send + Sync + 'static {
    /// Recognize identities in the referenced image.
    async fn recognize(&self, image: &ImageRef) -> RecognitionResult<RecognitionOutcome>;

    /// Static identifier of the backend, used in logs.
    fn backend_name(&self) -> &'static str;
}
