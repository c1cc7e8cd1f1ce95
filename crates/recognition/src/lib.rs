//! Celebrity face recognition for whoisit.
//!
//! This crate provides:
//! - The [`Recognizer`] trait consumed by the analysis handler
//! - Recognition result types
//! - An Amazon Rekognition backend

pub mod error;
pub mod rekognition;
pub mod traits;

pub use error::{RecognitionError, RecognitionResult};
pub use rekognition::RekognitionRecognizer;
pub use traits::{FaceBox, RecognitionOutcome, RecognizedIdentity, Recognizer};
