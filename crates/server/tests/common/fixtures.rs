//! Test fixtures: image payloads, notification bodies and a scripted recognizer.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use whoisit_core::{ImageRef, ObjectCreatedEvent};
use whoisit_recognition::{
    RecognitionError, RecognitionOutcome, RecognitionResult, RecognizedIdentity, Recognizer,
};

/// Bytes of a 10x10 baseline JPEG (SOI .. EOI). Nothing in the pipeline decodes them.
#[allow(dead_code)]
pub fn test_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    // SOF0 for a 10x10 single-component image
    data.extend_from_slice(&[
        0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x0A, 0x00, 0x0A, 0x01, 0x01, 0x11, 0x00,
    ]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

#[allow(dead_code)]
pub fn test_jpeg_base64() -> String {
    STANDARD.encode(test_jpeg())
}

/// `POST /celeb` body.
#[allow(dead_code)]
pub fn upload_body(image_base64: &str, file_name: &str, extension: &str) -> Value {
    json!({
        "imageBase64": image_base64,
        "fileName": file_name,
        "extension": extension,
    })
}

/// Object-created notification body for one object.
#[allow(dead_code)]
pub fn notification_body(bucket: &str, region: &str, key: &str) -> String {
    ObjectCreatedEvent::for_object(bucket, region, key, 42)
        .to_json()
        .expect("serialize notification")
}

/// `POST /v1/notifications` body wrapping the given notification bodies.
#[allow(dead_code)]
pub fn sqs_event(bodies: &[String]) -> Value {
    let records: Vec<Value> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| json!({"messageId": format!("msg-{i}"), "body": body}))
        .collect();
    json!({ "Records": records })
}

/// Key of an uploaded object, taken from its public URL.
#[allow(dead_code)]
pub fn key_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or_default().to_string()
}

/// Recognizer returning scripted outcomes per object key.
///
/// Unknown keys yield an outcome with no faces.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeRecognizer {
    outcomes: Mutex<HashMap<String, RecognitionOutcome>>,
    failing_keys: Mutex<HashSet<String>>,
    failures_remaining: AtomicUsize,
    calls: Mutex<Vec<ImageRef>>,
}

#[allow(dead_code)]
impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the identities (in order) and unrecognized face count for `key`.
    pub fn set_identities(&self, key: &str, identities: &[(&str, &str)], unrecognized_faces: usize) {
        let outcome = RecognitionOutcome {
            identities: identities
                .iter()
                .map(|(id, name)| RecognizedIdentity {
                    identity_id: id.to_string(),
                    display_name: name.to_string(),
                    match_confidence: Some(99.0),
                    bounding_box: None,
                })
                .collect(),
            unrecognized_faces,
        };
        self.outcomes
            .lock()
            .unwrap()
            .insert(key.to_string(), outcome);
    }

    /// Fail every call for `key`.
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Fail the next `n` calls regardless of key.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ImageRef> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(&self, image: &ImageRef) -> RecognitionResult<RecognitionOutcome> {
        self.calls.lock().unwrap().push(image.clone());

        let injected = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(RecognitionError::Throttled("injected failure".to_string()));
        }

        if self.failing_keys.lock().unwrap().contains(&image.key) {
            return Err(RecognitionError::Service(Box::new(std::io::Error::other(
                format!("injected failure for {}", image.key),
            ))));
        }

        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .get(&image.key)
            .cloned()
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
