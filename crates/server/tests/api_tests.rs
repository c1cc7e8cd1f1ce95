//! Integration tests for HTTP API endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    FailingStore, TestServer, key_from_url, notification_body, sqs_event, test_jpeg,
    test_jpeg_base64, upload_body,
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

const URL_PREFIX: &str = "http://testbucket.s3-us-east-1.amazonaws.com/";

async fn upload(server: &TestServer, file_name: &str, extension: &str) -> String {
    let (status, body) = server
        .json_request(
            "POST",
            "/celeb",
            Some(upload_body(&test_jpeg_base64(), file_name, extension)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    body["url"].as_str().unwrap().to_string()
}

// =============================================================================
// Upload handler
// =============================================================================

#[tokio::test]
async fn test_upload_returns_derived_public_url() {
    let server = TestServer::new().await;
    let url = upload(&server, "a.jpg", "jpg").await;

    let key = url.strip_prefix(URL_PREFIX).expect("url prefix");
    let id = key.strip_suffix(".jpg").expect("jpg suffix");
    Uuid::parse_str(id).expect("key is a uuid");

    assert_eq!(server.stored_objects(), vec![key.to_string()]);
    let stored = std::fs::read(server.storage_path.join(key)).unwrap();
    assert_eq!(stored, test_jpeg());
}

#[tokio::test]
async fn test_upload_writes_upload_record() {
    let server = TestServer::new().await;
    let url = upload(&server, "holiday.png", "png").await;
    assert!(url.ends_with(".png"));

    let upload_id = key_from_url(&url).trim_end_matches(".png").to_string();
    let (status, record) = server
        .json_request("GET", &format!("/v1/uploads/{upload_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["uploadId"], upload_id);
    assert_eq!(record["fileName"], "holiday.png");
    assert_eq!(record["url"], url);
    assert_eq!(record["extension"], "png");
}

#[tokio::test]
async fn test_each_upload_gets_a_fresh_key() {
    let server = TestServer::new().await;
    let first = upload(&server, "a.jpg", "jpg").await;
    let second = upload(&server, "a.jpg", "jpg").await;
    assert_ne!(first, second);
    assert_eq!(server.stored_objects().len(), 2);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extensions() {
    let server = TestServer::new().await;

    for extension in ["gif", "JPG", "jpeg", "png "] {
        let (status, _) = server
            .request(
                "POST",
                "/celeb",
                Some(upload_body(&test_jpeg_base64(), "a.gif", extension).to_string()),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "extension {extension:?}");
    }
    assert!(server.stored_objects().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_missing_fields() {
    let server = TestServer::new().await;

    let cases = [
        upload_body(&test_jpeg_base64(), "", "jpg"),
        upload_body("", "a.jpg", "jpg"),
        upload_body(&test_jpeg_base64(), "a.jpg", ""),
        json!({"imageBase64": test_jpeg_base64(), "extension": "jpg"}),
    ];
    for body in cases {
        let (status, _) = server.request("POST", "/celeb", Some(body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
    }
    assert!(server.stored_objects().is_empty());
}

#[tokio::test]
async fn test_upload_malformed_json() {
    let server = TestServer::new().await;
    let (status, body) = server
        .request("POST", "/celeb", Some("{not json".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "error unmarshalling request");
}

#[tokio::test]
async fn test_upload_body_over_limit() {
    let server = TestServer::with_config(|config| config.server.max_body_bytes = 64).await;
    let body = upload_body(&"A".repeat(200), "a.jpg", "jpg").to_string();
    let (status, text) = server.request("POST", "/celeb", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "error unmarshalling request");
    assert!(server.stored_objects().is_empty());
}

#[tokio::test]
async fn test_upload_invalid_base64_is_server_error() {
    let server = TestServer::new().await;
    let (status, _) = server
        .request(
            "POST",
            "/celeb",
            Some(upload_body("not base64!!", "a.jpg", "jpg").to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(server.stored_objects().is_empty());
}

#[tokio::test]
async fn test_upload_storage_failure_is_client_error() {
    let server = TestServer::with_storage(Arc::new(FailingStore)).await;
    let (status, body) = server
        .request(
            "POST",
            "/celeb",
            Some(upload_body(&test_jpeg_base64(), "a.jpg", "jpg").to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "unable to upload to storage");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploads")
        .fetch_one(server.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_upload_succeeds_when_record_write_fails() {
    let server = TestServer::new().await;
    sqlx::query("DROP TABLE uploads")
        .execute(server.pool())
        .await
        .unwrap();

    let url = upload(&server, "a.jpg", "jpg").await;
    assert!(url.starts_with(URL_PREFIX));
    assert_eq!(server.stored_objects().len(), 1);
}

// =============================================================================
// Notifications and the end-to-end pipeline
// =============================================================================

#[tokio::test]
async fn test_upload_then_recognize_indexes_identity() {
    let server = TestServer::new().await;
    let url = upload(&server, "a.jpg", "jpg").await;
    let key = key_from_url(&url);
    server.recognizer.set_identities(&key, &[("C1", "Jane")], 0);

    let event = sqs_event(&[notification_body("testbucket", "us-east-1", &key)]);
    let (status, report) = server
        .json_request("POST", "/v1/notifications", Some(event))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        report,
        json!({"messages": 1, "objects": 1, "identitiesMerged": 1, "unrecognizedFaces": 0})
    );

    let (status, identity) = server.json_request("GET", "/v1/identities/C1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(identity["identityId"], "C1");
    assert_eq!(identity["displayName"], "Jane");
    assert_eq!(identity["imageUrls"], json!([url]));
}

#[tokio::test]
async fn test_notification_recognition_failure_is_500() {
    let server = TestServer::new().await;
    server.recognizer.fail_key("broken.jpg");

    let event = sqs_event(&[notification_body("testbucket", "us-east-1", "broken.jpg")]);
    let (status, body) = server
        .request("POST", "/v1/notifications", Some(event.to_string()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("broken.jpg"), "body: {body}");
}

#[tokio::test]
async fn test_notification_without_records_is_noop() {
    let server = TestServer::new().await;
    let test_event = json!({
        "Service": "Amazon S3",
        "Event": "s3:TestEvent",
        "Bucket": "testbucket"
    })
    .to_string();

    let (status, report) = server
        .json_request("POST", "/v1/notifications", Some(sqs_event(&[test_event])))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["messages"], 1);
    assert_eq!(report["objects"], 0);
    assert!(server.recognizer.calls().is_empty());
}

#[tokio::test]
async fn test_notification_malformed_envelope() {
    let server = TestServer::new().await;
    let (status, _) = server
        .request(
            "POST",
            "/v1/notifications",
            Some(r#"{"Records": "nope"}"#.to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let event = sqs_event(&["not a notification".to_string()]);
    let (status, _) = server
        .request("POST", "/v1/notifications", Some(event.to_string()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Read endpoints
// =============================================================================

#[tokio::test]
async fn test_get_identity_not_found() {
    let server = TestServer::new().await;
    let (status, _) = server.request("GET", "/v1/identities/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_identities_ordered_and_limited() {
    let server = TestServer::new().await;
    server
        .recognizer
        .set_identities("group.jpg", &[("C3", "Zed"), ("C1", "Jane"), ("C2", "Bob")], 1);
    server.recognizer.set_identities("solo.jpg", &[("C1", "Jane")], 0);

    let event = sqs_event(&[
        notification_body("testbucket", "us-east-1", "group.jpg"),
        notification_body("testbucket", "us-east-1", "solo.jpg"),
    ]);
    let (status, report) = server
        .json_request("POST", "/v1/notifications", Some(event))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["identitiesMerged"], 4);
    assert_eq!(report["unrecognizedFaces"], 1);

    let (status, list) = server.json_request("GET", "/v1/identities", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["identityId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["C1", "C2", "C3"]);
    assert_eq!(list[0]["imageCount"], 2);

    let (_, limited) = server
        .json_request("GET", "/v1/identities?limit=2", None)
        .await;
    assert_eq!(limited.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_upload_errors() {
    let server = TestServer::new().await;

    let (status, _) = server.request("GET", "/v1/uploads/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .request("GET", &format!("/v1/uploads/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;
    let (status, body) = server.json_request("GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], Value::from(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_health_check_reports_storage_failure() {
    let server = TestServer::with_storage(Arc::new(FailingStore)).await;
    let (status, _) = server.request("GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_metrics_endpoint_toggle() {
    whoisit_server::metrics::register_metrics();

    let server = TestServer::new().await;
    upload(&server, "a.jpg", "jpg").await;
    let (status, body) = server.request("GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("whoisit_uploads_accepted_total"));

    let server = TestServer::with_config(|config| config.server.metrics_enabled = false).await;
    let (status, _) = server.request("GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
