//! Integration tests for MetadataStore implementations.

mod common;

use common::run_metadata_test_both;
use futures::future::join_all;
use std::collections::HashSet;
use time::OffsetDateTime;
use uuid::Uuid;
use whoisit_metadata::MetadataError;
use whoisit_metadata::models::UploadRow;

/// Whole-second timestamp, so round-trips through either backend compare equal.
fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().replace_nanosecond(0).unwrap()
}

fn url(key: &str) -> String {
    format!("http://testbucket.s3-us-east-1.amazonaws.com/{key}")
}

#[tokio::test]
async fn test_upload_record_lifecycle() {
    run_metadata_test_both(|store| async move {
        let row = UploadRow {
            upload_id: Uuid::new_v4(),
            file_name: "holiday.png".to_string(),
            url: url("holiday.png"),
            extension: "png".to_string(),
            created_at: now(),
        };

        assert!(store.get_upload(row.upload_id).await.unwrap().is_none());
        store.create_upload(&row).await.unwrap();
        assert_eq!(store.get_upload(row.upload_id).await.unwrap(), Some(row.clone()));

        let err = store.create_upload(&row).await.unwrap_err();
        assert!(matches!(err, MetadataError::AlreadyExists(_)), "got {err}");
    })
    .await;
}

#[tokio::test]
async fn test_merge_creates_identity() {
    run_metadata_test_both(|store| async move {
        let at = now();
        let record = store
            .merge_identity("C1", "Jane", &url("a.jpg"), at)
            .await
            .unwrap();

        assert_eq!(record.identity_id, "C1");
        assert_eq!(record.display_name.as_deref(), Some("Jane"));
        assert_eq!(record.image_urls, vec![url("a.jpg")]);
        assert_eq!(record.created_at, at);

        let fetched = store.get_identity("C1").await.unwrap().unwrap();
        assert_eq!(fetched, record);
        assert!(store.get_identity("C2").await.unwrap().is_none());
    })
    .await;
}

#[tokio::test]
async fn test_merge_appends_and_keeps_first_name() {
    run_metadata_test_both(|store| async move {
        let first = now();
        let later = first + time::Duration::seconds(30);

        store
            .merge_identity("C1", "Jane", &url("a.jpg"), first)
            .await
            .unwrap();
        let record = store
            .merge_identity("C1", "Jane Doe", &url("b.jpg"), later)
            .await
            .unwrap();

        assert_eq!(record.display_name.as_deref(), Some("Jane"));
        assert_eq!(record.image_urls, vec![url("a.jpg"), url("b.jpg")]);
        assert_eq!(record.created_at, first);
        assert_eq!(record.updated_at, later);
    })
    .await;
}

#[tokio::test]
async fn test_merge_keeps_duplicate_urls() {
    run_metadata_test_both(|store| async move {
        for _ in 0..3 {
            store
                .merge_identity("C1", "Jane", &url("a.jpg"), now())
                .await
                .unwrap();
        }
        let record = store.get_identity("C1").await.unwrap().unwrap();
        assert_eq!(record.image_urls, vec![url("a.jpg"); 3]);
    })
    .await;
}

#[tokio::test]
async fn test_concurrent_merges_lose_nothing() {
    run_metadata_test_both(|store| async move {
        let merges = (0..50).map(|i| {
            let store = store.clone();
            async move {
                store
                    .merge_identity("C1", "Jane", &url(&format!("{i}.jpg")), now())
                    .await
            }
        });
        for result in join_all(merges).await {
            result.unwrap();
        }

        let record = store.get_identity("C1").await.unwrap().unwrap();
        assert_eq!(record.image_urls.len(), 50);
        let unique: HashSet<_> = record.image_urls.iter().collect();
        assert_eq!(unique.len(), 50);
    })
    .await;
}

#[tokio::test]
async fn test_list_identities_sorted_with_counts() {
    run_metadata_test_both(|store| async move {
        assert!(store.list_identities(10).await.unwrap().is_empty());

        for (id, key) in [("C3", "x.jpg"), ("C1", "y.jpg"), ("C2", "z.jpg"), ("C1", "w.jpg")] {
            store.merge_identity(id, "Name", &url(key), now()).await.unwrap();
        }

        let all = store.list_identities(10).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.identity_id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
        let counts: Vec<i64> = all.iter().map(|r| r.image_count).collect();
        assert_eq!(counts, vec![2, 1, 1]);

        let limited = store.list_identities(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].identity_id, "C1");
    })
    .await;
}

#[tokio::test]
async fn test_health_check() {
    run_metadata_test_both(|store| async move {
        store.health_check().await.unwrap();
        // Re-running migrations against an existing schema is a no-op.
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();
    })
    .await;
}
