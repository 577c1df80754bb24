mod common;

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use clipfeed::{
    model::Post,
    persist::{Fields, Query, RemoteStore, StoreError, get_as, paths, sqlite::SqliteStore},
    runtime::{
        handle::{RuntimeConfig, spawn_list},
        source::{FeedArrangement, FeedSource},
    },
    core::optimistic::MutationOutcome,
    service::{Services, Session},
};

use common::{init_tracing, post, user};

fn fields(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[tokio::test]
async fn documents_survive_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("store.db");

    {
        let store = SqliteStore::open(&db_path).expect("open");
        store
            .set_document("posts", "p1", fields(json!({"ownerUid": "u1", "timestamp": 2})))
            .await
            .expect("set");
        store
            .set_document("posts", "p2", fields(json!({"ownerUid": "u2", "timestamp": 9})))
            .await
            .expect("set");
        store
            .update_fields("posts", "p1", fields(json!({"likes": 4})))
            .await
            .expect("update");
    }

    let store = SqliteStore::open(&db_path).expect("reopen");
    let p1: Post = get_as(&store, "posts", "p1").await.expect("p1");
    assert_eq!((p1.owner_uid.as_str(), p1.likes, p1.timestamp), ("u1", 4, 2));

    let newest: Vec<_> = store
        .query(&Query::new("posts").order_by("timestamp", true))
        .await
        .expect("query")
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(newest, ["p2", "p1"]);

    let owned = store
        .query(&Query::new("posts").where_eq("ownerUid", "u2"))
        .await
        .expect("query");
    assert_eq!(owned.len(), 1);
}

#[tokio::test]
async fn missing_documents_and_blobs_are_not_found() {
    let store = SqliteStore::open_in_memory().expect("open");

    assert!(!store.exists("users", "nobody").await.expect("exists"));
    let err = store.get_document("users", "nobody").await.expect_err("missing");
    assert!(err.is_not_found());
    let err = store
        .update_fields("users", "nobody", Fields::new())
        .await
        .expect_err("missing");
    assert!(matches!(err, StoreError::NotFound { .. }));
    store.delete_document("users", "nobody").await.expect("delete is idempotent");

    let err = store.delete_blob("post_images/none").await.expect_err("missing");
    assert!(matches!(err, StoreError::BlobNotFound(_)));
}

#[tokio::test]
async fn blobs_round_trip_with_urls() {
    let store = SqliteStore::open_in_memory().expect("open");
    let path = paths::post_video("p1");

    let url = store
        .upload_blob(&path, vec![7; 32], Some(paths::VIDEO_CONTENT_TYPE))
        .await
        .expect("upload");
    assert!(url.ends_with(&path));
    assert_eq!(store.blob(&path).await.expect("blob"), Some(vec![7; 32]));

    store.delete_blob(&path).await.expect("delete");
    assert_eq!(store.blob(&path).await.expect("blob"), None);
}

#[tokio::test]
async fn add_document_assigns_an_id() {
    let store = SqliteStore::open_in_memory().expect("open");
    let id = store
        .add_document("notes", fields(json!({"text": "hi"})))
        .await
        .expect("add");
    let doc = store.get_document("notes", &id).await.expect("get");
    assert_eq!(doc.field("text"), Some(&json!("hi")));
}

#[tokio::test]
async fn feed_runs_over_sqlite() {
    init_tracing();
    let tmp = TempDir::new().expect("tmp");
    let store = Arc::new(SqliteStore::open(tmp.path().join("feed.db")).expect("open"));
    let u1 = user("u1");
    let p1 = post("p1", "u1", 1, 2);
    store
        .set_document(paths::USERS, "u1", clipfeed::persist::encode_fields(&u1).expect("encode"))
        .await
        .expect("user");
    store
        .set_document(paths::POSTS, "p1", clipfeed::persist::encode_fields(&p1).expect("encode"))
        .await
        .expect("post");

    let services = Services::new(store.clone(), Session::signed_in("u2"));
    let feed = spawn_list(
        FeedSource::new(&services, FeedArrangement::Shuffled),
        Vec::new(),
        RuntimeConfig::default(),
    );
    let report = feed.load().await.expect("load");
    assert_eq!((report.loaded, report.missing_enrichment), (1, 0));

    let ticket = feed.like("p1").await.expect("like");
    assert_eq!(ticket.settled().await, MutationOutcome::Confirmed);
    assert!(store.exists(&paths::user_likes("u2"), "p1").await.expect("exists"));
    let stored: Post = get_as(store.as_ref(), paths::POSTS, "p1").await.expect("post");
    assert_eq!(stored.likes, 3);

    feed.shutdown().await.expect("shutdown");
}
