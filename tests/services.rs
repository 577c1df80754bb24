mod common;

use std::sync::Arc;

use clipfeed::{
    model::Notification,
    persist::{Query, RemoteStore, memory::MemoryStore, paths, query_as},
    service::{ServiceError, UserListConfig, user_list::filter_users},
    types::NotificationType,
};

use common::{init_tracing, notification, post, post_likes, seed_edge, seed_post, seed_user, services};

async fn inbox(store: &MemoryStore, uid: &str) -> Vec<Notification> {
    query_as(store, &Query::new(paths::user_notifications(uid)))
        .await
        .expect("inbox")
}

#[tokio::test]
async fn like_and_unlike_maintain_edges_counter_and_notification() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "u1");
    seed_user(&store, "u2");
    let p = post("p1", "u1", 1, 3);
    seed_post(&store, &p);
    let posts = services(&store, Some("u2")).posts();

    posts.like_post(&p).await.expect("like");
    assert_eq!(post_likes(&store, "p1"), 4);
    assert!(posts.did_like(&p).await.expect("did_like"));
    let sent = inbox(&store, "u1").await;
    assert_eq!(sent.len(), 1);
    assert_eq!((sent[0].kind, sent[0].post_id.as_deref()), (NotificationType::Like, Some("p1")));

    let mut liked = p.clone();
    liked.likes = 4;
    posts.unlike_post(&liked).await.expect("unlike");
    assert_eq!(post_likes(&store, "p1"), 3);
    assert!(!posts.did_like(&p).await.expect("did_like"));
    assert!(inbox(&store, "u1").await.is_empty());
}

#[tokio::test]
async fn unlike_with_zero_likes_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let p = post("p1", "u1", 1, 0);
    seed_post(&store, &p);

    services(&store, Some("u2")).posts().unlike_post(&p).await.expect("unlike");
    assert_eq!(store.calls().writes, 0);
}

#[tokio::test]
async fn liking_own_post_sends_no_notification() {
    let store = Arc::new(MemoryStore::new());
    let p = post("p1", "u1", 1, 0);
    seed_post(&store, &p);

    services(&store, Some("u1")).posts().like_post(&p).await.expect("like");
    assert_eq!(post_likes(&store, "p1"), 1);
    assert_eq!(store.document_count(&paths::user_notifications("u1")), 0);
}

#[tokio::test]
async fn follow_and_unfollow_are_paired() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "u1");
    seed_user(&store, "u2");
    let users = services(&store, Some("u1")).users();

    assert!(!users.is_followed("u2").await.expect("is_followed"));
    users.follow("u2").await.expect("follow");
    assert!(users.is_followed("u2").await.expect("is_followed"));
    assert!(store.contains(&paths::user_followers("u2"), "u1"));
    let sent = inbox(&store, "u2").await;
    assert_eq!(sent.len(), 1);
    assert_eq!((sent[0].kind, sent[0].uid.as_str()), (NotificationType::Follow, "u1"));

    let stats = users.fetch_user_stats("u2").await.expect("stats");
    assert_eq!((stats.followers, stats.following), (1, 0));

    users.unfollow("u2").await.expect("unfollow");
    assert!(!store.contains(&paths::user_following("u1"), "u2"));
    assert!(!store.contains(&paths::user_followers("u2"), "u1"));
    assert!(inbox(&store, "u2").await.is_empty());
}

#[tokio::test]
async fn following_yourself_is_forbidden() {
    let store = Arc::new(MemoryStore::new());
    let err = services(&store, Some("u1"))
        .users()
        .follow("u1")
        .await
        .expect_err("self follow");
    assert!(matches!(err, ServiceError::Forbidden(_)));
    assert_eq!(store.calls().writes, 0);
}

#[tokio::test]
async fn anonymous_writes_are_rejected_and_reads_answer_false() {
    let store = Arc::new(MemoryStore::new());
    let p = post("p1", "u1", 1, 0);
    seed_post(&store, &p);
    let services = services(&store, None);

    assert_eq!(services.posts().like_post(&p).await, Err(ServiceError::Unauthenticated));
    assert_eq!(services.users().follow("u1").await, Err(ServiceError::Unauthenticated));
    assert!(!services.posts().did_like(&p).await.expect("did_like"));
    assert!(!services.users().is_followed("u1").await.expect("is_followed"));
    assert!(matches!(
        services.notifications().fetch_notifications(4).await,
        Err(ServiceError::Unauthenticated)
    ));
}

#[tokio::test]
async fn stats_sum_likes_across_owned_posts() {
    let store = Arc::new(MemoryStore::new());
    seed_post(&store, &post("p1", "u1", 1, 3));
    seed_post(&store, &post("p2", "u1", 2, 4));
    seed_post(&store, &post("p3", "u2", 3, 100));
    seed_edge(&store, &paths::user_following("u1"), "u2");
    seed_edge(&store, &paths::user_following("u1"), "u3");
    seed_edge(&store, &paths::user_followers("u1"), "u3");

    let stats = services(&store, None).users().fetch_user_stats("u1").await.expect("stats");
    assert_eq!((stats.following, stats.followers, stats.likes), (2, 1, 7));
}

#[tokio::test]
async fn delete_notification_matches_kind_and_post() {
    let store = Arc::new(MemoryStore::new());
    let inbox_path = paths::user_notifications("u1");
    for n in [
        notification("a", "u2", NotificationType::Like, Some("p1"), 1),
        notification("b", "u2", NotificationType::Like, Some("p2"), 2),
        notification("c", "u2", NotificationType::Comment, Some("p1"), 3),
        notification("d", "u3", NotificationType::Like, Some("p1"), 4),
    ] {
        store.seed(&inbox_path, &n.id, &n).expect("seed");
    }

    let deleted = services(&store, Some("u2"))
        .notifications()
        .delete_notification("u1", NotificationType::Like, Some("p1"))
        .await
        .expect("delete");
    assert_eq!(deleted, 1);

    let left: Vec<_> = inbox(&store, "u1").await.into_iter().map(|n| n.id).collect();
    assert_eq!(left, ["b", "c", "d"]);
}

#[tokio::test]
async fn notifying_yourself_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let id = services(&store, Some("u1"))
        .notifications()
        .upload_notification("u1", NotificationType::Follow, None)
        .await
        .expect("upload");
    assert_eq!(id, None);
    assert_eq!(store.document_count(&paths::user_notifications("u1")), 0);
}

#[tokio::test]
async fn upload_comment_bumps_count_and_notifies_owner() {
    let store = Arc::new(MemoryStore::new());
    let p = post("p1", "u1", 1, 0);
    seed_post(&store, &p);

    let comment = services(&store, Some("u2"))
        .comments()
        .upload_comment(&p, "nice")
        .await
        .expect("comment");

    assert!(store.contains(&paths::post_comments("p1"), &comment.id));
    let count = store
        .document(paths::POSTS, "p1")
        .and_then(|d| d.field("commentCount").and_then(|v| v.as_u64()));
    assert_eq!(count, Some(1));
    let sent = inbox(&store, "u1").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationType::Comment);
}

#[tokio::test]
async fn delete_post_removes_reverse_edges_and_media() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let p = post("p1", "u1", 1, 2);
    seed_post(&store, &p);
    for liker in ["u2", "u3"] {
        seed_edge(&store, &paths::post_likes("p1"), liker);
        seed_edge(&store, &paths::user_likes(liker), "p1");
    }
    store
        .upload_blob(&paths::post_video("p1"), vec![1, 2, 3], Some(paths::VIDEO_CONTENT_TYPE))
        .await
        .expect("video");

    services(&store, Some("u1")).feed().delete_post(&p).await.expect("delete");

    assert!(!store.contains(paths::POSTS, "p1"));
    assert!(!store.contains(&paths::user_likes("u2"), "p1"));
    assert!(!store.contains(&paths::user_likes("u3"), "p1"));
    assert!(store.blob(&paths::post_video("p1")).is_none());
}

#[tokio::test]
async fn profile_image_replaces_blob_and_url() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "u1");
    let users = services(&store, Some("u1")).users();

    let url = users.update_profile_image(vec![9, 9]).await.expect("upload");
    assert_eq!(store.blob(&paths::profile_image("u1")), Some(vec![9, 9]));
    assert_eq!(
        store.blob_content_type(&paths::profile_image("u1")).as_deref(),
        Some(paths::IMAGE_CONTENT_TYPE)
    );
    let user = users.fetch_current_user().await.expect("user");
    assert_eq!(user.profile_image_url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn failed_upload_is_not_retried() {
    let store = Arc::new(MemoryStore::new());
    store.fail_uploads();
    let media = services(&store, Some("u1")).media();

    let err = media.upload_video("p1", vec![0; 16]).await.expect_err("upload");
    assert!(matches!(err, ServiceError::Store(_)));
    assert_eq!(store.calls().writes, 1);
}

#[tokio::test]
async fn search_lists_everyone_but_the_session_user() {
    let store = Arc::new(MemoryStore::new());
    for uid in ["u1", "u2", "u3"] {
        seed_user(&store, uid);
    }
    let lists = services(&store, Some("u2")).user_lists();

    let users = lists.fetch_users(&UserListConfig::Search).await.expect("search");
    let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["u1", "u3"]);

    let hits = filter_users(&users, "FULL U3");
    assert_eq!(hits.len(), 1);
    assert!(lists.fetch_users(&UserListConfig::Blocked).await.expect("blocked").is_empty());
}
