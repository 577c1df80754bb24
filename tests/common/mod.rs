#![allow(dead_code)]

use std::sync::{Arc, Once};

use clipfeed::{
    model::{Notification, Post, User},
    persist::{Fields, memory::MemoryStore, paths},
    service::{Services, Session},
    types::NotificationType,
};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness; `RUST_LOG` filters it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();
    });
}

pub fn user(id: &str) -> User {
    User::new(id, format!("{id}_name"), format!("{id}@example.com"), format!("Full {id}"))
}

pub fn post(id: &str, owner: &str, timestamp: u64, likes: u64) -> Post {
    let mut post = Post::new(id, owner, timestamp);
    post.likes = likes;
    post
}

pub fn notification(id: &str, from: &str, kind: NotificationType, post_id: Option<&str>, timestamp: u64) -> Notification {
    Notification {
        id: id.to_string(),
        post_id: post_id.map(str::to_string),
        timestamp,
        kind,
        uid: from.to_string(),
        post: None,
        user: None,
    }
}

pub fn seed_user(store: &MemoryStore, id: &str) {
    store.seed(paths::USERS, id, &user(id)).expect("seed user");
}

pub fn seed_post(store: &MemoryStore, post: &Post) {
    store.seed(paths::POSTS, &post.id, post).expect("seed post");
}

/// Writes an empty edge document, as the services do.
pub fn seed_edge(store: &MemoryStore, collection: &str, id: &str) {
    store.seed(collection, id, &Fields::new()).expect("seed edge");
}

pub fn services(store: &Arc<MemoryStore>, uid: Option<&str>) -> Services {
    let session = match uid {
        Some(uid) => Session::signed_in(uid),
        None => Session::anonymous(),
    };
    Services::new(store.clone(), session)
}

pub fn post_likes(store: &MemoryStore, post_id: &str) -> u64 {
    store
        .document(paths::POSTS, post_id)
        .and_then(|doc| doc.field("likes").and_then(|v| v.as_u64()))
        .unwrap_or(0)
}
