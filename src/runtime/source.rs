//! Where a list's records come from and how its edges are written back.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{
    core::optimistic::Toggleable,
    engine::traits::Enriched,
    model::{Notification, Post},
    op::{EdgeState, Toggle},
    service::{FeedService, NotificationService, PostService, ServiceError, ServiceResult, Services, UserService},
};

/// Remote side of one list screen.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    /// Record type of the list.
    type Record: Toggleable;

    /// Fetches and enriches the full collection.
    async fn fetch(&self, max_in_flight: usize) -> ServiceResult<Enriched<Self::Record>>;

    /// Reorders freshly fetched records before they are installed.
    fn arrange(&self, _records: &mut Vec<Self::Record>) {}

    /// Reads server-side edge state for installed records. Records missing
    /// from the result keep their current state.
    async fn reconcile(&self, _records: Vec<Self::Record>) -> Vec<(String, EdgeState)> {
        Vec::new()
    }

    /// Issues the remote write for `toggle`, computed from the record as it
    /// was before the optimistic change.
    async fn write_edge(&self, snapshot: &Self::Record, toggle: Toggle) -> ServiceResult<()>;

    /// Deletes `record` remotely. Unsupported unless overridden.
    async fn delete(&self, _record: &Self::Record) -> ServiceResult<()> {
        Err(ServiceError::Unsupported("delete"))
    }
}

/// Display order of the main feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedArrangement {
    /// Random order on every load.
    #[default]
    Shuffled,
    /// Newest first, as the store returns it.
    AsFetched,
}

/// The main video feed: all posts, likeable, deletable by their owner.
pub struct FeedSource {
    feed: FeedService,
    posts: PostService,
    arrangement: FeedArrangement,
}

impl FeedSource {
    /// Feed over `services`, ordered by `arrangement`.
    pub fn new(services: &Services, arrangement: FeedArrangement) -> Self {
        Self {
            feed: services.feed(),
            posts: services.posts(),
            arrangement,
        }
    }
}

#[async_trait]
impl ListSource for FeedSource {
    type Record = Post;

    async fn fetch(&self, max_in_flight: usize) -> ServiceResult<Enriched<Post>> {
        self.feed.fetch_posts(max_in_flight).await
    }

    fn arrange(&self, records: &mut Vec<Post>) {
        if self.arrangement == FeedArrangement::Shuffled {
            records.shuffle(&mut rand::thread_rng());
        }
    }

    // One did-like check at a time, in list order.
    async fn reconcile(&self, records: Vec<Post>) -> Vec<(String, EdgeState)> {
        let mut states = Vec::with_capacity(records.len());
        for post in records {
            match self.posts.did_like(&post).await {
                Ok(liked) => states.push((post.id, EdgeState::from_exists(liked))),
                Err(err) => tracing::debug!(post_id = %post.id, %err, "like state not reconciled"),
            }
        }
        states
    }

    async fn write_edge(&self, snapshot: &Post, toggle: Toggle) -> ServiceResult<()> {
        match toggle {
            Toggle::On => self.posts.like_post(snapshot).await,
            Toggle::Off => self.posts.unlike_post(snapshot).await,
        }
    }

    async fn delete(&self, post: &Post) -> ServiceResult<()> {
        self.feed.delete_post(post).await
    }
}

/// The session user's notifications; the toggle follows the acting user.
pub struct NotificationSource {
    notifications: NotificationService,
    users: UserService,
}

impl NotificationSource {
    /// Notifications of the session user.
    pub fn new(services: &Services) -> Self {
        Self {
            notifications: services.notifications(),
            users: services.users(),
        }
    }
}

#[async_trait]
impl ListSource for NotificationSource {
    type Record = Notification;

    async fn fetch(&self, max_in_flight: usize) -> ServiceResult<Enriched<Notification>> {
        self.notifications.fetch_notifications(max_in_flight).await
    }

    async fn write_edge(&self, snapshot: &Notification, toggle: Toggle) -> ServiceResult<()> {
        match toggle {
            Toggle::On => self.users.follow(&snapshot.uid).await,
            Toggle::Off => self.users.unfollow(&snapshot.uid).await,
        }
    }
}
