//! Concrete enrichers for the feed, notifications, comments, and user lists.

use async_trait::async_trait;

use crate::{
    model::{Comment, Notification, Post, User},
    op::EdgeState,
    service::{PostService, UserService},
    types::{NotificationType, UserId},
};

use super::traits::{EnrichField, EnrichMiss, Enricher};

/// Attaches the owning user to each post.
pub struct PostOwnerEnricher {
    users: UserService,
}

impl PostOwnerEnricher {
    /// Enricher resolving owners through `users`.
    pub fn new(users: UserService) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Enricher for PostOwnerEnricher {
    type Record = Post;

    async fn enrich(&self, mut post: Post) -> (Post, Vec<EnrichMiss>) {
        match self.users.fetch_user(&post.owner_uid).await {
            Ok(user) => {
                post.user = Some(user);
                (post, Vec::new())
            }
            Err(err) => {
                let miss = EnrichMiss::new(post.id.clone(), EnrichField::User, err);
                (post, vec![miss])
            }
        }
    }
}

/// Attaches the acting user, the referenced post, and for follow
/// notifications whether the session user follows back.
///
/// The three fetches for one notification run concurrently.
pub struct NotificationEnricher {
    users: UserService,
    posts: PostService,
}

impl NotificationEnricher {
    /// Enricher resolving users and posts through the given services.
    pub fn new(users: UserService, posts: PostService) -> Self {
        Self { users, posts }
    }
}

#[async_trait]
impl Enricher for NotificationEnricher {
    type Record = Notification;

    async fn enrich(&self, mut n: Notification) -> (Notification, Vec<EnrichMiss>) {
        let wants_follow = n.kind == NotificationType::Follow;

        let user_fut = self.users.fetch_user(&n.uid);
        let post_fut = async {
            match n.post_id.as_deref() {
                Some(post_id) => Some(self.posts.fetch_post(post_id).await),
                None => None,
            }
        };
        let follow_fut = async {
            if wants_follow {
                Some(self.users.is_followed(&n.uid).await)
            } else {
                None
            }
        };
        let (user, post, follow) = tokio::join!(user_fut, post_fut, follow_fut);

        let mut misses = Vec::new();
        match user {
            Ok(mut user) => {
                match follow {
                    Some(Ok(followed)) => user.follow = Some(EdgeState::from_exists(followed)),
                    Some(Err(err)) => {
                        misses.push(EnrichMiss::new(n.id.clone(), EnrichField::FollowState, err));
                    }
                    None => {}
                }
                n.user = Some(user);
            }
            Err(err) => misses.push(EnrichMiss::new(n.id.clone(), EnrichField::User, err)),
        }
        match post {
            Some(Ok(post)) => n.post = Some(post),
            Some(Err(err)) => misses.push(EnrichMiss::new(n.id.clone(), EnrichField::Post, err)),
            None => {}
        }
        (n, misses)
    }
}

/// Attaches the author to each comment.
pub struct CommentAuthorEnricher {
    users: UserService,
}

impl CommentAuthorEnricher {
    /// Enricher resolving authors through `users`.
    pub fn new(users: UserService) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Enricher for CommentAuthorEnricher {
    type Record = Comment;

    async fn enrich(&self, mut comment: Comment) -> (Comment, Vec<EnrichMiss>) {
        match self.users.fetch_user(&comment.comment_owner_uid).await {
            Ok(user) => {
                comment.user = Some(user);
                (comment, Vec::new())
            }
            Err(err) => {
                let miss = EnrichMiss::new(comment.id.clone(), EnrichField::User, err);
                (comment, vec![miss])
            }
        }
    }
}

/// A user id waiting to be resolved into a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSlot {
    /// Uid to resolve.
    pub uid: UserId,
    /// Resolved profile; `None` if the fetch failed.
    pub user: Option<User>,
}

impl UserSlot {
    /// Unresolved slot for `uid`.
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            user: None,
        }
    }
}

/// Resolves [`UserSlot`]s, used for follower and following lists.
pub struct UserResolver {
    users: UserService,
}

impl UserResolver {
    /// Resolver fetching profiles through `users`.
    pub fn new(users: UserService) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Enricher for UserResolver {
    type Record = UserSlot;

    async fn enrich(&self, mut slot: UserSlot) -> (UserSlot, Vec<EnrichMiss>) {
        match self.users.fetch_user(&slot.uid).await {
            Ok(user) => {
                slot.user = Some(user);
                (slot, Vec::new())
            }
            Err(err) => {
                let miss = EnrichMiss::new(slot.uid.clone(), EnrichField::User, err);
                (slot, vec![miss])
            }
        }
    }
}
