//! Domain documents: users, posts, notifications, and comments.
//!
//! Fields marked `#[serde(skip)]` are local-only: they are filled in by
//! enrichment or by the optimistic controller and never written back.

use serde::{Deserialize, Serialize};

use crate::{
    core::{list::Record, optimistic::Toggleable},
    op::{EdgePatch, EdgeState},
    types::{CommentId, NotificationId, NotificationType, PostId, TimestampMs, UserId},
};

/// Aggregate counters shown on a profile.
///
/// Computed from the edge collections on demand, so they may lag behind the
/// edges themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserStats {
    /// Accounts this user follows.
    pub following: u64,
    /// Accounts following this user.
    pub followers: u64,
    /// Likes summed over this user's posts.
    pub likes: u64,
}

/// User profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Auth uid and document id.
    pub id: UserId,
    /// Unique handle.
    pub username: String,
    /// Sign-in email.
    pub email: String,
    /// Display name.
    pub fullname: String,
    /// Optional biography.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Download URL of the profile picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    /// Follow edge from the session user, once resolved.
    #[serde(skip)]
    pub follow: Option<EdgeState>,
    /// Profile counters; zero when absent from the document.
    #[serde(default)]
    pub stats: UserStats,
}

impl User {
    /// Creates a profile with empty optional fields and zeroed stats.
    pub fn new(
        id: impl Into<UserId>,
        username: impl Into<String>,
        email: impl Into<String>,
        fullname: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            fullname: fullname.into(),
            bio: None,
            profile_image_url: None,
            follow: None,
            stats: UserStats::default(),
        }
    }

    /// Whether the session user follows this user, if resolved.
    pub fn is_followed(&self) -> Option<bool> {
        self.follow.map(EdgeState::is_on)
    }

    /// True when this profile belongs to `uid`.
    pub fn is_current_user(&self, uid: Option<&str>) -> bool {
        uid.is_some_and(|uid| uid == self.id)
    }
}

/// Video post document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Document id; also names the post's media blobs.
    pub id: PostId,
    /// Uploader.
    pub owner_uid: UserId,
    /// Caption text.
    #[serde(default)]
    pub caption: String,
    /// Like counter as stored on the post.
    #[serde(default)]
    pub likes: u64,
    /// Comment counter.
    #[serde(default)]
    pub comment_count: u64,
    /// Save counter.
    #[serde(default)]
    pub save_count: u64,
    /// Share counter.
    #[serde(default)]
    pub share_count: u64,
    /// View counter.
    #[serde(default)]
    pub views: u64,
    /// Thumbnail download URL.
    #[serde(default)]
    pub thumbnail_url: String,
    /// Video download URL.
    #[serde(default)]
    pub video_url: String,
    /// Upload time.
    pub timestamp: TimestampMs,
    /// Uploader profile, filled by enrichment.
    #[serde(skip)]
    pub user: Option<User>,
    /// Like edge from the session user.
    #[serde(skip)]
    pub like: EdgeState,
}

impl Post {
    /// Creates a post with zero counters and empty media URLs.
    pub fn new(id: impl Into<PostId>, owner_uid: impl Into<UserId>, timestamp: TimestampMs) -> Self {
        Self {
            id: id.into(),
            owner_uid: owner_uid.into(),
            caption: String::new(),
            likes: 0,
            comment_count: 0,
            save_count: 0,
            share_count: 0,
            views: 0,
            thumbnail_url: String::new(),
            video_url: String::new(),
            timestamp,
            user: None,
            like: EdgeState::Unset,
        }
    }

    /// Whether the session user's like is visible on this post.
    pub fn did_like(&self) -> bool {
        self.like.is_on()
    }
}

/// Activity notification document, stored under the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Document id.
    pub id: NotificationId,
    /// Post the activity refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    /// Activity time.
    pub timestamp: TimestampMs,
    /// Activity kind.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// User who performed the activity.
    pub uid: UserId,
    /// Referenced post, filled by enrichment.
    #[serde(skip)]
    pub post: Option<Post>,
    /// Acting user, filled by enrichment.
    #[serde(skip)]
    pub user: Option<User>,
}

/// Comment document, stored under its post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Document id.
    pub id: CommentId,
    /// Owner of the commented post.
    pub post_owner_uid: UserId,
    /// Comment body.
    pub comment_text: String,
    /// Commented post.
    pub post_id: PostId,
    /// Creation time.
    pub timestamp: TimestampMs,
    /// Author.
    pub comment_owner_uid: UserId,
    /// Author profile, filled by enrichment.
    #[serde(skip)]
    pub user: Option<User>,
}

impl Record for Post {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Notification {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Comment {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Toggleable for Post {
    fn edge_state(&self) -> Option<EdgeState> {
        Some(self.like)
    }

    fn edge_counter(&self) -> Option<u64> {
        Some(self.likes)
    }

    fn apply_edge(&mut self, patch: &EdgePatch) {
        if let Some(v) = patch.state {
            self.like = v;
        }
        if let Some(v) = patch.counter {
            self.likes = v;
        }
    }
}

// A notification toggles the follow edge of its acting user.
impl Toggleable for Notification {
    fn edge_state(&self) -> Option<EdgeState> {
        self.user.as_ref().and_then(|u| u.follow)
    }

    fn edge_target(&self) -> &str {
        &self.uid
    }

    fn apply_edge(&mut self, patch: &EdgePatch) {
        if let (Some(user), Some(v)) = (self.user.as_mut(), patch.state) {
            user.follow = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_without_stats_decodes_with_zeroes() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "username": "ada",
            "email": "ada@example.com",
            "fullname": "Ada L",
        }))
        .unwrap();
        assert_eq!(user.stats, UserStats::default());
        assert_eq!(user.is_followed(), None);
    }

    #[test]
    fn local_fields_are_not_serialized() {
        let mut post = Post::new("p1", "u1", 10);
        post.like = EdgeState::Set;
        post.user = Some(User::new("u1", "ada", "a@x", "Ada"));
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["ownerUid"], "u1");
        assert!(value.get("user").is_none());
        assert!(value.get("like").is_none());
    }

    #[test]
    fn notification_kind_uses_type_key() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "timestamp": 5,
            "type": "follow",
            "uid": "u2",
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationType::Follow);
        assert_eq!(n.post_id, None);
    }
}
