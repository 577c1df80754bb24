//! Collection and blob path layout.
//!
//! Edge sets are stored twice: likes under the post and under the liking
//! user, follows under the follower's `following` and the target's
//! `followers` collections.

/// User profiles, keyed by uid.
pub const USERS: &str = "users";
/// Posts, keyed by post id.
pub const POSTS: &str = "posts";

/// Uids that liked a post.
pub fn post_likes(post_id: &str) -> String {
    format!("posts/{post_id}/post-likes")
}

/// Comments under a post.
pub fn post_comments(post_id: &str) -> String {
    format!("posts/{post_id}/post-comments")
}

/// Post ids a user liked.
pub fn user_likes(uid: &str) -> String {
    format!("users/{uid}/user-likes")
}

/// Uids `uid` follows.
pub fn user_following(uid: &str) -> String {
    format!("following/{uid}/user-following")
}

/// Uids following `uid`.
pub fn user_followers(uid: &str) -> String {
    format!("followers/{uid}/user-followers")
}

/// Inbox of `uid`.
pub fn user_notifications(uid: &str) -> String {
    format!("notifications/{uid}/user-notifications")
}

/// Profile picture blob of `uid`.
pub fn profile_image(uid: &str) -> String {
    format!("profile_images/{uid}")
}

/// Thumbnail blob of a post.
pub fn post_image(post_id: &str) -> String {
    format!("post_images/{post_id}")
}

/// Video blob of a post.
pub fn post_video(post_id: &str) -> String {
    format!("post_videos/{post_id}")
}

/// Content type of uploaded videos.
pub const VIDEO_CONTENT_TYPE: &str = "video/quicktime";
/// Content type of uploaded images.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";
