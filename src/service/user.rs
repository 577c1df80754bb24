//! Profiles, the follow edge pair, and profile stats.

use futures::try_join;
use serde_json::Value;

use crate::{
    model::{Post, User, UserStats},
    persist::{Fields, Query, get_as, paths, query_as},
    types::{ImageKind, NotificationType},
};

use super::{ServiceError, ServiceResult, Services, join_edge_writes};

/// Profiles, follow edges, and profile statistics.
#[derive(Clone)]
pub struct UserService {
    services: Services,
}

impl UserService {
    /// User service over `services`.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// The session user's profile.
    pub async fn fetch_current_user(&self) -> ServiceResult<User> {
        let uid = self.services.session().require_uid()?;
        self.fetch_user(uid).await
    }

    /// Reads the profile of `uid`.
    pub async fn fetch_user(&self, uid: &str) -> ServiceResult<User> {
        Ok(get_as(self.services.store().as_ref(), paths::USERS, uid).await?)
    }

    /// Creates both halves of the follow edge, then notifies `uid`.
    pub async fn follow(&self, uid: &str) -> ServiceResult<()> {
        let current = self.services.session().require_uid()?;
        if current == uid {
            return Err(ServiceError::Forbidden("cannot follow yourself".to_string()));
        }

        let store = self.services.store();
        let following = paths::user_following(current);
        let followers = paths::user_followers(uid);
        join_edge_writes(
            "follow",
            vec![
                store.set_document(&following, uid, Fields::new()),
                store.set_document(&followers, current, Fields::new()),
            ],
        )
        .await?;

        if let Err(err) = self
            .services
            .notifications()
            .upload_notification(uid, NotificationType::Follow, None)
            .await
        {
            tracing::warn!(to = uid, %err, "follow notification upload failed");
        }
        Ok(())
    }

    /// Removes the follow edge pair to `uid`.
    pub async fn unfollow(&self, uid: &str) -> ServiceResult<()> {
        let current = self.services.session().require_uid()?;

        let store = self.services.store();
        let following = paths::user_following(current);
        let followers = paths::user_followers(uid);
        join_edge_writes(
            "unfollow",
            vec![
                store.delete_document(&following, uid),
                store.delete_document(&followers, current),
            ],
        )
        .await?;

        if let Err(err) = self
            .services
            .notifications()
            .delete_notification(uid, NotificationType::Follow, None)
            .await
        {
            tracing::warn!(to = uid, %err, "follow notification delete failed");
        }
        Ok(())
    }

    /// Whether the session user follows `uid`. Anonymous sessions follow
    /// nobody.
    pub async fn is_followed(&self, uid: &str) -> ServiceResult<bool> {
        let Some(current) = self.services.session().uid() else {
            return Ok(false);
        };
        Ok(self
            .services
            .store()
            .exists(&paths::user_following(current), uid)
            .await?)
    }

    /// Follow counts and the like total over `uid`'s posts, fetched
    /// concurrently.
    pub async fn fetch_user_stats(&self, uid: &str) -> ServiceResult<UserStats> {
        let store = self.services.store().as_ref();
        let following_q = Query::new(paths::user_following(uid));
        let followers_q = Query::new(paths::user_followers(uid));
        let posts_q = Query::new(paths::POSTS).where_eq("ownerUid", uid);

        let (following, followers, posts) = try_join!(
            store.query(&following_q),
            store.query(&followers_q),
            query_as::<Post>(store, &posts_q),
        )?;

        Ok(UserStats {
            following: following.len() as u64,
            followers: followers.len() as u64,
            likes: posts.iter().map(|p| p.likes).sum(),
        })
    }

    /// Replaces the session user's profile picture and returns its URL.
    ///
    /// The old blob is removed first on a best-effort basis.
    pub async fn update_profile_image(&self, bytes: Vec<u8>) -> ServiceResult<String> {
        let uid = self.services.session().require_uid()?.to_string();
        let store = self.services.store();

        match store.delete_blob(&paths::profile_image(&uid)).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => tracing::debug!(%uid, %err, "old profile image not removed"),
        }

        let url = self
            .services
            .media()
            .upload_image(&ImageKind::Profile(uid.clone()), bytes)
            .await?;

        let mut fields = Fields::new();
        fields.insert("profileImageUrl".to_string(), Value::String(url.clone()));
        store.update_fields(paths::USERS, &uid, fields).await?;
        Ok(url)
    }
}
