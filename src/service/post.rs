//! Post reads and the like edge pair.

use serde_json::{Value, json};

use crate::{
    model::{Post, User},
    persist::{Fields, Query, get_as, paths, query_as},
    types::NotificationType,
};

use super::{ServiceResult, Services, join_edge_writes};

/// Post reads and like edges.
#[derive(Clone)]
pub struct PostService {
    services: Services,
}

fn likes_field(likes: u64) -> Fields {
    let mut fields = Fields::new();
    fields.insert("likes".to_string(), json!(likes));
    fields
}

impl PostService {
    /// Post service over `services`.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Reads one post, without enrichment.
    pub async fn fetch_post(&self, post_id: &str) -> ServiceResult<Post> {
        Ok(get_as(self.services.store().as_ref(), paths::POSTS, post_id).await?)
    }

    /// All posts owned by `user`, each carrying `user` as its owner.
    pub async fn fetch_user_posts(&self, user: &User) -> ServiceResult<Vec<Post>> {
        let query = Query::new(paths::POSTS).where_eq("ownerUid", Value::String(user.id.clone()));
        let mut posts: Vec<Post> = query_as(self.services.store().as_ref(), &query).await?;
        for post in &mut posts {
            post.user = Some(user.clone());
        }
        Ok(posts)
    }

    /// Writes the like edge pair and `likes + 1`, computed from `post` as
    /// given, then notifies the owner.
    pub async fn like_post(&self, post: &Post) -> ServiceResult<()> {
        let uid = self.services.session().require_uid()?;
        let store = self.services.store();

        let post_likes = paths::post_likes(&post.id);
        let user_likes = paths::user_likes(uid);
        join_edge_writes(
            "like",
            vec![
                store.set_document(&post_likes, uid, Fields::new()),
                store.update_fields(paths::POSTS, &post.id, likes_field(post.likes + 1)),
                store.set_document(&user_likes, &post.id, Fields::new()),
            ],
        )
        .await?;

        if let Err(err) = self
            .services
            .notifications()
            .upload_notification(&post.owner_uid, NotificationType::Like, Some(&post.id))
            .await
        {
            tracing::warn!(post_id = %post.id, %err, "like notification upload failed");
        }
        Ok(())
    }

    /// Removes the like edge pair and writes `likes - 1`. No-op when the
    /// post has no likes.
    pub async fn unlike_post(&self, post: &Post) -> ServiceResult<()> {
        if post.likes == 0 {
            return Ok(());
        }
        let uid = self.services.session().require_uid()?;
        let store = self.services.store();

        let post_likes = paths::post_likes(&post.id);
        let user_likes = paths::user_likes(uid);
        join_edge_writes(
            "unlike",
            vec![
                store.delete_document(&post_likes, uid),
                store.delete_document(&user_likes, &post.id),
                store.update_fields(paths::POSTS, &post.id, likes_field(post.likes - 1)),
            ],
        )
        .await?;

        if let Err(err) = self
            .services
            .notifications()
            .delete_notification(&post.owner_uid, NotificationType::Like, Some(&post.id))
            .await
        {
            tracing::warn!(post_id = %post.id, %err, "like notification delete failed");
        }
        Ok(())
    }

    /// Whether the session user likes `post`. Anonymous sessions like
    /// nothing.
    pub async fn did_like(&self, post: &Post) -> ServiceResult<bool> {
        let Some(uid) = self.services.session().uid() else {
            return Ok(false);
        };
        Ok(self
            .services
            .store()
            .exists(&paths::user_likes(uid), &post.id)
            .await?)
    }
}
