//! Comments under a post, oldest first.

use serde_json::json;

use crate::{
    engine::{enrichers::CommentAuthorEnricher, pipeline::enrich_all, traits::Enriched},
    model::{Comment, Post},
    persist::{Fields, Query, encode_fields, generate_document_id, paths, query_as},
    types::{NotificationType, now_ms},
};

use super::{ServiceResult, Services};

/// Comment threads under posts.
#[derive(Clone)]
pub struct CommentService {
    services: Services,
}

impl CommentService {
    /// Comment service over `services`.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Comments on `post_id`, oldest first, with authors attached.
    pub async fn fetch_comments(&self, post_id: &str, max_in_flight: usize) -> ServiceResult<Enriched<Comment>> {
        let query = Query::new(paths::post_comments(post_id)).order_by("timestamp", false);
        let comments: Vec<Comment> = query_as(self.services.store().as_ref(), &query).await?;

        let enricher = CommentAuthorEnricher::new(self.services.users());
        Ok(enrich_all(&enricher, comments, max_in_flight).await)
    }

    /// Adds a comment from the session user, bumps `commentCount` from the
    /// value on `post`, and notifies the post owner.
    pub async fn upload_comment(&self, post: &Post, text: &str) -> ServiceResult<Comment> {
        let uid = self.services.session().require_uid()?;
        let comment = Comment {
            id: generate_document_id(),
            post_owner_uid: post.owner_uid.clone(),
            comment_text: text.to_string(),
            post_id: post.id.clone(),
            timestamp: now_ms(),
            comment_owner_uid: uid.to_string(),
            user: None,
        };

        let store = self.services.store();
        store
            .set_document(&paths::post_comments(&post.id), &comment.id, encode_fields(&comment)?)
            .await?;

        let mut count = Fields::new();
        count.insert("commentCount".to_string(), json!(post.comment_count + 1));
        store.update_fields(paths::POSTS, &post.id, count).await?;

        if let Err(err) = self
            .services
            .notifications()
            .upload_notification(&post.owner_uid, NotificationType::Comment, Some(&post.id))
            .await
        {
            tracing::warn!(post_id = %post.id, %err, "comment notification upload failed");
        }
        Ok(comment)
    }
}
