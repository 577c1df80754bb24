//! Main feed reads and owner-only post deletion.

use crate::{
    engine::{
        enrichers::PostOwnerEnricher,
        pipeline::enrich_all,
        traits::Enriched,
    },
    model::Post,
    persist::{Query, paths, query_as},
};

use super::{ServiceError, ServiceResult, Services};

/// Feed reads and post deletion.
#[derive(Clone)]
pub struct FeedService {
    services: Services,
}

impl FeedService {
    /// Feed service over `services`.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Every post, newest first, with owners attached.
    pub async fn fetch_posts(&self, max_in_flight: usize) -> ServiceResult<Enriched<Post>> {
        let query = Query::new(paths::POSTS).order_by("timestamp", true);
        let posts: Vec<Post> = query_as(self.services.store().as_ref(), &query).await?;

        let enricher = PostOwnerEnricher::new(self.services.users());
        Ok(enrich_all(&enricher, posts, max_in_flight).await)
    }

    /// Deletes `post`, the reverse like edges pointing at it, and its media.
    ///
    /// Only the owner may delete. Missing media blobs are ignored.
    pub async fn delete_post(&self, post: &Post) -> ServiceResult<()> {
        let uid = self.services.session().require_uid()?;
        if uid != post.owner_uid {
            return Err(ServiceError::Forbidden(format!(
                "post {} is owned by another user",
                post.id
            )));
        }

        let store = self.services.store();
        store.delete_document(paths::POSTS, &post.id).await?;

        let likers = store.query(&Query::new(paths::post_likes(&post.id))).await?;
        for liker in likers {
            store
                .delete_document(&paths::user_likes(&liker.id), &post.id)
                .await?;
        }

        for blob in [paths::post_image(&post.id), paths::post_video(&post.id)] {
            match store.delete_blob(&blob).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    tracing::debug!(%blob, "media blob already absent");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}
