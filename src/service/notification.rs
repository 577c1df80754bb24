//! Notification inbox of the session user.

use serde_json::Value;

use crate::{
    engine::{enrichers::NotificationEnricher, pipeline::enrich_all, traits::Enriched},
    model::Notification,
    persist::{Query, encode_fields, generate_document_id, paths, query_as},
    types::{NotificationId, NotificationType, now_ms},
};

use super::{ServiceResult, Services};

/// Per-user activity notifications.
#[derive(Clone)]
pub struct NotificationService {
    services: Services,
}

impl NotificationService {
    /// Notification service over `services`.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// The session user's notifications, newest first, enriched with the
    /// acting user, the referenced post, and follow state for follow
    /// notifications.
    pub async fn fetch_notifications(&self, max_in_flight: usize) -> ServiceResult<Enriched<Notification>> {
        let uid = self.services.session().require_uid()?;
        let query = Query::new(paths::user_notifications(uid)).order_by("timestamp", true);
        let notifications: Vec<Notification> =
            query_as(self.services.store().as_ref(), &query).await?;

        let enricher = NotificationEnricher::new(self.services.users(), self.services.posts());
        Ok(enrich_all(&enricher, notifications, max_in_flight).await)
    }

    /// Records that the session user did `kind` to `to_uid`.
    ///
    /// Returns `None` without writing when `to_uid` is the session user.
    pub async fn upload_notification(
        &self,
        to_uid: &str,
        kind: NotificationType,
        post_id: Option<&str>,
    ) -> ServiceResult<Option<NotificationId>> {
        let uid = self.services.session().require_uid()?;
        if uid == to_uid {
            return Ok(None);
        }

        let notification = Notification {
            id: generate_document_id(),
            post_id: post_id.map(str::to_string),
            timestamp: now_ms(),
            kind,
            uid: uid.to_string(),
            post: None,
            user: None,
        };
        let fields = encode_fields(&notification)?;
        self.services
            .store()
            .set_document(&paths::user_notifications(to_uid), &notification.id, fields)
            .await?;
        Ok(Some(notification.id))
    }

    /// Deletes the session user's `kind` notifications sent to `to_uid`,
    /// restricted to `post_id` when given. Returns how many were deleted.
    pub async fn delete_notification(
        &self,
        to_uid: &str,
        kind: NotificationType,
        post_id: Option<&str>,
    ) -> ServiceResult<usize> {
        let uid = self.services.session().require_uid()?;
        if uid == to_uid {
            return Ok(0);
        }

        let collection = paths::user_notifications(to_uid);
        let query = Query::new(collection.clone()).where_eq("uid", Value::String(uid.to_string()));
        let sent: Vec<Notification> = query_as(self.services.store().as_ref(), &query).await?;

        let mut deleted = 0;
        for notification in sent {
            if notification.kind != kind {
                continue;
            }
            if post_id.is_some() && notification.post_id.as_deref() != post_id {
                continue;
            }
            self.services
                .store()
                .delete_document(&collection, &notification.id)
                .await?;
            deleted += 1;
        }
        Ok(deleted)
    }
}
