//! Typed domain operations over a [`RemoteStore`].
//!
//! Every service carries an explicit [`Session`]; writes that need an
//! identity fail with [`ServiceError::Unauthenticated`] when it is absent.

/// Comments under posts.
pub mod comment;
/// The main feed and post deletion.
pub mod feed;
/// Image and video uploads.
pub mod media;
/// Notification inbox reads and writes.
pub mod notification;
/// Posts and likes.
pub mod post;
/// Profiles, follows, and stats.
pub mod user;
/// Follower, following, and search lists.
pub mod user_list;

use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use thiserror::Error;

use crate::{
    persist::{RemoteStore, StoreError, StoreResult},
    types::UserId,
};

pub use comment::CommentService;
pub use feed::FeedService;
pub use media::MediaUploader;
pub use notification::NotificationService;
pub use post::PostService;
pub use user::UserService;
pub use user_list::{UserListConfig, UserListService};

/// Failure of a service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The call needs a signed-in session.
    #[error("no signed-in user")]
    Unauthenticated,
    /// The session user may not do this.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The list or source does not offer this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// The underlying store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a service call.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Identity of the signed-in user, passed explicitly to every service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    uid: Option<UserId>,
}

impl Session {
    /// Session for `uid`.
    pub fn signed_in(uid: impl Into<UserId>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    /// Session without a user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed-in uid, if any.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Signed-in uid, or [`ServiceError::Unauthenticated`].
    pub fn require_uid(&self) -> ServiceResult<&str> {
        self.uid().ok_or(ServiceError::Unauthenticated)
    }
}

/// Store handle plus session shared by all services.
#[derive(Clone)]
pub struct Services {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl Services {
    /// Bundles `store` with `session`.
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Session the services act for.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// User profile and follow calls.
    pub fn users(&self) -> UserService {
        UserService::new(self.clone())
    }

    /// Post and like calls.
    pub fn posts(&self) -> PostService {
        PostService::new(self.clone())
    }

    /// Feed reads and post deletion.
    pub fn feed(&self) -> FeedService {
        FeedService::new(self.clone())
    }

    /// Notification inbox calls.
    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.clone())
    }

    /// Comment calls.
    pub fn comments(&self) -> CommentService {
        CommentService::new(self.clone())
    }

    /// Follower, following, and search lists.
    pub fn user_lists(&self) -> UserListService {
        UserListService::new(self.clone())
    }

    /// Blob uploads.
    pub fn media(&self) -> MediaUploader {
        MediaUploader::new(self.clone())
    }
}

/// Awaits every write of a forward/reverse edge pair, even after a failure.
///
/// There is no transaction across the writes: when some but not all of them
/// fail, the edge is left half applied and only a warning is logged.
pub(crate) async fn join_edge_writes(
    label: &'static str,
    writes: Vec<BoxFuture<'_, StoreResult<()>>>,
) -> ServiceResult<()> {
    let total = writes.len();
    let results = join_all(writes).await;
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 && failed < total {
        tracing::warn!(label, failed, total, "edge writes partially applied");
    }
    for result in results {
        result?;
    }
    Ok(())
}
