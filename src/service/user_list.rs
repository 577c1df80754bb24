//! Follower, following, and search user lists.

use crate::{
    engine::{
        enrichers::{UserResolver, UserSlot},
        pipeline::{DEFAULT_MAX_IN_FLIGHT, enrich_all},
    },
    model::User,
    persist::{Query, paths, query_as},
    types::{PostId, UserId},
};

use super::{ServiceResult, Services};

/// Which users a user list shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserListConfig {
    /// Accounts following the user.
    Followers(UserId),
    /// Accounts the user follows.
    Following(UserId),
    /// Accounts that liked the post; always empty.
    Likes(PostId),
    /// Every account except the session user.
    Search,
    /// Blocked accounts; always empty.
    Blocked,
    /// Message recipients; always empty.
    NewMessage,
}

impl UserListConfig {
    /// Screen title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Followers(_) => "Followers",
            Self::Following(_) => "Following",
            Self::Likes(_) => "Likes",
            Self::Search => "Explore",
            Self::Blocked => "Blocked",
            Self::NewMessage => "New Message",
        }
    }
}

/// Follower, following, and search user lists.
#[derive(Clone)]
pub struct UserListService {
    services: Services,
    max_in_flight: usize,
}

impl UserListService {
    /// User lists with the default enrichment bound.
    pub fn new(services: Services) -> Self {
        Self {
            services,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Overrides the profile-fetch bound used for edge lists.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Users shown for `config`.
    pub async fn fetch_users(&self, config: &UserListConfig) -> ServiceResult<Vec<User>> {
        match config {
            UserListConfig::Followers(uid) => self.resolve_edge_ids(paths::user_followers(uid)).await,
            UserListConfig::Following(uid) => self.resolve_edge_ids(paths::user_following(uid)).await,
            UserListConfig::Search => self.fetch_all_users().await,
            UserListConfig::Likes(_) | UserListConfig::Blocked | UserListConfig::NewMessage => Ok(Vec::new()),
        }
    }

    /// Every user except the session user.
    pub async fn fetch_all_users(&self) -> ServiceResult<Vec<User>> {
        let users: Vec<User> =
            query_as(self.services.store().as_ref(), &Query::new(paths::USERS)).await?;
        let current = self.services.session().uid();
        Ok(users
            .into_iter()
            .filter(|u| Some(u.id.as_str()) != current)
            .collect())
    }

    // Edge documents are keyed by the other user's uid; profiles that fail
    // to load are left out of the list.
    async fn resolve_edge_ids(&self, collection: String) -> ServiceResult<Vec<User>> {
        let edges = self.services.store().query(&Query::new(collection)).await?;
        let slots: Vec<UserSlot> = edges.into_iter().map(|doc| UserSlot::new(doc.id)).collect();

        let resolver = UserResolver::new(self.services.users());
        let enriched = enrich_all(&resolver, slots, self.max_in_flight).await;
        Ok(enriched
            .records
            .into_iter()
            .filter_map(|slot| slot.user)
            .collect())
    }
}

/// Users whose username or full name contains `query`, ignoring case.
pub fn filter_users(users: &[User], query: &str) -> Vec<User> {
    let needle = query.to_lowercase();
    users
        .iter()
        .filter(|u| {
            u.username.to_lowercase().contains(&needle) || u.fullname.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
