//! Client core for a short-video social app over a remote document store.
//!
//! Lists (feed, notifications) are owned by single-writer actors that fetch,
//! enrich, and hold records, and apply like/follow toggles optimistically
//! with rollback on failure.
//!
//! # Examples
//!
//! Feed over the in-memory store:
//! ```
//! use std::sync::Arc;
//!
//! use clipfeed::{
//!     model::{Post, User},
//!     persist::{memory::MemoryStore, paths},
//!     runtime::{
//!         handle::{spawn_list, RuntimeConfig},
//!         source::{FeedArrangement, FeedSource},
//!     },
//!     service::{Services, Session},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! store.seed(paths::USERS, "u1", &User::new("u1", "ada", "ada@example.com", "Ada L")).expect("seed");
//! store.seed(paths::POSTS, "p1", &Post::new("p1", "u1", 1_000)).expect("seed");
//!
//! let services = Services::new(store.clone(), Session::signed_in("u2"));
//! let feed = spawn_list(
//!     FeedSource::new(&services, FeedArrangement::AsFetched),
//!     Vec::new(),
//!     RuntimeConfig::default(),
//! );
//!
//! let report = feed.load().await.expect("load");
//! assert_eq!(report.loaded, 1);
//!
//! let ticket = feed.like("p1").await.expect("like");
//! assert_eq!(ticket.optimistic.likes, 1);
//! ticket.settled().await;
//! feed.shutdown().await.expect("shutdown");
//! # }
//! ```

#![deny(missing_docs)]

/// List state and optimistic mutation primitives.
pub mod core;
/// Enrichment pipeline and enrichers.
pub mod engine;
/// Domain documents.
pub mod model;
/// Edge mutation model.
pub mod op;
/// Remote store abstraction with in-memory and SQLite backends.
pub mod persist;
/// Single-writer list actors and events.
pub mod runtime;
/// Typed domain services.
pub mod service;
/// Shared primitive types and helpers.
pub mod types;
