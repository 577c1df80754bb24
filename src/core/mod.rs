//! In-memory view state and optimistic mutation helpers.

/// Ordered record collection backing one list screen.
pub mod list;
/// Optimistic edge mutation controller.
pub mod optimistic;
