//! Single-writer list actors and their event stream.

/// Event stream types emitted by list actors.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
/// List sources: fetch, reconcile, and remote edge writes.
pub mod source;
