//! Runtime event stream payloads.

/// Events emitted from a list actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// A load or refresh began.
    LoadStarted {
        /// Generation of the new load.
        generation: u64,
    },
    /// Fetched records were installed.
    Loaded {
        /// Generation that was installed.
        generation: u64,
        /// Number of records now held.
        len: usize,
    },
    /// The fetch failed; the collection stays empty.
    LoadFailed {
        /// Generation that failed.
        generation: u64,
    },
    /// Edge states were refreshed from the server.
    Reconciled {
        /// Generation that was reconciled.
        generation: u64,
    },
    /// A record left the collection.
    Removed {
        /// Removed record id.
        id: String,
    },
    /// An optimistic edge change was applied locally.
    EdgeApplied {
        /// Mutated record id.
        id: String,
    },
    /// The remote write succeeded.
    EdgeConfirmed {
        /// Mutated record id.
        id: String,
    },
    /// The remote write failed and the local change was undone.
    EdgeRolledBack {
        /// Mutated record id.
        id: String,
    },
}
