//! Optimistic edge mutations: apply locally now, confirm or roll back later.
//!
//! [`begin`] moves an edge into its pending state, adjusts the dependent
//! counter and captures the inverse patch. [`settle`] either confirms the
//! pending state or applies the inverse, which restores the exact prior
//! values.

use thiserror::Error;

use crate::op::{EdgePatch, EdgeState, Toggle};

use super::list::Record;

/// Record carrying one toggleable boolean edge.
pub trait Toggleable: Record {
    /// Current edge state, `None` when the record has no toggleable edge.
    fn edge_state(&self) -> Option<EdgeState>;

    /// Remote entity the edge points at. Records sharing a target show the
    /// same edge state.
    fn edge_target(&self) -> &str {
        self.record_id()
    }

    /// Counter that moves with the edge, if any.
    fn edge_counter(&self) -> Option<u64> {
        None
    }

    /// Applies `patch` in place.
    fn apply_edge(&mut self, patch: &EdgePatch);

    /// Captures an inverse patch for all fields present in `patch`.
    fn capture_inverse(&self, patch: &EdgePatch) -> EdgePatch {
        EdgePatch {
            state: patch.state.and(self.edge_state()),
            counter: patch.counter.and(self.edge_counter()),
        }
    }
}

/// Why a toggle was refused before anything changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The edge is pending; a second toggle is not queued.
    #[error("a write for this edge is still in flight")]
    InFlight,
    /// The edge already has the requested value.
    #[error("edge already in the requested state")]
    AlreadyApplied,
    /// The record has no resolved edge to toggle.
    #[error("record has no toggleable edge")]
    NotToggleable,
    /// No record with that id is in the list.
    #[error("record not found")]
    MissingRecord,
}

/// How an optimistic mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Remote write succeeded; the pending state was confirmed.
    Confirmed,
    /// Remote write failed; local state was restored.
    RolledBack,
    /// The record was replaced or removed before the write settled.
    Superseded,
}

/// Bookkeeping for one outstanding optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Mutated record.
    pub record_id: String,
    /// Requested direction.
    pub toggle: Toggle,
    /// List generation the record belonged to.
    pub generation: u64,
    /// Patch that restores the pre-mutation values.
    pub inverse: EdgePatch,
}

/// Applies the local effect of `toggle` to `record`.
pub fn begin<R: Toggleable>(
    record: &mut R,
    toggle: Toggle,
    generation: u64,
) -> Result<PendingMutation, MutationError> {
    let state = record.edge_state().ok_or(MutationError::NotToggleable)?;
    if state.is_pending() {
        return Err(MutationError::InFlight);
    }
    let next = state.begin(toggle).ok_or(MutationError::AlreadyApplied)?;

    let counter = record.edge_counter().map(|c| match toggle {
        Toggle::On => c.saturating_add(1),
        Toggle::Off => c.saturating_sub(1),
    });
    let patch = EdgePatch {
        state: Some(next),
        counter,
    };

    let inverse = record.capture_inverse(&patch);
    record.apply_edge(&patch);

    Ok(PendingMutation {
        record_id: record.record_id().to_string(),
        toggle,
        generation,
        inverse,
    })
}

/// Confirms or rolls back `pending` on `record` according to `succeeded`.
///
/// Returns [`MutationOutcome::Superseded`] without touching the record when
/// its edge is no longer in the pending state `pending` created.
pub fn settle<R: Toggleable>(
    record: &mut R,
    pending: &PendingMutation,
    succeeded: bool,
) -> MutationOutcome {
    let expected = match pending.toggle {
        Toggle::On => EdgeState::PendingSet,
        Toggle::Off => EdgeState::PendingUnset,
    };
    if record.edge_state() != Some(expected) {
        return MutationOutcome::Superseded;
    }

    if succeeded {
        record.apply_edge(&EdgePatch::state(expected.confirm()));
        MutationOutcome::Confirmed
    } else {
        record.apply_edge(&pending.inverse);
        MutationOutcome::RolledBack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Post;

    fn post(likes: u64) -> Post {
        let mut post = Post::new("p1", "u1", 1);
        post.likes = likes;
        post
    }

    #[test]
    fn like_then_confirm() {
        let mut p = post(5);
        let pending = begin(&mut p, Toggle::On, 0).unwrap();
        assert_eq!((p.likes, p.like), (6, EdgeState::PendingSet));

        assert_eq!(settle(&mut p, &pending, true), MutationOutcome::Confirmed);
        assert_eq!((p.likes, p.like), (6, EdgeState::Set));
    }

    #[test]
    fn like_then_rollback_restores_exact_counter() {
        let mut p = post(5);
        let pending = begin(&mut p, Toggle::On, 0).unwrap();
        assert_eq!(settle(&mut p, &pending, false), MutationOutcome::RolledBack);
        assert_eq!((p.likes, p.like), (5, EdgeState::Unset));
    }

    #[test]
    fn unlike_rollback_returns_to_set() {
        let mut p = post(3);
        p.like = EdgeState::Set;
        let pending = begin(&mut p, Toggle::Off, 0).unwrap();
        assert_eq!((p.likes, p.like), (2, EdgeState::PendingUnset));
        settle(&mut p, &pending, false);
        assert_eq!((p.likes, p.like), (3, EdgeState::Set));
    }

    #[test]
    fn pending_edges_reject_second_toggle() {
        let mut p = post(0);
        begin(&mut p, Toggle::On, 0).unwrap();
        assert_eq!(begin(&mut p, Toggle::Off, 0), Err(MutationError::InFlight));
        assert_eq!(begin(&mut p, Toggle::On, 0), Err(MutationError::InFlight));
        assert_eq!(p.likes, 1);
    }

    #[test]
    fn redundant_toggle_is_rejected() {
        let mut p = post(0);
        assert_eq!(begin(&mut p, Toggle::Off, 0), Err(MutationError::AlreadyApplied));
        assert_eq!(p.likes, 0);
    }

    #[test]
    fn settle_after_external_reset_is_superseded() {
        let mut p = post(1);
        let pending = begin(&mut p, Toggle::On, 0).unwrap();
        p.like = EdgeState::Set;
        assert_eq!(settle(&mut p, &pending, false), MutationOutcome::Superseded);
        assert_eq!(p.likes, 2);
    }
}
