//! Edge mutation model: toggle direction, tagged edge state, and patches.

use serde::{Deserialize, Serialize};

/// Requested direction of a boolean-edge mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Toggle {
    /// Create the edge (like, follow).
    On,
    /// Remove the edge (unlike, unfollow).
    Off,
}

/// Local view of one boolean edge, including in-flight transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeState {
    /// Edge absent and confirmed absent.
    #[default]
    Unset,
    /// Edge applied locally; remote create not yet confirmed.
    PendingSet,
    /// Edge present and confirmed present.
    Set,
    /// Edge removed locally; remote delete not yet confirmed.
    PendingUnset,
}

impl EdgeState {
    /// Value the user currently sees.
    pub fn is_on(self) -> bool {
        matches!(self, Self::PendingSet | Self::Set)
    }

    /// True while a remote write is outstanding.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::PendingSet | Self::PendingUnset)
    }

    /// Settled state matching a server-side existence answer.
    pub fn from_exists(exists: bool) -> Self {
        if exists { Self::Set } else { Self::Unset }
    }

    /// Pending state entered when `toggle` starts from `self`, if legal.
    pub fn begin(self, toggle: Toggle) -> Option<Self> {
        match (self, toggle) {
            (Self::Unset, Toggle::On) => Some(Self::PendingSet),
            (Self::Set, Toggle::Off) => Some(Self::PendingUnset),
            _ => None,
        }
    }

    /// Settled state after a successful remote write.
    pub fn confirm(self) -> Self {
        match self {
            Self::PendingSet => Self::Set,
            Self::PendingUnset => Self::Unset,
            settled => settled,
        }
    }
}

/// Sparse patch over a record's edge; each `Some` field overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgePatch {
    /// Optional replacement edge state.
    pub state: Option<EdgeState>,
    /// Optional replacement for the dependent counter (e.g. `likes`).
    pub counter: Option<u64>,
}

impl EdgePatch {
    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Patch that only replaces the edge state.
    pub fn state(state: EdgeState) -> Self {
        Self {
            state: Some(state),
            counter: None,
        }
    }
}
