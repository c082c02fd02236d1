//! Maps a tracked merge request state to its reconciler.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::MergeRequestState;
use crate::services::reconciler::{PassReport, Reconciler};

/// Fixed table of reconcilers, one slot per tracked state.
#[derive(Clone)]
pub struct StrategySelector {
    opened: Arc<Reconciler>,
    merged: Arc<Reconciler>,
}

impl StrategySelector {
    /// Build the table. Each reconciler must be configured for its slot.
    pub fn new(opened: Arc<Reconciler>, merged: Arc<Reconciler>) -> DomainResult<Self> {
        for (slot, reconciler) in [
            (MergeRequestState::Opened, &opened),
            (MergeRequestState::Merged, &merged),
        ] {
            if reconciler.target_state() != slot {
                return Err(DomainError::UnsupportedState(reconciler.target_state()));
            }
        }
        Ok(Self { opened, merged })
    }

    /// Reconciler handling `state`.
    ///
    /// Only tracked states have one; asking for any other state is a wiring bug.
    pub fn select(&self, state: MergeRequestState) -> DomainResult<Arc<Reconciler>> {
        match state {
            MergeRequestState::Opened => Ok(Arc::clone(&self.opened)),
            MergeRequestState::Merged => Ok(Arc::clone(&self.merged)),
            MergeRequestState::Closed => Err(DomainError::UnsupportedState(state)),
        }
    }

    /// Run one pass for `state`.
    pub async fn process(&self, state: MergeRequestState) -> DomainResult<PassReport> {
        self.select(state)?.process().await
    }

    pub const fn tracked_states(&self) -> [MergeRequestState; 2] {
        MergeRequestState::TRACKED
    }
}
