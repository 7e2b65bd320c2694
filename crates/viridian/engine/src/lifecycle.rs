//! Review status state machine.
//!
//! ```text
//! Preliminary --approve--> Active --approveDelete--> Deleted
//!      |                     |
//!      +--reject--> Rejected +--successor approved--> Outdated
//! ```
//!
//! `Outdated` is never reached through a review outcome; only the approval of
//! a successor moves its predecessor there.

use crate::error::{RegistryError, RegistryResult};
use viridian_types::{AssetId, AssetStatus, ReviewOutcome};

/// Status after applying `outcome` to a version in status `current`.
pub fn transition(
    id: &AssetId,
    current: AssetStatus,
    outcome: ReviewOutcome,
) -> RegistryResult<AssetStatus> {
    match (current, outcome) {
        (AssetStatus::Preliminary, ReviewOutcome::Approve) => Ok(AssetStatus::Active),
        (AssetStatus::Preliminary, ReviewOutcome::Reject) => Ok(AssetStatus::Rejected),
        (AssetStatus::Active, ReviewOutcome::ApproveDelete) => Ok(AssetStatus::Deleted),
        (from, outcome) => Err(RegistryError::IllegalTransition {
            id: id.clone(),
            from,
            outcome,
        }),
    }
}

/// Status of a predecessor once its successor becomes active.
pub fn outdate(id: &AssetId, current: AssetStatus) -> RegistryResult<AssetStatus> {
    match current {
        AssetStatus::Active => Ok(AssetStatus::Outdated),
        status => Err(RegistryError::InvalidPredecessorState {
            id: id.clone(),
            status,
        }),
    }
}

/// Only active versions may be extended by an update.
pub fn ensure_supersedable(id: &AssetId, status: AssetStatus) -> RegistryResult<()> {
    if status == AssetStatus::Active {
        Ok(())
    } else {
        Err(RegistryError::InvalidPredecessorState {
            id: id.clone(),
            status,
        })
    }
}
