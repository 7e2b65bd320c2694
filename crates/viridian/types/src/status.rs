use crate::validate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review status of an asset version.
///
/// Only the lifecycle state machine assigns a status; client input never
/// carries one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetStatus {
    /// Created, not reviewed yet.
    Preliminary,
    /// Passed review.
    Active,
    /// Passed review once, replaced by a newer active version.
    Outdated,
    /// A delete request passed review. Terminal for the lineage.
    Deleted,
    /// Did not pass review. Terminal.
    Rejected,
}

impl AssetStatus {
    /// Whether the version still takes part in the registry (reviewed or under review).
    pub fn is_live(&self) -> bool {
        matches!(self, AssetStatus::Preliminary | AssetStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetStatus::Deleted | AssetStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Preliminary => "preliminary",
            AssetStatus::Active => "active",
            AssetStatus::Outdated => "outdated",
            AssetStatus::Deleted => "deleted",
            AssetStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision handed over by the external review mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewOutcome {
    Approve,
    Reject,
    ApproveDelete,
}

impl ReviewOutcome {
    pub const ALL: [ReviewOutcome; 3] = [
        ReviewOutcome::Approve,
        ReviewOutcome::Reject,
        ReviewOutcome::ApproveDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOutcome::Approve => "approve",
            ReviewOutcome::Reject => "reject",
            ReviewOutcome::ApproveDelete => "approveDelete",
        }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewOutcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewOutcome::ALL
            .into_iter()
            .find(|outcome| outcome.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownOutcome(s.to_string()))
    }
}
