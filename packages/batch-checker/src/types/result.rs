//! Per-identifier check results.

use serde::{Deserialize, Serialize};

use super::group::Identifier;

/// Primary two-state status reported for every identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    /// The remote resource resolves to a genuine asset.
    Live,
    /// The resource is a placeholder, absent, or could not be checked.
    Die,
}

/// Tri-state outcome that keeps "confirmed absent" apart from "could not verify".
///
/// `Unknown` collapses to [`CheckStatus::Die`] in the primary status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutcome {
    Live { resource_url: String },
    Dead,
    Unknown { reason: String },
}

impl CheckOutcome {
    pub fn unknown(reason: impl Into<String>) -> Self {
        CheckOutcome::Unknown {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> CheckStatus {
        match self {
            CheckOutcome::Live { .. } => CheckStatus::Live,
            CheckOutcome::Dead | CheckOutcome::Unknown { .. } => CheckStatus::Die,
        }
    }
}

/// One record per input identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: Identifier,
    pub status: CheckStatus,
    /// Empty unless `status` is `Live`.
    pub resource_url: String,
    /// Set only when the identifier could not be verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckResult {
    pub fn live(id: impl Into<Identifier>, resource_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: CheckStatus::Live,
            resource_url: resource_url.into(),
            reason: None,
        }
    }

    pub fn dead(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            status: CheckStatus::Die,
            resource_url: String::new(),
            reason: None,
        }
    }

    pub fn unknown(id: impl Into<Identifier>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: CheckStatus::Die,
            resource_url: String::new(),
            reason: Some(reason.into()),
        }
    }

    pub fn from_outcome(id: impl Into<Identifier>, outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Live { resource_url } => Self::live(id, resource_url),
            CheckOutcome::Dead => Self::dead(id),
            CheckOutcome::Unknown { reason } => Self::unknown(id, reason),
        }
    }

    /// Reconstruct the tri-state outcome.
    pub fn outcome(&self) -> CheckOutcome {
        match (self.status, &self.reason) {
            (CheckStatus::Live, _) => CheckOutcome::Live {
                resource_url: self.resource_url.clone(),
            },
            (CheckStatus::Die, None) => CheckOutcome::Dead,
            (CheckStatus::Die, Some(reason)) => CheckOutcome::Unknown {
                reason: reason.clone(),
            },
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == CheckStatus::Live
    }

    /// True when the identifier is `Die` because the check itself failed.
    pub fn is_unverified(&self) -> bool {
        self.status == CheckStatus::Die && self.reason.is_some()
    }
}
