//! Photo/video submission review statuses and decision validation.
//!
//! Defines the review state of a photo submission, the sender's review
//! actions, and validation helpers used by both the lifecycle and API layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length for a rejection reason.
pub const MAX_REJECTION_REASON_LENGTH: usize = 500;

/// Review state of a photo submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::PendingApproval => "pending_approval",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_pending(self) -> bool {
        self == SubmissionStatus::PendingApproval
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_approval" => Ok(SubmissionStatus::PendingApproval),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(format!("Unknown submission status '{other}'")),
        }
    }
}

impl TryFrom<String> for SubmissionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A sender's decision on a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    /// The submission status this decision produces.
    pub fn resulting_status(self) -> SubmissionStatus {
        match self {
            ReviewAction::Approve => SubmissionStatus::Approved,
            ReviewAction::Reject => SubmissionStatus::Rejected,
        }
    }
}

/// Normalize and validate an optional rejection reason.
///
/// Blank reasons become `None`. Reasons are only meaningful on rejection;
/// a reason supplied with an approval is dropped.
pub fn normalize_review_reason(
    action: ReviewAction,
    reason: Option<&str>,
) -> Result<Option<String>, CoreError> {
    if action == ReviewAction::Approve {
        return Ok(None);
    }

    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    if reason.chars().count() > MAX_REJECTION_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "Rejection reason exceeds maximum length of {MAX_REJECTION_REASON_LENGTH} characters"
        )));
    }

    Ok(Some(reason.to_string()))
}
