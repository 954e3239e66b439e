//! Gift lifecycle status and delivery channel selection.
//!
//! [`GiftStatus`] encodes the lifecycle graph; [`GiftStatus::can_transition_to`]
//! is the single place that decides whether a status write is legal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftStatus {
    Pending,
    Notified,
    InProgress,
    PendingApproval,
    Completed,
    Expired,
    Cancelled,
}

impl GiftStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [GiftStatus; 7] = [
        GiftStatus::Pending,
        GiftStatus::Notified,
        GiftStatus::InProgress,
        GiftStatus::PendingApproval,
        GiftStatus::Completed,
        GiftStatus::Expired,
        GiftStatus::Cancelled,
    ];

    /// Statuses from which a recipient may still act on the challenge.
    pub const ACTIVE: [GiftStatus; 4] = [
        GiftStatus::Pending,
        GiftStatus::Notified,
        GiftStatus::InProgress,
        GiftStatus::PendingApproval,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GiftStatus::Pending => "pending",
            GiftStatus::Notified => "notified",
            GiftStatus::InProgress => "in_progress",
            GiftStatus::PendingApproval => "pending_approval",
            GiftStatus::Completed => "completed",
            GiftStatus::Expired => "expired",
            GiftStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GiftStatus::Completed | GiftStatus::Expired | GiftStatus::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Whether a write from `self` to `next` is a legal lifecycle step.
    ///
    /// `InProgress -> InProgress` is legal (another step of a multi-step
    /// challenge). `PendingApproval -> Pending` is the rejection path.
    pub fn can_transition_to(self, next: GiftStatus) -> bool {
        use GiftStatus::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Expired | Cancelled) {
            return true;
        }

        match self {
            Pending => matches!(next, Notified | InProgress | PendingApproval | Completed),
            Notified => matches!(next, InProgress | PendingApproval | Completed),
            InProgress => matches!(next, InProgress | PendingApproval | Completed),
            PendingApproval => matches!(next, Pending | Completed),
            Completed | Expired | Cancelled => false,
        }
    }

    /// Check a transition, producing a conflict error naming both ends.
    pub fn ensure_transition(self, next: GiftStatus) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Gift cannot move from '{self}' to '{next}'"
            )))
        }
    }
}

impl fmt::Display for GiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GiftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GiftStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown gift status '{s}'"))
    }
}

impl TryFrom<String> for GiftStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Channels the sender asked the gift to be delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Sms,
    Email,
    Both,
}

impl DeliveryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMethod::Sms => "sms",
            DeliveryMethod::Email => "email",
            DeliveryMethod::Both => "both",
        }
    }

    pub fn wants_sms(self) -> bool {
        matches!(self, DeliveryMethod::Sms | DeliveryMethod::Both)
    }

    pub fn wants_email(self) -> bool {
        matches!(self, DeliveryMethod::Email | DeliveryMethod::Both)
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(DeliveryMethod::Sms),
            "email" => Ok(DeliveryMethod::Email),
            "both" => Ok(DeliveryMethod::Both),
            other => Err(format!(
                "Unknown delivery method '{other}'. Must be one of: sms, email, both"
            )),
        }
    }
}

impl TryFrom<String> for DeliveryMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in GiftStatus::ALL {
            assert_eq!(status.as_str().parse::<GiftStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!("archived".parse::<GiftStatus>().is_err());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [GiftStatus::Completed, GiftStatus::Expired, GiftStatus::Cancelled] {
            for next in GiftStatus::ALL {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} -> {next} must be illegal"
                );
            }
        }
    }

    #[test]
    fn happy_path_is_legal() {
        assert!(GiftStatus::Pending.can_transition_to(GiftStatus::Notified));
        assert!(GiftStatus::Notified.can_transition_to(GiftStatus::InProgress));
        assert!(GiftStatus::InProgress.can_transition_to(GiftStatus::InProgress));
        assert!(GiftStatus::InProgress.can_transition_to(GiftStatus::Completed));
    }

    #[test]
    fn approval_loop_is_legal() {
        assert!(GiftStatus::Notified.can_transition_to(GiftStatus::PendingApproval));
        assert!(GiftStatus::PendingApproval.can_transition_to(GiftStatus::Pending));
        assert!(GiftStatus::Pending.can_transition_to(GiftStatus::PendingApproval));
        assert!(GiftStatus::PendingApproval.can_transition_to(GiftStatus::Completed));
    }

    #[test]
    fn notified_cannot_go_back_to_pending() {
        assert!(!GiftStatus::Notified.can_transition_to(GiftStatus::Pending));
        assert!(GiftStatus::Notified
            .ensure_transition(GiftStatus::Pending)
            .is_err());
    }

    #[test]
    fn administrative_exits_from_every_active_state() {
        for status in GiftStatus::ACTIVE {
            assert!(status.can_transition_to(GiftStatus::Expired));
            assert!(status.can_transition_to(GiftStatus::Cancelled));
        }
    }

    #[test]
    fn delivery_method_channel_flags() {
        assert!(DeliveryMethod::Sms.wants_sms());
        assert!(!DeliveryMethod::Sms.wants_email());
        assert!(DeliveryMethod::Email.wants_email());
        assert!(!DeliveryMethod::Email.wants_sms());
        assert!(DeliveryMethod::Both.wants_sms() && DeliveryMethod::Both.wants_email());
    }

    #[test]
    fn delivery_method_parse_error_lists_options() {
        let err = "fax".parse::<DeliveryMethod>().unwrap_err();
        assert!(err.contains("sms, email, both"));
    }
}
