//! Challenge types, requirements, and the progress record.
//!
//! The progress record is stored as JSON on the challenge row. All step
//! arithmetic lives on [`ChallengeProgress`] so that the bound
//! `0 <= current_step <= total_steps` is enforced in one place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/* --------------------------------------------------------------------------
Challenge type
-------------------------------------------------------------------------- */

/// The kind of task a recipient must complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeType {
    Photo,
    Video,
    Text,
    Keyword,
    MultiDay,
    Custom,
}

impl ChallengeType {
    pub const ALL: [ChallengeType; 6] = [
        ChallengeType::Photo,
        ChallengeType::Video,
        ChallengeType::Text,
        ChallengeType::Keyword,
        ChallengeType::MultiDay,
        ChallengeType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeType::Photo => "photo",
            ChallengeType::Video => "video",
            ChallengeType::Text => "text",
            ChallengeType::Keyword => "keyword",
            ChallengeType::MultiDay => "multi-day",
            ChallengeType::Custom => "custom",
        }
    }

    /// Photo and video submissions are gated on a human decision instead of
    /// step counting.
    pub fn requires_approval(self) -> bool {
        matches!(self, ChallengeType::Photo | ChallengeType::Video)
    }

    /// Types whose steps may be confirmed by the sender rather than by a
    /// recipient message.
    pub fn accepts_external_confirmation(self) -> bool {
        matches!(self, ChallengeType::MultiDay | ChallengeType::Custom)
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChallengeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown challenge type '{s}'. Must be one of: {}",
                    ChallengeType::ALL.map(ChallengeType::as_str).join(", ")
                )
            })
    }
}

impl TryFrom<String> for ChallengeType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/* --------------------------------------------------------------------------
Requirements
-------------------------------------------------------------------------- */

/// Structured, type-specific challenge requirements.
///
/// Unknown keys are preserved in `extra` so sender-supplied metadata
/// survives a round trip through storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<i32>,
    /// Number of days for `multi-day` challenges; used as the step count
    /// when `total_steps` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChallengeRequirements {
    /// The configured keyword, if it is non-blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Resolve the step count for a challenge of the given type. Always >= 1.
    pub fn resolve_total_steps(&self, challenge_type: ChallengeType) -> i32 {
        let explicit = self.total_steps.filter(|n| *n >= 1);
        let from_days = match challenge_type {
            ChallengeType::MultiDay => self.days.filter(|n| *n >= 1),
            _ => None,
        };
        explicit.or(from_days).unwrap_or(1)
    }
}

/* --------------------------------------------------------------------------
Submission record
-------------------------------------------------------------------------- */

/// What kind of payload a submission record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Text,
    Media,
    Confirmation,
}

/// One recorded attempt against a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submitted_at: Timestamp,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub payload: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl SubmissionRecord {
    pub fn new(kind: SubmissionKind, payload: impl Into<String>) -> Self {
        Self {
            submitted_at: chrono::Utc::now(),
            kind,
            payload: payload.into(),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/* --------------------------------------------------------------------------
Progress
-------------------------------------------------------------------------- */

/// Result of recording one valid step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A step was counted but more remain.
    Advanced { current_step: i32, total_steps: i32 },
    /// The final step was counted.
    Completed { total_steps: i32 },
    /// The challenge was already complete; nothing changed.
    AlreadyComplete,
}

/// Progress record stored on each challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub started: bool,
    pub completed: bool,
    pub current_step: i32,
    pub total_steps: i32,
    #[serde(default)]
    pub submissions: Vec<SubmissionRecord>,
}

impl ChallengeProgress {
    /// Fresh progress for a challenge with `total_steps` steps (clamped to >= 1).
    pub fn new(total_steps: i32) -> Self {
        Self {
            started: false,
            completed: false,
            current_step: 0,
            total_steps: total_steps.max(1),
            submissions: Vec::new(),
        }
    }

    pub fn remaining_steps(&self) -> i32 {
        (self.total_steps - self.current_step).max(0)
    }

    /// Count one valid step and append its record.
    ///
    /// `current_step` never exceeds `total_steps` and never decreases. A
    /// completed record is left untouched.
    pub fn record_step(&mut self, record: SubmissionRecord) -> StepOutcome {
        if self.completed {
            return StepOutcome::AlreadyComplete;
        }

        self.started = true;
        self.current_step = (self.current_step + 1).min(self.total_steps);
        self.submissions.push(record);

        if self.current_step >= self.total_steps {
            self.current_step = self.total_steps;
            self.completed = true;
            StepOutcome::Completed {
                total_steps: self.total_steps,
            }
        } else {
            StepOutcome::Advanced {
                current_step: self.current_step,
                total_steps: self.total_steps,
            }
        }
    }

    /// Whether the record satisfies `0 <= current_step <= total_steps` and
    /// `completed` agrees with the counter.
    pub fn is_consistent(&self) -> bool {
        self.total_steps >= 1
            && (0..=self.total_steps).contains(&self.current_step)
            && self.completed == (self.current_step == self.total_steps)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn text(payload: &str) -> SubmissionRecord {
        SubmissionRecord::new(SubmissionKind::Text, payload)
    }

    #[test]
    fn multi_day_serializes_kebab_case() {
        let json = serde_json::to_string(&ChallengeType::MultiDay).unwrap();
        assert_eq!(json, "\"multi-day\"");
        assert_eq!("multi-day".parse::<ChallengeType>().unwrap(), ChallengeType::MultiDay);
    }

    #[test]
    fn unknown_type_lists_valid_names() {
        let err = "riddle".parse::<ChallengeType>().unwrap_err();
        assert!(err.contains("photo, video, text, keyword, multi-day, custom"));
    }

    #[test]
    fn only_photo_and_video_require_approval() {
        let gated: Vec<_> = ChallengeType::ALL
            .into_iter()
            .filter(|t| t.requires_approval())
            .collect();
        assert_eq!(gated, vec![ChallengeType::Photo, ChallengeType::Video]);
    }

    #[test]
    fn total_steps_prefers_explicit_value() {
        let req = ChallengeRequirements {
            total_steps: Some(4),
            days: Some(7),
            ..Default::default()
        };
        assert_eq!(req.resolve_total_steps(ChallengeType::MultiDay), 4);
    }

    #[test]
    fn multi_day_falls_back_to_days() {
        let req = ChallengeRequirements {
            days: Some(5),
            ..Default::default()
        };
        assert_eq!(req.resolve_total_steps(ChallengeType::MultiDay), 5);
        assert_eq!(req.resolve_total_steps(ChallengeType::Text), 1);
    }

    #[test]
    fn non_positive_step_counts_default_to_one() {
        let req = ChallengeRequirements {
            total_steps: Some(0),
            ..Default::default()
        };
        assert_eq!(req.resolve_total_steps(ChallengeType::Custom), 1);
        assert_eq!(ChallengeProgress::new(-3).total_steps, 1);
    }

    #[test]
    fn blank_keyword_is_treated_as_missing() {
        let req = ChallengeRequirements {
            keyword: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(req.keyword(), None);
    }

    #[test]
    fn requirements_keep_unknown_keys() {
        let raw = serde_json::json!({"keyword": "pizza", "hint": "dinner"});
        let req: ChallengeRequirements = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(req.keyword(), Some("pizza"));
        assert_eq!(serde_json::to_value(&req).unwrap(), raw);
    }

    #[test]
    fn three_step_progress_completes_on_third() {
        let mut progress = ChallengeProgress::new(3);

        assert_matches!(
            progress.record_step(text("one")),
            StepOutcome::Advanced { current_step: 1, total_steps: 3 }
        );
        assert_matches!(
            progress.record_step(text("two")),
            StepOutcome::Advanced { current_step: 2, total_steps: 3 }
        );
        assert_matches!(
            progress.record_step(text("three")),
            StepOutcome::Completed { total_steps: 3 }
        );

        assert!(progress.started);
        assert!(progress.completed);
        assert_eq!(progress.submissions.len(), 3);
        assert!(progress.is_consistent());
    }

    #[test]
    fn completed_progress_is_not_re_incremented() {
        let mut progress = ChallengeProgress::new(1);
        progress.record_step(text("done"));
        let snapshot = progress.clone();

        assert_eq!(progress.record_step(text("again")), StepOutcome::AlreadyComplete);
        assert_eq!(progress, snapshot);
    }

    #[test]
    fn progress_serializes_submission_type_field() {
        let mut progress = ChallengeProgress::new(2);
        progress.record_step(text("hello there friend"));
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["current_step"], 1);
        assert_eq!(json["submissions"][0]["type"], "text");
    }

    #[test]
    fn fresh_progress_is_consistent() {
        let progress = ChallengeProgress::new(2);
        assert!(progress.is_consistent());
        assert_eq!(progress.remaining_steps(), 2);
    }
}
