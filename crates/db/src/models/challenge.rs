//! Challenge entity model and DTOs.

use giftlock_core::challenge::{ChallengeProgress, ChallengeRequirements, ChallengeType};
use giftlock_core::gift::GiftStatus;
use giftlock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `challenges` table.
///
/// `version` increments on every progress write and is the
/// compare-and-swap token for [`ProgressUpdate`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Challenge {
    pub id: DbId,
    pub gift_id: DbId,
    #[sqlx(try_from = "String")]
    pub challenge_type: ChallengeType,
    pub description: String,
    #[sqlx(json)]
    pub requirements: ChallengeRequirements,
    #[sqlx(json)]
    pub progress: ChallengeProgress,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a challenge alongside its gift.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub challenge_type: ChallengeType,
    pub description: String,
    pub requirements: ChallengeRequirements,
}

impl NewChallenge {
    /// Initial progress record for this challenge.
    pub fn initial_progress(&self) -> ChallengeProgress {
        ChallengeProgress::new(self.requirements.resolve_total_steps(self.challenge_type))
    }
}

/// One lifecycle write: new progress, the gift status it implies, and
/// whether the gift unlocks. Applied only if the challenge is still at
/// `expected_version`.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub challenge_id: DbId,
    pub expected_version: i32,
    pub progress: ChallengeProgress,
    pub gift_status: GiftStatus,
    pub unlock: bool,
}
