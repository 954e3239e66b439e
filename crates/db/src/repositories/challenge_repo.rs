//! Repository for the `challenges` table.

use giftlock_core::challenge::ChallengeProgress;
use giftlock_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgExecutor;

use crate::models::challenge::{Challenge, NewChallenge};

/// Column list for challenges queries.
const COLUMNS: &str =
    "id, gift_id, challenge_type, description, requirements, progress, version, \
     created_at, updated_at";

/// Provides CRUD operations for challenges.
pub struct ChallengeRepo;

impl ChallengeRepo {
    /// Insert the challenge for a gift with fresh progress.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        gift_id: DbId,
        input: &NewChallenge,
    ) -> Result<Challenge, sqlx::Error> {
        let query = format!(
            "INSERT INTO challenges (gift_id, challenge_type, description, requirements, progress)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Challenge>(&query)
            .bind(gift_id)
            .bind(input.challenge_type.as_str())
            .bind(&input.description)
            .bind(Json(&input.requirements))
            .bind(Json(input.initial_progress()))
            .fetch_one(executor)
            .await
    }

    /// Find a challenge by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Challenge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM challenges WHERE id = $1");
        sqlx::query_as::<_, Challenge>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a challenge by ID and hold a row lock until the transaction ends.
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Challenge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM challenges WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Challenge>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find the challenge belonging to a gift.
    pub async fn find_by_gift_id<'e, E: PgExecutor<'e>>(
        executor: E,
        gift_id: DbId,
    ) -> Result<Option<Challenge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM challenges WHERE gift_id = $1");
        sqlx::query_as::<_, Challenge>(&query)
            .bind(gift_id)
            .fetch_optional(executor)
            .await
    }

    /// Fetch the challenges for a set of gifts.
    pub async fn list_for_gifts<'e, E: PgExecutor<'e>>(
        executor: E,
        gift_ids: &[DbId],
    ) -> Result<Vec<Challenge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM challenges WHERE gift_id = ANY($1)");
        sqlx::query_as::<_, Challenge>(&query)
            .bind(gift_ids)
            .fetch_all(executor)
            .await
    }

    /// Replace the progress record if the row is still at `expected_version`.
    ///
    /// Returns `None` when the version moved on (a concurrent write won).
    pub async fn update_progress<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        progress: &ChallengeProgress,
        expected_version: i32,
    ) -> Result<Option<Challenge>, sqlx::Error> {
        let query = format!(
            "UPDATE challenges
             SET progress = $2, version = version + 1, updated_at = now()
             WHERE id = $1 AND version = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Challenge>(&query)
            .bind(id)
            .bind(Json(progress))
            .bind(expected_version)
            .fetch_optional(executor)
            .await
    }
}
