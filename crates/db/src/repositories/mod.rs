//! Repository layer: one zero-sized struct per table with async query
//! methods. Methods accept any `PgExecutor`, so they run equally against the
//! pool or inside a transaction.

pub mod challenge_repo;
pub mod gift_event_repo;
pub mod gift_repo;
pub mod photo_submission_repo;

pub use challenge_repo::ChallengeRepo;
pub use gift_event_repo::GiftEventRepo;
pub use gift_repo::GiftRepo;
pub use photo_submission_repo::PhotoSubmissionRepo;
