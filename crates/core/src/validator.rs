//! Challenge submission validation.
//!
//! [`validate`] decides, purely from the challenge type and requirements,
//! whether a recipient's submission satisfies the challenge. It has no side
//! effects and no error states: a miss is simply `false`.

use serde::{Deserialize, Serialize};

use crate::challenge::{ChallengeRequirements, ChallengeType};

/// Minimum trimmed length (exclusive) for a `text` challenge answer.
pub const MIN_TEXT_ANSWER_CHARS: usize = 10;

/// Content of one inbound submission, independent of the channel it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media_count: u32,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_content_type: Option<String>,
}

impl SubmissionContent {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            text: body.into(),
            ..Default::default()
        }
    }

    pub fn media(url: impl Into<String>, content_type: Option<String>) -> Self {
        Self {
            media_count: 1,
            media_url: Some(url.into()),
            media_content_type: content_type,
            ..Default::default()
        }
    }

    pub fn has_media(&self) -> bool {
        self.media_count > 0
    }
}

/// Does `content` satisfy a challenge of `challenge_type` with `requirements`?
///
/// - `photo` / `video`: at least one media attachment.
/// - `text`: trimmed body longer than [`MIN_TEXT_ANSWER_CHARS`] characters.
/// - `keyword`: body contains the configured keyword, case-insensitively.
///   Without a configured keyword nothing matches.
/// - `multi-day` / `custom`: always accepted; progress is driven by step
///   count or external confirmation.
pub fn validate(
    challenge_type: ChallengeType,
    requirements: &ChallengeRequirements,
    content: &SubmissionContent,
) -> bool {
    match challenge_type {
        ChallengeType::Photo | ChallengeType::Video => content.has_media(),
        ChallengeType::Text => content.text.trim().chars().count() > MIN_TEXT_ANSWER_CHARS,
        ChallengeType::Keyword => match requirements.keyword() {
            Some(keyword) => content
                .text
                .to_lowercase()
                .contains(&keyword.to_lowercase()),
            None => false,
        },
        ChallengeType::MultiDay | ChallengeType::Custom => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(k: &str) -> ChallengeRequirements {
        ChallengeRequirements {
            keyword: Some(k.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn photo_requires_media() {
        let req = ChallengeRequirements::default();
        assert!(!validate(ChallengeType::Photo, &req, &SubmissionContent::text("here it is")));
        assert!(validate(
            ChallengeType::Photo,
            &req,
            &SubmissionContent::media("https://cdn.example/p.jpg", None)
        ));
    }

    #[test]
    fn video_requires_media() {
        let req = ChallengeRequirements::default();
        let content = SubmissionContent {
            media_count: 2,
            ..Default::default()
        };
        assert!(validate(ChallengeType::Video, &req, &content));
        assert!(!validate(ChallengeType::Video, &req, &SubmissionContent::default()));
    }

    #[test]
    fn text_needs_more_than_ten_trimmed_chars() {
        let req = ChallengeRequirements::default();
        assert!(validate(ChallengeType::Text, &req, &SubmissionContent::text("I did it today")));
        // exactly ten characters once trimmed
        assert!(!validate(
            ChallengeType::Text,
            &req,
            &SubmissionContent::text("   0123456789   ")
        ));
        assert!(validate(ChallengeType::Text, &req, &SubmissionContent::text("01234567890")));
    }

    #[test]
    fn text_counts_characters_not_bytes() {
        let req = ChallengeRequirements::default();
        // five two-byte characters: ten bytes, five chars
        assert!(!validate(ChallengeType::Text, &req, &SubmissionContent::text("ééééé")));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert!(validate(
            ChallengeType::Keyword,
            &keyword("pizza"),
            &SubmissionContent::text("I love PIZZA night")
        ));
        assert!(validate(
            ChallengeType::Keyword,
            &keyword("PiZzA"),
            &SubmissionContent::text("pizza")
        ));
        assert!(!validate(
            ChallengeType::Keyword,
            &keyword("pizza"),
            &SubmissionContent::text("tacos tonight")
        ));
    }

    #[test]
    fn keyword_without_configuration_never_matches() {
        let req = ChallengeRequirements::default();
        assert!(!validate(ChallengeType::Keyword, &req, &SubmissionContent::text("anything")));
        assert!(!validate(ChallengeType::Keyword, &keyword(""), &SubmissionContent::text("")));
    }

    #[test]
    fn multi_day_and_custom_always_accept() {
        let req = ChallengeRequirements::default();
        let empty = SubmissionContent::default();
        assert!(validate(ChallengeType::MultiDay, &req, &empty));
        assert!(validate(ChallengeType::Custom, &req, &empty));
    }
}
