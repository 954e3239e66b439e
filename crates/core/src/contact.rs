//! Recipient and sender contact normalization.
//!
//! Inbound SMS is matched to gifts by phone number, so numbers are stored
//! in one canonical `+<digits>` form regardless of how the sender typed them.

use crate::error::CoreError;

/// Shortest accepted number (digits only, excluding `+`).
const MIN_PHONE_DIGITS: usize = 8;

/// Longest accepted number per E.164.
const MAX_PHONE_DIGITS: usize = 15;

/// Normalize a phone number to `+<digits>`.
///
/// Formatting characters are ignored. Ten-digit numbers without a country
/// code are assumed to be North American (`+1`). Returns `None` when the
/// input cannot be a phone number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');

    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' ')))
    {
        return None;
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    let canonical = match (has_plus, digits.len()) {
        (false, 10) => format!("1{digits}"),
        _ => digits,
    };

    if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&canonical.len()) {
        Some(format!("+{canonical}"))
    } else {
        None
    }
}

/// Lightweight structural email check: one `@`, non-empty local part, and a
/// dotted domain with no whitespace anywhere.
pub fn is_plausible_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// A normalized pair of optional contact fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ContactInfo {
    /// Normalize raw contact fields, rejecting malformed values and requiring
    /// at least one of phone or email. `role` names the party in messages.
    pub fn parse(
        role: &str,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, CoreError> {
        let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(normalize_phone(raw).ok_or_else(|| {
                CoreError::Validation(format!("Invalid {role} phone number '{raw}'"))
            })?),
            None => None,
        };

        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) if is_plausible_email(raw) => Some(raw.to_lowercase()),
            Some(raw) => {
                return Err(CoreError::Validation(format!(
                    "Invalid {role} email address '{raw}'"
                )))
            }
            None => None,
        };

        if phone.is_none() && email.is_none() {
            return Err(CoreError::Validation(format!(
                "A {role} phone number or email address is required"
            )));
        }

        Ok(Self { phone, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digit_numbers_get_north_american_prefix() {
        assert_eq!(normalize_phone("(555) 123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("555.123.4567").as_deref(), Some("+15551234567"));
    }

    #[test]
    fn international_numbers_keep_their_digits() {
        assert_eq!(normalize_phone("+44 20 7946 0958").as_deref(), Some("+442079460958"));
        assert_eq!(normalize_phone("+15551234567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("15551234567").as_deref(), Some("+15551234567"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(normalize_phone("call me"), None);
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("+1234567890123456"), None);
    }

    #[test]
    fn email_shape_checks() {
        assert!(is_plausible_email("a@example.com"));
        assert!(!is_plausible_email("a@example"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("a b@example.com"));
        assert!(!is_plausible_email("a@b@example.com"));
    }

    #[test]
    fn contact_requires_one_field() {
        let err = ContactInfo::parse("recipient", None, Some("  ")).unwrap_err();
        assert!(err.to_string().contains("recipient phone number or email"));
    }

    #[test]
    fn contact_normalizes_both_fields() {
        let contact =
            ContactInfo::parse("recipient", Some("555-123-4567"), Some("Pat@Example.com")).unwrap();
        assert_eq!(contact.phone.as_deref(), Some("+15551234567"));
        assert_eq!(contact.email.as_deref(), Some("pat@example.com"));
    }

    #[test]
    fn contact_rejects_malformed_email() {
        assert!(ContactInfo::parse("sender", None, Some("nope")).is_err());
    }
}
