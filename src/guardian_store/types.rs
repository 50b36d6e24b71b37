//! GuardianStore types

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single guardian contact record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Guardian {
    pub id: i64,
    /// Phone number in E.164-ish form (optional `+`, 7-15 digits)
    pub number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to set (insert or replace) the guardian number
#[derive(Debug, Clone, Deserialize)]
pub struct SetGuardianRequest {
    pub number: String,
}

/// Normalize and validate a phone number.
///
/// Spaces, dashes and parentheses are stripped; what remains must be an
/// optional leading `+` followed by 7-15 digits.
pub fn normalize_number(raw: &str) -> Result<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "Invalid phone number: {:?}",
            raw
        )));
    }
    if digits.len() < 7 || digits.len() > 15 {
        return Err(Error::Validation(format!(
            "Phone number must have 7-15 digits, got {}",
            digits.len()
        )));
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_number() {
        assert_eq!(normalize_number("01012345678").unwrap(), "01012345678");
    }

    #[test]
    fn test_normalize_e164_with_separators() {
        assert_eq!(
            normalize_number("+82 10-1234-5678").unwrap(),
            "+821012345678"
        );
    }

    #[test]
    fn test_reject_letters() {
        assert!(normalize_number("call-me").is_err());
    }

    #[test]
    fn test_reject_too_short() {
        assert!(normalize_number("123456").is_err());
    }

    #[test]
    fn test_reject_too_long() {
        assert!(normalize_number("+1234567890123456").is_err());
    }

    #[test]
    fn test_reject_empty() {
        assert!(normalize_number("").is_err());
        assert!(normalize_number("+").is_err());
    }
}
