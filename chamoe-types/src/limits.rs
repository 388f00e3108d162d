//! Content limits and the local validation run before anything reaches a gateway.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const POST_MAX_LENGTH: usize = 500;
pub const COMMENT_MAX_LENGTH: usize = 500;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content is empty")]
    Empty,

    #[error("content exceeds {max} characters (current: {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("username must be {min}-{max} characters (current: {actual})")]
    UsernameLength { min: usize, max: usize, actual: usize },

    #[error("username may only contain letters, digits and underscores")]
    UsernameCharacters,

    #[error("email address is invalid")]
    InvalidEmail,

    #[error("password is empty")]
    EmptyPassword,
}

/// Count characters the way the limits are stated: one per Unicode scalar value
pub fn count_characters(text: &str) -> usize {
    text.chars().count()
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap())
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn validate_text(content: &str, max: usize) -> Result<String, ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let actual = count_characters(content);
    if actual > max {
        return Err(ValidationError::TooLong { max, actual });
    }
    Ok(content.to_string())
}

/// Validate post content. The accepted content is returned untrimmed.
pub fn validate_post_content(content: &str) -> Result<String, ValidationError> {
    validate_text(content, POST_MAX_LENGTH)
}

pub fn validate_comment_content(content: &str) -> Result<String, ValidationError> {
    validate_text(content, COMMENT_MAX_LENGTH)
}

pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let actual = count_characters(username);
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&actual) {
        return Err(ValidationError::UsernameLength {
            min: USERNAME_MIN_LENGTH,
            max: USERNAME_MAX_LENGTH,
            actual,
        });
    }
    if !username_regex().is_match(username) {
        return Err(ValidationError::UsernameCharacters);
    }
    Ok(username.to_string())
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if !email_regex().is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_and_whitespace_rejected() {
        assert_eq!(validate_post_content(""), Err(ValidationError::Empty));
        assert_eq!(validate_post_content("   "), Err(ValidationError::Empty));
        assert_eq!(validate_comment_content("\n\t"), Err(ValidationError::Empty));
    }

    #[test]
    fn test_post_length_boundary() {
        assert!(validate_post_content(&"x".repeat(500)).is_ok());
        assert_eq!(
            validate_post_content(&"x".repeat(501)),
            Err(ValidationError::TooLong { max: 500, actual: 501 })
        );
    }

    #[test]
    fn test_multibyte_counts_as_one() {
        // 500 Hangul syllables are 1500 bytes but 500 characters
        let content = "참".repeat(500);
        assert!(validate_post_content(&content).is_ok());
    }

    #[test]
    fn test_content_returned_untrimmed() {
        assert_eq!(validate_post_content("  hello ").unwrap(), "  hello ");
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("user_01").is_ok());
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::UsernameLength { actual: 2, .. })
        ));
        assert!(matches!(
            validate_username(&"a".repeat(21)),
            Err(ValidationError::UsernameLength { actual: 21, .. })
        ));
        assert_eq!(
            validate_username("bad name"),
            Err(ValidationError::UsernameCharacters)
        );
    }

    #[test]
    fn test_email_rules() {
        assert_eq!(validate_email(" user@example.com ").unwrap(), "user@example.com");
        assert_eq!(validate_email("user@example"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("no-at-sign.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_password(""), Err(ValidationError::EmptyPassword));
    }

    proptest! {
        #[test]
        fn prop_post_length_limit(len in 1usize..800) {
            let content = "a".repeat(len);
            let result = validate_post_content(&content);
            if len <= POST_MAX_LENGTH {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result, Err(ValidationError::TooLong { max: POST_MAX_LENGTH, actual: len }));
            }
        }

        #[test]
        fn prop_whitespace_only_is_empty(ws in "[ \t\n\r]{0,40}") {
            prop_assert_eq!(validate_post_content(&ws), Err(ValidationError::Empty));
        }
    }
}
