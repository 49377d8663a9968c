//! Input validation for registration, login, and message posting.
//!
//! Checks are shape checks only; uniqueness and credential verification
//! belong to the store and auth layers. Every failure names the offending
//! field so clients can surface it next to the right input.

use std::fmt;

/// A failed field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const MESSAGE_MAX: usize = 2000;

/// Lowercase alphanumeric plus `_` and `-`, 3 to 32 characters.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < USERNAME_MIN || len > USERNAME_MAX {
        return Err(ValidationError::new(
            "username",
            format!("must be {USERNAME_MIN} to {USERNAME_MAX} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(ValidationError::new(
            "username",
            "may only contain lowercase letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Structural email check: one `@` with a dotted domain. Deliverability is
/// out of scope.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let err = || ValidationError::new("email", "must be a valid email address");
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(err());
    }
    let (local, domain) = email.split_once('@').ok_or_else(err)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(err());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(err)?;
    if host.is_empty() || tld.is_empty() {
        return Err(err());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        return Err(ValidationError::new(
            "password",
            format!("must be at least {PASSWORD_MIN} characters"),
        ));
    }
    if len > PASSWORD_MAX {
        return Err(ValidationError::new(
            "password",
            format!("must be at most {PASSWORD_MAX} characters"),
        ));
    }
    Ok(())
}

/// Trims surrounding whitespace and enforces the length bound. Returns the
/// trimmed content to store.
pub fn validate_message_content(content: &str) -> Result<&str, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("content", "must not be empty"));
    }
    if trimmed.chars().count() > MESSAGE_MAX {
        return Err(ValidationError::new(
            "content",
            format!("must be at most {MESSAGE_MAX} characters"),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("user_1-a").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("Alice").is_err());
        assert!(validate_username("al ice").is_err());
        assert!(validate_username("al.ice").is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn message_content_is_trimmed() {
        assert_eq!(validate_message_content("  hello  ").unwrap(), "hello");
        assert!(validate_message_content("   ").is_err());
        assert!(validate_message_content(&"x".repeat(2001)).is_err());
    }
}
