//! Input rules for accounts and content.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DomainError, DomainResult};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;
pub const POST_MAX_CHARS: usize = 5000;
pub const COMMENT_MAX_CHARS: usize = 1000;
pub const MAX_POST_IMAGES: usize = 2;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static regex"));

pub fn username(value: &str) -> DomainResult<()> {
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(DomainError::validation(format!(
            "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !USERNAME_RE.is_match(value) {
        return Err(DomainError::validation(
            "Username can only contain letters, numbers and _",
        ));
    }
    Ok(())
}

pub fn email(value: &str) -> DomainResult<()> {
    if !EMAIL_RE.is_match(value) {
        return Err(DomainError::validation("Invalid email format"));
    }
    Ok(())
}

pub fn password(value: &str) -> DomainResult<()> {
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if value.chars().count() < PASSWORD_MIN || !has_letter || !has_digit {
        return Err(DomainError::validation(format!(
            "Password must be at least {PASSWORD_MIN} characters and contain both letters and numbers"
        )));
    }
    Ok(())
}

/// Non-blank text bounded by `max_chars`.
pub fn content(value: &str, max_chars: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation("content is empty"));
    }
    if value.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "content must be at most {max_chars} characters"
        )));
    }
    Ok(())
}

/// Returns the value untouched, or a validation error naming `field` when missing or blank.
pub fn required<'a>(field: &str, value: Option<&'a str>) -> DomainResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(username("alice").is_ok());
        assert!(username("a_1").is_ok());
        assert!(username("al").is_err());
        assert!(username(&"x".repeat(21)).is_err());
        assert!(username("bad name").is_err());
        assert!(username("dash-ed").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(email("alice@x.com").is_ok());
        assert!(email("alice@x").is_err());
        assert!(email("alice x@y.com").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(password("Passw0rd").is_ok());
        assert!(password("short1").is_err());
        assert!(password("lettersonly").is_err());
        assert!(password("1234567890").is_err());
    }

    #[test]
    fn test_content_rules() {
        assert!(content("hi", 10).is_ok());
        assert!(content("   \n", 10).is_err());
        assert!(content(&"x".repeat(11), 10).is_err());
    }

    #[test]
    fn test_required_rejects_blank_and_keeps_whitespace() {
        assert_eq!(required("password", Some(" pass 1 ")).unwrap(), " pass 1 ");
        assert!(required("username", Some("   ")).is_err());
        assert!(required("username", None).is_err());
    }
}
