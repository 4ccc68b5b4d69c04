//! Synchronous credential checks run before any network call. Checks run in a
//! fixed order and the first failure wins.

use regex::Regex;
use thiserror::Error;

pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    EmailFormat,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Username is required")]
    UsernameRequired,
}

/// Basic `local@domain.tld` shape: no whitespace, one `@`, a dot in the domain.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Checks shared by sign-in and sign-up.
///
/// # Errors
/// Returns the first failing check.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !valid_email(email) {
        return Err(ValidationError::EmailFormat);
    }
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Sign-up checks: credentials first, then the username.
///
/// # Errors
/// Returns the first failing check.
pub fn validate_sign_up(email: &str, password: &str, username: &str) -> Result<(), ValidationError> {
    validate_credentials(email, password)?;
    if username.is_empty() {
        return Err(ValidationError::UsernameRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@b.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_malformed() {
        for email in [
            "not-an-email",
            "missing-at.example.com",
            "missing-domain@",
            "no-tld@example",
            "two@@example.com",
            "space in@example.com",
        ] {
            assert!(!valid_email(email), "{email} should be rejected");
        }
    }

    #[test]
    fn order_is_email_then_password() {
        assert_eq!(
            validate_credentials("", ""),
            Err(ValidationError::EmailRequired)
        );
        assert_eq!(
            validate_credentials("bad", ""),
            Err(ValidationError::EmailFormat)
        );
        assert_eq!(
            validate_credentials("a@b.com", ""),
            Err(ValidationError::PasswordRequired)
        );
        assert_eq!(
            validate_credentials("a@b.com", "12345"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(validate_credentials("a@b.com", "123456"), Ok(()));
    }

    #[test]
    fn short_passwords_always_fail() {
        for password in ["a", "ab", "abc", "abcd", "abcde", "ñññññ"] {
            assert_eq!(
                validate_credentials("a@b.com", password),
                Err(ValidationError::PasswordTooShort)
            );
        }
    }

    #[test]
    fn username_checked_last() {
        assert_eq!(
            validate_sign_up("bad", "1", ""),
            Err(ValidationError::EmailFormat)
        );
        assert_eq!(
            validate_sign_up("a@b.com", "secret1", ""),
            Err(ValidationError::UsernameRequired)
        );
        assert_eq!(validate_sign_up("a@b.com", "secret1", "alice"), Ok(()));
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "Password must be at least 6 characters long"
        );
        assert_eq!(
            ValidationError::EmailFormat.to_string(),
            "Please enter a valid email address"
        );
    }
}
