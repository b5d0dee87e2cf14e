//! Local input validation for login and administration forms.
//!
//! Validation failures are recovered where they happen: the caller shows
//! the message inline and never forwards it as a backend error.

use thiserror::Error;

/// Maximum accepted email length
const MAX_EMAIL_LENGTH: usize = 254;

/// Password length bounds accepted by the hosted auth service
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum display-name length for staff records
const MAX_NAME_LENGTH: usize = 80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be between {min} and {max} characters", min = MIN_PASSWORD_LENGTH, max = MAX_PASSWORD_LENGTH)]
    InvalidPassword,

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Name is too long ({0} characters)")]
    NameTooLong(usize),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Unknown cache section: {0}")]
    UnknownSection(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Order has no items")]
    EmptyOrder,
}

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Normalize and validate an email address.
///
/// Returns the trimmed, lower-cased address. The check is deliberately
/// shallow: one `@`, a non-empty local part, and a dotted domain.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_lowercase();
    let invalid = || ValidationError::InvalidEmail(email.to_string());

    if normalized.is_empty()
        || normalized.len() > MAX_EMAIL_LENGTH
        || !normalized.chars().all(|c| is_valid_input_char(c) && !c.is_whitespace())
    {
        return Err(invalid());
    }

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(normalized)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len)
        || !password.chars().all(is_valid_input_char)
    {
        return Err(ValidationError::InvalidPassword);
    }
    Ok(())
}

/// Trim and validate a staff display name.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong(len));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_normalizes() {
        assert_eq!(
            validate_email("  Chef@Maquis.CI ").unwrap(),
            "chef@maquis.ci"
        );
    }

    #[test]
    fn test_validate_email_rejects_malformed() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@maquis.ci").is_err());
        assert!(validate_email("chef@localhost").is_err());
        assert!(validate_email("chef@maquis..ci").is_err());
        assert!(validate_email("chef@a@b.ci").is_err());
        assert!(validate_email("chef mate@maquis.ci").is_err());
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(validate_password("secret").is_ok());
        assert_eq!(validate_password("short"), Err(ValidationError::InvalidPassword));
        assert!(validate_password(&"x".repeat(129)).is_err());
        assert!(validate_password("secret\n1").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Awa Koné ").unwrap(), "Awa Koné");
        assert_eq!(validate_name("   "), Err(ValidationError::EmptyName));
        assert!(matches!(
            validate_name(&"a".repeat(81)),
            Err(ValidationError::NameTooLong(81))
        ));
    }
}
