//! Common validation utilities.
//!
//! Functions return `validator::ValidationError` so they can back
//! `#[validate(custom(function = ...))]` attributes on request DTOs.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref SIMPLE_EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Loose email shape check used for profile contact updates.
pub fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    if SIMPLE_EMAIL.is_match(email.trim()) {
        Ok(())
    } else {
        Err(error("email_format", "Please enter a valid email address"))
    }
}

/// Emergency hotline numbers: digits with optional spaces, `-` and `+`.
pub fn validate_emergency_number(number: &str) -> Result<(), ValidationError> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err(error(
            "emergency_number_required",
            "Emergency number is required",
        ));
    }

    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-' || c == '+');
    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());

    if allowed && has_digit {
        Ok(())
    } else {
        Err(error(
            "emergency_number_format",
            "Emergency number must contain only digits, spaces, hyphens, and plus signs",
        ))
    }
}
