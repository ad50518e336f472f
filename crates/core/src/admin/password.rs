//! Password strength validation for admin resets

use agendapro_domain::constants::MIN_PASSWORD_LENGTH;
use agendapro_domain::{AgendaError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static SPECIAL_CHAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#)
        .expect("SPECIAL_CHAR_REGEX should compile - this is a bug")
});

/// Validate a new password against the strength rules
///
/// Requires the minimum length plus at least one uppercase letter, one
/// lowercase letter, one digit, and one special character. Every unmet rule
/// is reported in the error so the caller sees them all at once.
pub fn validate_password_strength(password: &str) -> Result<()> {
    let mut missing = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        missing.push(format!("at least {MIN_PASSWORD_LENGTH} characters"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit".to_string());
    }
    if !SPECIAL_CHAR_REGEX.is_match(password) {
        missing.push("a special character".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AgendaError::Validation(format!("password must contain {}", missing.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password_passes() {
        assert!(validate_password_strength("Str0ng!pass").is_ok());
    }

    #[test]
    fn test_short_password_fails() {
        let error = validate_password_strength("S1!a").unwrap_err();
        assert!(error.to_string().contains("at least 8 characters"));
    }

    #[test]
    fn test_missing_classes_are_all_reported() {
        let error = validate_password_strength("alllowercase").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("an uppercase letter"));
        assert!(message.contains("a digit"));
        assert!(message.contains("a special character"));
        assert!(!message.contains("a lowercase letter"));
    }

    #[test]
    fn test_each_special_class_char_counts() {
        for c in "!@#$%^&*(),.?\":{}|<>".chars() {
            let password = format!("Passw0rd{c}");
            assert!(
                validate_password_strength(&password).is_ok(),
                "{c} should satisfy the special character rule"
            );
        }
    }

    #[test]
    fn test_unlisted_special_char_does_not_count() {
        // Hyphen is not in the accepted special character class
        let error = validate_password_strength("Passw0rd-").unwrap_err();
        assert!(error.to_string().contains("a special character"));
    }
}
