//! Input validation for credentials and contact points.

use std::sync::LazyLock;

use regex::Regex;

use super::AuthError;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static E164_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("valid phone regex"));

/// At least 8 characters with at least one letter and one digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(char::is_alphabetic)
        && password.chars().any(char::is_numeric)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trim and lowercase an email, rejecting malformed addresses.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmailFormat)
    }
}

/// Strip separators and require E.164 (`+` followed by 8-15 digits).
pub fn normalize_phone(phone: &str) -> Result<String, AuthError> {
    let phone: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if E164_RE.is_match(&phone) {
        Ok(phone)
    } else {
        Err(AuthError::InvalidPhoneFormat)
    }
}

/// First value that is present and non-blank.
pub fn choose_non_empty(primary: Option<&str>, fallback: Option<&str>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}
