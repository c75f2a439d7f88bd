use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::availability::DomainStatus;

pub const MIN_STORE_NAME_LEN: usize = 3;

/// Field-level validation failure shown next to the offending input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Store name must be at least 3 characters")]
    StoreNameTooShort,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Domain cannot be empty.")]
    DomainEmpty,
    #[error("Domain availability has not been confirmed yet.")]
    DomainUnconfirmed,
    #[error("{}", .0.message())]
    DomainRejected(DomainStatus),
}

/// Live feedback for the store name while the user is typing.
///
/// An empty field counts as not yet entered and carries no error.
pub fn store_name_feedback(name: &str) -> Option<FieldError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    validate_store_name(trimmed).err()
}

/// Strict rule applied at submission time.
pub fn validate_store_name(name: &str) -> Result<(), FieldError> {
    if name.trim().chars().count() < MIN_STORE_NAME_LEN {
        return Err(FieldError::StoreNameTooShort);
    }
    Ok(())
}

/// Live feedback for the contact email; empty means not yet entered.
pub fn email_feedback(email: &str) -> Option<FieldError> {
    if email.is_empty() {
        return None;
    }
    validate_email(email).err()
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if is_basic_email(email) {
        Ok(())
    } else {
        Err(FieldError::InvalidEmail)
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

fn is_basic_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}
