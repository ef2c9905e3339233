//! Email address normalization.
//!
//! Every email stored by the identity core goes through [`normalize`] before
//! any uniqueness comparison, so the unique-email space is compared in
//! canonical form only.

use validator::ValidateEmail;

use crate::error::{IdentityError, Result};

/// Normalize an email address into its canonical `local@domain` form.
///
/// Trims surrounding whitespace and lowercases both parts. Fails with
/// [`IdentityError::MissingEmail`] on an empty input and
/// [`IdentityError::InvalidEmail`] on a malformed one. Idempotent:
/// normalizing an already-normalized address returns it unchanged.
pub fn normalize(raw: &str) -> Result<String> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(IdentityError::MissingEmail);
    }

    let (local, domain) = candidate
        .rsplit_once('@')
        .ok_or(IdentityError::InvalidEmail)?;
    if local.is_empty() || domain.is_empty() {
        return Err(IdentityError::InvalidEmail);
    }

    let email = format!("{}@{}", local.to_lowercase(), domain.to_lowercase());
    if !email.validate_email() {
        return Err(IdentityError::InvalidEmail);
    }

    Ok(email)
}
