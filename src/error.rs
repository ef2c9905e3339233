//! Error handler for identa.

use thiserror::Error;

use crate::crypto::CryptoError;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Enum representing identity-store errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("the email must be set")]
    MissingEmail,

    #[error("email is not valid")]
    InvalidEmail,

    #[error("email is already in use in the system")]
    DuplicateEmail,

    #[error("photo extension must be jpg, jpeg or png")]
    UnsupportedPhotoType,

    #[error("photo exceeds the maximum allowed size")]
    PhotoTooLarge,

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Map storage-layer unique-constraint violations to
/// [`IdentityError::DuplicateEmail`].
///
/// The in-process uniqueness check and the insert are two separate steps, so
/// under concurrent callers both can pass the check. The unique indexes on
/// `accounts.email` and `secondary_emails.email` reject the loser; surface
/// that the same way as the in-process check.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            IdentityError::DuplicateEmail
        },
        _ => err.into(),
    }
}
