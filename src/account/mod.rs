mod builder;
mod repository;
mod service;

pub use builder::*;
pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};

/// File extensions accepted for a profile photo.
pub const ALLOWED_PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
/// Maximum profile photo size, in bytes.
pub const MAX_PHOTO_BYTES: u64 = 5 * 1024 * 1024;

/// Login identity as saved on database.
///
/// Only sign-in related data lives here; everything else belongs to the
/// associated [`Profile`].
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct Account {
    pub id: i64,
    /// Normalized, globally unique credential email.
    pub email: String,
    /// PHC-format credential hash.
    #[serde(skip)]
    pub password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    /// Set by the database at insert, never updated afterwards.
    pub date_joined: chrono::DateTime<chrono::Utc>,
    /// Written by the surrounding login flow, not by this core.
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
}

impl Account {
    /// Start building a new [`Account`].
    pub fn builder() -> AccountBuilder<Missing, Missing> {
        AccountBuilder::new()
    }
}

/// Additional email owned by exactly one [`Account`].
///
/// Shares the global uniqueness space with account credential emails.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct SecondaryEmail {
    pub id: i64,
    pub email: String,
    pub account_id: i64,
}

/// Extended personal information, one-to-one with an [`Account`].
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct Profile {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub surname: String,
    pub patronymic: String,
    pub birthdate: Option<chrono::NaiveDate>,
    pub sex: Sex,
    /// Storage path of the uploaded photo, derived by [`crate::storage`].
    pub photo: Option<String>,
}

impl Profile {
    /// Human-readable name: "name surname", either part alone, or `None`
    /// when both are empty (callers fall back to the account email).
    pub fn display_name(&self) -> Option<String> {
        match (self.name.is_empty(), self.surname.is_empty()) {
            (false, false) => Some(format!("{} {}", self.name, self.surname)),
            (false, true) => Some(self.name.clone()),
            (true, false) => Some(self.surname.clone()),
            (true, true) => None,
        }
    }
}

/// Profile sex, stored as the `sex` Postgres enum.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "sex")]
pub enum Sex {
    #[default]
    #[sqlx(rename = "M")]
    #[serde(rename = "M")]
    Male,
    #[sqlx(rename = "F")]
    #[serde(rename = "F")]
    Female,
}

/// Check a candidate photo filename against [`ALLOWED_PHOTO_EXTENSIONS`].
pub fn validate_photo_extension(filename: &str) -> Result<()> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or(IdentityError::UnsupportedPhotoType)?;

    if ALLOWED_PHOTO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(IdentityError::UnsupportedPhotoType)
    }
}

/// Check a candidate photo size against [`MAX_PHOTO_BYTES`].
pub fn validate_photo_size(bytes: u64) -> Result<()> {
    if bytes > MAX_PHOTO_BYTES {
        return Err(IdentityError::PhotoTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        let mut profile = Profile {
            name: "Ivan".into(),
            surname: "Petrov".into(),
            ..Default::default()
        };
        assert_eq!(profile.display_name().unwrap(), "Ivan Petrov");

        profile.surname.clear();
        assert_eq!(profile.display_name().unwrap(), "Ivan");

        profile.name.clear();
        profile.surname = "Petrov".into();
        assert_eq!(profile.display_name().unwrap(), "Petrov");

        profile.surname.clear();
        assert!(profile.display_name().is_none());
    }

    #[test]
    fn test_photo_extension_validation() {
        assert!(validate_photo_extension("me.jpg").is_ok());
        assert!(validate_photo_extension("me.JPEG").is_ok());
        assert!(validate_photo_extension("me.png").is_ok());

        assert!(validate_photo_extension("me.gif").is_err());
        assert!(validate_photo_extension("no-extension").is_err());
    }

    #[test]
    fn test_photo_size_validation() {
        assert!(validate_photo_size(MAX_PHOTO_BYTES).is_ok());
        assert!(matches!(
            validate_photo_size(MAX_PHOTO_BYTES + 1),
            Err(IdentityError::PhotoTooLarge)
        ));
    }
}
