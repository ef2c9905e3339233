//! Typed builder for Account.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::account::{Account, AccountService};
use crate::crypto::PasswordManager;

/// [`Account`] builder.
#[derive(Debug, Clone)]
pub struct AccountBuilder<Email, Password> {
    email: Email,
    password: Password,
    is_active: bool,
    is_superuser: bool,
}

/// Value is missing on [`AccountBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`AccountBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl AccountBuilder<Missing, Missing> {
    /// Create a new [`AccountBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            password: Missing,
            is_active: true,
            is_superuser: false,
        }
    }
}

impl Default for AccountBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Password> AccountBuilder<Missing, Password> {
    /// Update `email` field on [`AccountBuilder`].
    ///
    /// The raw value is kept as given; normalization and uniqueness checks
    /// happen in [`AccountService::create_account`].
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> AccountBuilder<Present<String>, Password> {
        AccountBuilder {
            email: Present(email.into()),
            password: self.password,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
        }
    }
}

impl<Email> AccountBuilder<Email, Missing> {
    /// Update `password` field on [`AccountBuilder`].
    pub fn password(
        self,
        password: impl Into<String>,
    ) -> AccountBuilder<Email, Present<String>> {
        AccountBuilder {
            email: self.email,
            password: Present(password.into()),
            is_active: self.is_active,
            is_superuser: self.is_superuser,
        }
    }
}

impl<Email, Password> AccountBuilder<Email, Password> {
    /// Update `is_active` flag on [`AccountBuilder`].
    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Mark the account as superuser. Forces `is_active` too.
    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self.is_active = true;
        self
    }
}

impl AccountBuilder<Present<String>, Present<String>> {
    /// Build an [`Account`] with `email` and `password`, ready for creation.
    pub fn build(
        self,
        pool: Pool<Postgres>,
        crypto: Arc<PasswordManager>,
    ) -> AccountService {
        let account = Account {
            email: self.email.0,
            password: self.password.0,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            ..Default::default()
        };

        AccountService::new(account, pool, crypto)
    }
}

impl AccountBuilder<Present<String>, Missing> {
    /// Build an [`Account`] with `email` only, for lookups.
    pub fn build(
        self,
        pool: Pool<Postgres>,
        crypto: Arc<PasswordManager>,
    ) -> AccountService {
        let account = Account {
            email: self.email.0,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            ..Default::default()
        };

        AccountService::new(account, pool, crypto)
    }
}
