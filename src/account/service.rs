use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::account::{
    Account, AccountRepository, Profile, SecondaryEmail,
    validate_photo_extension,
};
use crate::crypto::PasswordManager;
use crate::email;
use crate::error::{IdentityError, Result};

/// Account manager.
#[derive(Clone)]
pub struct AccountService {
    pub repo: AccountRepository,
    pub crypto: Arc<PasswordManager>,
    pub data: Account,
    /// Filled by [`AccountService::create_account`]; otherwise loaded on
    /// demand through [`AccountService::profile`].
    pub profile: Option<Profile>,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(
        account: Account,
        pool: Pool<Postgres>,
        crypto: Arc<PasswordManager>,
    ) -> Self {
        Self {
            data: account,
            repo: AccountRepository::new(pool),
            crypto,
            profile: None,
        }
    }

    /// Create builded account together with its empty profile.
    ///
    /// Validation is fail-fast: missing email, then malformed email, then a
    /// duplicate anywhere in the unique-email space. On success the
    /// credential is hashed and the account and profile are persisted in one
    /// transaction.
    pub async fn create_account(mut self) -> Result<Self> {
        if self.data.email.is_empty() {
            return Err(IdentityError::MissingEmail);
        }
        self.data.email = email::normalize(&self.data.email)?;

        if self.repo.email_in_use(&self.data.email, None).await? {
            return Err(IdentityError::DuplicateEmail);
        }

        self.data.password = self.crypto.hash_password(&self.data.password)?;

        let (account, profile) = self.repo.insert(&self.data).await?;
        self.data = account;
        self.profile = Some(profile);

        Ok(self)
    }

    /// Create a superuser account; forces the superuser and active flags,
    /// then delegates to [`AccountService::create_account`].
    pub async fn create_superuser(
        email: impl Into<String>,
        password: impl Into<String>,
        pool: Pool<Postgres>,
        crypto: Arc<PasswordManager>,
    ) -> Result<Self> {
        Account::builder()
            .email(email)
            .password(password)
            .superuser()
            .build(pool, crypto)
            .create_account()
            .await
    }

    /// Find current account using `id` field.
    pub async fn find_by_id(mut self) -> Result<Self> {
        self.data = self.repo.find_by_id(self.data.id).await?;
        Ok(self)
    }

    /// Find current account using `email` field.
    ///
    /// The lookup email is normalized first, since only canonical forms are
    /// stored.
    pub async fn find_by_email(mut self) -> Result<Self> {
        let lookup = email::normalize(&self.data.email)?;
        self.data = self.repo.find_by_email(&lookup).await?;
        Ok(self)
    }

    /// Verify a plaintext credential against the stored hash.
    pub fn verify_password(&self, candidate: impl AsRef<[u8]>) -> Result<bool> {
        Ok(self.crypto.verify_password(candidate, &self.data.password)?)
    }

    /// Load the account's one [`Profile`].
    pub async fn profile(&mut self) -> Result<&Profile> {
        if self.profile.is_none() {
            self.profile = Some(self.repo.profile_of(self.data.id).await?);
        }

        // just filled above.
        Ok(self.profile.as_ref().unwrap())
    }

    /// Persist profile changes, checking the photo reference first.
    pub async fn update_profile(&self, profile: &Profile) -> Result<()> {
        if let Some(photo) = &profile.photo {
            validate_photo_extension(photo)?;
        }
        self.repo.update_profile(profile).await
    }

    /// Normalize a candidate secondary email in place and re-check the
    /// global uniqueness invariant.
    ///
    /// A persisted record (`id != 0`) is excluded from the collision check by
    /// its own id, so re-saving it under its current value succeeds. This
    /// does not persist anything; callers follow up with an insert or update.
    pub async fn validate_secondary_email(
        &self,
        record: &mut SecondaryEmail,
    ) -> Result<()> {
        record.email = email::normalize(&record.email)?;

        let exclude = (record.id != 0).then_some(record.id);
        if self.repo.email_in_use(&record.email, exclude).await? {
            return Err(IdentityError::DuplicateEmail);
        }

        Ok(())
    }

    /// Attach a new secondary email to the current account.
    pub async fn add_secondary_email(
        &self,
        email: impl Into<String>,
    ) -> Result<SecondaryEmail> {
        let mut record = SecondaryEmail {
            id: 0,
            email: email.into(),
            account_id: self.data.id,
        };
        self.validate_secondary_email(&mut record).await?;

        self.repo.insert_secondary_email(&record).await
    }

    /// List secondary emails of the current account.
    pub async fn secondary_emails(&self) -> Result<Vec<SecondaryEmail>> {
        self.repo.secondary_emails(self.data.id).await
    }

    /// Delete current account; the profile and secondary emails cascade.
    pub async fn delete(&self) -> Result<()> {
        self.repo.delete(self.data.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> Arc<PasswordManager> {
        Arc::new(PasswordManager::new(None).unwrap())
    }

    async fn create(
        pool: &Pool<Postgres>,
        email: &str,
    ) -> Result<AccountService> {
        Account::builder()
            .email(email)
            .password("P$soW%920$n&")
            .build(pool.clone(), crypto())
            .create_account()
            .await
    }

    #[sqlx::test]
    async fn test_create_account(pool: Pool<Postgres>) {
        let service = create(&pool, "Test@Example.COM").await.unwrap();

        assert_ne!(service.data.id, 0);
        assert_eq!(service.data.email, "test@example.com");
        assert!(service.data.is_active);
        assert!(!service.data.is_superuser);
        assert!(service.data.last_login.is_none());
        // the credential is stored hashed, never in plaintext.
        assert!(service.data.password.starts_with("$argon2id$"));
        assert!(service.verify_password("P$soW%920$n&").unwrap());
        assert!(!service.verify_password("other").unwrap());
    }

    #[sqlx::test]
    async fn test_create_account_creates_exactly_one_profile(
        pool: Pool<Postgres>,
    ) {
        let service = create(&pool, "test@example.com").await.unwrap();

        let profile = service.profile.as_ref().unwrap();
        assert_eq!(profile.account_id, service.data.id);
        assert_eq!(profile.name, "");
        assert!(profile.birthdate.is_none());

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM profiles WHERE account_id = $1",
        )
        .bind(service.data.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn test_create_account_rejects_empty_email(pool: Pool<Postgres>) {
        let result = create(&pool, "").await;
        assert!(matches!(result, Err(IdentityError::MissingEmail)));

        let result = create(&pool, "not-an-email").await;
        assert!(matches!(result, Err(IdentityError::InvalidEmail)));
    }

    #[sqlx::test]
    async fn test_create_account_rejects_duplicate_email(pool: Pool<Postgres>) {
        create(&pool, "test@example.com").await.unwrap();

        // same address, different casing: collides after normalization.
        let result = create(&pool, "TEST@example.com").await;
        assert!(matches!(result, Err(IdentityError::DuplicateEmail)));

        // nothing was half-persisted by the failed attempt.
        let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(accounts, 1);
    }

    #[sqlx::test]
    async fn test_create_superuser_forces_flags(pool: Pool<Postgres>) {
        let service = AccountService::create_superuser(
            "root@example.com",
            "P$soW%920$n&",
            pool.clone(),
            crypto(),
        )
        .await
        .unwrap();

        assert!(service.data.is_superuser);
        assert!(service.data.is_active);
    }

    #[sqlx::test]
    async fn test_find_by_email_normalizes_lookup(pool: Pool<Postgres>) {
        let created = create(&pool, "test@example.com").await.unwrap();

        let found = Account::builder()
            .email("TEST@Example.Com")
            .build(pool, crypto())
            .find_by_email()
            .await
            .unwrap();

        assert_eq!(found.data.id, created.data.id);
    }

    #[sqlx::test]
    async fn test_secondary_email_shares_uniqueness_space(
        pool: Pool<Postgres>,
    ) {
        let first = create(&pool, "first@example.com").await.unwrap();
        let second = create(&pool, "second@example.com").await.unwrap();

        let added = first.add_secondary_email("Extra@Example.com").await.unwrap();
        assert_eq!(added.email, "extra@example.com");
        assert_eq!(added.account_id, first.data.id);

        // collides with another account's credential email.
        let result = first.add_secondary_email("second@example.com").await;
        assert!(matches!(result, Err(IdentityError::DuplicateEmail)));

        // collides with an existing secondary email, from any account.
        let result = second.add_secondary_email("extra@example.com").await;
        assert!(matches!(result, Err(IdentityError::DuplicateEmail)));

        // a new account cannot take a secondary email either.
        let result = create(&pool, "extra@example.com").await;
        assert!(matches!(result, Err(IdentityError::DuplicateEmail)));
    }

    #[sqlx::test]
    async fn test_secondary_email_revalidation_excludes_itself(
        pool: Pool<Postgres>,
    ) {
        let service = create(&pool, "test@example.com").await.unwrap();
        let mut record =
            service.add_secondary_email("extra@example.com").await.unwrap();

        // re-validating the persisted record under its own value is fine.
        service.validate_secondary_email(&mut record).await.unwrap();

        // and so is moving it to a fresh address.
        record.email = "Moved@Example.com".into();
        service.validate_secondary_email(&mut record).await.unwrap();
        assert_eq!(record.email, "moved@example.com");
        service.repo.update_secondary_email(&record).await.unwrap();

        // but not onto the owner's credential email.
        record.email = "test@example.com".into();
        let result = service.validate_secondary_email(&mut record).await;
        assert!(matches!(result, Err(IdentityError::DuplicateEmail)));
    }

    #[sqlx::test]
    async fn test_update_profile_checks_photo_extension(pool: Pool<Postgres>) {
        let mut service = create(&pool, "test@example.com").await.unwrap();

        let mut profile = service.profile().await.unwrap().clone();
        profile.name = "Ivan".into();
        profile.photo = Some("base/profile/files/1/me.jpg".into());
        service.update_profile(&profile).await.unwrap();

        let stored = service.repo.profile_of(service.data.id).await.unwrap();
        assert_eq!(stored.name, "Ivan");
        assert_eq!(stored.photo.as_deref(), Some("base/profile/files/1/me.jpg"));

        profile.photo = Some("base/profile/files/1/me.gif".into());
        let result = service.update_profile(&profile).await;
        assert!(matches!(result, Err(IdentityError::UnsupportedPhotoType)));
    }

    #[sqlx::test]
    async fn test_delete_cascades_to_profile_and_secondary_emails(
        pool: Pool<Postgres>,
    ) {
        let service = create(&pool, "test@example.com").await.unwrap();
        service.add_secondary_email("one@example.com").await.unwrap();
        service.add_secondary_email("two@example.com").await.unwrap();
        assert_eq!(service.secondary_emails().await.unwrap().len(), 2);

        service.delete().await.unwrap();

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&pool)
            .await
            .unwrap();
        let secondary: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM secondary_emails")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(profiles, 0);
        assert_eq!(secondary, 0);

        // the released addresses can be claimed again.
        create(&pool, "one@example.com").await.unwrap();
    }
}
