//! Handle database requests.

use sqlx::{Pool, Postgres};

use crate::account::{Account, Profile, SecondaryEmail};
use crate::error::{IdentityError, Result, map_unique_violation};

#[derive(Clone)]
pub struct AccountRepository {
    pool: Pool<Postgres>,
}

impl AccountRepository {
    /// Create a new [`AccountRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Whether `email` is already taken anywhere in the unique-email space,
    /// i.e. as an account credential email or a secondary email.
    ///
    /// `exclude_secondary` removes one secondary-email row from the check so
    /// a persisted record can be re-validated against everything but itself.
    pub async fn email_in_use(
        &self,
        email: &str,
        exclude_secondary: Option<i64>,
    ) -> Result<bool> {
        let used = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)
                OR EXISTS (
                    SELECT 1 FROM secondary_emails
                    WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2)
                )"#,
        )
        .bind(email)
        .bind(exclude_secondary)
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    /// Insert [`Account`] and its empty [`Profile`] into database.
    ///
    /// Both rows are written in one transaction so the 1:1 invariant holds:
    /// either the account exists with its profile, or neither does. The
    /// uniqueness check is repeated inside the transaction; the unique index
    /// on `accounts.email` backstops concurrent inserts.
    pub async fn insert(&self, account: &Account) -> Result<(Account, Profile)> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)
                OR EXISTS (SELECT 1 FROM secondary_emails WHERE email = $1)"#,
        )
        .bind(&account.email)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            tx.rollback().await?;
            return Err(IdentityError::DuplicateEmail);
        }

        let created = sqlx::query_as::<_, Account>(
            r#"INSERT INTO accounts (email, password, is_active, is_superuser)
                VALUES ($1, $2, $3, $4)
                RETURNING id, email, password, is_active, is_superuser,
                    date_joined, last_login"#,
        )
        .bind(&account.email)
        .bind(&account.password)
        .bind(account.is_active)
        .bind(account.is_superuser)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"INSERT INTO profiles (account_id)
                VALUES ($1)
                RETURNING id, account_id, name, surname, patronymic,
                    birthdate, sex, photo"#,
        )
        .bind(created.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(account_id = created.id, "account created");

        Ok((created, profile))
    }

    /// Find current account using `id` field.
    pub async fn find_by_id(&self, account_id: i64) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"SELECT id, email, password, is_active, is_superuser,
                    date_joined, last_login
                FROM accounts WHERE id = $1"#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    /// Find current account using `email` field.
    pub async fn find_by_email(&self, email: &str) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"SELECT id, email, password, is_active, is_superuser,
                    date_joined, last_login
                FROM accounts WHERE email = $1"#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    /// Fetch the one [`Profile`] linked to an account.
    pub async fn profile_of(&self, account_id: i64) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"SELECT id, account_id, name, surname, patronymic,
                    birthdate, sex, photo
                FROM profiles WHERE account_id = $1"#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Update mutable [`Profile`] fields.
    pub async fn update_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"UPDATE profiles
                SET name = $1, surname = $2, patronymic = $3,
                    birthdate = $4, sex = $5, photo = $6
                WHERE id = $7"#,
        )
        .bind(&profile.name)
        .bind(&profile.surname)
        .bind(&profile.patronymic)
        .bind(profile.birthdate)
        .bind(profile.sex)
        .bind(&profile.photo)
        .bind(profile.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a validated [`SecondaryEmail`].
    pub async fn insert_secondary_email(
        &self,
        record: &SecondaryEmail,
    ) -> Result<SecondaryEmail> {
        sqlx::query_as::<_, SecondaryEmail>(
            r#"INSERT INTO secondary_emails (email, account_id)
                VALUES ($1, $2)
                RETURNING id, email, account_id"#,
        )
        .bind(&record.email)
        .bind(record.account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    /// Update a validated [`SecondaryEmail`] in place.
    pub async fn update_secondary_email(
        &self,
        record: &SecondaryEmail,
    ) -> Result<()> {
        sqlx::query(r#"UPDATE secondary_emails SET email = $1 WHERE id = $2"#)
            .bind(&record.email)
            .bind(record.id)
            .execute(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        Ok(())
    }

    /// List secondary emails owned by an account.
    pub async fn secondary_emails(
        &self,
        account_id: i64,
    ) -> Result<Vec<SecondaryEmail>> {
        let emails = sqlx::query_as::<_, SecondaryEmail>(
            r#"SELECT id, email, account_id
                FROM secondary_emails
                WHERE account_id = $1
                ORDER BY id"#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }

    /// Delete current account.
    ///
    /// The schema cascades the delete to the account's profile and secondary
    /// emails. Deletion policy itself is owned by the surrounding system.
    pub async fn delete(&self, account_id: i64) -> Result<()> {
        sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
