//! Identa is an email-first identity core: accounts keyed on email,
//! globally-unique secondary emails, a 1:1 extended profile and storage
//! path derivation for their files.

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod account;
pub mod config;
pub mod crypto;
pub mod database;
pub mod email;
pub mod error;
pub mod storage;
pub mod telemetry;

use std::sync::Arc;

pub use account::{Account, AccountService, Profile, SecondaryEmail};
pub use error::{IdentityError, Result};

/// Shared handles of the identity store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::PasswordManager>,
}

/// Initialize the application state.
pub async fn initialize_state() -> std::result::Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref config) => {
            database::Database::new(
                &config.address,
                &config
                    .username
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .password
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .database
                    .clone()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME.into()),
                config.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?
        },
        None => {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            return Err("missing `postgres` entry on `config.yaml` file".into());
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    let crypto =
        Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);

    Ok(AppState { config, db, crypto })
}
