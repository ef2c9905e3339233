//! Storage path derivation for uploaded and generated files.
//!
//! Paths follow the `module/kind/files/<id>` layout consumed by the
//! surrounding file-storage layer. This module computes paths only; it never
//! touches the filesystem.

use std::path::PathBuf;

use sqlx::{Pool, Postgres};

use crate::account::Profile;
use crate::error::Result;

/// Entity whose files live under `module/kind/files/<id>/`.
pub trait StoredEntity {
    /// Owning application module tag.
    const MODULE: &'static str;
    /// Lowercased type tag.
    const KIND: &'static str;
    /// Backing table, used to locate the identifier sequence.
    const TABLE: &'static str;

    /// Assigned identifier, if the entity has been persisted.
    fn id(&self) -> Option<i64>;
}

impl StoredEntity for Profile {
    const MODULE: &'static str = "base";
    const KIND: &'static str = "profile";
    const TABLE: &'static str = "profiles";

    fn id(&self) -> Option<i64> {
        (self.id != 0).then_some(self.id)
    }
}

/// Derive the storage path for an entity's file.
///
/// With a filename the result is the full file path
/// `module/kind/files/<id>/<filename>` (a file uploaded from outside). With
/// none it is the directory `module/kind/files/<id>`, for files the system
/// generates and places itself.
///
/// A persisted entity uses its real identifier. Otherwise the identifier is
/// *predicted* by peeking at the table's id sequence; the peek reserves
/// nothing, so a concurrent insert can claim the predicted value first.
/// Prefer deriving paths after the insert when possible.
pub async fn derive_path<E: StoredEntity>(
    pool: &Pool<Postgres>,
    entity: &E,
    filename: Option<&str>,
) -> Result<PathBuf> {
    let id = match entity.id() {
        Some(id) => id,
        None => predicted_id::<E>(pool).await?,
    };

    let path = match filename {
        Some(file) => PathBuf::from(format!(
            "{}/{}/files/{}/{}",
            E::MODULE,
            E::KIND,
            id,
            file
        )),
        None => [E::MODULE, E::KIND, "files", &id.to_string()]
            .iter()
            .collect(),
    };

    Ok(path)
}

/// Peek the next value the entity table's id sequence will assign.
async fn predicted_id<E: StoredEntity>(pool: &Pool<Postgres>) -> Result<i64> {
    let sequence: String = sqlx::query_scalar::<_, Option<String>>(
        r#"SELECT pg_get_serial_sequence($1, 'id')::TEXT"#,
    )
    .bind(E::TABLE)
    .fetch_one(pool)
    .await?
    .ok_or(sqlx::Error::RowNotFound)?;

    // a fresh sequence has not handed out `last_value` yet.
    let (last_value, is_called): (i64, bool) =
        sqlx::query_as(&format!("SELECT last_value, is_called FROM {sequence}"))
            .fetch_one(pool)
            .await?;

    Ok(if is_called { last_value + 1 } else { last_value })
}
