//! Versioned migrations for the annotation table.
//! Files live in `migrations/` as reversible `up`/`down` pairs.

use sqlx::migrate::Migrator;

use crate::db::sqlite::SqlitePool;
use crate::error::TagnoteError;

/// Embedded migration set. Applied versions are recorded in `_sqlx_migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations. No-op when the schema is already current.
pub async fn migrate(pool: &SqlitePool) -> Result<(), TagnoteError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Undo every applied migration, which drops the annotation table.
pub async fn revert(pool: &SqlitePool) -> Result<(), TagnoteError> {
    MIGRATOR.undo(pool, 0).await?;
    Ok(())
}
