//! # Database Migrations
//!
//! SQL files under `migrations/sqlite/` are embedded at compile time and
//! applied in filename order on startup.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   components + db_config (dmtx_ser = 0)
//! ```
//!
//! Add new files with the next sequence number; never edit an applied one.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Brings the schema up to date. Already-applied files are skipped, so this
/// runs on every open.
pub(crate) async fn apply(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(embedded = MIGRATOR.migrations.len(), "Inventory schema up to date");
    Ok(())
}

#[cfg(test)]
pub(crate) fn embedded_count() -> usize {
    MIGRATOR.migrations.len()
}
