//! # Settings Repository
//!
//! Key/value pairs in the `db_config` table. The only key the application
//! relies on is [`SERIAL_KEY`], the next synthetic barcode number.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Key holding the next synthetic barcode serial.
pub const SERIAL_KEY: &str = "dmtx_ser";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM db_config WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Inserts or replaces `key`.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing setting");
        upsert(&self.pool, key, value).await
    }

    /// The serial the next synthetic barcode will use, without consuming it.
    pub async fn peek_serial(&self) -> DbResult<i64> {
        match self.get(SERIAL_KEY).await? {
            Some(value) => parse_serial(&value),
            None => Ok(0),
        }
    }

    /// Takes the current serial and stores its successor.
    ///
    /// Runs on the caller's connection so the bump commits or rolls back
    /// together with the insert that uses it.
    pub async fn next_serial(conn: &mut SqliteConnection) -> DbResult<i64> {
        let current: Option<String> = sqlx::query_scalar("SELECT value FROM db_config WHERE key = ?1")
            .bind(SERIAL_KEY)
            .fetch_optional(&mut *conn)
            .await?;

        let serial = match current {
            Some(value) => parse_serial(&value)?,
            None => 0,
        };

        upsert(&mut *conn, SERIAL_KEY, &(serial + 1).to_string()).await?;

        debug!(serial, "Allocated synthetic barcode serial");
        Ok(serial)
    }
}

async fn upsert<'e, E>(executor: E, key: &str, value: &str) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO db_config (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}

fn parse_serial(value: &str) -> DbResult<i64> {
    value.trim().parse::<i64>().map_err(|_| DbError::CorruptValue {
        key: SERIAL_KEY.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_serial_starts_at_zero_and_increments() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.settings().peek_serial().await.unwrap(), 0);

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(SettingsRepository::next_serial(&mut conn).await.unwrap(), 0);
        assert_eq!(SettingsRepository::next_serial(&mut conn).await.unwrap(), 1);
        drop(conn);

        assert_eq!(db.settings().peek_serial().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_set_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        assert_eq!(settings.get("decode_mode").await.unwrap(), None);
        settings.set("decode_mode", "vendor").await.unwrap();
        settings.set("decode_mode", "local").await.unwrap();
        assert_eq!(settings.get("decode_mode").await.unwrap().as_deref(), Some("local"));
    }

    #[tokio::test]
    async fn test_corrupt_serial_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set(SERIAL_KEY, "abc").await.unwrap();
        assert!(matches!(
            db.settings().peek_serial().await,
            Err(DbError::CorruptValue { .. })
        ));
    }
}
