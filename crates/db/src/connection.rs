use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

/// Connection options shared by every pooled connection. Foreign keys are enforced so
/// deleting a group drops its items.
pub fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT))
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = connect_options(database_url)?;
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{connect_options, connect_with_settings};

    async fn pragma(pool: &super::DbPool, name: &str) -> i64 {
        sqlx::query(&format!("PRAGMA {name}"))
            .fetch_one(pool)
            .await
            .expect("read pragma")
            .get::<i64, _>(0)
    }

    #[tokio::test]
    async fn connections_enforce_foreign_keys_and_wait_when_busy() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        assert_eq!(pragma(&pool, "foreign_keys").await, 1);
        assert_eq!(pragma(&pool, "busy_timeout").await, 5000);
    }

    #[tokio::test]
    async fn file_databases_are_created_in_wal_mode() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("bot.db").display());
        let pool = connect_with_settings(&url, 2, 30).await.expect("connect");

        let mode = sqlx::query("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("read pragma")
            .get::<String, _>(0);

        assert_eq!(mode.to_lowercase(), "wal");
        pool.close().await;
    }

    #[test]
    fn unknown_url_parameters_are_rejected_before_connecting() {
        assert!(connect_options("sqlite://trrbot.db?flavour=strawberry").is_err());
    }
}
