use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::{Config, DbConfig};

pub async fn connect(db: &DbConfig) -> Result<SqlitePool> {
    let db_path = &db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// The `[db]` section, for commands that cannot run without a database.
pub fn require(config: &Config) -> Result<&DbConfig> {
    config
        .db
        .as_ref()
        .context("No database configured: add a [db] section or set ARCHSCAN_DB_PATH")
}
