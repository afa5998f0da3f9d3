use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::DbConfig;
use crate::db;

pub async fn run_migrations(db: &DbConfig) -> Result<()> {
    let pool = db::connect(db).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an open pool. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per (repo, quickstart_dir, template_file); the full document
    // is stored as JSON, with the filterable fields mirrored into columns.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS architectures (
            repo TEXT NOT NULL,
            quickstart_dir TEXT NOT NULL,
            template_file TEXT NOT NULL,
            name TEXT NOT NULL,
            name_lower TEXT NOT NULL DEFAULT '',
            resource_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            document_json TEXT NOT NULL,
            UNIQUE(repo, quickstart_dir, template_file)
        )
        "#,
    )
    .execute(pool)
    .await?;

    add_name_lower(pool).await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_architectures_name ON architectures(name)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_architectures_resource_count ON architectures(resource_count)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_architectures_created_at ON architectures(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Add and backfill `name_lower` on databases created before the column
/// existed. SQL `lower()` folds ASCII only, so the backfill runs here.
async fn add_name_lower(pool: &SqlitePool) -> Result<()> {
    let present: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('architectures') WHERE name = 'name_lower'",
    )
    .fetch_one(pool)
    .await?;
    if present > 0 {
        return Ok(());
    }

    sqlx::query("ALTER TABLE architectures ADD COLUMN name_lower TEXT NOT NULL DEFAULT ''")
        .execute(pool)
        .await?;
    let rows = sqlx::query("SELECT rowid, name FROM architectures")
        .fetch_all(pool)
        .await?;
    for row in rows {
        let rowid: i64 = row.get("rowid");
        let name: String = row.get("name");
        sqlx::query("UPDATE architectures SET name_lower = ? WHERE rowid = ?")
            .bind(name.to_lowercase())
            .bind(rowid)
            .execute(pool)
            .await?;
    }
    tracing::info!("added name_lower to architectures");
    Ok(())
}
