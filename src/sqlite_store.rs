//! SQLite-backed [`ArchitectureStore`] implementation.
//!
//! Each document is stored whole as JSON in `document_json`. The fields
//! the list endpoint filters and sorts on are mirrored into columns so the
//! query runs in SQL. `name_lower` holds the Unicode-lowercased name so
//! `q` folds case the same way [`ArchitectureQuery::matches`] does; SQLite's
//! own `LIKE` folds ASCII only.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use archscan_core::models::ArchitectureDocument;
use archscan_core::store::{ArchitectureQuery, ArchitectureStore, SortDirection, SortKey};

use crate::config::DbConfig;
use crate::db;
use crate::migrate;

/// SQLite implementation of the [`ArchitectureStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn open(db: &DbConfig) -> Result<Self> {
        let pool = db::connect(db).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn order_clause(query: &ArchitectureQuery) -> String {
    let column = match query.sort_by {
        SortKey::Name => "name",
        SortKey::ResourceCount => "resource_count",
    };
    let direction = match query.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!(
        "ORDER BY {} {}, repo ASC, quickstart_dir ASC, template_file ASC",
        column, direction
    )
}

#[async_trait]
impl ArchitectureStore for SqliteStore {
    async fn upsert(&self, doc: &ArchitectureDocument) -> Result<()> {
        let json = serde_json::to_string(doc)?;
        sqlx::query(
            r#"
            INSERT INTO architectures (repo, quickstart_dir, template_file, name,
                                       name_lower, resource_count, created_at,
                                       document_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(repo, quickstart_dir, template_file) DO UPDATE SET
                name = excluded.name,
                name_lower = excluded.name_lower,
                resource_count = excluded.resource_count,
                created_at = excluded.created_at,
                document_json = excluded.document_json
            "#,
        )
        .bind(&doc.repo)
        .bind(&doc.quickstart_dir)
        .bind(&doc.template_file)
        .bind(&doc.name)
        .bind(doc.name.to_lowercase())
        .bind(doc.resource_count as i64)
        .bind(&doc.created_at)
        .bind(&json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, query: &ArchitectureQuery) -> Result<Vec<ArchitectureDocument>> {
        let sql = format!(
            r#"
            SELECT document_json FROM architectures
            WHERE (?1 IS NULL OR name_lower LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR resource_count >= ?2)
              AND (?3 IS NULL OR created_at = ?3)
            {}
            LIMIT ?4 OFFSET ?5
            "#,
            order_clause(query)
        );

        let rows = sqlx::query(&sql)
            .bind(
                query
                    .name_contains
                    .as_deref()
                    .map(|q| like_pattern(&q.to_lowercase())),
            )
            .bind(query.min_resources.map(|n| n as i64))
            .bind(query.created_at.as_deref())
            .bind(query.limit as i64)
            .bind(query.skip as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let json: String = row.get("document_json");
                serde_json::from_str(&json).context("Corrupt document_json in architectures")
            })
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
