//! Database access for faw-watcher
//!
//! Running affect aggregates persist in a SQLite database so the interactive
//! agent can read a conversation's emotional state while frames are still
//! arriving.

pub mod aggregates;

use faw_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the database connection pool.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create faw-watcher tables if they don't exist.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS affect_aggregates (
            conversation_id TEXT PRIMARY KEY,
            valence REAL NOT NULL,
            arousal REAL NOT NULL,
            count INTEGER NOT NULL,
            valence_all TEXT NOT NULL,
            arousal_all TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (affect_aggregates)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faw_common::Error;

    #[tokio::test]
    async fn pool_init_creates_parent_directories_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("faw.db");

        let pool: std::result::Result<SqlitePool, Error> = init_database_pool(&db_path).await;
        let pool = pool.unwrap();

        sqlx::query("SELECT count FROM affect_aggregates")
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;

        // Reopening the same file must not fail on the existing schema.
        let pool = init_database_pool(&db_path).await.unwrap();
        pool.close().await;
    }
}
