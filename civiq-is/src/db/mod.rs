//! Database access for civiq-is
//!
//! SQLite via sqlx, one module per table. The pool is initialized once at
//! startup; tables are created idempotently and the standard departments
//! are seeded so name lookups work on a fresh install.

pub mod departments;
pub mod issues;
pub mod profiles;
pub mod schema;
pub mod settings;
pub mod timeline;
pub mod votes;

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    // foreign_keys is per-connection in SQLite, so it has to be part of the
    // connect options to cover every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    schema::create_tables(&pool).await?;
    departments::seed_departments(&pool).await?;

    Ok(pool)
}
