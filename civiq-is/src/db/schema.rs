//! Table definitions for the issue store
//!
//! All statements are `CREATE ... IF NOT EXISTS` so init is safe to re-run
//! against an existing database.

use anyhow::Result;
use sqlx::SqlitePool;

/// Create all civiq-is tables and indexes
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    // Citizen / officer / admin profiles. Auth itself is external; this
    // table only mirrors the records the service needs for aggregates and
    // vote attribution.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'citizen',
            city TEXT,
            ward TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id TEXT PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            description TEXT,
            transparency_score REAL NOT NULL DEFAULT 0.0,
            avg_resolution_days REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            location_text TEXT,
            photo_url TEXT,
            ai_detected_category TEXT,
            ai_severity TEXT,
            ai_suggested_department TEXT,
            ai_suggestions TEXT,
            priority_score INTEGER NOT NULL DEFAULT 50,
            status TEXT NOT NULL DEFAULT 'submitted',
            submitted_by TEXT NOT NULL,
            assigned_to_department TEXT REFERENCES departments(id),
            resolution_notes TEXT,
            submitted_at TEXT NOT NULL,
            acknowledged_at TEXT,
            resolved_at TEXT,
            closed_at TEXT,
            escalated INTEGER NOT NULL DEFAULT 0,
            escalated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The UNIQUE pair is the hard constraint behind vote-toggle idempotence:
    // concurrent double-toggles race to a single row, the loser is a no-op.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issue_votes (
            id TEXT PRIMARY KEY,
            issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(issue_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only status history
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issue_timeline (
            id TEXT PRIMARY KEY,
            issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
            status TEXT NOT NULL,
            notes TEXT,
            updated_by TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Triage lists are served ordered by priority
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_issues_priority ON issues(priority_score DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_issue ON issue_votes(issue_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_tables_is_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();

        create_tables(&pool).await.unwrap();
        create_tables(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('profiles', 'departments', 'issues', 'issue_votes', 'issue_timeline', 'settings')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(count, 6);
    }
}
