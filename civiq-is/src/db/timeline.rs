//! Issue timeline operations
//!
//! Append-only history of status changes, written alongside every status
//! update so the public tracking page can show progression.

use chrono::{DateTime, Utc};
use civiq_common::{Error, IssueStatus, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

/// Timeline entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub status: IssueStatus,
    pub notes: Option<String>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Append a status change to the issue's history
pub async fn append_entry(
    pool: &SqlitePool,
    issue_id: Uuid,
    status: IssueStatus,
    notes: Option<&str>,
    updated_by: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO issue_timeline (id, issue_id, status, notes, updated_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(issue_id.to_string())
    .bind(status.as_str())
    .bind(notes)
    .bind(updated_by.map(|id| id.to_string()))
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Full history for an issue, oldest first
pub async fn list_for_issue(pool: &SqlitePool, issue_id: Uuid) -> Result<Vec<TimelineEntry>> {
    let rows: Vec<(String, String, String, Option<String>, Option<String>, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT id, issue_id, status, notes, updated_by, created_at \
             FROM issue_timeline WHERE issue_id = ? ORDER BY created_at ASC",
        )
        .bind(issue_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|(id, issue_id, status, notes, updated_by, created_at)| {
            Ok(TimelineEntry {
                id: Uuid::parse_str(&id).map_err(|e| Error::Internal(e.to_string()))?,
                issue_id: Uuid::parse_str(&issue_id)
                    .map_err(|e| Error::Internal(e.to_string()))?,
                status: IssueStatus::from_str(&status).map_err(Error::Internal)?,
                notes,
                updated_by: updated_by.and_then(|s| Uuid::parse_str(&s).ok()),
                created_at,
            })
        })
        .collect()
}
