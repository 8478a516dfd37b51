//! Issue database operations
//!
//! The issue is the aggregate root: votes, timeline entries and the
//! department assignment all reference it by id. Classification and voting
//! both write `priority_score`; sequencing between them is last-write-wins
//! by design, with the 0..=100 clamp enforced on every write path.

use chrono::{DateTime, Utc};
use civiq_common::{Error, IssueStatus, Result, Severity};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// Issue record
///
/// Serializes in camelCase to match the service's wire format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_text: Option<String>,
    pub photo_url: Option<String>,
    pub ai_detected_category: Option<String>,
    pub ai_severity: Option<Severity>,
    pub ai_suggested_department: Option<String>,
    pub ai_suggestions: Option<serde_json::Value>,
    pub priority_score: i64,
    pub status: IssueStatus,
    pub submitted_by: Uuid,
    pub assigned_to_department: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub escalated: bool,
    pub escalated_at: Option<DateTime<Utc>>,
}

/// Neutral score assigned before classification runs
pub const DEFAULT_PRIORITY_SCORE: i64 = 50;

impl Issue {
    /// Create a new issue in its initial state (submitted, neutral score)
    pub fn new(
        title: String,
        description: String,
        category: String,
        submitted_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            category,
            latitude: None,
            longitude: None,
            location_text: None,
            photo_url: None,
            ai_detected_category: None,
            ai_severity: None,
            ai_suggested_department: None,
            ai_suggestions: None,
            priority_score: DEFAULT_PRIORITY_SCORE,
            status: IssueStatus::Submitted,
            submitted_by,
            assigned_to_department: None,
            resolution_notes: None,
            submitted_at: Utc::now(),
            acknowledged_at: None,
            resolved_at: None,
            closed_at: None,
            escalated: false,
            escalated_at: None,
        }
    }
}

/// Classification output persisted onto the issue row in a single update
#[derive(Debug, Clone)]
pub struct ClassificationUpdate {
    pub detected_category: String,
    pub severity: Severity,
    pub suggested_department: String,
    pub suggestions: serde_json::Value,
    pub priority_score: i64,
    pub department_id: Option<Uuid>,
}

/// Filters for the triage listing
#[derive(Debug, Default, Clone)]
pub struct IssueFilter {
    pub category: Option<String>,
    pub status: Option<IssueStatus>,
    pub department: Option<Uuid>,
}

const ISSUE_COLUMNS: &str = "id, title, description, category, latitude, longitude, \
     location_text, photo_url, ai_detected_category, ai_severity, ai_suggested_department, \
     ai_suggestions, priority_score, status, submitted_by, assigned_to_department, \
     resolution_notes, submitted_at, acknowledged_at, resolved_at, closed_at, \
     escalated, escalated_at";

fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    let id_str: String = row.get("id");
    let submitted_by_str: String = row.get("submitted_by");
    let department_str: Option<String> = row.get("assigned_to_department");
    let severity_str: Option<String> = row.get("ai_severity");
    let status_str: String = row.get("status");
    let suggestions_str: Option<String> = row.get("ai_suggestions");

    Ok(Issue {
        id: Uuid::parse_str(&id_str).map_err(|e| Error::Internal(e.to_string()))?,
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        location_text: row.get("location_text"),
        photo_url: row.get("photo_url"),
        ai_detected_category: row.get("ai_detected_category"),
        ai_severity: severity_str
            .as_deref()
            .map(Severity::from_str)
            .transpose()
            .map_err(Error::Internal)?,
        ai_suggested_department: row.get("ai_suggested_department"),
        ai_suggestions: suggestions_str
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        priority_score: row.get("priority_score"),
        status: IssueStatus::from_str(&status_str).map_err(Error::Internal)?,
        submitted_by: Uuid::parse_str(&submitted_by_str)
            .map_err(|e| Error::Internal(e.to_string()))?,
        assigned_to_department: department_str
            .and_then(|s| Uuid::parse_str(&s).ok()),
        resolution_notes: row.get("resolution_notes"),
        submitted_at: row.get("submitted_at"),
        acknowledged_at: row.get("acknowledged_at"),
        resolved_at: row.get("resolved_at"),
        closed_at: row.get("closed_at"),
        escalated: row.get("escalated"),
        escalated_at: row.get("escalated_at"),
    })
}

/// Insert a new issue
pub async fn insert_issue(pool: &SqlitePool, issue: &Issue) -> Result<()> {
    let suggestions = issue
        .ai_suggestions
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO issues (
            id, title, description, category, latitude, longitude, location_text,
            photo_url, ai_detected_category, ai_severity, ai_suggested_department,
            ai_suggestions, priority_score, status, submitted_by, assigned_to_department,
            resolution_notes, submitted_at, acknowledged_at, resolved_at, closed_at,
            escalated, escalated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(issue.id.to_string())
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(&issue.category)
    .bind(issue.latitude)
    .bind(issue.longitude)
    .bind(&issue.location_text)
    .bind(&issue.photo_url)
    .bind(&issue.ai_detected_category)
    .bind(issue.ai_severity.map(|s| s.as_str()))
    .bind(&issue.ai_suggested_department)
    .bind(suggestions)
    .bind(issue.priority_score)
    .bind(issue.status.as_str())
    .bind(issue.submitted_by.to_string())
    .bind(issue.assigned_to_department.map(|id| id.to_string()))
    .bind(&issue.resolution_notes)
    .bind(issue.submitted_at)
    .bind(issue.acknowledged_at)
    .bind(issue.resolved_at)
    .bind(issue.closed_at)
    .bind(issue.escalated)
    .bind(issue.escalated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load issue by id
pub async fn get_issue(pool: &SqlitePool, issue_id: Uuid) -> Result<Option<Issue>> {
    let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(issue_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(issue_from_row).transpose()
}

/// List issues ordered by priority (triage order), optionally filtered
pub async fn list_issues(pool: &SqlitePool, filter: &IssueFilter) -> Result<Vec<Issue>> {
    let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM issues");

    let mut clauses: Vec<&str> = Vec::new();
    if filter.category.is_some() {
        clauses.push("category = ?");
    }
    if filter.status.is_some() {
        clauses.push("status = ?");
    }
    if filter.department.is_some() {
        clauses.push("assigned_to_department = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY priority_score DESC, submitted_at ASC");

    let mut query = sqlx::query(&sql);
    if let Some(category) = &filter.category {
        query = query.bind(category);
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(department) = filter.department {
        query = query.bind(department.to_string());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(issue_from_row).collect()
}

/// Persist a classification result onto the issue (single update)
pub async fn update_classification(
    pool: &SqlitePool,
    issue_id: Uuid,
    update: &ClassificationUpdate,
) -> Result<()> {
    let suggestions = serde_json::to_string(&update.suggestions)?;

    let result = sqlx::query(
        r#"
        UPDATE issues SET
            ai_detected_category = ?,
            ai_severity = ?,
            ai_suggested_department = ?,
            ai_suggestions = ?,
            priority_score = MAX(0, MIN(100, ?)),
            assigned_to_department = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.detected_category)
    .bind(update.severity.as_str())
    .bind(&update.suggested_department)
    .bind(suggestions)
    .bind(update.priority_score)
    .bind(update.department_id.map(|id| id.to_string()))
    .bind(issue_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("issue {issue_id}")));
    }

    Ok(())
}

/// Move an issue to a new status, stamping the transition timestamp once
///
/// acknowledged_at / resolved_at / closed_at are only written when the
/// corresponding status is first reached; revisiting a status never
/// overwrites an earlier timestamp.
///
/// Returns the previous status and the updated issue.
pub async fn update_status(
    pool: &SqlitePool,
    issue_id: Uuid,
    new_status: IssueStatus,
    resolution_notes: Option<&str>,
) -> Result<(IssueStatus, Issue)> {
    let mut issue = get_issue(pool, issue_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("issue {issue_id}")))?;

    let old_status = issue.status;
    let now = Utc::now();

    if new_status == IssueStatus::Acknowledged && issue.acknowledged_at.is_none() {
        issue.acknowledged_at = Some(now);
    }
    if new_status == IssueStatus::Resolved && issue.resolved_at.is_none() {
        issue.resolved_at = Some(now);
    }
    if new_status == IssueStatus::Closed && issue.closed_at.is_none() {
        issue.closed_at = Some(now);
    }
    // Notes accompany every transition in the timeline; the issue row only
    // keeps the ones attached to the terminal transition
    if new_status.is_terminal() {
        if let Some(notes) = resolution_notes {
            issue.resolution_notes = Some(notes.to_string());
        }
    }
    issue.status = new_status;

    sqlx::query(
        r#"
        UPDATE issues SET
            status = ?,
            acknowledged_at = ?,
            resolved_at = ?,
            closed_at = ?,
            resolution_notes = ?
        WHERE id = ?
        "#,
    )
    .bind(issue.status.as_str())
    .bind(issue.acknowledged_at)
    .bind(issue.resolved_at)
    .bind(issue.closed_at)
    .bind(&issue.resolution_notes)
    .bind(issue_id.to_string())
    .execute(pool)
    .await?;

    Ok((old_status, issue))
}

/// Adjust priority score by `delta`, clamped to 0..=100
///
/// Returns the new score.
pub async fn adjust_priority(pool: &SqlitePool, issue_id: Uuid, delta: i64) -> Result<i64> {
    let result = sqlx::query(
        "UPDATE issues SET priority_score = MAX(0, MIN(100, priority_score + ?)) WHERE id = ?",
    )
    .bind(delta)
    .bind(issue_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("issue {issue_id}")));
    }

    let score: i64 = sqlx::query_scalar("SELECT priority_score FROM issues WHERE id = ?")
        .bind(issue_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(score)
}

/// Issues overdue for escalation: open past the cutoff and not yet flagged
pub async fn list_overdue_unescalated(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Issue>> {
    let sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues \
         WHERE status NOT IN ('resolved', 'closed') AND escalated = 0 AND submitted_at < ?"
    );
    let rows = sqlx::query(&sql).bind(cutoff).fetch_all(pool).await?;
    rows.iter().map(issue_from_row).collect()
}

/// Flag an issue as escalated (write-once)
///
/// Returns false if the issue was already escalated.
pub async fn mark_escalated(pool: &SqlitePool, issue_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE issues SET escalated = 1, escalated_at = ? WHERE id = ? AND escalated = 0",
    )
    .bind(Utc::now())
    .bind(issue_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Total issue count
pub async fn count_issues(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM issues")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Count of resolved or closed issues
pub async fn count_resolved_issues(pool: &SqlitePool) -> Result<i64> {
    let count =
        sqlx::query_scalar("SELECT COUNT(*) FROM issues WHERE status IN ('resolved', 'closed')")
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Average days from submission to resolution, over issues with both stamps
pub async fn avg_resolution_days(pool: &SqlitePool) -> Result<Option<f64>> {
    let avg: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(julianday(resolved_at) - julianday(submitted_at)) \
         FROM issues WHERE resolved_at IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::schema::create_tables(&pool).await.unwrap();
        pool
    }

    fn sample_issue() -> Issue {
        let mut issue = Issue::new(
            "Streetlight out on Elm Road".to_string(),
            "Dark stretch near the school crossing".to_string(),
            "Electricity".to_string(),
            Uuid::new_v4(),
        );
        issue.location_text = Some("Elm Road / 5th Cross".to_string());
        issue
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let pool = setup_pool().await;
        let issue = sample_issue();

        insert_issue(&pool, &issue).await.unwrap();
        let loaded = get_issue(&pool, issue.id).await.unwrap().unwrap();

        assert_eq!(loaded.title, issue.title);
        assert_eq!(loaded.status, IssueStatus::Submitted);
        assert_eq!(loaded.priority_score, DEFAULT_PRIORITY_SCORE);
        assert!(loaded.ai_severity.is_none());
        assert!(!loaded.escalated);
    }

    #[tokio::test]
    async fn get_missing_issue_is_none() {
        let pool = setup_pool().await;
        assert!(get_issue(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn classification_update_persists_all_fields() {
        let pool = setup_pool().await;
        let issue = sample_issue();
        insert_issue(&pool, &issue).await.unwrap();

        let update = ClassificationUpdate {
            detected_category: "Electricity".to_string(),
            severity: Severity::High,
            suggested_department: "Electricity".to_string(),
            suggestions: serde_json::json!({"action": "replace lamp"}),
            priority_score: 80,
            department_id: None,
        };
        update_classification(&pool, issue.id, &update).await.unwrap();

        let loaded = get_issue(&pool, issue.id).await.unwrap().unwrap();
        assert_eq!(loaded.ai_severity, Some(Severity::High));
        assert_eq!(loaded.priority_score, 80);
        assert_eq!(loaded.ai_suggested_department.as_deref(), Some("Electricity"));
        assert_eq!(
            loaded.ai_suggestions.unwrap()["action"],
            serde_json::json!("replace lamp")
        );
    }

    #[tokio::test]
    async fn classification_update_clamps_score() {
        let pool = setup_pool().await;
        let issue = sample_issue();
        insert_issue(&pool, &issue).await.unwrap();

        let update = ClassificationUpdate {
            detected_category: "Road".to_string(),
            severity: Severity::High,
            suggested_department: "Roads & Transport".to_string(),
            suggestions: serde_json::json!({}),
            priority_score: 250,
            department_id: None,
        };
        update_classification(&pool, issue.id, &update).await.unwrap();

        let loaded = get_issue(&pool, issue.id).await.unwrap().unwrap();
        assert_eq!(loaded.priority_score, 100);
    }

    #[tokio::test]
    async fn classification_update_unknown_issue_is_not_found() {
        let pool = setup_pool().await;
        let update = ClassificationUpdate {
            detected_category: "Road".to_string(),
            severity: Severity::Low,
            suggested_department: "General".to_string(),
            suggestions: serde_json::json!({}),
            priority_score: 30,
            department_id: None,
        };
        let result = update_classification(&pool, Uuid::new_v4(), &update).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn status_timestamps_are_write_once() {
        let pool = setup_pool().await;
        let issue = sample_issue();
        insert_issue(&pool, &issue).await.unwrap();

        let (old, updated) =
            update_status(&pool, issue.id, IssueStatus::Acknowledged, None)
                .await
                .unwrap();
        assert_eq!(old, IssueStatus::Submitted);
        let first_ack = updated.acknowledged_at.unwrap();
        assert!(first_ack >= issue.submitted_at);

        // Leave and re-enter acknowledged; the stamp must not move
        update_status(&pool, issue.id, IssueStatus::InProgress, None)
            .await
            .unwrap();
        let (_, revisited) =
            update_status(&pool, issue.id, IssueStatus::Acknowledged, None)
                .await
                .unwrap();
        assert_eq!(revisited.acknowledged_at.unwrap(), first_ack);
    }

    #[tokio::test]
    async fn resolve_sets_notes_and_timestamp() {
        let pool = setup_pool().await;
        let issue = sample_issue();
        insert_issue(&pool, &issue).await.unwrap();

        let (_, updated) = update_status(
            &pool,
            issue.id,
            IssueStatus::Resolved,
            Some("Lamp replaced"),
        )
        .await
        .unwrap();

        assert_eq!(updated.status, IssueStatus::Resolved);
        assert_eq!(updated.resolution_notes.as_deref(), Some("Lamp replaced"));
        assert!(updated.resolved_at.unwrap() >= updated.submitted_at);
    }

    #[tokio::test]
    async fn adjust_priority_clamps_both_ends() {
        let pool = setup_pool().await;
        let issue = sample_issue();
        insert_issue(&pool, &issue).await.unwrap();

        assert_eq!(adjust_priority(&pool, issue.id, 5).await.unwrap(), 55);
        assert_eq!(adjust_priority(&pool, issue.id, 60).await.unwrap(), 100);
        assert_eq!(adjust_priority(&pool, issue.id, -300).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_orders_by_priority() {
        let pool = setup_pool().await;

        let mut low = sample_issue();
        low.priority_score = 20;
        let mut high = sample_issue();
        high.priority_score = 90;
        insert_issue(&pool, &low).await.unwrap();
        insert_issue(&pool, &high).await.unwrap();

        let issues = list_issues(&pool, &IssueFilter::default()).await.unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].id, high.id);
        assert_eq!(issues[1].id, low.id);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_category() {
        let pool = setup_pool().await;

        let road = sample_issue();
        let mut water = sample_issue();
        water.category = "Water".to_string();
        insert_issue(&pool, &road).await.unwrap();
        insert_issue(&pool, &water).await.unwrap();
        update_status(&pool, water.id, IssueStatus::Resolved, None)
            .await
            .unwrap();

        let filter = IssueFilter {
            category: Some("Water".to_string()),
            status: Some(IssueStatus::Resolved),
            department: None,
        };
        let issues = list_issues(&pool, &filter).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, water.id);
    }

    #[tokio::test]
    async fn escalation_is_write_once() {
        let pool = setup_pool().await;
        let issue = sample_issue();
        insert_issue(&pool, &issue).await.unwrap();

        assert!(mark_escalated(&pool, issue.id).await.unwrap());
        assert!(!mark_escalated(&pool, issue.id).await.unwrap());

        let loaded = get_issue(&pool, issue.id).await.unwrap().unwrap();
        assert!(loaded.escalated);
        assert!(loaded.escalated_at.is_some());
    }

    #[tokio::test]
    async fn overdue_listing_skips_terminal_and_escalated() {
        let pool = setup_pool().await;

        let open = sample_issue();
        let resolved = sample_issue();
        let flagged = sample_issue();
        for issue in [&open, &resolved, &flagged] {
            insert_issue(&pool, issue).await.unwrap();
        }
        update_status(&pool, resolved.id, IssueStatus::Resolved, None)
            .await
            .unwrap();
        mark_escalated(&pool, flagged.id).await.unwrap();

        // Cutoff in the future makes every issue "overdue"
        let cutoff = Utc::now() + chrono::Duration::days(1);
        let overdue = list_overdue_unescalated(&pool, cutoff).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, open.id);
    }
}
