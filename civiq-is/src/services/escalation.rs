//! Overdue issue escalation
//!
//! Issues still open past the threshold age are flagged for admin
//! attention. The flag is write-once; re-running the sweep never re-flags
//! or un-flags anything, so it can sit behind a dumb scheduler.

use chrono::{Duration, Utc};
use civiq_common::events::{CiviqEvent, EventBus};
use civiq_common::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;

/// Open issues older than this many days get escalated
pub const ESCALATION_AGE_DAYS: i64 = 7;

/// Sweep for overdue issues and flag them
///
/// Returns the number of issues newly escalated by this run.
pub async fn escalate_overdue(pool: &SqlitePool, event_bus: &EventBus) -> Result<u64> {
    let now = Utc::now();
    let cutoff = now - Duration::days(ESCALATION_AGE_DAYS);

    let overdue = db::issues::list_overdue_unescalated(pool, cutoff).await?;

    let mut escalated = 0u64;
    for issue in overdue {
        // mark_escalated is conditional on the flag still being clear, so
        // two concurrent sweeps cannot double-count
        if db::issues::mark_escalated(pool, issue.id).await? {
            escalated += 1;
            let age_days = (now - issue.submitted_at).num_days();

            info!(issue_id = %issue.id, age_days, "Issue escalated as overdue");

            event_bus.emit(CiviqEvent::IssueEscalated {
                issue_id: issue.id,
                age_days,
                timestamp: now,
            });
        }
    }

    if escalated > 0 {
        info!(escalated, "Escalation sweep complete");
    }

    Ok(escalated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::issues::Issue;
    use uuid::Uuid;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::schema::create_tables(&pool).await.unwrap();
        pool
    }

    async fn insert_issue_aged(pool: &SqlitePool, age_days: i64) -> Issue {
        let mut issue = Issue::new(
            "Broken drain cover".to_string(),
            "Open drain on the footpath".to_string(),
            "Safety".to_string(),
            Uuid::new_v4(),
        );
        issue.submitted_at = Utc::now() - Duration::days(age_days);
        crate::db::issues::insert_issue(pool, &issue).await.unwrap();
        issue
    }

    #[tokio::test]
    async fn sweep_flags_only_overdue_issues() {
        let pool = setup_pool().await;
        let bus = EventBus::new(16);

        let old = insert_issue_aged(&pool, 10).await;
        let fresh = insert_issue_aged(&pool, 2).await;

        let escalated = escalate_overdue(&pool, &bus).await.unwrap();
        assert_eq!(escalated, 1);

        let old_loaded = crate::db::issues::get_issue(&pool, old.id).await.unwrap().unwrap();
        let fresh_loaded = crate::db::issues::get_issue(&pool, fresh.id).await.unwrap().unwrap();
        assert!(old_loaded.escalated);
        assert!(!fresh_loaded.escalated);
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let pool = setup_pool().await;
        let bus = EventBus::new(16);
        insert_issue_aged(&pool, 30).await;

        assert_eq!(escalate_overdue(&pool, &bus).await.unwrap(), 1);
        assert_eq!(escalate_overdue(&pool, &bus).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn resolved_issues_are_never_escalated() {
        let pool = setup_pool().await;
        let bus = EventBus::new(16);

        let issue = insert_issue_aged(&pool, 15).await;
        crate::db::issues::update_status(
            &pool,
            issue.id,
            civiq_common::IssueStatus::Resolved,
            None,
        )
        .await
        .unwrap();

        assert_eq!(escalate_overdue(&pool, &bus).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_emits_escalation_events() {
        let pool = setup_pool().await;
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        insert_issue_aged(&pool, 8).await;
        escalate_overdue(&pool, &bus).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "IssueEscalated");
    }
}
