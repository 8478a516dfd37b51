//! Vote database operations
//!
//! A user holds at most one vote per issue, enforced by the UNIQUE
//! (issue_id, user_id) constraint. The displayed count is always a fresh
//! aggregate; nothing here caches.

use chrono::Utc;
use civiq_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Insert a vote for (issue, user)
///
/// Returns true if a row was inserted, false if the vote already existed.
/// A duplicate insert is a no-op, not an error: two racing toggles both
/// observing "no vote" collapse onto the constraint and one loses quietly.
pub async fn insert_vote(pool: &SqlitePool, issue_id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO issue_votes (id, issue_id, user_id, created_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(issue_id, user_id) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(issue_id.to_string())
    .bind(user_id.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove the vote for (issue, user)
///
/// Returns true if a row was deleted.
pub async fn remove_vote(pool: &SqlitePool, issue_id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM issue_votes WHERE issue_id = ? AND user_id = ?")
        .bind(issue_id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Whether (issue, user) currently holds a vote
pub async fn has_vote(pool: &SqlitePool, issue_id: Uuid, user_id: Uuid) -> Result<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM issue_votes WHERE issue_id = ? AND user_id = ?")
            .bind(issue_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Fresh vote count for an issue
pub async fn vote_count(pool: &SqlitePool, issue_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM issue_votes WHERE issue_id = ?")
        .bind(issue_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool_with_issue() -> (SqlitePool, Uuid) {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::schema::create_tables(&pool).await.unwrap();

        let issue = crate::db::issues::Issue::new(
            "Pothole".to_string(),
            "Deep one".to_string(),
            "Road".to_string(),
            Uuid::new_v4(),
        );
        crate::db::issues::insert_issue(&pool, &issue).await.unwrap();
        (pool, issue.id)
    }

    #[tokio::test]
    async fn duplicate_insert_is_noop() {
        let (pool, issue_id) = setup_pool_with_issue().await;
        let user = Uuid::new_v4();

        assert!(insert_vote(&pool, issue_id, user).await.unwrap());
        assert!(!insert_vote(&pool, issue_id, user).await.unwrap());
        assert_eq!(vote_count(&pool, issue_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unvote_then_revote_restores_count() {
        let (pool, issue_id) = setup_pool_with_issue().await;
        let user = Uuid::new_v4();

        insert_vote(&pool, issue_id, user).await.unwrap();
        let before = vote_count(&pool, issue_id).await.unwrap();

        assert!(remove_vote(&pool, issue_id, user).await.unwrap());
        assert_eq!(vote_count(&pool, issue_id).await.unwrap(), before - 1);

        insert_vote(&pool, issue_id, user).await.unwrap();
        assert_eq!(vote_count(&pool, issue_id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn count_aggregates_distinct_users() {
        let (pool, issue_id) = setup_pool_with_issue().await;

        for _ in 0..3 {
            insert_vote(&pool, issue_id, Uuid::new_v4()).await.unwrap();
        }
        assert_eq!(vote_count(&pool, issue_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn has_vote_tracks_membership() {
        let (pool, issue_id) = setup_pool_with_issue().await;
        let user = Uuid::new_v4();

        assert!(!has_vote(&pool, issue_id, user).await.unwrap());
        insert_vote(&pool, issue_id, user).await.unwrap();
        assert!(has_vote(&pool, issue_id, user).await.unwrap());
    }
}
