//! Community voting endpoint
//!
//! Toggles the (issue, user) vote and applies the symmetric priority step:
//! +5 on vote, -5 on un-vote, clamped to 0..=100. The step equals the
//! per-vote bonus the classifier uses, so incremental updates and a later
//! reclassification agree on the vote contribution.

use crate::classify::scoring::VOTE_PRIORITY_STEP;
use crate::{db, ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use civiq_common::events::CiviqEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Request payload for a vote toggle
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub user_id: Uuid,
}

/// Vote toggle outcome
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    /// Whether the user holds a vote after the toggle
    pub voted: bool,
    /// Fresh aggregate count for the issue
    pub new_count: i64,
}

/// POST /api/issues/:id/vote
pub async fn toggle_vote(
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    db::issues::get_issue(&state.db, issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("issue {issue_id}")))?;

    let user_id = payload.user_id;

    let voted = if db::votes::has_vote(&state.db, issue_id, user_id).await? {
        db::votes::remove_vote(&state.db, issue_id, user_id).await?;
        db::issues::adjust_priority(&state.db, issue_id, -VOTE_PRIORITY_STEP).await?;
        false
    } else {
        // A racing duplicate collapses on the unique constraint; only the
        // toggle that actually inserted moves the score.
        let inserted = db::votes::insert_vote(&state.db, issue_id, user_id).await?;
        if inserted {
            db::issues::adjust_priority(&state.db, issue_id, VOTE_PRIORITY_STEP).await?;
        }
        true
    };

    let new_count = db::votes::vote_count(&state.db, issue_id).await?;

    debug!(%issue_id, %user_id, voted, new_count, "Vote toggled");

    state.event_bus.emit(CiviqEvent::VoteToggled {
        issue_id,
        user_id,
        voted,
        vote_count: new_count,
        timestamp: Utc::now(),
    });

    Ok(Json(VoteResponse { voted, new_count }))
}

/// Build vote routes
pub fn vote_routes() -> Router<AppState> {
    Router::new().route("/api/issues/:id/vote", post(toggle_vote))
}
