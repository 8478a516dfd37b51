//! Issue lifecycle endpoints
//!
//! Submission, retrieval, triage listing, status updates and the overdue
//! escalation sweep. Classification is a separate endpoint invoked by the
//! client after submission (see `crate::api::classify`).

use crate::db::issues::{Issue, IssueFilter};
use crate::services::escalation;
use crate::{db, ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use civiq_common::events::CiviqEvent;
use civiq_common::{Category, IssueStatus};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Request payload for issue submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitIssueRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub location_text: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub submitted_by: Uuid,
}

/// Issue plus its fresh vote count
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    #[serde(flatten)]
    pub issue: Issue,
    pub vote_count: i64,
}

/// Listing filters (all optional)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListIssuesParams {
    pub category: Option<String>,
    pub status: Option<String>,
    pub department: Option<Uuid>,
}

/// Request payload for a status update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_by: Option<Uuid>,
}

/// Response for the escalation sweep
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateResponse {
    pub escalated: u64,
}

/// POST /api/issues
///
/// Validation failures are a 400 with no record created; the record lands
/// with status=submitted and the neutral default score.
pub async fn submit_issue(
    State(state): State<AppState>,
    Json(payload): Json<SubmitIssueRequest>,
) -> ApiResult<Json<IssueResponse>> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if payload.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description is required".to_string()));
    }
    let location_text = match payload.location_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return Err(ApiError::BadRequest("locationText is required".to_string())),
    };
    if Category::from_str(&payload.category).is_err() {
        return Err(ApiError::BadRequest(format!(
            "unknown category: {}",
            payload.category
        )));
    }

    let mut issue = Issue::new(
        payload.title.trim().to_string(),
        payload.description.trim().to_string(),
        payload.category.clone(),
        payload.submitted_by,
    );
    issue.latitude = payload.latitude;
    issue.longitude = payload.longitude;
    issue.location_text = Some(location_text);
    issue.photo_url = payload.photo_url;

    db::issues::insert_issue(&state.db, &issue).await?;

    info!(issue_id = %issue.id, category = %issue.category, "Issue submitted");

    state.event_bus.emit(CiviqEvent::IssueSubmitted {
        issue_id: issue.id,
        category: issue.category.clone(),
        timestamp: Utc::now(),
    });

    Ok(Json(IssueResponse {
        issue,
        vote_count: 0,
    }))
}

/// GET /api/issues
///
/// Triage order: priority score descending.
pub async fn list_issues(
    State(state): State<AppState>,
    Query(params): Query<ListIssuesParams>,
) -> ApiResult<Json<Vec<IssueResponse>>> {
    let status = params
        .status
        .as_deref()
        .map(IssueStatus::from_str)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let filter = IssueFilter {
        category: params.category,
        status,
        department: params.department,
    };

    let issues = db::issues::list_issues(&state.db, &filter).await?;

    let mut responses = Vec::with_capacity(issues.len());
    for issue in issues {
        let vote_count = db::votes::vote_count(&state.db, issue.id).await?;
        responses.push(IssueResponse { issue, vote_count });
    }

    Ok(Json(responses))
}

/// GET /api/issues/:id
pub async fn get_issue(
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> ApiResult<Json<IssueResponse>> {
    let issue = db::issues::get_issue(&state.db, issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("issue {issue_id}")))?;
    let vote_count = db::votes::vote_count(&state.db, issue_id).await?;

    Ok(Json(IssueResponse { issue, vote_count }))
}

/// GET /api/issues/:id/timeline
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> ApiResult<Json<Vec<crate::db::timeline::TimelineEntry>>> {
    db::issues::get_issue(&state.db, issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("issue {issue_id}")))?;

    let entries = db::timeline::list_for_issue(&state.db, issue_id).await?;
    Ok(Json(entries))
}

/// POST /api/issues/:id/status
///
/// Moves the issue through its lifecycle, stamping each transition
/// timestamp exactly once and appending to the timeline.
pub async fn update_status(
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<IssueResponse>> {
    let new_status = IssueStatus::from_str(&payload.status).map_err(ApiError::BadRequest)?;

    let (old_status, issue) =
        db::issues::update_status(&state.db, issue_id, new_status, payload.notes.as_deref())
            .await?;

    db::timeline::append_entry(
        &state.db,
        issue_id,
        new_status,
        payload.notes.as_deref(),
        payload.updated_by,
    )
    .await?;

    info!(%issue_id, %old_status, %new_status, "Issue status updated");

    state.event_bus.emit(CiviqEvent::IssueStatusChanged {
        issue_id,
        old_status,
        new_status,
        timestamp: Utc::now(),
    });

    let vote_count = db::votes::vote_count(&state.db, issue_id).await?;
    Ok(Json(IssueResponse { issue, vote_count }))
}

/// POST /api/issues/escalate-overdue
///
/// Flags open issues older than the escalation threshold. Intended for a
/// scheduler; safe to re-run.
pub async fn escalate_overdue(
    State(state): State<AppState>,
) -> ApiResult<Json<EscalateResponse>> {
    let escalated = escalation::escalate_overdue(&state.db, &state.event_bus).await?;
    Ok(Json(EscalateResponse { escalated }))
}

/// Build issue routes
pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/api/issues", post(submit_issue).get(list_issues))
        .route("/api/issues/escalate-overdue", post(escalate_overdue))
        .route("/api/issues/:id", get(get_issue))
        .route("/api/issues/:id/timeline", get(get_timeline))
        .route("/api/issues/:id/status", post(update_status))
}
