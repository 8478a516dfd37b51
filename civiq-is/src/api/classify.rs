//! Classification endpoint
//!
//! Invoked by the client right after issue submission. The response always
//! carries a usable classification: AI-backend failures degrade to the
//! deterministic defaults inside the pipeline and never surface here. Only
//! an unknown issue id fails the request.

use crate::{ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request payload, as sent by the browser client
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub issue_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// Classification response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub success: bool,
    pub category: String,
    pub severity: civiq_common::Severity,
    pub department: String,
    pub priority_score: i64,
    pub suggestions: serde_json::Value,
}

/// POST /api/classify
pub async fn classify_issue(
    State(state): State<AppState>,
    Json(payload): Json<ClassifyRequest>,
) -> ApiResult<Json<ClassifyResponse>> {
    let result = state
        .classifier
        .classify(
            payload.issue_id,
            &payload.title,
            &payload.description,
            &payload.category,
        )
        .await?;

    Ok(Json(ClassifyResponse {
        success: true,
        category: result.category,
        severity: result.severity,
        department: result.department,
        priority_score: result.priority_score,
        suggestions: result.suggestions,
    }))
}

/// Build classification routes
pub fn classify_routes() -> Router<AppState> {
    Router::new().route("/api/classify", post(classify_issue))
}
