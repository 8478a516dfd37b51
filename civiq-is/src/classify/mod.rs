//! Issue classification pipeline
//!
//! Assigns a severity, a responsible department and a 0-100 priority score
//! to a submitted issue. The pipeline is a sequence of pure stages over an
//! immutable [`Classification`] value:
//!
//! 1. neutral defaults
//! 2. optional AI enrichment (merged over the defaults, failures absorbed)
//! 3. deterministic scoring from the severity table plus the live vote count
//! 4. department resolution and best-effort lookup
//!
//! followed by a single persistence update. AI availability only ever
//! improves severity/department/suggestions; the score itself is always
//! deterministic, and nothing on the AI path can fail the caller.

pub mod gemini;
pub mod scoring;

use crate::db;
use crate::db::issues::ClassificationUpdate;
use civiq_common::events::{CiviqEvent, EventBus};
use civiq_common::{Error, Result, Severity};
use gemini::{AiClassification, AiError, GeminiClient};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// In-flight classification state, rebuilt by each stage
#[derive(Debug, Clone)]
pub struct Classification {
    /// Enriched category; starts as the citizen's choice and is never
    /// overridden, only annotated
    pub detected_category: String,
    pub severity: Severity,
    /// AI-suggested department, if any; resolved to a concrete name by the
    /// department stage
    pub department: Option<String>,
    pub suggestions: serde_json::Value,
    pub priority_score: i64,
}

/// Classification result returned to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: String,
    pub severity: Severity,
    pub department: String,
    pub priority_score: i64,
    pub suggestions: serde_json::Value,
}

/// Stage 1: neutral defaults for an issue in `category`
pub fn defaults(category: &str) -> Classification {
    Classification {
        detected_category: category.to_string(),
        severity: Severity::Medium,
        department: None,
        suggestions: serde_json::json!({}),
        priority_score: db::issues::DEFAULT_PRIORITY_SCORE,
    }
}

/// Stage 2: merge an AI outcome over the defaults
///
/// Pure: an error keeps the defaults untouched, a partial answer overrides
/// only the fields it carries. Severity values outside low/medium/high are
/// treated as missing. The AI's own priorityScore is deliberately not
/// merged; the scoring stage recomputes the score from the severity table
/// and the vote count.
pub fn merge_ai_result(
    base: Classification,
    outcome: std::result::Result<AiClassification, AiError>,
) -> Classification {
    match outcome {
        Ok(ai) => {
            let severity = ai
                .severity
                .as_deref()
                .and_then(|s| s.parse::<Severity>().ok())
                .unwrap_or(base.severity);
            let department = ai
                .department
                .filter(|d| !d.trim().is_empty())
                .or(base.department);
            let suggestions = ai.suggestions.unwrap_or(base.suggestions);

            Classification {
                severity,
                department,
                suggestions,
                ..base
            }
        }
        Err(_) => base,
    }
}

/// Stage 3: deterministic score from severity and the live vote count
pub fn apply_score(base: Classification, vote_count: i64) -> Classification {
    Classification {
        priority_score: scoring::final_priority(base.severity, vote_count),
        ..base
    }
}

/// Stage 4: fill in the department name if the AI stage left it empty
pub fn resolve_department(base: Classification, citizen_category: &str) -> Classification {
    let name = scoring::resolve_department_name(base.department.as_deref(), citizen_category);
    Classification {
        department: Some(name),
        ..base
    }
}

/// Classification service
///
/// Owns the optional Gemini client; without a configured API key the
/// service runs in pure deterministic mode.
pub struct ClassificationService {
    db: SqlitePool,
    gemini: Option<GeminiClient>,
    event_bus: EventBus,
    last_error: Arc<RwLock<Option<String>>>,
}

impl ClassificationService {
    pub fn new(
        db: SqlitePool,
        gemini: Option<GeminiClient>,
        event_bus: EventBus,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            db,
            gemini,
            event_bus,
            last_error,
        }
    }

    /// Whether AI enrichment is configured
    pub fn ai_enabled(&self) -> bool {
        self.gemini.is_some()
    }

    /// Classify an issue and persist the result onto its row
    ///
    /// Fails only when the issue does not exist. AI-backend failures fall
    /// back to deterministic defaults; a store failure on the final update
    /// is logged and the computed result is still returned (the row may be
    /// stale until the next classification).
    pub async fn classify(
        &self,
        issue_id: Uuid,
        title: &str,
        description: &str,
        category: &str,
    ) -> Result<ClassificationResult> {
        db::issues::get_issue(&self.db, issue_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("issue {issue_id}")))?;

        let initial = defaults(category);

        let enriched = match &self.gemini {
            Some(client) => {
                let outcome = client.classify(title, description, category).await;
                if let Err(err) = &outcome {
                    warn!(%issue_id, error = %err, "AI classification failed, using deterministic defaults");
                }
                merge_ai_result(initial, outcome)
            }
            None => initial,
        };

        let vote_count = db::votes::vote_count(&self.db, issue_id).await?;
        let scored = apply_score(enriched, vote_count);
        let resolved = resolve_department(scored, category);

        let department_name = resolved.department.clone().unwrap_or_default();
        let department_id = db::departments::find_by_name(&self.db, &department_name)
            .await?
            .map(|d| d.id);

        debug!(
            %issue_id,
            severity = %resolved.severity,
            department = %department_name,
            priority_score = resolved.priority_score,
            vote_count,
            department_assigned = department_id.is_some(),
            "Classification computed"
        );

        let update = ClassificationUpdate {
            detected_category: resolved.detected_category.clone(),
            severity: resolved.severity,
            suggested_department: department_name.clone(),
            suggestions: resolved.suggestions.clone(),
            priority_score: resolved.priority_score,
            department_id,
        };

        if let Err(err) = db::issues::update_classification(&self.db, issue_id, &update).await {
            warn!(%issue_id, error = %err, "Failed to persist classification; returning computed result");
            *self.last_error.write().await = Some(err.to_string());
        }

        self.event_bus.emit(CiviqEvent::IssueClassified {
            issue_id,
            severity: resolved.severity,
            department: department_name.clone(),
            priority_score: resolved.priority_score,
            timestamp: chrono::Utc::now(),
        });

        Ok(ClassificationResult {
            category: resolved.detected_category,
            severity: resolved.severity,
            department: department_name,
            priority_score: resolved.priority_score,
            suggestions: resolved.suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Classification {
        defaults("Road")
    }

    #[test]
    fn defaults_are_neutral() {
        let c = base();
        assert_eq!(c.detected_category, "Road");
        assert_eq!(c.severity, Severity::Medium);
        assert!(c.department.is_none());
        assert_eq!(c.priority_score, 50);
        assert_eq!(c.suggestions, serde_json::json!({}));
    }

    #[test]
    fn merge_error_keeps_defaults() {
        let merged = merge_ai_result(base(), Err(AiError::Network("timeout".to_string())));
        assert_eq!(merged.severity, Severity::Medium);
        assert!(merged.department.is_none());
    }

    #[test]
    fn merge_full_answer_overrides_fields() {
        let ai = AiClassification {
            severity: Some("HIGH".to_string()),
            department: Some("Water Supply".to_string()),
            priority_score: Some(97),
            suggestions: Some(serde_json::json!({"fix": "replace main"})),
        };
        let merged = merge_ai_result(base(), Ok(ai));
        assert_eq!(merged.severity, Severity::High);
        assert_eq!(merged.department.as_deref(), Some("Water Supply"));
        assert_eq!(merged.suggestions["fix"], serde_json::json!("replace main"));
        // the AI's own score must not leak into the pipeline
        assert_eq!(merged.priority_score, 50);
    }

    #[test]
    fn merge_partial_answer_keeps_rest() {
        let ai = AiClassification {
            severity: None,
            department: Some("Sanitation".to_string()),
            priority_score: None,
            suggestions: None,
        };
        let merged = merge_ai_result(base(), Ok(ai));
        assert_eq!(merged.severity, Severity::Medium);
        assert_eq!(merged.department.as_deref(), Some("Sanitation"));
        assert_eq!(merged.suggestions, serde_json::json!({}));
    }

    #[test]
    fn merge_unknown_severity_is_treated_as_missing() {
        let ai = AiClassification {
            severity: Some("catastrophic".to_string()),
            ..Default::default()
        };
        let merged = merge_ai_result(base(), Ok(ai));
        assert_eq!(merged.severity, Severity::Medium);
    }

    #[test]
    fn score_stage_overrides_any_prior_score() {
        let enriched = Classification {
            severity: Severity::High,
            priority_score: 12,
            ..base()
        };
        let scored = apply_score(enriched, 2);
        assert_eq!(scored.priority_score, 90);
    }

    #[test]
    fn department_stage_fills_from_category() {
        let resolved = resolve_department(base(), "Road");
        assert_eq!(resolved.department.as_deref(), Some("Roads & Transport"));

        let resolved = resolve_department(base(), "Fireworks");
        assert_eq!(resolved.department.as_deref(), Some("General"));
    }

    mod service {
        use super::*;
        use crate::db::issues::Issue;

        async fn setup_service() -> (ClassificationService, SqlitePool) {
            let pool = SqlitePool::connect(":memory:").await.unwrap();
            crate::db::schema::create_tables(&pool).await.unwrap();
            crate::db::departments::seed_departments(&pool).await.unwrap();

            let service = ClassificationService::new(
                pool.clone(),
                None, // deterministic mode
                EventBus::new(16),
                Arc::new(RwLock::new(None)),
            );
            (service, pool)
        }

        async fn insert_issue(pool: &SqlitePool, category: &str) -> Issue {
            let issue = Issue::new(
                "Pothole near bus stop".to_string(),
                "Half the lane is gone".to_string(),
                category.to_string(),
                Uuid::new_v4(),
            );
            crate::db::issues::insert_issue(pool, &issue).await.unwrap();
            issue
        }

        #[tokio::test]
        async fn unknown_issue_is_not_found_with_no_mutation() {
            let (service, pool) = setup_service().await;

            let result = service
                .classify(Uuid::new_v4(), "t", "d", "Road")
                .await;
            assert!(matches!(result, Err(Error::NotFound(_))));
            assert_eq!(crate::db::issues::count_issues(&pool).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn deterministic_mode_classifies_and_persists() {
            let (service, pool) = setup_service().await;
            let issue = insert_issue(&pool, "Road").await;

            let result = service
                .classify(issue.id, &issue.title, &issue.description, "Road")
                .await
                .unwrap();

            assert_eq!(result.severity, Severity::Medium);
            assert_eq!(result.department, "Roads & Transport");
            assert_eq!(result.priority_score, 50);

            let stored = crate::db::issues::get_issue(&pool, issue.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.ai_severity, Some(Severity::Medium));
            assert_eq!(stored.priority_score, 50);
            assert_eq!(
                stored.ai_suggested_department.as_deref(),
                Some("Roads & Transport")
            );
            assert!(stored.assigned_to_department.is_some());
        }

        #[tokio::test]
        async fn votes_raise_the_recomputed_score() {
            let (service, pool) = setup_service().await;
            let issue = insert_issue(&pool, "Water").await;

            for _ in 0..3 {
                crate::db::votes::insert_vote(&pool, issue.id, Uuid::new_v4())
                    .await
                    .unwrap();
            }

            let result = service
                .classify(issue.id, &issue.title, &issue.description, "Water")
                .await
                .unwrap();

            // medium base 50 + 3 votes * 5
            assert_eq!(result.priority_score, 65);
            assert_eq!(result.department, "Water Supply");
        }

        #[tokio::test]
        async fn unknown_category_assigns_general() {
            let (service, pool) = setup_service().await;
            let issue = insert_issue(&pool, "Stray Fireworks").await;

            let result = service
                .classify(issue.id, &issue.title, &issue.description, "Stray Fireworks")
                .await
                .unwrap();

            assert_eq!(result.department, "General");
            let stored = crate::db::issues::get_issue(&pool, issue.id)
                .await
                .unwrap()
                .unwrap();
            // "General" is seeded, so the assignment resolves
            assert!(stored.assigned_to_department.is_some());
        }

        #[tokio::test]
        async fn classification_emits_event() {
            let (service, pool) = setup_service().await;
            let issue = insert_issue(&pool, "Waste").await;
            let mut rx = service.event_bus.subscribe();

            service
                .classify(issue.id, &issue.title, &issue.description, "Waste")
                .await
                .unwrap();

            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type(), "IssueClassified");
        }
    }
}
