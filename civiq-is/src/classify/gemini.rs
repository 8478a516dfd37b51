//! Gemini client for AI-assisted issue classification
//!
//! Single prompt/response round trip against the `generateContent`
//! endpoint. The model is asked to answer in JSON but frequently wraps the
//! payload in prose, so extraction is defensive: take the outermost
//! `{...}` span of the reply text and parse that.
//!
//! Every failure mode is a typed [`AiError`]; the pipeline absorbs them
//! all and falls back to deterministic defaults. No retries.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Gemini generateContent endpoint (model name appended)
const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Request timeout for the classification round trip
///
/// The upstream default is effectively unbounded; classification runs on
/// the submission path, so a hung call must not hold the request open.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Classification errors from the AI backend
///
/// None of these escape the pipeline; they select the deterministic
/// fallback and are logged at warn.
#[derive(Debug, Error)]
pub enum AiError {
    /// Request never completed (connect failure, timeout)
    #[error("Gemini request failed: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("Gemini API error: {0}")]
    Api(String),

    /// Response arrived but no usable classification could be parsed
    #[error("Gemini response parse failed: {0}")]
    Parse(String),
}

/// Fields the model is asked to return
///
/// Everything is optional: a partial answer is merged over the defaults
/// field by field. `priority_score` is deserialized for fidelity to the
/// wire contract but the pipeline recomputes the score deterministically
/// and does not use it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiClassification {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, rename = "priorityScore")]
    pub priority_score: Option<i64>,
    #[serde(default)]
    pub suggestions: Option<serde_json::Value>,
}

/// Gemini client
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
}

impl GeminiClient {
    /// Create a new client with the given API key
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }

    /// Ask the model to classify an issue
    pub async fn classify(
        &self,
        title: &str,
        description: &str,
        category: &str,
    ) -> Result<AiClassification, AiError> {
        let prompt = build_prompt(title, description, category);

        debug!(prompt_length = prompt.len(), "Querying Gemini for classification");

        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .http_client
            .post(GEMINI_API_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("status {}: {}", status, body)));
        }

        let generate_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(format!("response body: {}", e)))?;

        let text = generate_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| AiError::Parse("no candidates in response".to_string()))?;

        parse_classification(text)
    }
}

/// Build the classification prompt
fn build_prompt(title: &str, description: &str, category: &str) -> String {
    format!(
        "Analyze the following civic issue and provide:\n\
         1. Severity level (low/medium/high)\n\
         2. Most appropriate department\n\
         3. Priority score (0-100)\n\
         4. Brief solution suggestions\n\
         \n\
         Title: {title}\n\
         Description: {description}\n\
         Reported Category: {category}\n\
         \n\
         Respond in JSON format with keys: severity, department, priorityScore, suggestions"
    )
}

/// Parse a classification payload out of free-form model text
pub fn parse_classification(text: &str) -> Result<AiClassification, AiError> {
    let json = extract_json_object(text)
        .ok_or_else(|| AiError::Parse("no JSON object in reply text".to_string()))?;

    serde_json::from_str(json).map_err(|e| AiError::Parse(format!("classification JSON: {}", e)))
}

/// Extract the outermost `{...}` span from free-form text
///
/// Models wrap JSON answers in prose or markdown fences; the span from the
/// first `{` to the last `}` is the payload.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

// ============================================================================
// Gemini API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: String,
}

// ============================================================================
// Tests
// ============================================================================
