//! Deterministic priority scoring and department resolution
//!
//! The final score is always computed here, regardless of what the AI
//! backend suggested: a fixed severity table plus a community-vote bonus,
//! capped at 100. Keeping this pure makes the whole pipeline testable
//! without a database or network.

use civiq_common::Severity;

/// Priority points added per community vote
///
/// Also the step applied to an issue's stored score when a vote is toggled
/// (+5 on vote, -5 on un-vote), so recomputation and incremental updates
/// agree.
pub const VOTE_PRIORITY_STEP: i64 = 5;

/// Scores are ranks in 0..=100
pub const MAX_PRIORITY_SCORE: i64 = 100;

/// Base priority from severity
pub fn base_priority(severity: Severity) -> i64 {
    match severity {
        Severity::Low => 30,
        Severity::Medium => 50,
        Severity::High => 80,
    }
}

/// Additive contribution from community votes
pub fn vote_bonus(vote_count: i64) -> i64 {
    vote_count.max(0) * VOTE_PRIORITY_STEP
}

/// Final score: base + vote bonus, capped at 100
pub fn final_priority(severity: Severity, vote_count: i64) -> i64 {
    (base_priority(severity) + vote_bonus(vote_count)).min(MAX_PRIORITY_SCORE)
}

/// Department responsible for a citizen-chosen category
///
/// Unrecognized categories land in "General" rather than failing; the
/// classify endpoint accepts whatever label the client sends.
pub fn category_department(category: &str) -> &'static str {
    match category {
        "Road" => "Roads & Transport",
        "Sanitation" => "Sanitation",
        "Water" => "Water Supply",
        "Safety" => "Public Safety",
        "Electricity" => "Electricity",
        "Waste" => "Waste Management",
        _ => "General",
    }
}

/// Resolve the suggested department name
///
/// An AI-suggested department wins when present and non-empty; otherwise
/// the category mapping applies.
pub fn resolve_department_name(ai_department: Option<&str>, category: &str) -> String {
    match ai_department {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => category_department(category).to_string(),
    }
}
