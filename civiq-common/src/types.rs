//! Shared domain enums
//!
//! Stored in the database as lowercase/label text, so every enum here keeps
//! its string form stable. Parsing is case-insensitive because two of these
//! (severity, category) also arrive from external sources that do not
//! guarantee casing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issue severity, drives the base priority score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Issue lifecycle status
///
/// Transition timestamps on the issue row (acknowledged_at, resolved_at,
/// closed_at) are stamped exactly once, when the status is first reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Submitted,
    Acknowledged,
    InProgress,
    Resolved,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Submitted => "submitted",
            IssueStatus::Acknowledged => "acknowledged",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
        }
    }

    /// Resolved and closed issues count as completed for metrics
    pub fn is_terminal(&self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Closed)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "submitted" => Ok(IssueStatus::Submitted),
            "acknowledged" => Ok(IssueStatus::Acknowledged),
            "in_progress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            "closed" => Ok(IssueStatus::Closed),
            other => Err(format!("unknown issue status: {other}")),
        }
    }
}

/// Citizen-chosen issue category
///
/// The citizen's choice is never overridden by classification, only
/// enriched. Classification must still tolerate arbitrary category strings
/// on the wire (unknown labels resolve to the "General" department), so the
/// database column stays TEXT; this enum is for validating submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Road,
    Sanitation,
    Water,
    Safety,
    Electricity,
    Waste,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Road,
        Category::Sanitation,
        Category::Water,
        Category::Safety,
        Category::Electricity,
        Category::Waste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Road => "Road",
            Category::Sanitation => "Sanitation",
            Category::Water => "Water",
            Category::Safety => "Safety",
            Category::Electricity => "Electricity",
            Category::Waste => "Waste",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "road" => Ok(Category::Road),
            "sanitation" => Ok(Category::Sanitation),
            "water" => Ok(Category::Water),
            "safety" => Ok(Category::Safety),
            "electricity" => Ok(Category::Electricity),
            "waste" => Ok(Category::Waste),
            other => Err(format!("unknown category: {other}")),
        }
    }
}
