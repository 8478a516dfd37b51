//! Event types and EventBus for the CIVIQ event system
//!
//! Events are broadcast in-process and serialized for SSE transmission to
//! dashboard clients.

use crate::types::{IssueStatus, Severity};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// CIVIQ event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CiviqEvent {
    /// Citizen submitted a new issue
    IssueSubmitted {
        issue_id: Uuid,
        category: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Classification pipeline finished for an issue
    IssueClassified {
        issue_id: Uuid,
        severity: Severity,
        department: String,
        priority_score: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Citizen voted or un-voted an issue
    VoteToggled {
        issue_id: Uuid,
        user_id: Uuid,
        voted: bool,
        vote_count: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Officer moved an issue to a new lifecycle status
    IssueStatusChanged {
        issue_id: Uuid,
        old_status: IssueStatus,
        new_status: IssueStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Overdue sweep flagged an issue as escalated
    IssueEscalated {
        issue_id: Uuid,
        age_days: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CiviqEvent {
    /// Get event type as string for SSE filtering
    pub fn event_type(&self) -> &str {
        match self {
            CiviqEvent::IssueSubmitted { .. } => "IssueSubmitted",
            CiviqEvent::IssueClassified { .. } => "IssueClassified",
            CiviqEvent::VoteToggled { .. } => "VoteToggled",
            CiviqEvent::IssueStatusChanged { .. } => "IssueStatusChanged",
            CiviqEvent::IssueEscalated { .. } => "IssueEscalated",
        }
    }
}

/// Central event distribution bus
///
/// Backed by `tokio::sync::broadcast`: non-blocking publish, any number of
/// concurrent subscribers, automatic cleanup when receivers drop. Slow
/// subscribers lag and lose old events rather than blocking producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CiviqEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CiviqEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers that received the event. Zero
    /// subscribers is not an error; event emission is fire-and-forget.
    pub fn emit(&self, event: CiviqEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
