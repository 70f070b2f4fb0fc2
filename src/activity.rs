use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statuses counted as completed work. Matching is exact and case-sensitive.
pub const COMPLETED_STATUSES: [&str; 5] = ["Done", "Closed", "Resolved", "Complete", "Finished"];

/// Priorities that count as high priority in the productivity score.
pub const HIGH_PRIORITIES: [&str; 2] = ["High", "Critical"];

/// Label used when an activity has no priority.
pub const NO_PRIORITY: &str = "None";

/// Label used when an activity has no status.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// The person an activity is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: String,
    pub display_name: String,
}

impl Assignee {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn unassigned() -> Self {
        Self::new("unassigned", "Unassigned")
    }
}

/// A single unit of tracked work (e.g. an issue-tracker ticket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    /// Human-readable ticket code, e.g. `PROJ-123`.
    pub key: String,
    pub summary: String,
    pub priority: String,
    pub status: String,
    /// Logged work in seconds.
    pub time_spent: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub assignee: Assignee,
}

impl Activity {
    pub fn is_completed(&self) -> bool {
        COMPLETED_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_high_priority(&self) -> bool {
        HIGH_PRIORITIES.contains(&self.priority.as_str())
    }

    pub fn priority_label(&self) -> &str {
        if self.priority.is_empty() {
            NO_PRIORITY
        } else {
            &self.priority
        }
    }

    pub fn status_label(&self) -> &str {
        if self.status.is_empty() {
            UNKNOWN_STATUS
        } else {
            &self.status
        }
    }
}
