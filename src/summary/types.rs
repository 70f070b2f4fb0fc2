use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processor::ProcessingResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Executive,
    /// Narrative plus the full processing result.
    Detailed,
}

/// What to generate from a processing result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub title: Option<String>,
    /// Period label interpolated into the narrative, e.g. `weekly` or `2025-Q1`.
    pub period: String,
    pub format: SummaryFormat,
    /// Maximum number of user insights. 0 keeps everyone.
    pub max_users: usize,
    pub include_trends: bool,
    /// Named extra sections: `priority_breakdown`, `status_summary`,
    /// `velocity_analysis`, `time_analysis`.
    pub custom_sections: Vec<String>,
}

/// Headline numbers re-projected for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_activities: usize,
    pub total_users: usize,
    pub completion_rate: f64,
    pub productivity_score: f64,
    pub total_time_spent: String,
    pub average_time_per_user: String,
    pub top_priority: Option<String>,
    pub most_active_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInsight {
    pub user_id: String,
    pub display_name: String,
    pub productivity_rank: usize,
    pub completion_rate: f64,
    pub total_activities: usize,
    pub total_time_spent: String,
    pub achievements: Vec<String>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub overall: String,
    pub velocity: String,
    pub productivity: String,
    pub seasonality: BTreeMap<String, f64>,
}

impl TrendSummary {
    /// The three trend sentences, one per display line.
    pub fn lines(&self) -> [&str; 3] {
        [&self.overall, &self.velocity, &self.productivity]
    }
}

/// Narrative rendering of a [`ProcessingResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub title: String,
    pub period: String,
    pub date_range: String,
    pub generated_at: DateTime<Utc>,
    pub executive_summary: String,
    pub key_metrics: KeyMetrics,
    pub highlights: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub user_insights: Vec<UserInsight>,
    pub trends: Option<TrendSummary>,
    pub custom_sections: BTreeMap<String, String>,
    pub raw_data: Option<ProcessingResult>,
}
