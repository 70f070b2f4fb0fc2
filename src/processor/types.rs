use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which aggregations to run. The default produces summary metrics only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub group_by_user: bool,
    pub group_by_priority: bool,
    pub group_by_status: bool,
    pub include_trend_analysis: bool,
    pub calculate_velocity: bool,
    /// Caller-supplied trend windows. Empty means weekly windows are generated.
    pub time_ranges: Vec<TimeRange>,
    /// Drop activities with less logged time than this (seconds). 0 disables the filter.
    pub minimum_time_spent: u64,
    /// Reference instant for "recent" computations. `None` reads the clock once per call.
    pub as_of: Option<DateTime<Utc>>,
}

impl ProcessingOptions {
    /// Every aggregation enabled.
    pub fn all() -> Self {
        Self {
            group_by_user: true,
            group_by_priority: true,
            group_by_status: true,
            include_trend_analysis: true,
            calculate_velocity: true,
            ..Self::default()
        }
    }
}

/// Inclusive time window used by trend analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Team-wide totals over the filtered activity set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_activities: usize,
    pub total_users: usize,
    /// Seconds.
    pub total_time_spent: u64,
    /// Seconds.
    pub average_time_per_user: f64,
    pub completion_rate: f64,
    pub productivity_score: f64,
    /// User id with the most logged time.
    pub most_active_user: Option<String>,
    /// Priority label with the most activities.
    pub top_priority: Option<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub user_id: String,
    pub display_name: String,
    pub total_activities: usize,
    pub completed_activities: usize,
    pub total_time_spent: u64,
    pub average_time_per_task: f64,
    pub completion_rate: f64,
    /// 1 is best. Assigned once every user's completion rate is known.
    pub productivity_rank: usize,
    pub priority_distribution: BTreeMap<String, usize>,
    pub status_distribution: BTreeMap<String, usize>,
    /// Keys of activities with at least two hours logged, in encounter order.
    pub top_issues: Vec<String>,
}

impl UserMetrics {
    /// Finalize the metrics with the user's productivity rank.
    pub fn with_rank(self, productivity_rank: usize) -> Self {
        Self {
            productivity_rank,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityMetrics {
    pub priority: String,
    pub count: usize,
    pub completed_count: usize,
    pub total_time_spent: u64,
    /// Mean logged time of the completed activities only.
    pub average_time_to_complete: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMetrics {
    pub status: String,
    pub count: usize,
    pub completed_count: usize,
    pub total_time_spent: u64,
    pub completion_rate: f64,
    pub users: BTreeSet<String>,
    /// Activities updated within the seven days before the reference instant.
    pub recent_changes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeMetrics {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub activity_count: usize,
    pub completed_count: usize,
    pub total_time_spent: u64,
    /// Completions per day.
    pub velocity: f64,
    pub productivity_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub time_ranges: Vec<TimeRangeMetrics>,
    /// Direction of activity volume across windows.
    pub overall_trend: TrendDirection,
    pub velocity_trend: TrendDirection,
    pub productivity_trend: TrendDirection,
    /// Weekday name -> completed/total ratio of activities created on that day.
    pub seasonality: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityMetrics {
    /// Completions per day, averaged across users with a non-zero span.
    pub average_velocity: f64,
    pub current_velocity: f64,
    pub burndown_rate: f64,
    pub user_velocities: BTreeMap<String, f64>,
}

/// Output of [`DataProcessor::process_activities`](super::DataProcessor::process_activities).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub summary: SummaryMetrics,
    pub user_metrics: Option<BTreeMap<String, UserMetrics>>,
    pub priority_metrics: Option<BTreeMap<String, PriorityMetrics>>,
    pub status_metrics: Option<BTreeMap<String, StatusMetrics>>,
    pub trend_analysis: Option<TrendAnalysis>,
    pub velocity_metrics: Option<VelocityMetrics>,
    pub processing_time_ms: f64,
}
