pub mod sections;
pub mod types;

pub use types::*;

use std::collections::BTreeMap;

use chrono::Utc;

use crate::date_util::{format_date_range, format_time_spent};
use crate::error::{Error, Result};
use crate::processor::{
    PriorityMetrics, ProcessingResult, TrendAnalysis, TrendDirection, UserMetrics,
};

/// Average logged time per task (seconds) above which tasks are considered too large.
pub const LARGE_TASK_SECONDS: f64 = 14_400.0;

/// Renders a [`ProcessingResult`] as executive-summary prose and insight lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryGenerator;

impl SummaryGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a summary. Fails only when no processing result is supplied;
    /// missing optional breakdowns just leave their sections empty.
    pub fn generate_summary(
        &self,
        result: Option<&ProcessingResult>,
        request: &SummaryRequest,
    ) -> Result<SummaryResponse> {
        let result = result.ok_or(Error::DataRequired)?;
        log::debug!(
            "generating {:?} summary for period '{}'",
            request.format,
            request.period
        );

        let date_range = result
            .summary
            .date_range
            .map(|r| format_date_range(r.start, r.end))
            .unwrap_or_else(|| "no recorded activity".to_string());

        let trends = if request.include_trends {
            result.trend_analysis.as_ref().map(trend_summary)
        } else {
            None
        };

        let custom_sections: BTreeMap<String, String> = request
            .custom_sections
            .iter()
            .map(|name| (name.clone(), sections::render_section(name, result)))
            .collect();

        let response = SummaryResponse {
            title: request
                .title
                .clone()
                .unwrap_or_else(|| format!("Team Productivity Summary: {}", request.period)),
            period: request.period.clone(),
            executive_summary: executive_summary(result, &request.period, &date_range),
            date_range,
            generated_at: Utc::now(),
            key_metrics: key_metrics(result),
            highlights: highlights(result),
            concerns: concerns(result),
            recommendations: recommendations(result),
            user_insights: user_insights(result, request.max_users),
            trends,
            custom_sections,
            raw_data: match request.format {
                SummaryFormat::Detailed => Some(result.clone()),
                SummaryFormat::Executive => None,
            },
        };

        log::info!(
            "generated summary with {} highlights, {} concerns, {} user insights",
            response.highlights.len(),
            response.concerns.len(),
            response.user_insights.len()
        );
        Ok(response)
    }
}

/// Qualitative label for a productivity score.
pub fn productivity_adjective(score: f64) -> &'static str {
    if score >= 80.0 {
        "excellent"
    } else if score >= 60.0 {
        "good"
    } else if score >= 40.0 {
        "average"
    } else {
        "concerning"
    }
}

/// True when, with at least two users, someone logged more than twice or
/// less than half of the mean time.
pub fn has_workload_imbalance(users: &BTreeMap<String, UserMetrics>) -> bool {
    if users.len() < 2 {
        return false;
    }
    let mean = users.values().map(|u| u.total_time_spent as f64).sum::<f64>() / users.len() as f64;
    users.values().any(|u| {
        let time = u.total_time_spent as f64;
        time > mean * 2.0 || time < mean * 0.5
    })
}

fn key_metrics(result: &ProcessingResult) -> KeyMetrics {
    let s = &result.summary;
    KeyMetrics {
        total_activities: s.total_activities,
        total_users: s.total_users,
        completion_rate: s.completion_rate,
        productivity_score: s.productivity_score,
        total_time_spent: format_time_spent(s.total_time_spent),
        average_time_per_user: format_time_spent(s.average_time_per_user.round() as u64),
        top_priority: s.top_priority.clone(),
        most_active_user: most_active(result).map(|u| u.display_name.clone()),
    }
}

/// The most active user's metrics, when the id resolves in the per-user breakdown.
fn most_active(result: &ProcessingResult) -> Option<&UserMetrics> {
    let id = result.summary.most_active_user.as_ref()?;
    result.user_metrics.as_ref()?.get(id)
}

fn high_priority(result: &ProcessingResult) -> Option<&PriorityMetrics> {
    result.priority_metrics.as_ref()?.get("High")
}

fn executive_summary(result: &ProcessingResult, period: &str, date_range: &str) -> String {
    let s = &result.summary;
    let mut text = format!(
        "During the {period} period ({date_range}), the team worked on {} activities \
         with a {:.1}% completion rate, logging {} across {} team members \
         (an average of {} per person). Overall productivity was {} with a score of {:.1}.",
        s.total_activities,
        s.completion_rate,
        format_time_spent(s.total_time_spent),
        s.total_users,
        format_time_spent(s.average_time_per_user.round() as u64),
        productivity_adjective(s.productivity_score),
        s.productivity_score,
    );
    if let Some(priority) = &s.top_priority {
        text.push_str(&format!(" Most work was {priority} priority."));
    }
    if let Some(user) = most_active(result) {
        text.push_str(&format!(
            " {} was the most active contributor, logging {} across {} activities.",
            user.display_name,
            format_time_spent(user.total_time_spent),
            user.total_activities
        ));
    }
    text
}

fn highlights(result: &ProcessingResult) -> Vec<String> {
    let s = &result.summary;
    let mut items = Vec::new();

    if s.completion_rate >= 80.0 {
        items.push(format!("Excellent completion rate of {:.1}%", s.completion_rate));
    }
    if s.productivity_score >= 75.0 {
        items.push(format!("Strong productivity score of {:.1}", s.productivity_score));
    }
    if let Some(high) = high_priority(result) {
        if high.completion_rate >= 75.0 {
            items.push(format!(
                "High-priority items are {:.1}% complete",
                high.completion_rate
            ));
        }
    }
    if let Some(users) = &result.user_metrics {
        let mut top: Vec<&UserMetrics> = users
            .values()
            .filter(|u| u.completion_rate >= 80.0 && u.productivity_rank <= 3)
            .collect();
        top.sort_by_key(|u| u.productivity_rank);
        let names: Vec<&str> = top.iter().take(2).map(|u| u.display_name.as_str()).collect();
        if !names.is_empty() {
            items.push(format!("Top performers: {}", names.join(" and ")));
        }
    }
    if let Some(trend) = &result.trend_analysis {
        if trend.overall_trend == TrendDirection::Increasing {
            items.push("Activity volume is trending upward".to_string());
        }
        if trend.velocity_trend == TrendDirection::Increasing {
            items.push("Team velocity is increasing".to_string());
        }
    }
    items
}

fn concerns(result: &ProcessingResult) -> Vec<String> {
    let s = &result.summary;
    let mut items = Vec::new();

    if s.completion_rate < 60.0 {
        items.push(format!("Low completion rate of {:.1}%", s.completion_rate));
    }
    if s.productivity_score < 50.0 {
        items.push(format!(
            "Productivity score of {:.1} is below target",
            s.productivity_score
        ));
    }
    if let Some(high) = high_priority(result) {
        if high.completion_rate < 60.0 {
            items.push(format!(
                "Only {:.1}% of high-priority items are complete",
                high.completion_rate
            ));
        }
    }
    if let Some(users) = &result.user_metrics {
        let struggling = underperformer_count(users);
        if struggling > 0 {
            items.push(format!(
                "{struggling} team member(s) may need additional support"
            ));
        }
    }
    if let Some(trend) = &result.trend_analysis {
        if trend.overall_trend == TrendDirection::Decreasing {
            items.push("Activity volume is trending downward".to_string());
        }
        if trend.velocity_trend == TrendDirection::Decreasing {
            items.push("Team velocity is decreasing".to_string());
        }
    }
    if result
        .user_metrics
        .as_ref()
        .is_some_and(has_workload_imbalance)
    {
        items.push("Workload is unevenly distributed across the team".to_string());
    }
    items
}

/// Users below 50% completion or ranked in the bottom quarter of the team.
fn underperformer_count(users: &BTreeMap<String, UserMetrics>) -> usize {
    let cutoff = (users.len() as f64 * 0.75).ceil() as usize;
    users
        .values()
        .filter(|u| u.completion_rate < 50.0 || u.productivity_rank > cutoff)
        .count()
}

fn recommendations(result: &ProcessingResult) -> Vec<String> {
    let s = &result.summary;
    let mut items = Vec::new();

    if s.completion_rate < 70.0 {
        items.push(
            "Review in-progress and blocked items to raise the completion rate".to_string(),
        );
    }
    if s.productivity_score < 60.0 {
        items.push("Identify process bottlenecks that are holding back productivity".to_string());
    }
    if let Some(high) = high_priority(result) {
        if high.completion_rate < 70.0 {
            items.push(format!(
                "Prioritize the high-priority backlog ({:.1}% complete)",
                high.completion_rate
            ));
        }
    }
    if result
        .user_metrics
        .as_ref()
        .is_some_and(has_workload_imbalance)
    {
        items.push("Rebalance assignments so work is spread more evenly".to_string());
    }

    items.push("Continue monitoring team metrics on a regular cadence".to_string());
    items.push("Recognize top performers and share their practices with the team".to_string());
    items
}

fn user_insights(result: &ProcessingResult, max_users: usize) -> Vec<UserInsight> {
    let Some(users) = &result.user_metrics else {
        return Vec::new();
    };

    let mut ordered: Vec<&UserMetrics> = users.values().collect();
    ordered.sort_by_key(|u| u.productivity_rank);
    if max_users > 0 {
        ordered.truncate(max_users);
    }
    ordered.into_iter().map(user_insight).collect()
}

fn user_insight(user: &UserMetrics) -> UserInsight {
    let mut achievements = Vec::new();
    if user.completion_rate >= 90.0 {
        achievements.push(format!(
            "Outstanding completion rate of {:.1}%",
            user.completion_rate
        ));
    }
    if user.productivity_rank <= 2 {
        achievements.push(format!(
            "Ranked #{} in team productivity",
            user.productivity_rank
        ));
    }
    if !user.top_issues.is_empty() {
        achievements.push(format!(
            "Handled {} high-effort issue(s) of 2h or more",
            user.top_issues.len()
        ));
    }

    let mut improvement_areas = Vec::new();
    if user.completion_rate < 60.0 {
        improvement_areas.push(format!(
            "Completion rate of {:.1}% is below target",
            user.completion_rate
        ));
    }
    if user.average_time_per_task > LARGE_TASK_SECONDS {
        improvement_areas.push(format!(
            "Averaging {} per task; consider breaking work into smaller pieces",
            format_time_spent(user.average_time_per_task.round() as u64)
        ));
    }

    UserInsight {
        user_id: user.user_id.clone(),
        display_name: user.display_name.clone(),
        productivity_rank: user.productivity_rank,
        completion_rate: user.completion_rate,
        total_activities: user.total_activities,
        total_time_spent: format_time_spent(user.total_time_spent),
        achievements,
        improvement_areas,
    }
}

fn trend_summary(trend: &TrendAnalysis) -> TrendSummary {
    TrendSummary {
        overall: format!("Activity volume is {}", trend.overall_trend),
        velocity: format!("Team velocity is {}", trend.velocity_trend),
        productivity: format!("Productivity is {}", trend.productivity_trend),
        seasonality: trend.seasonality.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::fixtures::*;
    use crate::processor::{DataProcessor, ProcessingOptions, SummaryMetrics};

    fn processed() -> ProcessingResult {
        let options = ProcessingOptions {
            as_of: Some(ts("2025-01-21T00:00:00Z")),
            ..ProcessingOptions::all()
        };
        DataProcessor::new().process_activities(&two_user_team(), &options)
    }

    fn request() -> SummaryRequest {
        SummaryRequest {
            period: "weekly".into(),
            include_trends: true,
            ..SummaryRequest::default()
        }
    }

    fn user(id: &str, completion_rate: f64, rank: usize, time: u64) -> UserMetrics {
        UserMetrics {
            user_id: id.into(),
            display_name: format!("User {id}"),
            total_activities: 4,
            completed_activities: 0,
            total_time_spent: time,
            average_time_per_task: time as f64 / 4.0,
            completion_rate,
            productivity_rank: rank,
            priority_distribution: BTreeMap::new(),
            status_distribution: BTreeMap::new(),
            top_issues: Vec::new(),
        }
    }

    fn result_with(completion_rate: f64, productivity_score: f64) -> ProcessingResult {
        ProcessingResult {
            summary: SummaryMetrics {
                total_activities: 10,
                total_users: 2,
                completion_rate,
                productivity_score,
                ..SummaryMetrics::default()
            },
            ..ProcessingResult::default()
        }
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let err = SummaryGenerator::new()
            .generate_summary(None, &request())
            .unwrap_err();
        assert!(matches!(err, Error::DataRequired));
    }

    #[test]
    fn test_generates_from_valid_result() {
        let result = processed();
        let response = SummaryGenerator::new()
            .generate_summary(Some(&result), &request())
            .unwrap();
        assert_eq!(response.period, "weekly");
        assert_eq!(response.date_range, "Jan 06, 2025 - Jan 20, 2025");
        assert_eq!(response.key_metrics.total_activities, 4);
        assert_eq!(response.key_metrics.total_time_spent, "5h");
        assert_eq!(response.key_metrics.most_active_user.as_deref(), Some("Alice Smith"));
        assert!(response.raw_data.is_none());
        assert!(response.trends.is_some());
    }

    #[test]
    fn test_generates_from_empty_result() {
        let result = DataProcessor::new().process_activities(&[], &ProcessingOptions::all());
        let response = SummaryGenerator::new()
            .generate_summary(Some(&result), &request())
            .unwrap();
        assert_eq!(response.date_range, "no recorded activity");
        assert!(response.user_insights.is_empty());
        assert!(response.trends.is_none());
        assert!(!response.executive_summary.contains("most active"));
    }

    #[test]
    fn test_executive_summary_text() {
        let result = processed();
        let text = executive_summary(&result, "weekly", "Jan 06, 2025 - Jan 20, 2025");
        assert!(text.starts_with("During the weekly period (Jan 06, 2025 - Jan 20, 2025)"));
        assert!(text.contains("worked on 4 activities with a 50.0% completion rate"));
        assert!(text.contains("logging 5h across 2 team members"));
        assert!(text.contains("an average of 2h 30m per person"));
        assert!(text.contains("productivity was good with a score of 68."));
        assert!(text.contains("Most work was High priority."));
        assert!(text.contains("Alice Smith was the most active contributor, logging 3h across 2 activities."));
    }

    #[test]
    fn test_executive_summary_omits_unresolved_user() {
        let mut result = processed();
        result.user_metrics = None;
        let text = executive_summary(&result, "weekly", "range");
        assert!(!text.contains("most active contributor"));
    }

    #[test]
    fn test_productivity_adjective_cutoffs() {
        assert_eq!(productivity_adjective(80.0), "excellent");
        assert_eq!(productivity_adjective(79.9), "good");
        assert_eq!(productivity_adjective(60.0), "good");
        assert_eq!(productivity_adjective(40.0), "average");
        assert_eq!(productivity_adjective(39.9), "concerning");
    }

    #[test]
    fn test_highlights_order() {
        let result = result_with(85.0, 80.0);
        let items = highlights(&result);
        assert!(items[0].contains("Excellent completion rate"));
        assert!(items[1].contains("Strong productivity score"));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_top_performers_highlight() {
        let mut result = result_with(85.0, 80.0);
        let users: BTreeMap<String, UserMetrics> = [
            user("a", 95.0, 2, 100),
            user("b", 100.0, 1, 100),
            user("c", 90.0, 3, 100),
            user("d", 50.0, 4, 100),
        ]
        .into_iter()
        .map(|u| (u.user_id.clone(), u))
        .collect();
        result.user_metrics = Some(users);
        let items = highlights(&result);
        assert_eq!(items[2], "Top performers: User b and User a");
    }

    #[test]
    fn test_trend_highlights_and_concerns() {
        let mut result = result_with(70.0, 70.0);
        result.trend_analysis = Some(TrendAnalysis {
            overall_trend: TrendDirection::Increasing,
            velocity_trend: TrendDirection::Decreasing,
            ..TrendAnalysis::default()
        });
        assert_eq!(highlights(&result), vec!["Activity volume is trending upward"]);
        assert_eq!(concerns(&result), vec!["Team velocity is decreasing"]);
    }

    #[test]
    fn test_concerns_for_weak_metrics() {
        let result = result_with(40.0, 30.0);
        let items = concerns(&result);
        assert!(items[0].starts_with("Low completion rate of 40.0%"));
        assert!(items[1].contains("below target"));
        assert!(highlights(&result).is_empty());
    }

    #[test]
    fn test_high_priority_concern_and_highlight() {
        let result = processed();
        // Both High items are done.
        assert!(highlights(&result)
            .iter()
            .any(|h| h == "High-priority items are 100.0% complete"));
        assert!(!concerns(&result).iter().any(|c| c.contains("high-priority")));
    }

    #[test]
    fn test_underperformers() {
        let users: BTreeMap<String, UserMetrics> = [
            user("a", 90.0, 1, 100),
            user("b", 80.0, 2, 100),
            user("c", 70.0, 3, 100),
            user("d", 60.0, 4, 100),
        ]
        .into_iter()
        .map(|u| (u.user_id.clone(), u))
        .collect();
        // Cutoff rank is 3, so only d counts.
        assert_eq!(underperformer_count(&users), 1);
    }

    #[test]
    fn test_workload_imbalance() {
        let balanced: BTreeMap<String, UserMetrics> = [user("a", 50.0, 1, 100), user("b", 50.0, 2, 120)]
            .into_iter()
            .map(|u| (u.user_id.clone(), u))
            .collect();
        assert!(!has_workload_imbalance(&balanced));

        let skewed: BTreeMap<String, UserMetrics> = [
            user("a", 50.0, 1, 100),
            user("b", 50.0, 2, 100),
            user("c", 50.0, 3, 1000),
        ]
        .into_iter()
        .map(|u| (u.user_id.clone(), u))
        .collect();
        assert!(has_workload_imbalance(&skewed));

        let single: BTreeMap<String, UserMetrics> = [user("a", 50.0, 1, 100)]
            .into_iter()
            .map(|u| (u.user_id.clone(), u))
            .collect();
        assert!(!has_workload_imbalance(&single));
    }

    #[test]
    fn test_recommendations_always_include_baseline() {
        let strong = recommendations(&result_with(95.0, 95.0));
        assert_eq!(
            strong,
            vec![
                "Continue monitoring team metrics on a regular cadence",
                "Recognize top performers and share their practices with the team",
            ]
        );

        let weak = recommendations(&result_with(50.0, 50.0));
        assert_eq!(weak.len(), 4);
        assert!(weak[0].contains("completion rate"));
    }

    #[test]
    fn test_user_insights_sorted_and_truncated() {
        let result = processed();
        let insights = user_insights(&result, 1);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].productivity_rank, 1);

        let all = user_insights(&result, 0);
        assert_eq!(all.len(), 2);
        assert!(all[0].productivity_rank < all[1].productivity_rank);
    }

    #[test]
    fn test_user_insight_content() {
        let mut star = user("a", 100.0, 1, 4 * 20_000);
        star.top_issues = vec!["PROJ-1".into(), "PROJ-2".into()];
        let insight = user_insight(&star);
        assert_eq!(
            insight.achievements,
            vec![
                "Outstanding completion rate of 100.0%",
                "Ranked #1 in team productivity",
                "Handled 2 high-effort issue(s) of 2h or more",
            ]
        );
        assert_eq!(insight.improvement_areas.len(), 1);
        assert!(insight.improvement_areas[0].starts_with("Averaging 5h 33m per task"));

        let struggling = user_insight(&user("b", 25.0, 5, 400));
        assert!(struggling.achievements.is_empty());
        assert_eq!(
            struggling.improvement_areas,
            vec!["Completion rate of 25.0% is below target"]
        );
    }

    #[test]
    fn test_trends_only_when_requested() {
        let result = processed();
        let without = SummaryRequest {
            include_trends: false,
            ..request()
        };
        let response = SummaryGenerator::new()
            .generate_summary(Some(&result), &without)
            .unwrap();
        assert!(response.trends.is_none());

        let response = SummaryGenerator::new()
            .generate_summary(Some(&result), &request())
            .unwrap();
        let trends = response.trends.unwrap();
        assert_eq!(trends.overall, "Activity volume is stable");
        assert_eq!(trends.seasonality["Monday"], 1.0);

        let lines = trends.lines();
        assert_eq!(lines[0], "Activity volume is stable");
        assert!(lines.iter().all(|l| !l.is_empty() && l.chars().next().is_some_and(char::is_uppercase)));
    }

    #[test]
    fn test_custom_sections() {
        let result = processed();
        let req = SummaryRequest {
            custom_sections: vec!["priority_breakdown".into(), "unknown_section".into()],
            ..request()
        };
        let response = SummaryGenerator::new()
            .generate_summary(Some(&result), &req)
            .unwrap();
        assert!(response.custom_sections["priority_breakdown"].starts_with("Priority breakdown:"));
        assert!(response.custom_sections["unknown_section"].contains("not implemented"));
    }

    #[test]
    fn test_detailed_format_embeds_raw_data() {
        let result = processed();
        let req = SummaryRequest {
            format: SummaryFormat::Detailed,
            ..request()
        };
        let response = SummaryGenerator::new()
            .generate_summary(Some(&result), &req)
            .unwrap();
        assert_eq!(response.raw_data, Some(result));
    }
}
