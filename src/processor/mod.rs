pub mod trend;
pub mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

use crate::activity::Activity;

/// Activities with at least this much logged time (seconds) count as high-effort "top issues".
pub const HIGH_EFFORT_SECONDS: u64 = 7200;

/// Window, in days before the reference instant, in which a status change counts as recent.
pub const RECENT_CHANGE_DAYS: i64 = 7;

/// Aggregates activities into summary, per-dimension, trend and velocity metrics.
///
/// Stateless: every call works only on its arguments, so one processor can be
/// shared freely between callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Run the aggregations selected by `options` over `activities`.
    ///
    /// Never fails. An empty (or fully filtered) input yields a zero-valued
    /// result with no per-dimension breakdowns.
    pub fn process_activities(
        &self,
        activities: &[Activity],
        options: &ProcessingOptions,
    ) -> ProcessingResult {
        let started = Instant::now();
        let as_of = options.as_of.unwrap_or_else(Utc::now);

        let filtered = filter_activities(activities, options.minimum_time_spent);
        log::debug!(
            "processing {} of {} activities (minimum_time_spent={}s)",
            filtered.len(),
            activities.len(),
            options.minimum_time_spent
        );

        let mut result = ProcessingResult::default();
        if filtered.is_empty() {
            result.processing_time_ms = elapsed_ms(started);
            log::info!("no activities to process after filtering");
            return result;
        }

        result.summary = compute_summary(&filtered);
        if options.group_by_user {
            result.user_metrics = Some(compute_user_metrics(&filtered));
        }
        if options.group_by_priority {
            result.priority_metrics = Some(compute_priority_metrics(&filtered));
        }
        if options.group_by_status {
            result.status_metrics = Some(compute_status_metrics(&filtered, as_of));
        }
        if options.include_trend_analysis {
            result.trend_analysis = Some(trend::analyze_trends(&filtered, &options.time_ranges));
        }
        if options.calculate_velocity {
            result.velocity_metrics = Some(trend::compute_velocity(&filtered));
        }

        result.processing_time_ms = elapsed_ms(started);
        log::info!(
            "processed {} activities for {} users in {:.2}ms",
            result.summary.total_activities,
            result.summary.total_users,
            result.processing_time_ms
        );
        result
    }
}

/// Keep activities with at least `minimum_time_spent` seconds logged, in input order.
pub fn filter_activities(activities: &[Activity], minimum_time_spent: u64) -> Vec<&Activity> {
    if minimum_time_spent == 0 {
        return activities.iter().collect();
    }
    activities
        .iter()
        .filter(|a| a.time_spent >= minimum_time_spent)
        .collect()
}

/// Percentage of `completed` out of `total`; 0 when there is nothing to complete.
pub fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// Heuristic productivity score in `[0, 100]`.
///
/// Half the weight is the completion rate, a quarter rewards finishing
/// High/Critical work (only when any exists), and a quarter gives full credit
/// for each completed activity and half credit for each open one.
pub fn productivity_score(activities: &[&Activity], completion_rate: f64) -> f64 {
    if activities.is_empty() {
        return 0.0;
    }

    let mut score = completion_rate * 0.5;

    let high: Vec<&&Activity> = activities.iter().filter(|a| a.is_high_priority()).collect();
    if !high.is_empty() {
        let high_completed = high.iter().filter(|a| a.is_completed()).count();
        score += high_completed as f64 / high.len() as f64 * 25.0;
    }

    let credit: f64 = activities
        .iter()
        .map(|a| if a.is_completed() { 1.0 } else { 0.5 })
        .sum();
    score += credit / activities.len() as f64 * 25.0;

    score.clamp(0.0, 100.0)
}

/// Assign dense ranks 1..N by completion rate, highest first.
///
/// The sort is stable over user-id order, so equal rates keep their id order.
pub fn rank_users(metrics: &BTreeMap<String, UserMetrics>) -> BTreeMap<String, usize> {
    let mut ordered: Vec<&UserMetrics> = metrics.values().collect();
    ordered.sort_by(|a, b| b.completion_rate.total_cmp(&a.completion_rate));
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, m)| (m.user_id.clone(), i + 1))
        .collect()
}

fn compute_summary(activities: &[&Activity]) -> SummaryMetrics {
    let mut users: BTreeSet<&str> = BTreeSet::new();
    let mut priority_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut user_time: BTreeMap<&str, u64> = BTreeMap::new();
    let mut completed = 0;
    let mut total_time: u64 = 0;
    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;

    for a in activities {
        users.insert(a.assignee.id.as_str());
        *priority_counts.entry(a.priority_label()).or_insert(0) += 1;
        *user_time.entry(a.assignee.id.as_str()).or_insert(0) += a.time_spent;
        if a.is_completed() {
            completed += 1;
        }
        total_time += a.time_spent;
        earliest = Some(earliest.map_or(a.created, |e| e.min(a.created)));
        latest = Some(latest.map_or(a.updated, |l| l.max(a.updated)));
    }

    let rate = completion_rate(completed, activities.len());
    let average_time_per_user = if users.is_empty() {
        0.0
    } else {
        total_time as f64 / users.len() as f64
    };

    SummaryMetrics {
        total_activities: activities.len(),
        total_users: users.len(),
        total_time_spent: total_time,
        average_time_per_user,
        completion_rate: rate,
        productivity_score: productivity_score(activities, rate),
        most_active_user: first_max(&user_time).map(str::to_string),
        top_priority: first_max(&priority_counts).map(str::to_string),
        date_range: earliest
            .zip(latest)
            .map(|(start, end)| DateRange { start, end }),
    }
}

/// Key of the largest value; on a tie the first key in map order wins.
fn first_max<'a, V: PartialOrd + Copy>(map: &BTreeMap<&'a str, V>) -> Option<&'a str> {
    let mut best: Option<(&'a str, V)> = None;
    for (&key, &value) in map {
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((key, value)),
        }
    }
    best.map(|(key, _)| key)
}

/// Group activities by a key, keeping encounter order inside each group.
fn group_by<'a, F>(activities: &[&'a Activity], key: F) -> BTreeMap<String, Vec<&'a Activity>>
where
    F: Fn(&Activity) -> &str,
{
    let mut groups: BTreeMap<String, Vec<&'a Activity>> = BTreeMap::new();
    for &a in activities {
        groups.entry(key(a).to_string()).or_default().push(a);
    }
    groups
}

fn compute_user_metrics(activities: &[&Activity]) -> BTreeMap<String, UserMetrics> {
    let unranked: BTreeMap<String, UserMetrics> = group_by(activities, |a| a.assignee.id.as_str())
        .into_iter()
        .map(|(user_id, group)| {
            let metrics = user_metrics_for(&user_id, &group);
            (user_id, metrics)
        })
        .collect();

    let ranks = rank_users(&unranked);
    unranked
        .into_iter()
        .map(|(user_id, metrics)| {
            let rank = ranks.get(&user_id).copied().unwrap_or_default();
            (user_id, metrics.with_rank(rank))
        })
        .collect()
}

fn user_metrics_for(user_id: &str, group: &[&Activity]) -> UserMetrics {
    let completed = group.iter().filter(|a| a.is_completed()).count();
    let total_time: u64 = group.iter().map(|a| a.time_spent).sum();

    let mut priority_distribution = BTreeMap::new();
    let mut status_distribution = BTreeMap::new();
    for a in group {
        *priority_distribution
            .entry(a.priority_label().to_string())
            .or_insert(0) += 1;
        *status_distribution
            .entry(a.status_label().to_string())
            .or_insert(0) += 1;
    }

    UserMetrics {
        user_id: user_id.to_string(),
        display_name: group
            .first()
            .map(|a| a.assignee.display_name.clone())
            .unwrap_or_default(),
        total_activities: group.len(),
        completed_activities: completed,
        total_time_spent: total_time,
        average_time_per_task: total_time as f64 / group.len() as f64,
        completion_rate: completion_rate(completed, group.len()),
        productivity_rank: 0,
        priority_distribution,
        status_distribution,
        top_issues: group
            .iter()
            .filter(|a| a.time_spent >= HIGH_EFFORT_SECONDS)
            .map(|a| a.key.clone())
            .collect(),
    }
}

fn compute_priority_metrics(activities: &[&Activity]) -> BTreeMap<String, PriorityMetrics> {
    group_by(activities, |a| a.priority_label())
        .into_iter()
        .map(|(priority, group)| {
            let completed: Vec<&&Activity> = group.iter().filter(|a| a.is_completed()).collect();
            let average_time_to_complete = if completed.is_empty() {
                0.0
            } else {
                completed.iter().map(|a| a.time_spent).sum::<u64>() as f64 / completed.len() as f64
            };
            let metrics = PriorityMetrics {
                priority: priority.clone(),
                count: group.len(),
                completed_count: completed.len(),
                total_time_spent: group.iter().map(|a| a.time_spent).sum(),
                average_time_to_complete,
                completion_rate: completion_rate(completed.len(), group.len()),
            };
            (priority, metrics)
        })
        .collect()
}

fn compute_status_metrics(
    activities: &[&Activity],
    as_of: DateTime<Utc>,
) -> BTreeMap<String, StatusMetrics> {
    let recent_cutoff = as_of - Duration::days(RECENT_CHANGE_DAYS);
    group_by(activities, |a| a.status_label())
        .into_iter()
        .map(|(status, group)| {
            let completed = group.iter().filter(|a| a.is_completed()).count();
            let metrics = StatusMetrics {
                status: status.clone(),
                count: group.len(),
                completed_count: completed,
                total_time_spent: group.iter().map(|a| a.time_spent).sum(),
                completion_rate: completion_rate(completed, group.len()),
                users: group.iter().map(|a| a.assignee.id.clone()).collect(),
                recent_changes: group.iter().filter(|a| a.updated > recent_cutoff).count(),
            };
            (status, metrics)
        })
        .collect()
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::activity::{Activity, Assignee};
    use crate::date_util::parse_timestamp;

    pub fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn activity(
        key: &str,
        user: (&str, &str),
        priority: &str,
        status: &str,
        time_spent: u64,
        created: &str,
        updated: &str,
    ) -> Activity {
        Activity {
            id: key.to_lowercase(),
            key: key.to_string(),
            summary: format!("Work on {key}"),
            priority: priority.to_string(),
            status: status.to_string(),
            time_spent,
            created: ts(created),
            updated: ts(updated),
            assignee: Assignee::new(user.0, user.1),
        }
    }

    /// Two users, four activities: High/Medium/High/Low, Done/In Progress/Done/Open.
    pub fn two_user_team() -> Vec<Activity> {
        let alice = ("u1", "Alice Smith");
        let bob = ("u2", "Bob Jones");
        vec![
            activity("PROJ-1", alice, "High", "Done", 7200, "2025-01-06T09:00:00Z", "2025-01-08T17:00:00Z"),
            activity("PROJ-2", alice, "Medium", "In Progress", 3600, "2025-01-07T09:00:00Z", "2025-01-10T12:00:00Z"),
            activity("PROJ-3", bob, "High", "Done", 5400, "2025-01-13T10:00:00Z", "2025-01-15T16:00:00Z"),
            activity("PROJ-4", bob, "Low", "Open", 1800, "2025-01-14T11:00:00Z", "2025-01-20T09:00:00Z"),
        ]
    }
}
