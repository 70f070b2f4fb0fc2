//! Windowed trend detection, weekday seasonality and per-user velocity.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};

use super::types::{TimeRange, TimeRangeMetrics, TrendAnalysis, TrendDirection, VelocityMetrics};
use super::{completion_rate, productivity_score};
use crate::activity::Activity;
use crate::date_util::{days_between, weekday_name};

/// Length of auto-generated trend windows.
pub const WINDOW_DAYS: i64 = 7;

/// Relative change between the two halves of a series needed to call a trend.
pub const TREND_THRESHOLD: f64 = 0.10;

/// Burndown rate reported with velocity metrics. Sprint boundaries are not
/// part of the input, so this is a fixed value rather than a computation.
pub const DEFAULT_BURNDOWN_RATE: f64 = 0.8;

/// Compute per-window metrics, trend directions and weekday seasonality.
///
/// An activity belongs to a window when it was created at or after the
/// window start and last updated at or before the window end, so windows can
/// overlap in membership and their counts need not sum to the total.
pub fn analyze_trends(activities: &[&Activity], custom_ranges: &[TimeRange]) -> TrendAnalysis {
    let ranges = if custom_ranges.is_empty() {
        weekly_ranges(activities)
    } else {
        custom_ranges.to_vec()
    };

    let time_ranges: Vec<TimeRangeMetrics> = ranges
        .iter()
        .map(|range| window_metrics(activities, range))
        .collect();

    let counts: Vec<f64> = time_ranges.iter().map(|w| w.activity_count as f64).collect();
    let velocities: Vec<f64> = time_ranges.iter().map(|w| w.velocity).collect();
    let scores: Vec<f64> = time_ranges.iter().map(|w| w.productivity_score).collect();

    log::debug!("trend analysis over {} windows", time_ranges.len());

    TrendAnalysis {
        overall_trend: trend_direction(&counts),
        velocity_trend: trend_direction(&velocities),
        productivity_trend: trend_direction(&scores),
        seasonality: seasonality(activities),
        time_ranges,
    }
}

/// Consecutive seven-day windows from the earliest creation to the latest
/// update. The last window is clipped to the overall end.
pub fn weekly_ranges(activities: &[&Activity]) -> Vec<TimeRange> {
    let start = activities.iter().map(|a| a.created).min();
    let end = activities.iter().map(|a| a.updated).max();
    let (Some(start), Some(end)) = (start, end) else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let window_end = (cursor + Duration::days(WINDOW_DAYS)).min(end);
        ranges.push(TimeRange {
            start: cursor,
            end: window_end,
            label: format!("Week {}", ranges.len() + 1),
        });
        cursor += Duration::days(WINDOW_DAYS);
    }
    ranges
}

fn window_metrics(activities: &[&Activity], range: &TimeRange) -> TimeRangeMetrics {
    let members: Vec<&Activity> = activities
        .iter()
        .copied()
        .filter(|a| in_window(a, range.start, range.end))
        .collect();

    let completed = members.iter().filter(|a| a.is_completed()).count();
    let rate = completion_rate(completed, members.len());
    let days = days_between(range.start, range.end);
    let velocity = if days > 0.0 {
        completed as f64 / days
    } else {
        0.0
    };

    TimeRangeMetrics {
        label: range.label.clone(),
        start: range.start,
        end: range.end,
        activity_count: members.len(),
        completed_count: completed,
        total_time_spent: members.iter().map(|a| a.time_spent).sum(),
        velocity,
        productivity_score: productivity_score(&members, rate),
    }
}

fn in_window(activity: &Activity, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    activity.created >= start && activity.updated <= end
}

/// Compare the mean of the second half of `values` against the first half.
///
/// Fewer than two points is always stable.
pub fn trend_direction(values: &[f64]) -> TrendDirection {
    if values.len() < 2 {
        return TrendDirection::Stable;
    }
    let mid = values.len() / 2;
    let first = mean(&values[..mid]);
    let second = mean(&values[mid..]);

    if second > first * (1.0 + TREND_THRESHOLD) {
        TrendDirection::Increasing
    } else if second < first * (1.0 - TREND_THRESHOLD) {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Completion ratio per weekday of creation. Days with no activities are omitted.
pub fn seasonality(activities: &[&Activity]) -> BTreeMap<String, f64> {
    let mut per_day: BTreeMap<&'static str, (usize, usize)> = BTreeMap::new();
    for a in activities {
        let entry = per_day.entry(weekday_name(a.created.weekday())).or_insert((0, 0));
        entry.0 += 1;
        if a.is_completed() {
            entry.1 += 1;
        }
    }
    per_day
        .into_iter()
        .map(|(day, (total, completed))| (day.to_string(), completed as f64 / total as f64))
        .collect()
}

/// Completions per day for each user over their own created-to-updated span.
///
/// Users whose span is zero are reported with a velocity of 0 and left out
/// of the average.
pub fn compute_velocity(activities: &[&Activity]) -> VelocityMetrics {
    let mut spans: BTreeMap<&str, (DateTime<Utc>, DateTime<Utc>, usize)> = BTreeMap::new();
    for a in activities {
        let completed = usize::from(a.is_completed());
        spans
            .entry(a.assignee.id.as_str())
            .and_modify(|(first, last, done)| {
                *first = (*first).min(a.created);
                *last = (*last).max(a.updated);
                *done += completed;
            })
            .or_insert((a.created, a.updated, completed));
    }

    let mut user_velocities = BTreeMap::new();
    let mut measured = Vec::new();
    for (user_id, (first, last, done)) in spans {
        let days = days_between(first, last);
        let velocity = if days > 0.0 {
            let v = done as f64 / days;
            measured.push(v);
            v
        } else {
            0.0
        };
        user_velocities.insert(user_id.to_string(), velocity);
    }

    let average_velocity = mean(&measured);
    VelocityMetrics {
        average_velocity,
        current_velocity: average_velocity,
        burndown_rate: DEFAULT_BURNDOWN_RATE,
        user_velocities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::fixtures::*;

    fn refs(activities: &[Activity]) -> Vec<&Activity> {
        activities.iter().collect()
    }

    #[test]
    fn test_weekly_ranges_cover_span() {
        let team = two_user_team();
        let ranges = weekly_ranges(&refs(&team));
        // Jan 6 09:00 through Jan 20 09:00 is exactly two weeks.
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].label, "Week 1");
        assert_eq!(ranges[0].start, ts("2025-01-06T09:00:00Z"));
        assert_eq!(ranges[0].end, ts("2025-01-13T09:00:00Z"));
        assert_eq!(ranges[1].label, "Week 2");
        assert_eq!(ranges[1].end, ts("2025-01-20T09:00:00Z"));
    }

    #[test]
    fn test_weekly_ranges_clip_last_window() {
        let a = activity("PROJ-1", ("u1", "A"), "Low", "Done", 0, "2025-01-01T00:00:00Z", "2025-01-10T00:00:00Z");
        let ranges = weekly_ranges(&[&a]);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].start, ts("2025-01-08T00:00:00Z"));
        assert_eq!(ranges[1].end, ts("2025-01-10T00:00:00Z"));
    }

    #[test]
    fn test_weekly_ranges_empty() {
        assert!(weekly_ranges(&[]).is_empty());
    }

    #[test]
    fn test_window_membership_is_inclusive() {
        let team = two_user_team();
        let analysis = analyze_trends(&refs(&team), &[]);
        let week1 = &analysis.time_ranges[0];
        // PROJ-1 and PROJ-2 fit inside week 1; PROJ-3/4 start after it.
        assert_eq!(week1.activity_count, 2);
        assert_eq!(week1.completed_count, 1);
        assert_eq!(week1.total_time_spent, 10_800);
        assert_eq!(week1.velocity, 1.0 / 7.0);

        let week2 = &analysis.time_ranges[1];
        // PROJ-4 ends exactly at the window end and is included.
        assert_eq!(week2.activity_count, 2);
    }

    #[test]
    fn test_activity_can_land_in_overlapping_custom_windows() {
        let a = activity("PROJ-1", ("u1", "A"), "Low", "Done", 0, "2025-01-05T00:00:00Z", "2025-01-06T00:00:00Z");
        let ranges = vec![
            TimeRange {
                start: ts("2025-01-01T00:00:00Z"),
                end: ts("2025-01-06T00:00:00Z"),
                label: "first".into(),
            },
            TimeRange {
                start: ts("2025-01-05T00:00:00Z"),
                end: ts("2025-01-10T00:00:00Z"),
                label: "second".into(),
            },
            TimeRange {
                start: ts("2025-01-06T00:00:00Z"),
                end: ts("2025-01-10T00:00:00Z"),
                label: "third".into(),
            },
        ];
        let analysis = analyze_trends(&[&a], &ranges);
        let counts: Vec<usize> = analysis.time_ranges.iter().map(|w| w.activity_count).collect();
        assert_eq!(counts, vec![1, 1, 0]);
        assert_eq!(analysis.time_ranges[2].label, "third");
    }

    #[test]
    fn test_zero_length_window_has_zero_velocity() {
        let a = activity("PROJ-1", ("u1", "A"), "Low", "Done", 0, "2025-01-05T00:00:00Z", "2025-01-05T00:00:00Z");
        let ranges = vec![TimeRange {
            start: ts("2025-01-05T00:00:00Z"),
            end: ts("2025-01-05T00:00:00Z"),
            label: "instant".into(),
        }];
        let analysis = analyze_trends(&[&a], &ranges);
        assert_eq!(analysis.time_ranges[0].completed_count, 1);
        assert_eq!(analysis.time_ranges[0].velocity, 0.0);
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(trend_direction(&[]), TrendDirection::Stable);
        assert_eq!(trend_direction(&[5.0]), TrendDirection::Stable);
        assert_eq!(trend_direction(&[1.0, 2.0]), TrendDirection::Increasing);
        assert_eq!(trend_direction(&[2.0, 1.0]), TrendDirection::Decreasing);
        assert_eq!(trend_direction(&[10.0, 10.5]), TrendDirection::Stable);
        assert_eq!(trend_direction(&[0.0, 0.0, 0.0]), TrendDirection::Stable);
        assert_eq!(trend_direction(&[0.0, 1.0]), TrendDirection::Increasing);
        // Odd length: first half is [4], second half is [4, 6].
        assert_eq!(trend_direction(&[4.0, 4.0, 6.0]), TrendDirection::Increasing);
    }

    #[test]
    fn test_single_window_is_stable() {
        let a = activity("PROJ-1", ("u1", "A"), "Low", "Done", 0, "2025-01-01T00:00:00Z", "2025-01-03T00:00:00Z");
        let analysis = analyze_trends(&[&a], &[]);
        assert_eq!(analysis.time_ranges.len(), 1);
        assert_eq!(analysis.overall_trend, TrendDirection::Stable);
        assert_eq!(analysis.velocity_trend, TrendDirection::Stable);
        assert_eq!(analysis.productivity_trend, TrendDirection::Stable);
    }

    #[test]
    fn test_seasonality_omits_empty_days() {
        let team = two_user_team();
        let season = seasonality(&refs(&team));
        // Created on Mon Jan 6, Tue Jan 7, Mon Jan 13, Tue Jan 14.
        assert_eq!(season.len(), 2);
        assert_eq!(season["Monday"], 1.0);
        assert_eq!(season["Tuesday"], 0.0);
        assert!(!season.contains_key("Friday"));
    }

    #[test]
    fn test_velocity_per_user() {
        let team = two_user_team();
        let velocity = compute_velocity(&refs(&team));
        // Alice: Jan 6 09:00 -> Jan 10 12:00, 1 completion.
        let alice_days = days_between(ts("2025-01-06T09:00:00Z"), ts("2025-01-10T12:00:00Z"));
        assert_eq!(velocity.user_velocities["u1"], 1.0 / alice_days);
        assert_eq!(velocity.user_velocities.len(), 2);
        assert_eq!(velocity.current_velocity, velocity.average_velocity);
        assert_eq!(velocity.burndown_rate, DEFAULT_BURNDOWN_RATE);
    }

    #[test]
    fn test_velocity_skips_zero_span_users_in_average() {
        let a = activity("PROJ-1", ("u1", "A"), "Low", "Done", 0, "2025-01-01T00:00:00Z", "2025-01-03T00:00:00Z");
        let b = activity("PROJ-2", ("u2", "B"), "Low", "Done", 0, "2025-01-05T00:00:00Z", "2025-01-05T00:00:00Z");
        let velocity = compute_velocity(&[&a, &b]);
        assert_eq!(velocity.user_velocities["u2"], 0.0);
        assert_eq!(velocity.average_velocity, 0.5);
    }
}
