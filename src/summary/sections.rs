//! Optional named sections appended to a summary on request.

use crate::date_util::format_time_spent;
use crate::processor::ProcessingResult;

pub const PRIORITY_BREAKDOWN: &str = "priority_breakdown";
pub const STATUS_SUMMARY: &str = "status_summary";
pub const VELOCITY_ANALYSIS: &str = "velocity_analysis";
pub const TIME_ANALYSIS: &str = "time_analysis";

/// Render the section called `name`. Unknown names render a placeholder instead of failing.
pub fn render_section(name: &str, result: &ProcessingResult) -> String {
    match name {
        PRIORITY_BREAKDOWN => priority_breakdown(result),
        STATUS_SUMMARY => status_summary(result),
        VELOCITY_ANALYSIS => velocity_analysis(result),
        TIME_ANALYSIS => time_analysis(result),
        other => {
            log::warn!("requested unknown summary section: {other}");
            format!("Custom section '{other}' not implemented")
        }
    }
}

fn priority_breakdown(result: &ProcessingResult) -> String {
    let Some(priorities) = &result.priority_metrics else {
        return "Priority breakdown unavailable: activities were not grouped by priority.".into();
    };

    let mut rows: Vec<_> = priorities.values().collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.priority.cmp(&b.priority)));

    let mut lines = vec!["Priority breakdown:".to_string()];
    for p in rows {
        lines.push(format!(
            "- {}: {} activities, {:.1}% complete, {} logged",
            p.priority,
            p.count,
            p.completion_rate,
            format_time_spent(p.total_time_spent)
        ));
    }
    lines.join("\n")
}

fn status_summary(result: &ProcessingResult) -> String {
    let Some(statuses) = &result.status_metrics else {
        return "Status summary unavailable: activities were not grouped by status.".into();
    };

    let mut rows: Vec<_> = statuses.values().collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));

    let mut lines = vec!["Status summary:".to_string()];
    for s in rows {
        lines.push(format!(
            "- {}: {} activities across {} users ({} changed in the last 7 days)",
            s.status,
            s.count,
            s.users.len(),
            s.recent_changes
        ));
    }
    lines.join("\n")
}

fn velocity_analysis(result: &ProcessingResult) -> String {
    let Some(velocity) = &result.velocity_metrics else {
        return "Velocity analysis unavailable: velocity was not calculated.".into();
    };

    let mut lines = vec![
        format!(
            "Average velocity: {:.2} completions/day",
            velocity.average_velocity
        ),
        format!(
            "Current velocity: {:.2} completions/day",
            velocity.current_velocity
        ),
        format!("Burndown rate: {:.2}", velocity.burndown_rate),
    ];
    for (user_id, v) in &velocity.user_velocities {
        let name = result
            .user_metrics
            .as_ref()
            .and_then(|users| users.get(user_id))
            .map(|u| u.display_name.as_str())
            .unwrap_or(user_id.as_str());
        lines.push(format!("- {name}: {v:.2} completions/day"));
    }
    lines.join("\n")
}

fn time_analysis(result: &ProcessingResult) -> String {
    let summary = &result.summary;
    let mut lines = vec![
        format!(
            "Total time logged: {}",
            format_time_spent(summary.total_time_spent)
        ),
        format!(
            "Average per user: {}",
            format_time_spent(summary.average_time_per_user.round() as u64)
        ),
    ];

    if let Some(users) = &result.user_metrics {
        let mut rows: Vec<_> = users.values().collect();
        rows.sort_by(|a, b| b.total_time_spent.cmp(&a.total_time_spent));
        lines.push("Time by user:".into());
        for u in rows {
            lines.push(format!(
                "- {}: {} total, {} per task",
                u.display_name,
                format_time_spent(u.total_time_spent),
                format_time_spent(u.average_time_per_task.round() as u64)
            ));
        }
    }

    if let Some(priorities) = &result.priority_metrics {
        lines.push("Average time to complete by priority:".into());
        for p in priorities.values().filter(|p| p.completed_count > 0) {
            lines.push(format!(
                "- {}: {}",
                p.priority,
                format_time_spent(p.average_time_to_complete.round() as u64)
            ));
        }
    }
    lines.join("\n")
}
