//! Turns raw exported records into [`Activity`] values, rejecting anything
//! the aggregator cannot trust.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::activity::{Activity, Assignee};
use crate::date_util::parse_timestamp;
use crate::error::{Error, Result};

static RE_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+-\d+$").unwrap());

/// Priorities accepted on import. An empty priority is also accepted.
pub const ALLOWED_PRIORITIES: [&str; 7] =
    ["Highest", "Critical", "High", "Medium", "Low", "Lowest", "None"];

/// An activity record as it appears in an export file, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActivity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub time_spent: Option<f64>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub assignee: Option<RawAssignee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssignee {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Validate one raw record. The first violated rule is reported.
pub fn validate_activity(raw: RawActivity) -> Result<Activity> {
    if raw.id.trim().is_empty() {
        return Err(Error::validation("id", "must not be empty"));
    }
    if !RE_KEY.is_match(&raw.key) {
        return Err(Error::validation(
            "key",
            format!("'{}' does not look like PROJECT-123", raw.key),
        ));
    }

    let priority = raw.priority.unwrap_or_default();
    if !priority.is_empty() && !ALLOWED_PRIORITIES.contains(&priority.as_str()) {
        return Err(Error::validation(
            "priority",
            format!("'{priority}' is not one of {}", ALLOWED_PRIORITIES.join(", ")),
        ));
    }

    let time_spent = match raw.time_spent {
        None => 0,
        Some(t) if t.is_finite() && t >= 0.0 => t.round() as u64,
        Some(t) => {
            return Err(Error::validation(
                "time_spent",
                format!("must be a non-negative number of seconds, got {t}"),
            ))
        }
    };

    let created = parse_timestamp(&raw.created).ok_or_else(|| {
        Error::validation("created", format!("unparseable timestamp '{}'", raw.created))
    })?;
    let updated = parse_timestamp(&raw.updated).ok_or_else(|| {
        Error::validation("updated", format!("unparseable timestamp '{}'", raw.updated))
    })?;
    if updated < created {
        return Err(Error::validation(
            "updated",
            format!("{updated} is before created {created}"),
        ));
    }

    let assignee = match raw.assignee {
        Some(a) if !a.id.trim().is_empty() => {
            let display_name = a
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| a.id.clone());
            Assignee::new(a.id, display_name)
        }
        _ => Assignee::unassigned(),
    };

    Ok(Activity {
        id: raw.id,
        key: raw.key,
        summary: raw.summary.unwrap_or_default(),
        priority,
        status: raw.status.unwrap_or_default(),
        time_spent,
        created,
        updated,
        assignee,
    })
}

/// Parse and validate a single JSON value.
pub fn validate_value(value: serde_json::Value) -> Result<Activity> {
    let raw: RawActivity = serde_json::from_value(value)?;
    validate_activity(raw)
}
