use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::get_timezone;

/// Priority the service assigns when none is given.
pub const DEFAULT_PRIORITY: &str = "Medium";

/// Server-assigned identifier. The service hands out integers today but the
/// client never interprets it beyond putting it back into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => TaskId(n.to_string()),
            Raw::Text(s) => TaskId(s),
        })
    }
}

/// A task as last reported by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(rename = "estimatedHours")]
    pub estimated_hours: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub priority: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    /// A task is overdue when it has a parseable deadline strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline
            .as_deref()
            .and_then(parse_deadline)
            .map(|deadline| deadline < now)
            .unwrap_or(false)
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

/// Parse a deadline the way users and the service write them. Values without an
/// offset are read in the configured timezone; a bare date means local midnight.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })?;

    get_timezone()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task name is required!")]
    EmptyName,
    #[error("Hours must be greater than zero!")]
    NonPositiveHours,
}

/// Raw add-task input as typed into the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub estimated_hours: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub priority: String,
}

impl TaskForm {
    /// Check the form and turn it into a draft. The name rule is checked first.
    pub fn validate(&self) -> Result<TaskDraft, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let hours: f64 = self
            .estimated_hours
            .trim()
            .parse()
            .map_err(|_| ValidationError::NonPositiveHours)?;
        if !hours.is_finite() || hours <= 0.0 {
            return Err(ValidationError::NonPositiveHours);
        }

        let priority = match self.priority.trim() {
            "" => DEFAULT_PRIORITY.to_string(),
            p => p.to_string(),
        };

        Ok(TaskDraft {
            name: name.to_string(),
            estimated_hours: hours,
            deadline: Some(self.deadline.trim().to_string()).filter(|d| !d.is_empty()),
            priority,
        })
    }
}

/// A validated task that has not been submitted yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    pub name: String,
    #[serde(rename = "estimatedHours")]
    pub estimated_hours: f64,
    #[serde(serialize_with = "none_as_empty")]
    pub deadline: Option<String>,
    pub priority: String,
}

fn none_as_empty<S: serde::Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.as_deref().unwrap_or(""))
}
