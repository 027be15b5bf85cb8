//! Status conditions: named, timestamped tri-states with a machine reason.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
    /// Not yet known, usually because a joined input is absent
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// True or False
    pub fn is_known(&self) -> bool {
        !matches!(self, ConditionStatus::Unknown)
    }

    /// Map a boolean onto True/False
    pub fn from_bool(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        })
    }
}

/// One entry of `status.conditions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition name, unique within a status
    #[serde(rename = "type")]
    pub type_: String,
    /// Current status
    pub status: ConditionStatus,
    /// Machine-readable reason
    #[serde(default)]
    pub reason: String,
    /// Human-readable detail
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// When `status` last changed
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Build a condition stamped with the current time (second precision)
    pub fn new(type_: impl Into<String>, status: ConditionStatus, reason: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: String::new(),
            last_transition_time: Utc::now().trunc_subsecs(0),
        }
    }

    /// Attach a message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// True when the status is `True`
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Find a condition by type
pub fn find<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Status of a condition, `Unknown` when absent
pub fn status_of(conditions: &[Condition], type_: &str) -> ConditionStatus {
    find(conditions, type_).map_or(ConditionStatus::Unknown, |c| c.status)
}

/// Insert or replace a condition keyed by type.
///
/// When the status is unchanged the previous `lastTransitionTime` is kept, so
/// repeated evaluation with the same inputs yields identical documents.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Remove a condition by type
pub fn remove_condition(conditions: &mut Vec<Condition>, type_: &str) {
    conditions.retain(|c| c.type_ != type_);
}

/// Aggregate named sub-conditions into a single status: True iff all True,
/// False if any False, otherwise Unknown.
pub fn aggregate(conditions: &[Condition], types: &[&str]) -> ConditionStatus {
    let statuses: Vec<_> = types.iter().map(|t| status_of(conditions, t)).collect();
    if statuses.iter().all(|s| *s == ConditionStatus::True) {
        ConditionStatus::True
    } else if statuses.contains(&ConditionStatus::False) {
        ConditionStatus::False
    } else {
        ConditionStatus::Unknown
    }
}
