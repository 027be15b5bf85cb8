//! Admission predicates.
//!
//! A predicate is evaluated against the new state of an object and the last
//! state the loop saw. An event is admitted when either side matches, so a
//! loop hears both about an object entering its gate and about it leaving.
//! Deletions bypass predicates entirely.

use fivegc_core::conditions::status_of;
use fivegc_core::{ConditionStatus, Object};

/// Event admission rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Admit everything
    Always,
    /// Admit creations and spec changes only
    GenerationChanged,
    /// Admit when a condition has the given status
    Condition {
        /// Condition type
        type_: String,
        /// Required status
        status: ConditionStatus,
    },
    /// Admit when a condition is True or False
    ConditionKnown(String),
    /// Admit when a label has the given value
    Label {
        /// Label key
        key: String,
        /// Required value
        value: String,
    },
    /// Admit when any of the inner predicates admits
    Any(Vec<Predicate>),
}

impl Predicate {
    /// `Condition` shorthand
    pub fn condition(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Predicate::Condition {
            type_: type_.into(),
            status,
        }
    }

    /// `Condition{status: True}` shorthand
    pub fn condition_true(type_: impl Into<String>) -> Self {
        Self::condition(type_, ConditionStatus::True)
    }

    /// `ConditionKnown` shorthand
    pub fn condition_known(type_: impl Into<String>) -> Self {
        Predicate::ConditionKnown(type_.into())
    }

    /// `Label` shorthand
    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Label {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether a single object state satisfies the predicate
    pub fn matches(&self, object: &Object) -> bool {
        match self {
            Predicate::Always | Predicate::GenerationChanged => true,
            Predicate::Condition { type_, status } => {
                status_of(&object.conditions(), type_) == *status
            }
            Predicate::ConditionKnown(type_) => {
                status_of(&object.conditions(), type_).is_known()
            }
            Predicate::Label { key, value } => object.label(key) == Some(value.as_str()),
            Predicate::Any(inner) => inner.iter().any(|p| p.matches(object)),
        }
    }

    /// Whether a change from `old` to `new` should wake the loop
    pub fn admits(&self, new: &Object, old: Option<&Object>) -> bool {
        match self {
            Predicate::GenerationChanged => {
                old.map_or(true, |o| o.metadata.generation != new.metadata.generation)
            }
            Predicate::Any(inner) => inner.iter().any(|p| p.admits(new, old)),
            p => p.matches(new) || old.is_some_and(|o| p.matches(o)),
        }
    }
}
