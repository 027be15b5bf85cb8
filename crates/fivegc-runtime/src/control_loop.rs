//! Control loop declarations: what a loop watches, how inputs correlate with
//! the reconcile target, and the pure transform that turns inputs into writes.

use crate::error::TransformError;
use crate::predicate::Predicate;
use fivegc_core::{Kind, Object, ObjectKey};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps a primary object onto the key of a joined object
pub type KeyFn = fn(&Object) -> Option<ObjectKey>;

/// Pure transform from loaded inputs to store writes
pub type TransformFn = Arc<dyn Fn(&Inputs) -> Result<Vec<Write>, TransformError> + Send + Sync>;

/// What a loop reconciles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One reconcile per object of this kind
    Kind(Kind),
    /// A single fixed object, e.g. an aggregate table
    Singleton(ObjectKey),
}

/// How an input correlates with the target
#[derive(Clone)]
pub enum Join {
    /// Same namespace and name as the target
    SameKey,
    /// A fixed object; a change re-admits every known target
    Singleton(ObjectKey),
    /// Key computed from the primary object
    ForeignKey(KeyFn),
    /// Every live object of the kind
    Members,
}

impl fmt::Debug for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Join::SameKey => f.write_str("SameKey"),
            Join::Singleton(key) => write!(f, "Singleton({key})"),
            Join::ForeignKey(_) => f.write_str("ForeignKey"),
            Join::Members => f.write_str("Members"),
        }
    }
}

/// A watched input besides the primary
#[derive(Debug, Clone)]
pub struct Input {
    /// Watched kind
    pub kind: Kind,
    /// Correlation with the target
    pub join: Join,
    /// Event admission for this input
    pub predicate: Predicate,
}

impl Input {
    /// Input admitting every event
    pub fn new(kind: Kind, join: Join) -> Self {
        Self {
            kind,
            join,
            predicate: Predicate::Always,
        }
    }

    /// Restrict admission
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }
}

/// A declared reconciler
#[derive(Clone)]
pub struct ControlLoop {
    /// Unique loop name, used in logs and error reports
    pub name: String,
    /// Reconcile target
    pub target: Target,
    /// Admission for events on the primary kind
    pub predicate: Predicate,
    /// Joined inputs
    pub inputs: Vec<Input>,
    /// The reconcile body
    pub transform: TransformFn,
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("predicate", &self.predicate)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

impl ControlLoop {
    /// Declare a loop
    pub fn new<F>(name: impl Into<String>, target: Target, transform: F) -> Self
    where
        F: Fn(&Inputs) -> Result<Vec<Write>, TransformError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            target,
            predicate: Predicate::Always,
            inputs: Vec::new(),
            transform: Arc::new(transform),
        }
    }

    /// Set the primary predicate
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Add a joined input
    pub fn with_input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    /// Kind of per-object targets, if any
    pub fn primary_kind(&self) -> Option<Kind> {
        match &self.target {
            Target::Kind(kind) => Some(*kind),
            Target::Singleton(_) => None,
        }
    }

    /// Every kind the loop subscribes to, primary first
    pub fn watched_kinds(&self) -> Vec<Kind> {
        let mut kinds: Vec<Kind> = self.primary_kind().into_iter().collect();
        for input in &self.inputs {
            if !kinds.contains(&input.kind) {
                kinds.push(input.kind);
            }
        }
        kinds
    }

    /// Run the transform
    pub fn reconcile(&self, inputs: &Inputs) -> Result<Vec<Write>, TransformError> {
        (self.transform)(inputs)
    }
}

/// Loaded joined input
#[derive(Debug, Clone, PartialEq)]
pub enum Joined {
    /// Result of a `SameKey`, `Singleton` or `ForeignKey` join
    One(Option<Object>),
    /// Result of a `Members` join
    Many(Vec<Object>),
}

/// Point-in-time view handed to a transform
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    /// Reconcile target
    pub target: ObjectKey,
    /// Current primary (or singleton) object; absent after deletion
    pub primary: Option<Object>,
    /// Last state of a deleted primary, for cascades
    pub tombstone: Option<Object>,
    joined: HashMap<Kind, Joined>,
}

impl Inputs {
    /// Empty inputs for a target
    pub fn new(target: ObjectKey) -> Self {
        Self {
            target,
            primary: None,
            tombstone: None,
            joined: HashMap::new(),
        }
    }

    /// Set the primary
    pub fn with_primary(mut self, primary: Option<Object>) -> Self {
        self.primary = primary;
        self
    }

    /// Set the tombstone
    pub fn with_tombstone(mut self, tombstone: Option<Object>) -> Self {
        self.tombstone = tombstone;
        self
    }

    /// Attach a single joined object
    pub fn with_one(mut self, kind: Kind, object: Option<Object>) -> Self {
        self.joined.insert(kind, Joined::One(object));
        self
    }

    /// Attach a member list
    pub fn with_many(mut self, kind: Kind, objects: Vec<Object>) -> Self {
        self.joined.insert(kind, Joined::Many(objects));
        self
    }

    /// Joined object of a kind, absent when not (yet) available
    pub fn one(&self, kind: Kind) -> Option<&Object> {
        match self.joined.get(&kind) {
            Some(Joined::One(obj)) => obj.as_ref(),
            _ => None,
        }
    }

    /// Joined members of a kind
    pub fn many(&self, kind: Kind) -> &[Object] {
        match self.joined.get(&kind) {
            Some(Joined::Many(objs)) => objs,
            _ => &[],
        }
    }

    /// The primary, or its tombstone when deleted
    pub fn primary_or_tombstone(&self) -> Option<&Object> {
        self.primary.as_ref().or(self.tombstone.as_ref())
    }
}

/// A store mutation produced by a transform
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create (resource version 0) or optimistic update
    Apply(Object),
    /// Merge patch; a missing object is not an error
    Patch {
        /// Object to patch
        key: ObjectKey,
        /// RFC 7386 patch
        patch: Value,
    },
    /// Delete; a missing object is not an error
    Delete(ObjectKey),
}

impl Write {
    /// Key the write touches
    pub fn key(&self) -> ObjectKey {
        match self {
            Write::Apply(obj) => obj.key(),
            Write::Patch { key, .. } | Write::Delete(key) => key.clone(),
        }
    }
}
