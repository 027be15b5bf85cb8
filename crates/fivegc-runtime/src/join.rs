//! Correlation engine: routes watch events of every watched kind onto the
//! reconcile targets they affect.
//!
//! The index keeps, per loop, the last state seen of every watched object, the
//! set of known targets, the tombstones of deleted primaries that have not yet
//! been reconciled, and a reverse index from foreign keys to the targets that
//! reference them.

use crate::control_loop::{ControlLoop, Join, Target};
use fivegc_core::{EventType, Object, ObjectKey, WatchEvent};
use std::collections::{BTreeSet, HashMap};

/// Per-loop join state
#[derive(Debug, Default)]
pub struct JoinIndex {
    last_seen: HashMap<ObjectKey, Object>,
    targets: BTreeSet<ObjectKey>,
    tombstones: HashMap<ObjectKey, Object>,
    foreign: HashMap<ObjectKey, BTreeSet<ObjectKey>>,
    forward: HashMap<ObjectKey, Vec<ObjectKey>>,
}

impl JoinIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and return the targets it admits
    pub fn route(&mut self, spec: &ControlLoop, event: &WatchEvent) -> BTreeSet<ObjectKey> {
        let object = &event.object;
        let key = object.key();
        let deleted = event.event_type == EventType::Deleted;
        let old = if deleted {
            self.last_seen.remove(&key)
        } else {
            self.last_seen.insert(key.clone(), object.clone())
        };

        let mut out = BTreeSet::new();

        if let Target::Kind(primary) = &spec.target {
            if *primary == object.kind {
                if deleted {
                    self.tombstones.insert(key.clone(), object.clone());
                    out.insert(key.clone());
                } else {
                    self.tombstones.remove(&key);
                    self.targets.insert(key.clone());
                    self.index_foreign_keys(spec, object);
                    if spec.predicate.admits(object, old.as_ref()) {
                        out.insert(key.clone());
                    }
                }
            }
        }

        for input in spec.inputs.iter().filter(|i| i.kind == object.kind) {
            if !deleted && !input.predicate.admits(object, old.as_ref()) {
                continue;
            }
            match (&spec.target, &input.join) {
                (Target::Singleton(target), _) => {
                    out.insert(target.clone());
                }
                (Target::Kind(primary), Join::SameKey) => {
                    out.insert(key.with_kind(*primary));
                }
                (Target::Kind(_), Join::Singleton(singleton)) => {
                    if *singleton == key {
                        out.extend(self.targets.iter().cloned());
                    }
                }
                (Target::Kind(_), Join::ForeignKey(_)) => {
                    if let Some(targets) = self.foreign.get(&key) {
                        out.extend(targets.iter().cloned());
                    }
                }
                (Target::Kind(_), Join::Members) => {
                    out.extend(self.targets.iter().cloned());
                }
            }
        }

        out
    }

    fn index_foreign_keys(&mut self, spec: &ControlLoop, primary: &Object) {
        let key = primary.key();
        let fks: Vec<ObjectKey> = spec
            .inputs
            .iter()
            .filter_map(|input| match input.join {
                Join::ForeignKey(f) => f(primary),
                _ => None,
            })
            .collect();
        self.unindex(&key);
        for fk in &fks {
            self.foreign.entry(fk.clone()).or_default().insert(key.clone());
        }
        if !fks.is_empty() {
            self.forward.insert(key, fks);
        }
    }

    fn unindex(&mut self, target: &ObjectKey) {
        for fk in self.forward.remove(target).unwrap_or_default() {
            if let Some(targets) = self.foreign.get_mut(&fk) {
                targets.remove(target);
                if targets.is_empty() {
                    self.foreign.remove(&fk);
                }
            }
        }
    }

    /// Tombstone of a deleted primary awaiting its cascade
    pub fn tombstone(&self, target: &ObjectKey) -> Option<Object> {
        self.tombstones.get(target).cloned()
    }

    /// Forget a deleted target once its cascade reconciled successfully.
    /// Does nothing if the primary has been seen again since.
    pub fn settle(&mut self, target: &ObjectKey) {
        if self.last_seen.contains_key(target) || !self.tombstones.contains_key(target) {
            return;
        }
        self.tombstones.remove(target);
        self.targets.remove(target);
        self.unindex(target);
    }

    /// Objects of a kind last seen alive, used to synthesize deletions after a
    /// lagged watch
    pub fn seen_of_kind(&self, kind: fivegc_core::Kind) -> Vec<Object> {
        self.last_seen
            .values()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect()
    }

    /// Known targets
    pub fn targets(&self) -> impl Iterator<Item = &ObjectKey> {
        self.targets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_loop::{Input, Write};
    use crate::predicate::Predicate;
    use fivegc_core::Kind;
    use serde_json::json;

    fn noop(_: &crate::Inputs) -> Result<Vec<Write>, crate::TransformError> {
        Ok(vec![])
    }

    fn by_guti(obj: &Object) -> Option<ObjectKey> {
        obj.spec
            .get("guti")
            .and_then(|g| g.as_str())
            .map(|g| ObjectKey::new(Kind::UdmConfig, obj.namespace(), g))
    }

    fn obj(kind: Kind, ns: &str, name: &str, spec: serde_json::Value) -> Object {
        let mut o = Object::new(&ObjectKey::new(kind, ns, name));
        o.spec = spec;
        o.metadata.generation = 1;
        o
    }

    fn added(o: &Object) -> WatchEvent {
        WatchEvent::new(EventType::Added, o.clone())
    }

    #[test]
    fn same_key_routes_to_primary_kind() {
        let spec = ControlLoop::new("l", Target::Kind(Kind::Registration), noop)
            .with_input(Input::new(Kind::RegState, Join::SameKey));
        let mut idx = JoinIndex::new();
        let routed = idx.route(&spec, &added(&obj(Kind::RegState, "ns", "r", json!({}))));
        assert_eq!(
            routed.into_iter().collect::<Vec<_>>(),
            vec![ObjectKey::new(Kind::Registration, "ns", "r")]
        );
    }

    #[test]
    fn singleton_change_readmits_every_known_target() {
        let table = ObjectKey::cluster(Kind::PolicyTable, "policies");
        let spec = ControlLoop::new("l", Target::Kind(Kind::SessionContext), noop)
            .with_input(Input::new(Kind::PolicyTable, Join::Singleton(table.clone())));
        let mut idx = JoinIndex::new();
        idx.route(&spec, &added(&obj(Kind::SessionContext, "a", "s", json!({}))));
        idx.route(&spec, &added(&obj(Kind::SessionContext, "b", "s", json!({}))));

        let routed = idx.route(&spec, &added(&obj(Kind::PolicyTable, "", "policies", json!([]))));
        assert_eq!(routed.len(), 2);
        let other = idx.route(&spec, &added(&obj(Kind::PolicyTable, "", "other", json!([]))));
        assert!(other.is_empty());
    }

    #[test]
    fn foreign_key_reverse_index_follows_primary_changes() {
        let spec = ControlLoop::new("l", Target::Kind(Kind::RegState), noop)
            .with_input(Input::new(Kind::UdmConfig, Join::ForeignKey(by_guti)));
        let mut idx = JoinIndex::new();
        let reg = obj(Kind::RegState, "ns", "r", json!({"guti": "g1"}));
        idx.route(&spec, &added(&reg));

        let cfg = obj(Kind::UdmConfig, "ns", "g1", json!({}));
        assert_eq!(idx.route(&spec, &added(&cfg)).len(), 1);

        // the primary moves to a different GUTI
        let mut moved = reg.clone();
        moved.spec = json!({"guti": "g2"});
        moved.metadata.generation = 2;
        idx.route(&spec, &WatchEvent::new(EventType::Updated, moved));
        assert!(idx.route(&spec, &added(&cfg)).is_empty());
    }

    #[test]
    fn deletions_leave_a_tombstone_until_settled() {
        let spec = ControlLoop::new("l", Target::Kind(Kind::Registration), noop)
            .with_predicate(Predicate::GenerationChanged);
        let mut idx = JoinIndex::new();
        let reg = obj(Kind::Registration, "ns", "r", json!({"a": 1}));
        idx.route(&spec, &added(&reg));
        let routed = idx.route(&spec, &WatchEvent::new(EventType::Deleted, reg.clone()));
        assert_eq!(routed.len(), 1);
        assert_eq!(idx.tombstone(&reg.key()), Some(reg.clone()));

        idx.settle(&reg.key());
        assert_eq!(idx.tombstone(&reg.key()), None);
        assert_eq!(idx.targets().count(), 0);
    }

    #[test]
    fn settle_keeps_a_recreated_primary() {
        let spec = ControlLoop::new("l", Target::Kind(Kind::Registration), noop);
        let mut idx = JoinIndex::new();
        let reg = obj(Kind::Registration, "ns", "r", json!({}));
        idx.route(&spec, &added(&reg));
        idx.route(&spec, &WatchEvent::new(EventType::Deleted, reg.clone()));
        idx.route(&spec, &added(&reg));
        idx.settle(&reg.key());
        assert_eq!(idx.targets().count(), 1);
        assert_eq!(idx.tombstone(&reg.key()), None);
    }

    #[test]
    fn singleton_target_collects_member_events() {
        let table = ObjectKey::cluster(Kind::ActiveConfigTable, "active-configs");
        let spec = ControlLoop::new("l", Target::Singleton(table.clone()), noop)
            .with_input(Input::new(Kind::UpfConfig, Join::Members));
        let mut idx = JoinIndex::new();
        let routed = idx.route(&spec, &added(&obj(Kind::UpfConfig, "a", "b", json!({}))));
        assert_eq!(routed.into_iter().collect::<Vec<_>>(), vec![table]);
    }
}
