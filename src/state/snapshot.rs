//! Node and reservation snapshots.
//!
//! Each poll replaces the whole snapshot. What the consumer sees is the diff
//! against the previous one:
//!
//! ```text
//! previous {A, B}   current {B, C}
//!   appeared:    [C]
//!   disappeared: [A]
//!   changed:     B if a tracked attribute differs
//!   unchanged:   B otherwise
//! ```
//!
//! Only the tracked attributes count as a change; load-like fields that move
//! every poll would otherwise make every entity "changed".

use super::{LastGood, Observed, StateManager};
use crate::{EntityKind, Error, FieldValue, Record, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Entities of one kind keyed by name.
pub type Snapshot = BTreeMap<String, Record>;

pub const NODE_TRACKED: &[&str] = &["state", "reason", "alloc_tres", "gres", "features"];
pub const RESERVATION_TRACKED: &[&str] = &["state", "nodes", "start_time", "end_time", "users", "accounts"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub field: String,
    pub before: Option<FieldValue>,
    pub after: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityChange {
    pub name: String,
    pub attributes: Vec<AttributeChange>,
}

/// Difference between two consecutive snapshots. All lists are sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    pub appeared: Vec<String>,
    pub disappeared: Vec<String>,
    pub changed: Vec<EntityChange>,
    pub unchanged: Vec<String>,
}

impl SnapshotDiff {
    /// True when nothing appeared, disappeared or changed.
    pub fn is_quiet(&self) -> bool {
        self.appeared.is_empty() && self.disappeared.is_empty() && self.changed.is_empty()
    }
}

/// Diffing state manager for nodes or reservations.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    kind: EntityKind,
    key_field: &'static str,
    tracked: &'static [&'static str],
    last: LastGood<Snapshot>,
}

impl SnapshotManager {
    pub fn new(kind: EntityKind, key_field: &'static str, tracked: &'static [&'static str]) -> Self {
        SnapshotManager { kind, key_field, tracked, last: LastGood::new() }
    }

    pub fn nodes() -> Self {
        Self::new(EntityKind::Node, "name", NODE_TRACKED)
    }

    pub fn reservations() -> Self {
        Self::new(EntityKind::Reservation, "name", RESERVATION_TRACKED)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn snapshot(&self) -> Option<Observed<'_, Snapshot>> {
        self.last.observed()
    }

    pub fn is_stale(&self) -> bool {
        self.last.is_stale()
    }

    fn build(&self, records: &[Record]) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        for record in records {
            let name = record
                .text(self.key_field)
                .ok_or_else(|| Error::MissingField { kind: self.kind, field: self.key_field.to_string() })?;
            snapshot.insert(name.to_string(), record.clone());
        }
        Ok(snapshot)
    }

    fn changes(&self, before: &Record, after: &Record) -> Vec<AttributeChange> {
        self.tracked
            .iter()
            .filter(|field| before.get(field) != after.get(field))
            .map(|field| AttributeChange {
                field: field.to_string(),
                before: before.get(field).cloned(),
                after: after.get(field).cloned(),
            })
            .collect()
    }

    fn diff(&self, current: &Snapshot) -> SnapshotDiff {
        let empty = Snapshot::new();
        let previous = self.last.get().unwrap_or(&empty);
        let mut diff = SnapshotDiff::default();

        for (name, record) in current {
            match previous.get(name) {
                None => diff.appeared.push(name.clone()),
                Some(before) => {
                    let attributes = self.changes(before, record);
                    if attributes.is_empty() {
                        diff.unchanged.push(name.clone());
                    } else {
                        diff.changed.push(EntityChange { name: name.clone(), attributes });
                    }
                }
            }
        }
        diff.disappeared = previous.keys().filter(|name| !current.contains_key(*name)).cloned().collect();
        diff
    }
}

impl StateManager for SnapshotManager {
    type Prepared = (Snapshot, SnapshotDiff);
    type Output = SnapshotDiff;

    fn prepare(&self, records: &[Record]) -> Result<Self::Prepared> {
        let snapshot = self.build(records)?;
        let diff = self.diff(&snapshot);
        Ok((snapshot, diff))
    }

    fn commit(&mut self, (snapshot, diff): Self::Prepared) -> SnapshotDiff {
        tracing::debug!(
            kind = %self.kind,
            entities = snapshot.len(),
            appeared = diff.appeared.len(),
            disappeared = diff.disappeared.len(),
            changed = diff.changed.len(),
            "snapshot replaced"
        );
        self.last.replace(snapshot);
        diff
    }

    fn mark_stale(&mut self) {
        self.last.mark_stale();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, state: &str) -> Record {
        vec![("name", FieldValue::Text(name.into())), ("state", FieldValue::Text(state.into()))].into_iter().collect()
    }

    #[test]
    fn first_poll_reports_everything_as_appeared() {
        let mut nodes = SnapshotManager::nodes();
        assert!(nodes.snapshot().is_none());

        let diff = nodes.update(&[node("A", "IDLE"), node("B", "IDLE")]).unwrap();
        assert_eq!(diff.appeared, vec!["A", "B"]);
        assert!(diff.disappeared.is_empty());
        assert_eq!(nodes.snapshot().unwrap().polls, 1);
    }

    #[test]
    fn node_diff_reports_appeared_disappeared_and_unchanged() {
        let mut nodes = SnapshotManager::nodes();
        nodes.update(&[node("A", "IDLE"), node("B", "MIXED")]).unwrap();

        let diff = nodes.update(&[node("B", "MIXED"), node("C", "IDLE")]).unwrap();
        assert_eq!(diff.appeared, vec!["C"]);
        assert_eq!(diff.disappeared, vec!["A"]);
        assert_eq!(diff.unchanged, vec!["B"]);
        assert!(diff.changed.is_empty());

        let snapshot = nodes.snapshot().unwrap();
        assert_eq!(snapshot.value.keys().collect::<Vec<_>>(), vec!["B", "C"]);
    }

    #[test]
    fn tracked_attribute_change_is_reported() {
        let mut nodes = SnapshotManager::nodes();
        nodes.update(&[node("A", "IDLE")]).unwrap();

        let mut drained = node("A", "DRAIN");
        drained.insert("reason", FieldValue::Text("maintenance".into()));
        let diff = nodes.update(&[drained]).unwrap();

        assert_eq!(diff.changed.len(), 1);
        let change = &diff.changed[0];
        assert_eq!(change.name, "A");
        assert_eq!(
            change.attributes,
            vec![
                AttributeChange {
                    field: "state".into(),
                    before: Some(FieldValue::Text("IDLE".into())),
                    after: Some(FieldValue::Text("DRAIN".into())),
                },
                AttributeChange {
                    field: "reason".into(),
                    before: None,
                    after: Some(FieldValue::Text("maintenance".into())),
                },
            ]
        );
    }

    #[test]
    fn untracked_attribute_change_is_ignored() {
        let mut nodes = SnapshotManager::nodes();
        let mut a = node("A", "IDLE");
        a.insert("memory", FieldValue::Text("1024".into()));
        nodes.update(&[a]).unwrap();

        let mut a = node("A", "IDLE");
        a.insert("memory", FieldValue::Text("2048".into()));
        let diff = nodes.update(&[a]).unwrap();
        assert!(diff.is_quiet());
        assert_eq!(diff.unchanged, vec!["A"]);
    }

    #[test]
    fn record_without_key_fails_and_keeps_previous_snapshot() {
        let mut nodes = SnapshotManager::nodes();
        nodes.update(&[node("A", "IDLE")]).unwrap();

        let nameless: Record = vec![("state", FieldValue::Text("IDLE".into()))].into_iter().collect();
        let err = nodes.update(&[node("B", "IDLE"), nameless]).unwrap_err();
        assert!(matches!(err, Error::MissingField { kind: EntityKind::Node, .. }));

        let snapshot = nodes.snapshot().unwrap();
        assert!(snapshot.stale);
        assert_eq!(snapshot.polls, 1);
        assert_eq!(snapshot.value.keys().collect::<Vec<_>>(), vec!["A"]);

        nodes.update(&[node("A", "IDLE")]).unwrap();
        assert!(!nodes.is_stale());
    }
}
