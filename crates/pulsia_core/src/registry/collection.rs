//! Ordered, id-unique candidate collection.
//!
//! # Invariants
//! - At most one entry per `CandidateId`.
//! - Untouched entries keep their relative order across every mutation.
//! - New entries go to the front (most recent first, like the snapshot).

use crate::model::candidate::{Candidate, CandidateId};
use crate::model::change::ChangeEvent;
use crate::view::to_view_model;
use chrono::{DateTime, Utc};
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;

/// Effect one change had on the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Replaced,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateCollection {
    entries: Vec<Candidate>,
}

impl CandidateCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from snapshot order.
    ///
    /// A repeated id keeps its first (most recent) occurrence.
    pub fn from_snapshot(candidates: Vec<Candidate>) -> Self {
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut entries = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if seen.insert(candidate.id.clone()) {
                entries.push(candidate);
            } else {
                warn!(
                    "event=snapshot_load module=registry status=skip reason=duplicate_id candidate_id={}",
                    candidate.id
                );
            }
        }
        Self { entries }
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.position(id).map(|index| &self.entries[index])
    }

    pub fn position(&self, id: &CandidateId) -> Option<usize> {
        self.entries.iter().position(|candidate| &candidate.id == id)
    }

    pub fn ids(&self) -> Vec<CandidateId> {
        self.entries.iter().map(|candidate| candidate.id.clone()).collect()
    }

    /// Applies one change, mapping its record at `now`.
    ///
    /// - Insert of a present id replaces in place (duplicate delivery).
    /// - Update of an absent id prepends (missed creation).
    /// - Delete of an absent id is a no-op.
    pub fn apply(&mut self, event: ChangeEvent, now: DateTime<Utc>) -> ApplyOutcome {
        match event {
            ChangeEvent::Insert(record) | ChangeEvent::Update(record) => {
                let candidate = to_view_model(record, now);
                match self.position(&candidate.id) {
                    Some(index) => {
                        self.entries[index] = candidate;
                        ApplyOutcome::Replaced
                    }
                    None => {
                        self.entries.insert(0, candidate);
                        ApplyOutcome::Inserted
                    }
                }
            }
            ChangeEvent::Delete(id) => match self.position(&id) {
                Some(index) => {
                    self.entries.remove(index);
                    ApplyOutcome::Removed
                }
                None => ApplyOutcome::Unchanged,
            },
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Immutable copy handed to observers.
    pub fn to_shared(&self) -> Arc<[Candidate]> {
        Arc::from(self.entries.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplyOutcome, CandidateCollection};
    use crate::model::candidate::{CandidateId, CandidateRecord, CandidateStatus};
    use crate::model::change::ChangeEvent;
    use crate::view::to_view_model;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn record(id: &str, score: i64) -> CandidateRecord {
        let mut record =
            CandidateRecord::new(id, format!("Candidate {id}"), CandidateStatus::New, now());
        record.diagnostic_score = score;
        record
    }

    fn collection(ids: &[&str]) -> CandidateCollection {
        CandidateCollection::from_snapshot(
            ids.iter()
                .map(|id| to_view_model(record(id, 0), now()))
                .collect(),
        )
    }

    fn ids(collection: &CandidateCollection) -> Vec<String> {
        collection
            .ids()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    #[test]
    fn insert_prepends_new_entries() {
        let mut list = collection(&["1", "2"]);
        let outcome = list.apply(ChangeEvent::Insert(record("3", 0)), now());
        assert_eq!(outcome, ApplyOutcome::Inserted);
        assert_eq!(ids(&list), ["3", "1", "2"]);
    }

    #[test]
    fn update_replaces_in_place_with_mapped_record() {
        let mut list = collection(&["1", "2", "3"]);
        let mut updated = record("2", 91);
        updated.last_message_time = now() - Duration::minutes(5);

        let outcome = list.apply(ChangeEvent::Update(updated.clone()), now());
        assert_eq!(outcome, ApplyOutcome::Replaced);
        assert_eq!(list.position(&CandidateId::from("2")), Some(1));
        assert_eq!(list.as_slice()[1], to_view_model(updated, now()));
        assert_eq!(list.as_slice()[1].last_message_label, "5m ago");
    }

    #[test]
    fn update_for_unknown_id_inserts_at_front() {
        let mut list = collection(&["1"]);
        let outcome = list.apply(ChangeEvent::Update(record("9", 0)), now());
        assert_eq!(outcome, ApplyOutcome::Inserted);
        assert_eq!(ids(&list), ["9", "1"]);
    }

    #[test]
    fn duplicate_insert_equals_insert_then_update() {
        let mut twice = collection(&["1"]);
        twice.apply(ChangeEvent::Insert(record("2", 50)), now());
        twice.apply(ChangeEvent::Insert(record("2", 50)), now());

        let mut once_then_update = collection(&["1"]);
        once_then_update.apply(ChangeEvent::Insert(record("2", 50)), now());
        once_then_update.apply(ChangeEvent::Update(record("2", 50)), now());

        assert_eq!(twice, once_then_update);
        assert_eq!(ids(&twice), ["2", "1"]);
    }

    #[test]
    fn delete_of_missing_id_is_a_no_op() {
        let mut list = collection(&["1", "2"]);
        let before = list.clone();
        let outcome = list.apply(ChangeEvent::Delete(CandidateId::from("7")), now());
        assert_eq!(outcome, ApplyOutcome::Unchanged);
        assert_eq!(list, before);
    }

    #[test]
    fn delete_preserves_order_of_remaining_entries() {
        let mut list = collection(&["1", "2", "3", "4"]);
        list.apply(ChangeEvent::Delete(CandidateId::from("2")), now());
        assert_eq!(ids(&list), ["1", "3", "4"]);
    }

    #[test]
    fn snapshot_keeps_first_occurrence_of_repeated_id() {
        let list = collection(&["1", "2", "1"]);
        assert_eq!(ids(&list), ["1", "2"]);
    }

    #[test]
    fn arbitrary_event_sequences_keep_one_entry_per_live_id() {
        let script: &[(&str, &str)] = &[
            ("insert", "a"),
            ("insert", "b"),
            ("update", "c"),
            ("insert", "a"),
            ("delete", "b"),
            ("delete", "b"),
            ("update", "a"),
            ("insert", "d"),
            ("delete", "c"),
            ("insert", "b"),
        ];
        let mut list = CandidateCollection::new();
        let mut live = std::collections::BTreeSet::new();
        for (op, id) in script {
            let event = match *op {
                "insert" => ChangeEvent::Insert(record(id, 0)),
                "update" => ChangeEvent::Update(record(id, 0)),
                _ => ChangeEvent::Delete(CandidateId::from(*id)),
            };
            list.apply(event, now());
            if *op == "delete" {
                live.remove(*id);
            } else {
                live.insert(*id);
            }
        }

        let mut present = ids(&list);
        let len = present.len();
        present.sort();
        present.dedup();
        assert_eq!(present.len(), len, "ids must be unique");
        assert_eq!(present, live.into_iter().collect::<Vec<_>>());
        assert_eq!(ids(&list), ["b", "d", "a"]);
    }
}
