//! Flight recorder: the append-only log of oracle labels

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Labels of one iteration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub accept: BTreeSet<String>,
    pub reject: BTreeSet<String>,
    pub implicit_reject: BTreeSet<String>,
}

static EMPTY_RECORD: Record = Record {
    accept: BTreeSet::new(),
    reject: BTreeSet::new(),
    implicit_reject: BTreeSet::new(),
};

impl Record {
    pub fn new<A, R, I>(accept: A, reject: R, implicit_reject: I) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            accept: accept.into_iter().map(Into::into).collect(),
            reject: reject.into_iter().map(Into::into).collect(),
            implicit_reject: implicit_reject.into_iter().map(Into::into).collect(),
        }
    }

    /// True when nothing was accepted or rejected explicitly
    pub fn has_no_feedback(&self) -> bool {
        self.accept.is_empty() && self.reject.is_empty()
    }

    /// Every concept labelled in this record
    pub fn labeled(&self) -> impl Iterator<Item = &str> {
        self.accept
            .iter()
            .chain(&self.reject)
            .chain(&self.implicit_reject)
            .map(String::as_str)
    }

    fn absorb(&mut self, other: &Record) {
        self.accept.extend(other.accept.iter().cloned());
        self.reject.extend(other.reject.iter().cloned());
        self.implicit_reject.extend(other.implicit_reject.iter().cloned());
    }
}

/// Label state after resolving contradictions: the latest label wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveLabels {
    pub accepted: BTreeSet<String>,
    pub rejected: BTreeSet<String>,
}

/// Ordered records plus their running union.
///
/// The union is raw: a concept accepted in one record and rejected in a
/// later one appears in both `union().accept` and `union().reject`. Use
/// [`FlightRecorder::effective_labels`] for the resolved view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecorder {
    records: Vec<Record>,
    total: Record,
}

impl FlightRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a recorder from its records
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut recorder = Self::new();
        for record in records {
            recorder.add_record(record);
        }
        recorder
    }

    /// Append one iteration's labels
    pub fn record<A, R, I>(&mut self, accept: A, reject: R, implicit_reject: I)
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.add_record(Record::new(accept, reject, implicit_reject));
    }

    pub fn add_record(&mut self, record: Record) {
        self.total.absorb(&record);
        self.records.push(record);
    }

    /// The most recent record, or an empty one before the first iteration
    pub fn latest(&self) -> &Record {
        self.records.last().unwrap_or(&EMPTY_RECORD)
    }

    /// Cumulative labels over all records
    pub fn union(&self) -> &Record {
        &self.total
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.total = Record::default();
    }

    /// Concepts that were ever accepted or rejected explicitly
    pub fn feedback_concepts(&self) -> FxHashSet<&str> {
        self.total
            .accept
            .iter()
            .chain(&self.total.reject)
            .map(String::as_str)
            .collect()
    }

    /// Concepts carrying any label, implicit rejections included
    pub fn labeled_concepts(&self) -> FxHashSet<&str> {
        self.total.labeled().collect()
    }

    /// Replay the records, letting each label override earlier ones.
    ///
    /// Implicit rejections count as rejections.
    pub fn effective_labels(&self) -> EffectiveLabels {
        let mut labels = EffectiveLabels::default();
        for record in &self.records {
            for concept in &record.accept {
                labels.rejected.remove(concept);
                labels.accepted.insert(concept.clone());
            }
            for concept in record.reject.iter().chain(&record.implicit_reject) {
                labels.accepted.remove(concept);
                labels.rejected.insert(concept.clone());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_and_union() {
        let mut recorder = FlightRecorder::new();
        assert!(recorder.latest().has_no_feedback());
        assert!(recorder.is_empty());

        recorder.record(["a"], ["c"], Vec::<String>::new());
        recorder.record(["b"], Vec::<String>::new(), ["d"]);

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.latest().accept, BTreeSet::from(["b".to_string()]));
        let union = recorder.union();
        assert_eq!(union.accept.len(), 2);
        assert_eq!(union.reject.len(), 1);
        assert_eq!(union.implicit_reject.len(), 1);
        assert_eq!(recorder.feedback_concepts().len(), 3);
        assert_eq!(recorder.labeled_concepts().len(), 4);
    }

    #[test]
    fn test_contradiction_last_label_wins() {
        let mut recorder = FlightRecorder::new();
        recorder.record(["a", "b"], ["c"], Vec::<String>::new());
        recorder.record(["c"], ["a"], Vec::<String>::new());

        let union = recorder.union();
        assert!(union.accept.contains("a") && union.reject.contains("a"));

        let labels = recorder.effective_labels();
        assert_eq!(
            labels.accepted,
            BTreeSet::from(["b".to_string(), "c".to_string()])
        );
        assert_eq!(labels.rejected, BTreeSet::from(["a".to_string()]));
    }

    #[test]
    fn test_from_records_and_clear() {
        let records = vec![
            Record::new(["a"], ["b"], Vec::<String>::new()),
            Record::new(Vec::<String>::new(), Vec::<String>::new(), ["x"]),
        ];
        let mut recorder = FlightRecorder::from_records(records.clone());
        assert_eq!(recorder.records(), records.as_slice());
        assert!(recorder.latest().has_no_feedback());
        assert_eq!(recorder.union().implicit_reject.len(), 1);

        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.union().accept.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut recorder = FlightRecorder::new();
        recorder.record(["a"], ["b"], ["c"]);
        let json = serde_json::to_string(&recorder).unwrap();
        let back: FlightRecorder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recorder);
    }
}
