//! # Export History
//!
//! A newest-first list of exported cards with a fixed capacity. Appending
//! beyond capacity evicts the oldest records. Records are never edited:
//! [`HistoryRing::get`] hands out a copy, so installing a record as the
//! draft and editing it leaves the stored record as it was.

use crate::model::{HistoryCardRecord, clamp_chars};
use chrono::{DateTime, Utc};

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRing {
    records: Vec<HistoryCardRecord>,
}

impl HistoryRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps already-ordered records (newest first), dropping any overflow.
    pub fn from_records(mut records: Vec<HistoryCardRecord>) -> Self {
        records.truncate(HISTORY_CAPACITY);
        Self { records }
    }

    /// Inserts at the head and evicts from the tail past capacity.
    pub fn append(&mut self, record: HistoryCardRecord) {
        self.records.insert(0, record);
        self.records.truncate(HISTORY_CAPACITY);
    }

    /// Returns whether a record was removed. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// A copy of the record with `id`.
    pub fn get(&self, id: &str) -> Option<HistoryCardRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Newest first.
    pub fn records(&self) -> &[HistoryCardRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A record id for a card created at `at` that no stored record uses.
    pub fn next_id(&self, at: DateTime<Utc>) -> String {
        let base = format!("card-{}", at.timestamp_millis());
        if !self.contains(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or(base)
    }
}

/// One line of a history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySummary {
    pub id: String,
    pub title: String,
    pub date: String,
    pub nickname: Option<String>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl From<&HistoryCardRecord> for HistorySummary {
    fn from(record: &HistoryCardRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: clamp_chars(&record.subject, crate::model::MAX_SUBJECT_CHARS),
            date: record.date.clone(),
            nickname: record.nickname.clone(),
            details: format!(
                "{} • {} • {} 条重点",
                record.scheme.label(),
                record.card_size.label(),
                record.filled_highlights()
            ),
            created_at: record.created_at,
        }
    }
}
