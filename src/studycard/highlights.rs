//! # Highlight List
//!
//! The ordered list of highlight notes on a card. Order is render order.
//!
//! Entries are addressed by a stable string id rather than by position:
//! content is freely editable and may repeat, and a surface that is editing
//! an entry must keep pointing at the same entry after a reorder.
//!
//! ## Invariants
//!
//! - The list never becomes empty: removing the last entry is a silent no-op.
//! - Ids are unique within the list and are never handed out twice.
//!
//! ## Reordering
//!
//! There is exactly one reorder operation, [`HighlightList::reorder`], taking
//! a pair of positions. Surfaces that track entries by id resolve them with
//! [`HighlightList::index_of`] first. Pointer and drag state never reaches
//! this module.

use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightEntry {
    pub id: String,
    pub content: String,
}

impl HighlightEntry {
    fn blank() -> Self {
        Self {
            id: fresh_id(),
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightList {
    entries: Vec<HighlightEntry>,
}

impl Default for HighlightList {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightList {
    /// A list holding a single empty entry.
    pub fn new() -> Self {
        Self {
            entries: vec![HighlightEntry::blank()],
        }
    }

    /// Builds a list from stored entries, repairing the invariants:
    /// an empty input yields one blank entry, and blank or repeated ids
    /// are replaced with fresh ones.
    pub fn from_entries(entries: Vec<HighlightEntry>) -> Self {
        if entries.is_empty() {
            return Self::new();
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                if entry.id.trim().is_empty() || !seen.insert(entry.id.clone()) {
                    log::debug!("re-keying highlight with duplicate id `{}`", entry.id);
                    entry.id = fresh_id();
                    seen.insert(entry.id.clone());
                }
                entry
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[HighlightEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HighlightEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Appends an empty entry and returns its id.
    pub fn add(&mut self) -> String {
        let entry = HighlightEntry::blank();
        let id = entry.id.clone();
        self.entries.push(entry);
        id
    }

    /// Appends an entry with the given content and returns its id.
    pub fn add_with(&mut self, content: impl Into<String>) -> String {
        let id = self.add();
        self.edit_content(&id, content);
        id
    }

    /// Removes the entry with `id`. Returns false (and leaves the list
    /// untouched) when it is the only entry or the id is unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.entries.len() <= 1 {
            return false;
        }
        match self.index_of(id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replaces the content of the entry with `id`. The text is stored as
    /// given; callers apply the length bound.
    pub fn edit_content(&mut self, id: &str, text: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.content = text.into();
                true
            }
            None => false,
        }
    }

    /// Moves the entry at `from` to position `to`, shifting the entries in
    /// between.
    ///
    /// # Panics
    ///
    /// Panics when either index is out of range. Use [`Self::try_reorder`]
    /// when the indices come from user input.
    pub fn reorder(&mut self, from: usize, to: usize) {
        let len = self.entries.len();
        assert!(
            from < len && to < len,
            "reorder({from}, {to}) on a list of {len} entries"
        );
        if from == to {
            return;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
    }

    /// Checked form of [`Self::reorder`].
    pub fn try_reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(CardError::IndexOutOfRange { index, len });
            }
        }
        self.reorder(from, to);
        Ok(())
    }

    /// Entries that are actually drawn on the card, with their 1-based
    /// number. Blank entries are skipped and do not consume a number.
    pub fn rendered(&self) -> impl Iterator<Item = (usize, &HighlightEntry)> {
        self.entries
            .iter()
            .filter(|e| !e.content.trim().is_empty())
            .enumerate()
            .map(|(i, e)| (i + 1, e))
    }

    pub fn filled_count(&self) -> usize {
        self.rendered().count()
    }
}

fn fresh_id() -> String {
    format!("hl-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(contents: &[&str]) -> HighlightList {
        HighlightList::from_entries(
            contents
                .iter()
                .map(|c| HighlightEntry {
                    id: format!("id-{}", c),
                    content: c.to_string(),
                })
                .collect(),
        )
    }

    fn contents(list: &HighlightList) -> Vec<&str> {
        list.entries().iter().map(|e| e.content.as_str()).collect()
    }

    #[test]
    fn add_appends_blank_entry_with_unique_id() {
        let mut list = HighlightList::new();
        let first = list.entries()[0].id.clone();
        let second = list.add();

        assert_eq!(list.len(), 2);
        assert_ne!(first, second);
        assert_eq!(list.get(&second).unwrap().content, "");
    }

    #[test]
    fn ids_stay_unique_across_add_and_remove() {
        let mut list = HighlightList::new();
        let mut handed_out = HashSet::new();
        handed_out.insert(list.entries()[0].id.clone());

        for round in 0..20 {
            let id = list.add();
            assert!(handed_out.insert(id.clone()), "id reused: {id}");
            if round % 3 == 0 {
                let victim = list.entries()[0].id.clone();
                assert!(list.remove(&victim));
            }
        }

        let ids: HashSet<_> = list.entries().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), list.len());
    }

    #[test]
    fn removing_the_last_entry_is_a_no_op() {
        let mut list = HighlightList::new();
        let only = list.entries()[0].id.clone();

        assert!(!list.remove(&only));
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].id, only);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut list = list_of(&["a", "b"]);
        assert!(!list.remove("missing"));
        assert_eq!(contents(&list), vec!["a", "b"]);
    }

    #[test]
    fn edit_content_targets_by_id_even_with_duplicate_text() {
        let mut list = HighlightList::new();
        let first = list.entries()[0].id.clone();
        let second = list.add();
        list.edit_content(&first, "same");
        list.edit_content(&second, "same");

        assert!(list.edit_content(&second, "changed"));
        assert_eq!(list.get(&first).unwrap().content, "same");
        assert_eq!(list.get(&second).unwrap().content, "changed");
        assert!(!list.edit_content("missing", "x"));
    }

    #[test]
    fn edit_content_does_not_truncate() {
        let mut list = HighlightList::new();
        let id = list.entries()[0].id.clone();
        let long = "x".repeat(500);
        list.edit_content(&id, long.clone());
        assert_eq!(list.get(&id).unwrap().content, long);
    }

    #[test]
    fn reorder_moves_forward_and_back() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        list.reorder(0, 2);
        assert_eq!(contents(&list), vec!["b", "c", "a", "d"]);

        // Same indices swapped do restore here, but only because `a` now sits at 2.
        list.reorder(2, 0);
        assert_eq!(contents(&list), vec!["a", "b", "c", "d"]);

        list.reorder(3, 1);
        assert_eq!(contents(&list), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn reorder_keeps_ids_attached_to_content() {
        let mut list = list_of(&["a", "b", "c"]);
        let id_a = list.entries()[0].id.clone();
        list.reorder(0, 2);
        assert_eq!(list.index_of(&id_a), Some(2));
        assert_eq!(list.get(&id_a).unwrap().content, "a");
    }

    #[test]
    #[should_panic]
    fn reorder_out_of_range_panics() {
        let mut list = list_of(&["a", "b"]);
        list.reorder(0, 2);
    }

    #[test]
    fn try_reorder_reports_out_of_range() {
        let mut list = list_of(&["a", "b"]);
        let err = list.try_reorder(5, 0).unwrap_err();
        assert!(matches!(err, CardError::IndexOutOfRange { index: 5, len: 2 }));
        assert_eq!(contents(&list), vec!["a", "b"]);
    }

    #[test]
    fn from_entries_repairs_invariants() {
        let empty = HighlightList::from_entries(Vec::new());
        assert_eq!(empty.len(), 1);

        let dupes = HighlightList::from_entries(vec![
            HighlightEntry {
                id: "x".into(),
                content: "one".into(),
            },
            HighlightEntry {
                id: "x".into(),
                content: "two".into(),
            },
            HighlightEntry {
                id: " ".into(),
                content: "three".into(),
            },
        ]);
        let ids: HashSet<_> = dupes.entries().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(dupes.entries()[0].id, "x");
        assert_eq!(contents(&dupes), vec!["one", "two", "three"]);
    }

    #[test]
    fn rendered_skips_blank_entries() {
        let list = list_of(&["a", " ", "c"]);
        let rendered: Vec<_> = list
            .rendered()
            .map(|(n, e)| (n, e.content.as_str()))
            .collect();
        assert_eq!(rendered, vec![(1, "a"), (2, "c")]);
        assert_eq!(list.filled_count(), 2);
    }
}
