//! # Editing Session
//!
//! [`Session`] is the single source of truth for everything the user is
//! editing: the draft [`CardState`], the [`AuthorProfile`] and the export
//! [`HistoryRing`]. Every surface (the form, the live preview, the history
//! list) mutates state only through these methods and reads it back from
//! here, so two surfaces can never disagree for longer than one interaction.
//!
//! ## Text Bounds
//!
//! The session is the caller that applies text limits: subjects and
//! nicknames are cut to 20 code points, highlight content to 160. The lower
//! layers store what they are given.
//!
//! ## Saving
//!
//! Draft and author edits mark the session dirty; [`Session::flush`] hands
//! both to the persistence adapter, which skips unchanged records. Dropping
//! the session flushes. History changes are written immediately, since they
//! are rare and must survive even if the draft write is skipped.

use crate::error::{CardError, Result};
use crate::history::HistoryRing;
use crate::model::{
    AuthorProfile, CardSize, CardState, ColorScheme, ExportFormat, HistoryCardRecord,
    MAX_HIGHLIGHT_CHARS, MAX_NICKNAME_CHARS, MAX_SUBJECT_CHARS, clamp_chars, parse_date,
};
use crate::persist::Persistence;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};

pub struct Session<B: KeyValueStore> {
    card: CardState,
    author: AuthorProfile,
    history: HistoryRing,
    persistence: Persistence<B>,
    dirty: bool,
}

impl<B: KeyValueStore> Session<B> {
    /// Restores the last draft, author and history, or defaults.
    pub fn open(persistence: Persistence<B>) -> Self {
        let (card, author) = persistence.load();
        let history = HistoryRing::from_records(persistence.load_history());
        Self {
            card,
            author,
            history,
            persistence,
            dirty: false,
        }
    }

    pub fn card(&self) -> &CardState {
        &self.card
    }

    pub fn author(&self) -> &AuthorProfile {
        &self.author
    }

    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    pub fn persistence(&self) -> &Persistence<B> {
        &self.persistence
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Immutable copies of the draft and the author, taken together.
    pub fn snapshot(&self) -> (CardState, AuthorProfile) {
        (self.card.clone(), self.author.clone())
    }

    // --- Card fields ---

    pub fn set_subject(&mut self, subject: &str) {
        self.card.subject = clamp_chars(subject, MAX_SUBJECT_CHARS);
        self.touch();
    }

    /// Accepts only `YYYY-MM-DD` dates; the draft is unchanged on error.
    pub fn set_date(&mut self, date: &str) -> Result<()> {
        let parsed = parse_date(date)?;
        self.card.date = parsed.format("%Y-%m-%d").to_string();
        self.touch();
        Ok(())
    }

    pub fn set_scheme(&mut self, scheme: ColorScheme) {
        self.card.scheme = scheme;
        self.touch();
    }

    pub fn set_card_size(&mut self, size: CardSize) {
        self.card.card_size = size;
        self.touch();
    }

    pub fn set_export_format(&mut self, format: ExportFormat) {
        self.card.export_format = format;
        self.touch();
    }

    // --- Author ---

    pub fn set_nickname(&mut self, nickname: &str) {
        self.author.nickname = clamp_chars(nickname.trim(), MAX_NICKNAME_CHARS);
        self.touch();
    }

    pub fn set_avatar(&mut self, avatar: Option<String>) {
        self.author.avatar = avatar.filter(|a| !a.trim().is_empty());
        self.touch();
    }

    // --- Highlights ---

    pub fn add_highlight(&mut self) -> String {
        let id = self.card.highlights.add();
        self.touch();
        id
    }

    pub fn add_highlight_with(&mut self, content: &str) -> String {
        let id = self
            .card
            .highlights
            .add_with(clamp_chars(content, MAX_HIGHLIGHT_CHARS));
        self.touch();
        id
    }

    pub fn edit_highlight(&mut self, id: &str, content: &str) -> bool {
        let changed = self
            .card
            .highlights
            .edit_content(id, clamp_chars(content, MAX_HIGHLIGHT_CHARS));
        if changed {
            self.touch();
        }
        changed
    }

    pub fn remove_highlight(&mut self, id: &str) -> bool {
        let removed = self.card.highlights.remove(id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Moves the highlight at position `from` to position `to`.
    pub fn reorder_highlights(&mut self, from: usize, to: usize) -> Result<()> {
        self.card.highlights.try_reorder(from, to)?;
        if from != to {
            self.touch();
        }
        Ok(())
    }

    /// Moves the highlight with `id` to position `to`. Surfaces that track
    /// entries by id go through here, which resolves to the positional form.
    pub fn move_highlight(&mut self, id: &str, to: usize) -> Result<()> {
        let from = self
            .card
            .highlights
            .index_of(id)
            .ok_or_else(|| CardError::Validation(format!("no highlight with id `{}`", id)))?;
        self.reorder_highlights(from, to)
    }

    /// Id of the highlight at a 1-based display position.
    pub fn highlight_id_at(&self, position: usize) -> Result<String> {
        let len = self.card.highlights.len();
        position
            .checked_sub(1)
            .and_then(|i| self.card.highlights.entries().get(i))
            .map(|e| e.id.clone())
            .ok_or(CardError::IndexOutOfRange {
                index: position,
                len,
            })
    }

    // --- History ---

    /// Appends an exported snapshot to the history and saves it.
    pub fn record_export(
        &mut self,
        card: &CardState,
        author: &AuthorProfile,
        at: DateTime<Utc>,
    ) -> HistoryCardRecord {
        let mut record = HistoryCardRecord::from_snapshot(card, author, at);
        record.id = self.history.next_id(at);
        self.history.append(record.clone());
        self.persistence.save_history(self.history.records());
        log::debug!("recorded export {} ({} in history)", record.id, self.history.len());
        record
    }

    /// Replaces the draft with a copy of the history record. The export
    /// format and the author profile are kept.
    pub fn load_history_entry(&mut self, id: &str) -> bool {
        match self.history.get(id) {
            Some(record) => {
                self.card = CardState::from_record(&record, self.card.export_format);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn delete_history_entry(&mut self, id: &str) -> bool {
        let removed = self.history.remove(id);
        if removed {
            self.persistence.save_history(self.history.records());
        }
        removed
    }

    pub fn clear_history(&mut self) {
        if self.history.is_empty() {
            return;
        }
        self.history.clear();
        self.persistence.save_history(self.history.records());
    }

    /// Id of the history record at a 1-based position, newest first.
    pub fn history_id_at(&self, position: usize) -> Result<String> {
        let len = self.history.len();
        position
            .checked_sub(1)
            .and_then(|i| self.history.records().get(i))
            .map(|r| r.id.clone())
            .ok_or(CardError::IndexOutOfRange {
                index: position,
                len,
            })
    }

    // --- Saving ---

    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        self.persistence.save(&self.card, &self.author);
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
    }
}

impl<B: KeyValueStore> Drop for Session<B> {
    fn drop(&mut self) {
        self.flush();
    }
}
