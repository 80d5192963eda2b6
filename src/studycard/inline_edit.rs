//! In-place editing started from the preview surface.
//!
//! An [`InlineEdit`] holds the text being typed. The session is not touched
//! until the edit commits (confirm key or focus loss); a cancel key drops the
//! temporary value. This is the only "currently editing" state kept outside
//! the session.

use crate::session::Session;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Subject,
    Highlight(String),
    Nickname,
}

/// Key and focus events that end an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// Enter.
    Confirm,
    /// Escape.
    Cancel,
    /// Focus left the field.
    Blur,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineEdit {
    target: EditTarget,
    value: String,
}

impl InlineEdit {
    /// Starts editing `target` with its current text. Returns `None` when
    /// the target highlight does not exist.
    pub fn begin<B: KeyValueStore>(session: &Session<B>, target: EditTarget) -> Option<Self> {
        let value = match &target {
            EditTarget::Subject => session.card().subject.clone(),
            EditTarget::Nickname => session.author().nickname.clone(),
            EditTarget::Highlight(id) => session.card().highlights.get(id)?.content.clone(),
        };
        Some(Self { target, value })
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Applies the temporary value. Returns false when the target highlight
    /// was removed while the edit was open.
    pub fn commit<B: KeyValueStore>(self, session: &mut Session<B>) -> bool {
        match self.target {
            EditTarget::Subject => {
                session.set_subject(&self.value);
                true
            }
            EditTarget::Nickname => {
                session.set_nickname(&self.value);
                true
            }
            EditTarget::Highlight(id) => session.edit_highlight(&id, &self.value),
        }
    }

    pub fn cancel(self) {}

    /// Resolves the edit from a key or focus event. Returns whether the
    /// value was applied.
    pub fn handle_key<B: KeyValueStore>(self, key: EditKey, session: &mut Session<B>) -> bool {
        match key {
            EditKey::Confirm | EditKey::Blur => self.commit(session),
            EditKey::Cancel => {
                self.cancel();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::Persistence;
    use crate::store::memory::MemBackend;

    #[test]
    fn confirm_commits_through_the_session() {
        let backend = MemBackend::new();
        let mut session = Session::open(Persistence::new(&backend));
        let id = session.card().highlights.entries()[0].id.clone();

        let mut edit = InlineEdit::begin(&session, EditTarget::Highlight(id.clone())).unwrap();
        edit.set_value("typed in preview");
        assert_eq!(session.card().highlights.get(&id).unwrap().content, "");

        assert!(edit.handle_key(EditKey::Confirm, &mut session));
        assert_eq!(
            session.card().highlights.get(&id).unwrap().content,
            "typed in preview"
        );
    }

    #[test]
    fn blur_commits_and_cancel_discards() {
        let backend = MemBackend::new();
        let mut session = Session::open(Persistence::new(&backend));
        session.set_subject("Math");
        session.flush();
        let writes = backend.write_count();

        let mut edit = InlineEdit::begin(&session, EditTarget::Subject).unwrap();
        edit.set_value("Physics");
        assert!(!edit.handle_key(EditKey::Cancel, &mut session));
        assert_eq!(session.card().subject, "Math");
        assert!(!session.is_dirty());
        assert_eq!(backend.write_count(), writes);

        let mut edit = InlineEdit::begin(&session, EditTarget::Nickname).unwrap();
        edit.set_value(" 小红 ");
        assert!(edit.handle_key(EditKey::Blur, &mut session));
        assert_eq!(session.author().nickname, "小红");
    }

    #[test]
    fn edit_survives_reorder_and_fails_after_removal() {
        let backend = MemBackend::new();
        let mut session = Session::open(Persistence::new(&backend));
        let target = session.add_highlight_with("b");
        session.add_highlight_with("c");

        let mut edit = InlineEdit::begin(&session, EditTarget::Highlight(target.clone())).unwrap();
        edit.set_value("b2");
        session.reorder_highlights(1, 2).unwrap();
        assert!(edit.commit(&mut session));
        assert_eq!(session.card().highlights.entries()[2].content, "b2");

        let edit = InlineEdit::begin(&session, EditTarget::Highlight(target.clone())).unwrap();
        assert!(session.remove_highlight(&target));
        assert!(!edit.commit(&mut session));
    }

    #[test]
    fn unknown_highlight_cannot_be_edited() {
        let backend = MemBackend::new();
        let session = Session::open(Persistence::new(&backend));
        assert!(InlineEdit::begin(&session, EditTarget::Highlight("nope".into())).is_none());
    }
}
