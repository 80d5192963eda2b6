//! # Persistence Adapter
//!
//! Turns session state into stored records and back. The adapter is the only
//! place that talks to a [`KeyValueStore`]; it is injected into the session,
//! never reached through a global.
//!
//! ## Failure Policy
//!
//! Nothing in here returns an error to its caller:
//!
//! - Missing records load as defaults.
//! - Unreadable or malformed records are logged and load as defaults.
//! - Failed writes are logged and retried on the next save.
//!
//! ## Versioned Decoding
//!
//! Decoding is a pure function over the stored text (see [`codec`]), tried in
//! three steps: the current schema, then the legacy shapes earlier versions
//! wrote (highlights as bare strings or `{content}` objects without ids, or a
//! single `content` field instead of a list), then hard defaults. Entries
//! that arrive without an id get `legacy-<position>` so the id invariant holds
//! as soon as loading returns.
//!
//! ## Write Coalescing
//!
//! Each key remembers the last text written to it. A save whose encoding is
//! identical is skipped, so a burst of edits that ends where it started costs
//! no write, and saving both records when only one changed writes one file.

use crate::history::HISTORY_CAPACITY;
use crate::model::{AuthorProfile, CardState, HistoryCardRecord};
use crate::store::{AUTHOR_KEY, DRAFT_KEY, HISTORY_KEY, KeyValueStore};
use std::cell::RefCell;
use std::collections::HashMap;

/// How a stored record was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Parsed with the current schema.
    Current,
    /// Parsed from an older shape and migrated.
    Legacy,
    /// Missing or unparseable; defaults were used.
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub value: T,
    pub origin: Origin,
}

impl<T> Decoded<T> {
    fn new(value: T, origin: Origin) -> Self {
        Self { value, origin }
    }
}

pub struct Persistence<B: KeyValueStore> {
    backend: B,
    last_written: RefCell<HashMap<&'static str, String>>,
}

impl<B: KeyValueStore> Persistence<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            last_written: RefCell::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads the draft and the author profile. Never fails.
    pub fn load(&self) -> (CardState, AuthorProfile) {
        let draft = match self.read(DRAFT_KEY) {
            Some(raw) => codec::decode_draft(&raw),
            None => Decoded::new(CardState::default(), Origin::Defaulted),
        };
        let author = match self.read(AUTHOR_KEY) {
            Some(raw) => codec::decode_author(&raw),
            None => Decoded::new(AuthorProfile::default(), Origin::Defaulted),
        };
        log::debug!(
            "loaded draft ({:?}) and author ({:?})",
            draft.origin,
            author.origin
        );
        (draft.value, author.value)
    }

    /// Loads the history list, newest first. Never fails.
    pub fn load_history(&self) -> Vec<HistoryCardRecord> {
        match self.read(HISTORY_KEY) {
            Some(raw) => {
                let decoded = codec::decode_history(&raw);
                log::debug!(
                    "loaded {} history records ({:?})",
                    decoded.value.len(),
                    decoded.origin
                );
                decoded.value
            }
            None => Vec::new(),
        }
    }

    /// Saves the draft and the author under their own keys.
    pub fn save(&self, draft: &CardState, author: &AuthorProfile) {
        match codec::encode_draft(draft) {
            Ok(encoded) => self.write(DRAFT_KEY, encoded),
            Err(e) => log::warn!("could not encode draft: {}", e),
        }
        match codec::encode_author(author) {
            Ok(encoded) => self.write(AUTHOR_KEY, encoded),
            Err(e) => log::warn!("could not encode author profile: {}", e),
        }
    }

    pub fn save_history(&self, records: &[HistoryCardRecord]) {
        match codec::encode_history(records) {
            Ok(encoded) => self.write(HISTORY_KEY, encoded),
            Err(e) => log::warn!("could not encode history: {}", e),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("could not read `{}`, using defaults: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &'static str, encoded: String) {
        if self.last_written.borrow().get(key) == Some(&encoded) {
            log::debug!("`{}` unchanged, skipping write", key);
            return;
        }
        match self.backend.set(key, &encoded) {
            Ok(()) => {
                self.last_written.borrow_mut().insert(key, encoded);
            }
            Err(e) => log::warn!("could not save `{}`: {}", key, e),
        }
    }
}

/// Pure encode/decode functions for the stored records.
pub mod codec {
    use super::{Decoded, HISTORY_CAPACITY, Origin};
    use crate::error::Result;
    use crate::highlights::{HighlightEntry, HighlightList};
    use crate::model::{
        AuthorProfile, CardSize, CardState, ColorScheme, ExportFormat, HistoryCardRecord, today,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};
    use std::collections::HashSet;
    use std::str::FromStr;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct DraftRecord {
        subject: String,
        date: String,
        highlights: Vec<HighlightEntry>,
        scheme: ColorScheme,
        card_size: CardSize,
        export_format: ExportFormat,
    }

    pub fn encode_draft(card: &CardState) -> Result<String> {
        let record = DraftRecord {
            subject: card.subject.clone(),
            date: card.date.clone(),
            highlights: card.highlights.entries().to_vec(),
            scheme: card.scheme,
            card_size: card.card_size,
            export_format: card.export_format,
        };
        Ok(serde_json::to_string(&record)?)
    }

    pub fn decode_draft(raw: &str) -> Decoded<CardState> {
        if let Ok(record) = serde_json::from_str::<DraftRecord>(raw) {
            let card = CardState {
                subject: record.subject,
                date: non_blank_date(record.date),
                highlights: HighlightList::from_entries(record.highlights),
                scheme: record.scheme,
                card_size: record.card_size,
                export_format: record.export_format,
            };
            return Decoded::new(card, Origin::Current);
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => Decoded::new(legacy_draft(&obj), Origin::Legacy),
            Ok(_) => {
                log::warn!("stored draft is not an object, using defaults");
                Decoded::new(CardState::default(), Origin::Defaulted)
            }
            Err(e) => {
                log::warn!("stored draft is not valid JSON, using defaults: {}", e);
                Decoded::new(CardState::default(), Origin::Defaulted)
            }
        }
    }

    fn legacy_draft(obj: &Map<String, Value>) -> CardState {
        let mut entries = obj.get("highlights").map(legacy_highlights).unwrap_or_default();
        if entries.is_empty() {
            // The first version stored one free-text block.
            if let Some(content) = obj.get("content").and_then(Value::as_str) {
                entries.push(HighlightEntry {
                    id: legacy_id(0, &HashSet::new()),
                    content: content.to_string(),
                });
            }
        }

        CardState {
            subject: string_field(obj, "subject").unwrap_or_default(),
            date: non_blank_date(string_field(obj, "date").unwrap_or_default()),
            highlights: HighlightList::from_entries(entries),
            scheme: parsed_field(obj, "scheme"),
            card_size: parsed_field(obj, "cardSize"),
            export_format: parsed_field(obj, "exportFormat"),
        }
    }

    /// Reads highlights in any shape an earlier version wrote. Items that
    /// carry no text at all are dropped; everything else keeps its position.
    ///
    /// Stored ids are claimed first, so a synthesized id never takes one
    /// that is actually stored and the result is the same on every load.
    pub fn legacy_highlights(value: &Value) -> Vec<HighlightEntry> {
        let Some(items) = value.as_array() else {
            return Vec::new();
        };
        let parsed: Vec<(usize, Option<String>, String)> = items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| match item {
                Value::String(content) => Some((position, None, content.clone())),
                Value::Object(obj) => {
                    let content = obj.get("content").and_then(Value::as_str)?.to_string();
                    let id = match obj.get("id") {
                        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                        Some(Value::Number(n)) => Some(n.to_string()),
                        _ => None,
                    };
                    Some((position, id, content))
                }
                _ => None,
            })
            .collect();

        let mut taken: HashSet<String> = parsed.iter().filter_map(|(_, id, _)| id.clone()).collect();
        parsed
            .into_iter()
            .map(|(position, id, content)| {
                let id = id.unwrap_or_else(|| {
                    let id = legacy_id(position, &taken);
                    taken.insert(id.clone());
                    id
                });
                HighlightEntry { id, content }
            })
            .collect()
    }

    /// `legacy-<position>`, or `legacy-<position>-<n>` with the first free `n`.
    fn legacy_id(position: usize, taken: &HashSet<String>) -> String {
        let base = format!("legacy-{}", position);
        if !taken.contains(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !taken.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn non_blank_date(date: String) -> String {
        if date.trim().is_empty() {
            today()
        } else {
            date
        }
    }

    fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
        obj.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn parsed_field<T: FromStr + Default>(obj: &Map<String, Value>, key: &str) -> T {
        obj.get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn encode_author(author: &AuthorProfile) -> Result<String> {
        Ok(serde_json::to_string(author)?)
    }

    pub fn decode_author(raw: &str) -> Decoded<AuthorProfile> {
        if let Ok(author) = serde_json::from_str::<AuthorProfile>(raw) {
            return Decoded::new(author, Origin::Current);
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => {
                let author = AuthorProfile {
                    nickname: string_field(&obj, "nickname").unwrap_or_default(),
                    avatar: string_field(&obj, "avatar").filter(|a| !a.is_empty()),
                };
                Decoded::new(author, Origin::Legacy)
            }
            _ => {
                log::warn!("stored author profile is unreadable, using defaults");
                Decoded::new(AuthorProfile::default(), Origin::Defaulted)
            }
        }
    }

    pub fn encode_history(records: &[HistoryCardRecord]) -> Result<String> {
        Ok(serde_json::to_string(records)?)
    }

    /// Decodes the history array. Records that cannot be repaired are
    /// dropped one by one instead of discarding the whole history.
    pub fn decode_history(raw: &str) -> Decoded<Vec<HistoryCardRecord>> {
        if let Ok(mut records) = serde_json::from_str::<Vec<HistoryCardRecord>>(raw) {
            let origin = if records.len() > HISTORY_CAPACITY {
                records.truncate(HISTORY_CAPACITY);
                Origin::Legacy
            } else {
                Origin::Current
            };
            return Decoded::new(records, origin);
        }

        let items = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            _ => {
                log::warn!("stored history is unreadable, starting empty");
                return Decoded::new(Vec::new(), Origin::Defaulted);
            }
        };

        let mut records: Vec<HistoryCardRecord> = items
            .into_iter()
            .filter_map(|item| {
                let record = legacy_record(item);
                if record.is_none() {
                    log::warn!("dropping unreadable history record");
                }
                record
            })
            .collect();
        records.truncate(HISTORY_CAPACITY);
        Decoded::new(records, Origin::Legacy)
    }

    fn legacy_record(mut item: Value) -> Option<HistoryCardRecord> {
        let obj = item.as_object_mut()?;
        let highlights = obj.get("highlights").map(legacy_highlights).unwrap_or_default();
        obj.insert("highlights".to_string(), serde_json::to_value(highlights).ok()?);
        for key in ["scheme", "cardSize"] {
            let known = obj
                .get(key)
                .and_then(Value::as_str)
                .map(|s| match key {
                    "scheme" => ColorScheme::from_str(s).is_ok(),
                    _ => CardSize::from_str(s).is_ok(),
                })
                .unwrap_or(false);
            if !known {
                let fallback = match key {
                    "scheme" => ColorScheme::default().to_string(),
                    _ => CardSize::default().to_string(),
                };
                obj.insert(key.to_string(), Value::String(fallback));
            }
        }
        serde_json::from_value(item).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::codec::*;
    use super::*;
    use crate::highlights::HighlightList;
    use crate::model::{CardSize, ColorScheme, ExportFormat};
    use crate::store::memory::MemBackend;
    use std::collections::HashSet;

    fn sample_card() -> CardState {
        let mut highlights = HighlightList::new();
        let first = highlights.entries()[0].id.clone();
        highlights.edit_content(&first, "derivatives");
        highlights.add_with("chain rule");
        highlights.add();
        highlights.reorder(2, 0);
        CardState {
            subject: "高数".into(),
            date: "2026-10-16".into(),
            highlights,
            scheme: ColorScheme::Pink,
            card_size: CardSize::Phone,
            export_format: ExportFormat::Pdf,
        }
    }

    #[test]
    fn missing_records_load_as_defaults() {
        let persistence = Persistence::new(MemBackend::new());
        let (card, author) = persistence.load();
        assert_eq!(card.subject, "");
        assert_eq!(card.highlights.len(), 1);
        assert_eq!(card.scheme, ColorScheme::Blue);
        assert_eq!(author, AuthorProfile::default());
        assert!(persistence.load_history().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let persistence = Persistence::new(MemBackend::new());
        let card = sample_card();
        let author = AuthorProfile {
            nickname: "小明".into(),
            avatar: Some("data:image/png;base64,AAAA".into()),
        };

        persistence.save(&card, &author);
        let (loaded_card, loaded_author) = persistence.load();

        assert_eq!(loaded_card, card);
        assert_eq!(loaded_author, author);
    }

    #[test]
    fn malformed_draft_falls_back_to_defaults() {
        let backend = MemBackend::new()
            .with_value(DRAFT_KEY, "{not json")
            .with_value(AUTHOR_KEY, "42");
        let persistence = Persistence::new(backend);

        let (card, author) = persistence.load();
        assert_eq!(card.highlights.len(), 1);
        assert_eq!(card.subject, "");
        assert_eq!(author, AuthorProfile::default());
    }

    #[test]
    fn non_object_draft_is_defaulted() {
        let decoded = decode_draft("[1, 2, 3]");
        assert_eq!(decoded.origin, Origin::Defaulted);
    }

    #[test]
    fn legacy_content_objects_get_synthesized_ids() {
        let raw = r#"{
            "subject": "Math",
            "date": "2026-10-01",
            "highlights": [{"content": "x"}, {"content": "y"}, {"content": "x"}],
            "scheme": "green"
        }"#;
        let decoded = decode_draft(raw);
        assert_eq!(decoded.origin, Origin::Legacy);

        let card = decoded.value;
        let contents: Vec<_> = card
            .highlights
            .entries()
            .iter()
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(contents, vec!["x", "y", "x"]);

        let ids: Vec<_> = card.highlights.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["legacy-0", "legacy-1", "legacy-2"]);
        assert_eq!(card.scheme, ColorScheme::Green);
        assert_eq!(card.card_size, CardSize::Standard);
        assert_eq!(card.export_format, ExportFormat::Png);
    }

    #[test]
    fn legacy_migration_is_deterministic() {
        let raw = r#"{"subject":"a","highlights":[{"content":"1"},{"content":"2"}]}"#;
        assert_eq!(decode_draft(raw).value.highlights, decode_draft(raw).value.highlights);
    }

    #[test]
    fn legacy_plain_strings_and_mixed_ids() {
        let raw = r#"{"highlights": ["first", {"id": "keep", "content": "second"}, 7, {"content": "third"}]}"#;
        let card = decode_draft(raw).value;
        let entries = card.highlights.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "legacy-0");
        assert_eq!(entries[1].id, "keep");
        assert_eq!(entries[2].id, "legacy-3");
        assert_eq!(entries[2].content, "third");

        let ids: HashSet<_> = entries.iter().map(|e| &e.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn synthesized_ids_never_take_a_stored_id() {
        let raw = r#"{"highlights":[{"content":"first"},{"id":"legacy-0","content":"second"},"third",{"id":"legacy-0-1","content":"fourth"}]}"#;
        let ids = |raw: &str| -> Vec<String> {
            decode_draft(raw)
                .value
                .highlights
                .entries()
                .iter()
                .map(|e| e.id.clone())
                .collect()
        };

        let first_load = ids(raw);
        assert_eq!(first_load, vec!["legacy-0-2", "legacy-0", "legacy-2", "legacy-0-1"]);
        assert_eq!(first_load, ids(raw));
    }

    #[test]
    fn blank_date_falls_back_to_today_on_current_schema() {
        let mut card = sample_card();
        card.date = " ".into();
        let raw = encode_draft(&card).unwrap();

        let decoded = decode_draft(&raw);
        assert_eq!(decoded.origin, Origin::Current);
        assert_eq!(decoded.value.date, crate::model::today());
    }

    #[test]
    fn oldest_single_content_schema_is_migrated() {
        let raw = r#"{"subject":"英语","date":"2025-01-02","content":"irregular verbs","scheme":"pink"}"#;
        let card = decode_draft(raw).value;
        assert_eq!(card.subject, "英语");
        assert_eq!(card.highlights.len(), 1);
        assert_eq!(card.highlights.entries()[0].content, "irregular verbs");
        assert_eq!(card.highlights.entries()[0].id, "legacy-0");
        assert_eq!(card.scheme, ColorScheme::Pink);
    }

    #[test]
    fn unknown_enum_values_fall_back_per_field() {
        let raw = r#"{"subject":"a","scheme":"purple","cardSize":"poster","exportFormat":"jpeg","date":""}"#;
        let card = decode_draft(raw).value;
        assert_eq!(card.scheme, ColorScheme::Blue);
        assert_eq!(card.card_size, CardSize::Standard);
        assert_eq!(card.export_format, ExportFormat::Jpg);
        assert_eq!(card.date, crate::model::today());
    }

    #[test]
    fn history_drops_only_broken_records() {
        let raw = r#"[
            {"id":"card-2","subject":"b","date":"2026-01-02","highlights":[{"content":"x"}],
             "scheme":"blue","cardSize":"social","createdAt":"2026-01-02T10:00:00Z"},
            {"id":"card-1","subject":"a"},
            "garbage"
        ]"#;
        let decoded = decode_history(raw);
        assert_eq!(decoded.origin, Origin::Legacy);
        assert_eq!(decoded.value.len(), 1);
        assert_eq!(decoded.value[0].id, "card-2");
        assert_eq!(decoded.value[0].highlights[0].id, "legacy-0");
    }

    #[test]
    fn history_longer_than_capacity_is_truncated() {
        let card = sample_card();
        let author = AuthorProfile::default();
        let records: Vec<_> = (0..60)
            .map(|i| {
                let mut r = HistoryCardRecord::from_snapshot(&card, &author, chrono::Utc::now());
                r.id = format!("card-{}", i);
                r
            })
            .collect();
        let raw = encode_history(&records).unwrap();

        let decoded = decode_history(&raw);
        assert_eq!(decoded.value.len(), HISTORY_CAPACITY);
        assert_eq!(decoded.value[0].id, "card-0");
    }

    #[test]
    fn identical_saves_are_coalesced() {
        let persistence = Persistence::new(MemBackend::new());
        let card = sample_card();
        let author = AuthorProfile::default();

        persistence.save(&card, &author);
        assert_eq!(persistence.backend().write_count(), 2);

        persistence.save(&card, &author);
        assert_eq!(persistence.backend().write_count(), 2);

        let mut changed = card.clone();
        changed.subject = "线代".into();
        persistence.save(&changed, &author);
        assert_eq!(persistence.backend().write_count(), 3);
    }

    #[test]
    fn write_failures_are_absorbed_and_retried() {
        let persistence = Persistence::new(MemBackend::new());
        let card = sample_card();
        let author = AuthorProfile::default();

        persistence.backend().set_simulate_write_error(true);
        persistence.save(&card, &author);
        assert_eq!(persistence.backend().raw(DRAFT_KEY), None);

        persistence.backend().set_simulate_write_error(false);
        persistence.save(&card, &author);
        assert!(persistence.backend().raw(DRAFT_KEY).is_some());
    }

    #[test]
    fn draft_uses_camel_case_keys() {
        let raw = encode_draft(&sample_card()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["cardSize"], "phone");
        assert_eq!(value["exportFormat"], "pdf");
        assert_eq!(value["scheme"], "pink");
        assert!(value["highlights"][0]["id"].is_string());
    }
}
