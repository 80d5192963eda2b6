//! # Card Data Model
//!
//! Plain data types shared by every layer: the editable [`CardState`] (the
//! draft), the [`AuthorProfile`], and the immutable [`HistoryCardRecord`]
//! produced by a successful export.
//!
//! The presentation enums ([`ColorScheme`], [`CardSize`], [`ExportFormat`])
//! carry their display labels and the fixed numbers the renderer needs, so
//! that no UI has to keep its own lookup table.

use crate::error::{CardError, Result};
use crate::highlights::{HighlightEntry, HighlightList};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_SUBJECT_CHARS: usize = 20;
pub const MAX_HIGHLIGHT_CHARS: usize = 160;
pub const MAX_NICKNAME_CHARS: usize = 20;

/// Subject used for file names when the card has none.
pub const FALLBACK_SUBJECT: &str = "学习卡片";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Blue,
    Green,
    Pink,
}

/// RGB colors used when a card is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub gradient_from: [u8; 3],
    pub gradient_to: [u8; 3],
    pub keypoint: [u8; 3],
    pub text: [u8; 3],
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 3] = [ColorScheme::Blue, ColorScheme::Green, ColorScheme::Pink];

    pub fn label(self) -> &'static str {
        match self {
            ColorScheme::Blue => "海洋蓝",
            ColorScheme::Green => "柔绿",
            ColorScheme::Pink => "柔粉",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ColorScheme::Blue => Palette {
                gradient_from: [0xaa, 0xc9, 0xe5],
                gradient_to: [0xe3, 0xea, 0xf5],
                keypoint: [0x63, 0xa2, 0xc8],
                text: [0x1e, 0x37, 0x53],
            },
            ColorScheme::Green => Palette {
                gradient_from: [0xb8, 0xd2, 0xc1],
                gradient_to: [0xe1, 0xf0, 0xe5],
                keypoint: [0x83, 0xbd, 0xa4],
                text: [0x21, 0x59, 0x49],
            },
            ColorScheme::Pink => Palette {
                gradient_from: [0xcb, 0xb9, 0xc6],
                gradient_to: [0xf3, 0xe8, 0xef],
                keypoint: [0xc8, 0x85, 0xa2],
                text: [0x6e, 0x2f, 0x4c],
            },
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorScheme::Blue => "blue",
            ColorScheme::Green => "green",
            ColorScheme::Pink => "pink",
        };
        f.write_str(name)
    }
}

impl FromStr for ColorScheme {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(ColorScheme::Blue),
            "green" => Ok(ColorScheme::Green),
            "pink" => Ok(ColorScheme::Pink),
            other => Err(CardError::Validation(format!(
                "unknown color scheme `{}` (expected blue, green or pink)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    #[default]
    Standard,
    Phone,
    Tablet,
    Desktop,
    Social,
}

impl CardSize {
    pub const ALL: [CardSize; 5] = [
        CardSize::Standard,
        CardSize::Phone,
        CardSize::Tablet,
        CardSize::Desktop,
        CardSize::Social,
    ];

    /// Display name, also used as the file name suffix.
    pub fn label(self) -> &'static str {
        match self {
            CardSize::Standard => "标准卡片",
            CardSize::Phone => "手机壁纸",
            CardSize::Tablet => "平板横屏",
            CardSize::Desktop => "电脑壁纸",
            CardSize::Social => "社交分享",
        }
    }

    /// Base pixel dimensions (width, height) before the export scale.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            CardSize::Standard => (420, 240),
            CardSize::Phone => (360, 640),
            CardSize::Tablet => (600, 400),
            CardSize::Desktop => (800, 450),
            CardSize::Social => (400, 400),
        }
    }

    pub fn ratio(self) -> &'static str {
        match self {
            CardSize::Standard => "7:4",
            CardSize::Phone => "9:16",
            CardSize::Tablet => "3:2",
            CardSize::Desktop => "16:9",
            CardSize::Social => "1:1",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CardSize::Standard => "适合一般使用",
            CardSize::Phone => "竖屏手机背景",
            CardSize::Tablet => "平板设备使用",
            CardSize::Desktop => "桌面背景图",
            CardSize::Social => "微博/朋友圈",
        }
    }
}

impl fmt::Display for CardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardSize::Standard => "standard",
            CardSize::Phone => "phone",
            CardSize::Tablet => "tablet",
            CardSize::Desktop => "desktop",
            CardSize::Social => "social",
        };
        f.write_str(name)
    }
}

impl FromStr for CardSize {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(CardSize::Standard),
            "phone" => Ok(CardSize::Phone),
            "tablet" => Ok(CardSize::Tablet),
            "desktop" => Ok(CardSize::Desktop),
            "social" => Ok(CardSize::Social),
            other => Err(CardError::Validation(format!(
                "unknown card size `{}` (expected standard, phone, tablet, desktop or social)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG (推荐)",
            ExportFormat::Jpg => "JPG (压缩)",
            ExportFormat::Pdf => "PDF (文档)",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(CardError::Validation(format!(
                "unknown export format `{}` (expected png, jpg or pdf)",
                other
            ))),
        }
    }
}

/// Nickname and avatar shown on exported cards.
///
/// Persisted independently of the draft so it survives across cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    #[serde(default)]
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl AuthorProfile {
    pub fn is_empty(&self) -> bool {
        self.nickname.trim().is_empty() && self.avatar.is_none()
    }
}

/// The card being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardState {
    pub subject: String,
    pub date: String,
    pub highlights: HighlightList,
    pub scheme: ColorScheme,
    pub card_size: CardSize,
    pub export_format: ExportFormat,
}

impl Default for CardState {
    fn default() -> Self {
        Self {
            subject: String::new(),
            date: today(),
            highlights: HighlightList::new(),
            scheme: ColorScheme::default(),
            card_size: CardSize::default(),
            export_format: ExportFormat::default(),
        }
    }
}

impl CardState {
    /// Checks the fields an export requires.
    pub fn validate_for_export(&self) -> Result<()> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(CardError::Validation("subject is required".to_string()));
        }
        if char_count(subject) > MAX_SUBJECT_CHARS {
            return Err(CardError::Validation(format!(
                "subject is longer than {} characters",
                MAX_SUBJECT_CHARS
            )));
        }
        parse_date(&self.date)?;
        Ok(())
    }

    /// Installs a history record as the new draft. The record is copied.
    pub fn from_record(record: &HistoryCardRecord, export_format: ExportFormat) -> Self {
        Self {
            subject: record.subject.clone(),
            date: record.date.clone(),
            highlights: HighlightList::from_entries(record.highlights.clone()),
            scheme: record.scheme,
            card_size: record.card_size,
            export_format,
        }
    }
}

/// Immutable snapshot of an exported card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCardRecord {
    pub id: String,
    pub subject: String,
    pub date: String,
    pub highlights: Vec<HighlightEntry>,
    pub scheme: ColorScheme,
    pub card_size: CardSize,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl HistoryCardRecord {
    pub fn from_snapshot(card: &CardState, author: &AuthorProfile, created_at: DateTime<Utc>) -> Self {
        let nickname = author.nickname.trim();
        Self {
            id: format!("card-{}", created_at.timestamp_millis()),
            subject: card.subject.clone(),
            date: card.date.clone(),
            highlights: card.highlights.entries().to_vec(),
            scheme: card.scheme,
            card_size: card.card_size,
            created_at,
            nickname: (!nickname.is_empty()).then(|| nickname.to_string()),
            avatar: author.avatar.clone(),
        }
    }

    pub fn filled_highlights(&self) -> usize {
        self.highlights
            .iter()
            .filter(|h| !h.content.trim().is_empty())
            .count()
    }
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| CardError::Validation(format!("`{}` is not a YYYY-MM-DD date", date)))
}

/// Length in code points, the unit every text bound is expressed in.
pub fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// Truncates to at most `max` code points.
pub fn clamp_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_card_has_one_empty_highlight_and_today() {
        let card = CardState::default();
        assert_eq!(card.highlights.len(), 1);
        assert_eq!(card.highlights.entries()[0].content, "");
        assert_eq!(card.date, today());
        assert_eq!(card.scheme, ColorScheme::Blue);
        assert_eq!(card.card_size, CardSize::Standard);
        assert_eq!(card.export_format, ExportFormat::Png);
    }

    #[test]
    fn validation_requires_subject_and_date() {
        let mut card = CardState::default();
        assert!(card.validate_for_export().is_err());

        card.subject = "Math".into();
        assert!(card.validate_for_export().is_ok());

        card.date = "16/10/2026".into();
        assert!(card.validate_for_export().is_err());

        card.date = "2026-10-16".into();
        card.subject = "数".repeat(21);
        assert!(card.validate_for_export().is_err());

        card.subject = "数".repeat(20);
        assert!(card.validate_for_export().is_ok());
    }

    #[test]
    fn export_format_accepts_jpeg_alias() {
        assert_eq!("jpeg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert_eq!(".PNG".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert!("gif".parse::<ExportFormat>().is_err());

        let parsed: ExportFormat = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(parsed, ExportFormat::Jpg);
    }

    #[test]
    fn record_snapshot_copies_fields() {
        let mut card = CardState {
            subject: "History".into(),
            date: "2026-10-16".into(),
            ..Default::default()
        };
        let id = card.highlights.entries()[0].id.clone();
        card.highlights.edit_content(&id, "1492");
        let author = AuthorProfile {
            nickname: "  ".into(),
            avatar: Some("avatar.png".into()),
        };
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();

        let record = HistoryCardRecord::from_snapshot(&card, &author, at);
        assert_eq!(record.id, format!("card-{}", at.timestamp_millis()));
        assert_eq!(record.highlights[0].id, id);
        assert_eq!(record.nickname, None);
        assert_eq!(record.avatar.as_deref(), Some("avatar.png"));
        assert_eq!(record.filled_highlights(), 1);
    }

    #[test]
    fn size_table_matches_ratios() {
        assert_eq!(CardSize::Phone.dimensions(), (360, 640));
        assert_eq!(CardSize::Desktop.ratio(), "16:9");
        assert_eq!(CardSize::Social.label(), "社交分享");
    }
}
