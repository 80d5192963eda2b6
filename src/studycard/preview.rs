//! # Card Preview
//!
//! Builds the visual target of a card: the frozen, render-ready view of a
//! snapshot that a rasterizer draws and that the terminal preview prints.
//! Placeholder subject, icon and numbering with blanks removed are all
//! resolved here rather than in each renderer.

use crate::model::{AuthorProfile, CardSize, CardState, ColorScheme, Palette};
use colored::Colorize;
use once_cell::sync::Lazy;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SUBJECT_PLACEHOLDER: &str = "学习主题";
const EMPTY_PLACEHOLDER: &str = "在此填写您的学习内容…";
const SECTION_TITLE: &str = "重点 Key Points";
const FOOTER: &str = "由「生成学习卡片」小站制作";

/// Icon shown before the subject, picked from keywords in the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectIcon {
    Calendar,
    Beaker,
    Book,
}

impl SubjectIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            SubjectIcon::Calendar => "📅",
            SubjectIcon::Beaker => "🧪",
            SubjectIcon::Book => "📖",
        }
    }
}

// Checked in order; the first table with a hit wins.
static ICON_KEYWORDS: Lazy<Vec<(SubjectIcon, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (SubjectIcon::Calendar, vec!["文", "history", "历", "日"]),
        (
            SubjectIcon::Beaker,
            vec![
                "理", "数", "算", "科", "化", "物", "beaker", "science", "化学", "实验",
            ],
        ),
        (
            SubjectIcon::Book,
            vec![
                "英", "book", "单词", "文献", "书", "词", "语", "language", "reading", "writing",
            ],
        ),
    ]
});

pub fn subject_icon(subject: &str) -> Option<SubjectIcon> {
    let subject = subject.to_lowercase();
    if subject.trim().is_empty() {
        return None;
    }
    ICON_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| subject.contains(w)))
        .map(|(icon, _)| *icon)
}

/// Render-ready view of a card snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTarget {
    pub title: String,
    pub date: String,
    pub icon: Option<SubjectIcon>,
    /// Numbered non-blank highlights, in render order.
    pub points: Vec<(usize, String)>,
    pub scheme: ColorScheme,
    pub size: CardSize,
    pub nickname: Option<String>,
    pub has_avatar: bool,
}

impl CardTarget {
    pub fn new(card: &CardState, author: &AuthorProfile) -> Self {
        let subject = card.subject.trim();
        let nickname = author.nickname.trim();
        Self {
            title: if subject.is_empty() {
                SUBJECT_PLACEHOLDER.to_string()
            } else {
                subject.to_string()
            },
            date: card.date.clone(),
            icon: subject_icon(subject),
            points: card
                .highlights
                .rendered()
                .map(|(n, e)| (n, e.content.trim().to_string()))
                .collect(),
            scheme: card.scheme,
            size: card.card_size,
            nickname: (!nickname.is_empty()).then(|| nickname.to_string()),
            has_avatar: author.avatar.is_some(),
        }
    }

    pub fn palette(&self) -> Palette {
        self.scheme.palette()
    }
}

/// Renders the card as a framed block of text `width` columns wide.
/// With `styled`, the frame and highlights use the scheme colors.
pub fn render_card(target: &CardTarget, width: usize, styled: bool) -> String {
    let width = width.max(24);
    let inner = width - 4;
    let palette = target.palette();
    let paint = |text: &str, rgb: [u8; 3], bold: bool| -> String {
        if !styled {
            return text.to_string();
        }
        let colored = text.truecolor(rgb[0], rgb[1], rgb[2]);
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    };

    let mut lines = Vec::new();
    let border = format!("╭{}╮", "─".repeat(width - 2));
    lines.push(paint(&border, palette.keypoint, false));

    let heading = match target.icon {
        Some(icon) => format!("{} {}", icon.glyph(), target.title),
        None => target.title.clone(),
    };
    let heading = truncate_to_width(&heading, inner.saturating_sub(target.date.width() + 1));
    let gap = inner.saturating_sub(heading.width() + target.date.width());
    lines.push(frame(
        &format!(
            "{}{}{}",
            paint(&heading, palette.text, true),
            " ".repeat(gap),
            paint(&target.date, palette.text, false)
        ),
        inner,
        inner,
        &paint("│", palette.keypoint, false),
    ));
    lines.push(frame("", 0, inner, &paint("│", palette.keypoint, false)));
    lines.push(frame(
        &paint(SECTION_TITLE, palette.text, true),
        SECTION_TITLE.width(),
        inner,
        &paint("│", palette.keypoint, false),
    ));

    if target.points.is_empty() {
        lines.push(frame(
            EMPTY_PLACEHOLDER,
            EMPTY_PLACEHOLDER.width(),
            inner,
            &paint("│", palette.keypoint, false),
        ));
    }
    for (number, text) in &target.points {
        let marker = format!("{}. ", number);
        let body_width = inner.saturating_sub(marker.width()).max(1);
        for (i, chunk) in wrap(text, body_width).into_iter().enumerate() {
            let prefix = if i == 0 {
                marker.clone()
            } else {
                " ".repeat(marker.width())
            };
            let used = prefix.width() + chunk.width();
            lines.push(frame(
                &format!("{}{}", prefix, paint(&chunk, palette.keypoint, true)),
                used,
                inner,
                &paint("│", palette.keypoint, false),
            ));
        }
    }

    lines.push(frame("", 0, inner, &paint("│", palette.keypoint, false)));
    let footer = match &target.nickname {
        Some(name) => format!("by {} · {}", name, FOOTER),
        None => FOOTER.to_string(),
    };
    let footer = truncate_to_width(&footer, inner);
    let pad = inner.saturating_sub(footer.width());
    lines.push(frame(
        &format!("{}{}", " ".repeat(pad), paint(&footer, palette.text, false)),
        inner,
        inner,
        &paint("│", palette.keypoint, false),
    ));
    let bottom = format!("╰{}╯", "─".repeat(width - 2));
    lines.push(paint(&bottom, palette.keypoint, false));

    lines.join("\n")
}

/// Wraps `content` (whose visible width is `used`) in side borders.
fn frame(content: &str, used: usize, inner: usize, side: &str) -> String {
    format!(
        "{} {}{} {}",
        side,
        content,
        " ".repeat(inner.saturating_sub(used)),
        side
    )
}

/// Greedy wrap by display width; wide (CJK) characters count as two.
fn wrap(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        let mut width = 0;
        for c in paragraph.chars() {
            let w = c.width().unwrap_or(0);
            if width + w > max_width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                width = 0;
            }
            line.push(c);
            width += w;
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Cuts `s` to at most `max_width` display columns, ending in `…` when cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}
