use chrono::{DateTime, Utc};
use colored::Colorize;
use std::io::IsTerminal;
use studycard::config::{KEYS, StudyCardConfig};
use studycard::export::{Notice, Notifier};
use studycard::history::HistorySummary;
use studycard::model::{AuthorProfile, CardSize, CardState, ColorScheme};
use studycard::preview::{CardTarget, render_card, truncate_to_width};
use timeago::Formatter;
use unicode_width::UnicodeWidthStr;

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 16;
const CARD_WIDTH: usize = 44;

#[derive(Debug, Clone)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

/// Prints export notices: failures on stderr, everything else on stdout.
pub(super) struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        if notice.kind.is_error() {
            eprintln!("{} {}", notice.title.red().bold(), notice.description);
        } else {
            println!("{} {}", notice.title.green().bold(), notice.description.dimmed());
        }
    }
}

pub(super) fn print_card(card: &CardState, author: &AuthorProfile) {
    let target = CardTarget::new(card, author);
    println!(
        "{}",
        render_card(&target, CARD_WIDTH, std::io::stdout().is_terminal())
    );
}

pub(super) fn print_form(card: &CardState, author: &AuthorProfile) {
    let (w, h) = card.card_size.dimensions();
    let field = |name: &str| format!("{:<10}", name).bold();

    println!("{}{}", field("Subject"), display_or_dash(&card.subject));
    println!("{}{}", field("Date"), card.date);
    println!(
        "{}{} ({})",
        field("Scheme"),
        card.scheme.label(),
        card.scheme
    );
    println!(
        "{}{} {}×{} {} ({})",
        field("Size"),
        card.card_size.label(),
        w,
        h,
        card.card_size.ratio(),
        card.card_size
    );
    println!("{}{}", field("Format"), card.export_format.label());
    println!(
        "{}{}{}",
        field("Author"),
        display_or_dash(&author.nickname),
        if author.avatar.is_some() {
            " (avatar)".dimmed().to_string()
        } else {
            String::new()
        }
    );

    println!();
    println!("{}", "Highlights".bold());
    for (i, entry) in card.highlights.entries().iter().enumerate() {
        let idx = format!("{:>4}. ", i + 1);
        if entry.content.trim().is_empty() {
            println!("{}{}", idx.yellow(), "(empty)".dimmed());
        } else {
            let available = LINE_WIDTH.saturating_sub(idx.width());
            println!(
                "{}{}",
                idx.yellow(),
                truncate_to_width(&entry.content.replace('\n', " "), available)
            );
        }
    }
}

pub(super) fn print_history(summaries: &[HistorySummary]) {
    if summaries.is_empty() {
        println!("No exported cards yet.");
        return;
    }

    for (i, summary) in summaries.iter().enumerate() {
        let idx = format!("{:>4}. ", i + 1);
        let author = summary
            .nickname
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(|n| format!(" · {}", n))
            .unwrap_or_default();
        let left = format!("{}  {}{}  ", summary.title, summary.date, author);
        let right = summary.details.clone();

        let fixed = idx.width() + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let text = truncate_to_width(&format!("{}{}", left, right), available);
        let padding = available.saturating_sub(text.width());

        println!(
            "{}{}{}{}",
            idx.yellow(),
            text,
            " ".repeat(padding),
            format_time_ago(summary.created_at).dimmed()
        );
    }
}

pub(super) fn print_presets() {
    println!("{}", "Sizes".bold());
    for size in CardSize::ALL {
        let (w, h) = size.dimensions();
        let label = pad_to_width(size.label(), 10);
        println!(
            "  {:<9}{}{:>9}  {:<5} {}",
            size.to_string().yellow(),
            label,
            format!("{}×{}", w, h),
            size.ratio(),
            size.description().dimmed()
        );
    }

    println!();
    println!("{}", "Schemes".bold());
    for scheme in ColorScheme::ALL {
        let [r, g, b] = scheme.palette().keypoint;
        println!(
            "  {:<9}{} {}",
            scheme.to_string().yellow(),
            "■■".truecolor(r, g, b),
            scheme.label()
        );
    }
}

pub(super) fn print_config(config: &StudyCardConfig) {
    for key in KEYS {
        let value = config.get(key).unwrap_or_default();
        let value = if value.is_empty() {
            "(unset)".dimmed().to_string()
        } else {
            value
        };
        println!("{:<24}{}", key.bold(), value);
    }
}

fn display_or_dash(s: &str) -> String {
    if s.trim().is_empty() {
        "-".dimmed().to_string()
    } else {
        s.to_string()
    }
}

fn pad_to_width(s: &str, width: usize) -> String {
    format!("{}{}", s, " ".repeat(width.saturating_sub(s.width())))
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_ago_is_right_aligned() {
        let s = format_time_ago(Utc::now());
        assert_eq!(s.width(), TIME_WIDTH);
        assert!(s.trim_start().ends_with("ago") || s.trim() == "now");
    }
}
