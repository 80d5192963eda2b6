use clap::{Parser, Subcommand};
use std::path::PathBuf;
use studycard::model::{CardSize, ColorScheme, ExportFormat};

#[derive(Parser, Debug)]
#[command(name = "studycard", bin_name = "studycard", version)]
#[command(about = "Compose study cards from highlight notes and export them as images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current card
    #[command(alias = "s")]
    Show {
        /// List fields and highlight positions instead of the card preview
        #[arg(long)]
        form: bool,
    },

    /// Change card fields
    Set {
        /// Subject shown as the card title (max 20 characters)
        #[arg(long)]
        subject: Option<String>,

        /// Card date, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,

        /// Color scheme: blue, green or pink
        #[arg(long)]
        scheme: Option<ColorScheme>,

        /// Size preset: standard, phone, tablet, desktop or social
        #[arg(long)]
        size: Option<CardSize>,

        /// Export format: png, jpg or pdf
        #[arg(long)]
        format: Option<ExportFormat>,
    },

    /// Add a highlight at the end
    #[command(alias = "a")]
    Add {
        /// Highlight text (an empty highlight when omitted)
        #[arg(num_args = 0..)]
        text: Vec<String>,
    },

    /// Replace the text of a highlight
    #[command(alias = "e")]
    Edit {
        /// Position of the highlight (1-based)
        position: usize,

        /// New text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Remove a highlight (the last one is kept)
    #[command(name = "rm", alias = "remove")]
    Remove {
        /// Position of the highlight (1-based)
        position: usize,
    },

    /// Move a highlight to another position
    #[command(name = "mv", alias = "move")]
    Move {
        /// Current position (1-based)
        from: usize,

        /// Target position (1-based)
        to: usize,
    },

    /// Show or change the author shown on cards
    Author {
        /// Nickname (max 20 characters)
        #[arg(long)]
        nickname: Option<String>,

        /// Avatar image reference
        #[arg(long, conflicts_with = "clear_avatar")]
        avatar: Option<String>,

        /// Remove the avatar
        #[arg(long)]
        clear_avatar: bool,
    },

    /// Export the card as an image or PDF
    #[command(alias = "x")]
    Export {
        /// Format for this and later exports
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Browse exported cards
    #[command(alias = "h")]
    History {
        #[command(subcommand)]
        action: Option<HistoryCommands>,
    },

    /// List size presets and color schemes
    Presets,

    /// Get or set configuration
    Config {
        /// Configuration key (e.g. output_dir)
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List exported cards, newest first
    #[command(alias = "ls")]
    List,

    /// Replace the current card with an exported one
    Load {
        /// Position in the list (1-based)
        position: usize,
    },

    /// Delete an exported card from the history
    #[command(alias = "rm")]
    Delete {
        /// Position in the list (1-based)
        position: usize,
    },

    /// Delete the whole history
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_presets() {
        let cli = Cli::parse_from([
            "studycard", "set", "--subject", "Math", "--scheme", "pink", "--size", "phone",
            "--format", "jpeg",
        ]);
        match cli.command {
            Some(Commands::Set {
                subject,
                scheme,
                size,
                format,
                date,
            }) => {
                assert_eq!(subject.as_deref(), Some("Math"));
                assert_eq!(scheme, Some(ColorScheme::Pink));
                assert_eq!(size, Some(CardSize::Phone));
                assert_eq!(format, Some(ExportFormat::Jpg));
                assert_eq!(date, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(Cli::try_parse_from(["studycard", "set", "--scheme", "purple"]).is_err());
    }

    #[test]
    fn parses_aliases_and_history_actions() {
        let cli = Cli::try_parse_from(["studycard", "remove", "2"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Remove { position: 2 })));

        let cli = Cli::try_parse_from(["studycard", "history", "load", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::History {
                action: Some(HistoryCommands::Load { position: 3 })
            })
        ));

        let cli = Cli::try_parse_from(["studycard", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn avatar_and_clear_conflict() {
        assert!(
            Cli::try_parse_from(["studycard", "author", "--avatar", "a.png", "--clear-avatar"])
                .is_err()
        );
    }
}
