//! # CLI Layer
//!
//! One client of the studycard library. This is the only place that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Uses `std::process::exit`
//! - Initializes logging and the async runtime
//! - Resolves the data directory
//!
//! Every change goes through [`Session`]; handlers translate 1-based
//! positions typed by the user into the ids and indexes the session expects,
//! then print the result.

use super::print::{
    CmdMessage, TerminalNotifier, print_card, print_config, print_form, print_history,
    print_messages, print_presets,
};
use super::setup::{Cli, Commands, HistoryCommands};
use clap::Parser;
use directories::ProjectDirs;
use std::cell::RefCell;
use std::path::PathBuf;
use studycard::config::StudyCardConfig;
use studycard::error::{CardError, Result};
use studycard::export::emit::DiskEmitter;
use studycard::export::raster::SwatchRasterizer;
use studycard::export::{ExportOutcome, Exporter, RasterOptions};
use studycard::history::HistorySummary;
use studycard::model::{CardSize, ColorScheme, ExportFormat};
use studycard::persist::Persistence;
use studycard::session::Session;
use studycard::store::fs::FsBackend;
use studycard::store::{DRAFT_KEY, KeyValueStore};

const HOME_ENV: &str = "STUDYCARD_HOME";

struct AppContext {
    session: RefCell<Session<FsBackend>>,
    config: StudyCardConfig,
    data_dir: PathBuf,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = init_context()?;

    match cli.command {
        None => handle_show(&ctx, false),
        Some(Commands::Show { form }) => handle_show(&ctx, form),
        Some(Commands::Set {
            subject,
            date,
            scheme,
            size,
            format,
        }) => handle_set(&ctx, subject, date, scheme, size, format),
        Some(Commands::Add { text }) => handle_add(&ctx, text),
        Some(Commands::Edit { position, text }) => handle_edit(&ctx, position, text),
        Some(Commands::Remove { position }) => handle_remove(&ctx, position),
        Some(Commands::Move { from, to }) => handle_move(&ctx, from, to),
        Some(Commands::Author {
            nickname,
            avatar,
            clear_avatar,
        }) => handle_author(&ctx, nickname, avatar, clear_avatar),
        Some(Commands::Export { format, out }) => {
            if !handle_export(&ctx, format, out)? {
                // The notice already explained what went wrong.
                drop(ctx);
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::History { action }) => handle_history(&ctx, action),
        Some(Commands::Presets) => {
            print_presets();
            Ok(())
        }
        Some(Commands::Config { key, value }) => handle_config(&ctx, key, value),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .try_init();
}

fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    let proj_dirs = ProjectDirs::from("com", "studycard", "studycard")
        .ok_or_else(|| CardError::Store("Could not determine data directory".to_string()))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

fn init_context() -> Result<AppContext> {
    let data_dir = data_dir()?;
    log::debug!("using data directory {}", data_dir.display());

    let config = StudyCardConfig::load(&data_dir).unwrap_or_else(|e| {
        log::warn!("ignoring unreadable config: {}", e);
        StudyCardConfig::default()
    });

    let backend = FsBackend::new(&data_dir);
    let fresh = matches!(backend.get(DRAFT_KEY), Ok(None));
    let mut session = Session::open(Persistence::new(backend));
    if fresh && session.card().export_format != config.default_format {
        session.set_export_format(config.default_format);
    }

    Ok(AppContext {
        session: RefCell::new(session),
        config,
        data_dir,
    })
}

fn handle_show(ctx: &AppContext, form: bool) -> Result<()> {
    let session = ctx.session.borrow();
    if form {
        print_form(session.card(), session.author());
    } else {
        print_card(session.card(), session.author());
    }
    Ok(())
}

fn handle_set(
    ctx: &AppContext,
    subject: Option<String>,
    date: Option<String>,
    scheme: Option<ColorScheme>,
    size: Option<CardSize>,
    format: Option<ExportFormat>,
) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    let mut messages = Vec::new();

    // Validate the date first so a bad value leaves every field untouched.
    if let Some(date) = &date {
        studycard::model::parse_date(date)?;
    }

    if let Some(subject) = subject {
        session.set_subject(&subject);
        if session.card().subject != subject {
            messages.push(CmdMessage::warning(format!(
                "Subject cut to 20 characters: {}",
                session.card().subject
            )));
        }
    }
    if let Some(date) = date {
        session.set_date(&date)?;
    }
    if let Some(scheme) = scheme {
        session.set_scheme(scheme);
    }
    if let Some(size) = size {
        session.set_card_size(size);
    }
    if let Some(format) = format {
        session.set_export_format(format);
    }

    if session.is_dirty() {
        session.flush();
        messages.push(CmdMessage::success("Card updated."));
    } else {
        messages.push(CmdMessage::info("Nothing to change."));
    }
    print_messages(&messages);
    Ok(())
}

fn handle_add(ctx: &AppContext, text: Vec<String>) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    let text = text.join(" ");
    if text.trim().is_empty() {
        session.add_highlight();
    } else {
        session.add_highlight_with(&text);
    }
    session.flush();

    let position = session.card().highlights.len();
    print_messages(&[CmdMessage::success(format!("Added highlight {}.", position))]);
    Ok(())
}

fn handle_edit(ctx: &AppContext, position: usize, text: Vec<String>) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    let id = session.highlight_id_at(position)?;
    session.edit_highlight(&id, &text.join(" "));
    session.flush();
    print_messages(&[CmdMessage::success(format!("Updated highlight {}.", position))]);
    Ok(())
}

fn handle_remove(ctx: &AppContext, position: usize) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    let id = session.highlight_id_at(position)?;
    let message = if session.remove_highlight(&id) {
        session.flush();
        CmdMessage::success(format!("Removed highlight {}.", position))
    } else {
        CmdMessage::warning("A card keeps at least one highlight.")
    };
    print_messages(&[message]);
    Ok(())
}

fn handle_move(ctx: &AppContext, from: usize, to: usize) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    let len = session.card().highlights.len();
    let to_index = to
        .checked_sub(1)
        .filter(|i| *i < len)
        .ok_or(CardError::IndexOutOfRange { index: to, len })?;
    let id = session.highlight_id_at(from)?;
    session.move_highlight(&id, to_index)?;
    session.flush();
    print_messages(&[CmdMessage::success(format!(
        "Moved highlight {} to {}.",
        from, to
    ))]);
    Ok(())
}

fn handle_author(
    ctx: &AppContext,
    nickname: Option<String>,
    avatar: Option<String>,
    clear_avatar: bool,
) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    if nickname.is_none() && avatar.is_none() && !clear_avatar {
        let author = session.author();
        if author.is_empty() {
            print_messages(&[CmdMessage::info("No author set.")]);
        } else {
            println!("{}", author.nickname);
            if let Some(avatar) = &author.avatar {
                println!("{}", avatar);
            }
        }
        return Ok(());
    }

    if let Some(nickname) = nickname {
        session.set_nickname(&nickname);
    }
    if let Some(avatar) = avatar {
        session.set_avatar(Some(avatar));
    }
    if clear_avatar {
        session.set_avatar(None);
    }
    session.flush();
    print_messages(&[CmdMessage::success("Author updated.")]);
    Ok(())
}

/// Returns whether the card was written.
fn handle_export(
    ctx: &AppContext,
    format: Option<ExportFormat>,
    out: Option<PathBuf>,
) -> Result<bool> {
    // A format given here becomes the card's format for later exports too.
    let format = {
        let mut session = ctx.session.borrow_mut();
        if let Some(format) = format {
            session.set_export_format(format);
            session.flush();
        }
        session.card().export_format
    };

    let dir = out
        .or_else(|| ctx.config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let exporter = Exporter::new(SwatchRasterizer, DiskEmitter::new(dir), TerminalNotifier)
        .with_options(RasterOptions {
            scale: ctx.config.scale,
            transparent_background: ctx.config.transparent_background,
        })
        .with_deadline(ctx.config.rasterize_timeout());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let outcome = runtime.block_on(exporter.export(&ctx.session, format));

    match outcome {
        ExportOutcome::Exported(report) => {
            log::debug!(
                "exported {}×{} {} as {}",
                report.width,
                report.height,
                report.format,
                report.record_id
            );
            Ok(true)
        }
        ExportOutcome::Busy => {
            print_messages(&[CmdMessage::warning("An export is already running.")]);
            Ok(false)
        }
        ExportOutcome::Failed(_) | ExportOutcome::Invalid(_) => Ok(false),
    }
}

fn handle_history(ctx: &AppContext, action: Option<HistoryCommands>) -> Result<()> {
    let mut session = ctx.session.borrow_mut();
    match action.unwrap_or(HistoryCommands::List) {
        HistoryCommands::List => {
            let summaries: Vec<HistorySummary> = session
                .history()
                .records()
                .iter()
                .map(HistorySummary::from)
                .collect();
            print_history(&summaries);
        }
        HistoryCommands::Load { position } => {
            let id = session.history_id_at(position)?;
            session.load_history_entry(&id);
            session.flush();
            print_messages(&[CmdMessage::success(format!(
                "Loaded card {} into the editor.",
                position
            ))]);
        }
        HistoryCommands::Delete { position } => {
            let id = session.history_id_at(position)?;
            session.delete_history_entry(&id);
            print_messages(&[CmdMessage::success(format!(
                "Deleted card {} from history.",
                position
            ))]);
        }
        HistoryCommands::Clear => {
            let count = session.history().len();
            session.clear_history();
            print_messages(&[CmdMessage::success(format!(
                "Cleared {} card(s) from history.",
                count
            ))]);
        }
    }
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    match (key, value) {
        (None, _) => print_config(&ctx.config),
        (Some(key), None) => match ctx.config.get(&key) {
            Some(value) => println!("{}", value),
            None => print_messages(&[CmdMessage::error(format!(
                "Unknown config key: {}",
                key
            ))]),
        },
        (Some(key), Some(value)) => {
            let mut config = ctx.config.clone();
            config.set(&key, &value)?;
            config.save(&ctx.data_dir)?;
            let display = config.get(&key).unwrap_or(value);
            print_messages(&[CmdMessage::success(format!("{} set to {}", key, display))]);
        }
    }
    Ok(())
}
