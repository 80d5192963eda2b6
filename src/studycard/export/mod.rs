//! # Export
//!
//! Turns the current card into an image or PDF file and records it in the
//! history. The [`Exporter`] drives three collaborators:
//!
//! - [`Rasterizer`]: renders a [`CardTarget`] to pixels. May be slow, so it is async.
//! - [`FileEmitter`]: writes the pixels out in the chosen format.
//! - [`Notifier`]: shows the user a transient success or failure notice.
//!
//! An export either completes fully (file written, history appended and
//! saved, success notice) or has no effect on history or draft (one failure
//! notice). While one export is in flight, further requests return
//! [`ExportOutcome::Busy`] without touching any collaborator.
//!
//! The binary uses [`raster::SwatchRasterizer`] and [`emit::DiskEmitter`].

pub mod emit;
pub mod pdf;
pub mod raster;

use crate::error::{CardError, Result};
use crate::model::{CardState, ExportFormat, FALLBACK_SUBJECT};
use crate::preview::CardTarget;
use crate::session::Session;
use crate::store::KeyValueStore;
use chrono::Utc;
use image::RgbaImage;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

pub const SUCCESS_TITLE: &str = "卡片已生成并下载！";
pub const FAILURE_TITLE: &str = "生成失败";
pub const INVALID_TITLE: &str = "无法生成";
const NOTICE_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Pixel density multiplier over the preset dimensions.
    pub scale: u32,
    /// Leave the area outside the rounded card transparent instead of white.
    pub transparent_background: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            transparent_background: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub pixels: RgbaImage,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    /// Rasterizing or writing failed.
    Failure,
    /// The card could not be exported as it stands.
    Invalid,
}

impl NoticeKind {
    pub fn is_error(self) -> bool {
        !matches!(self, NoticeKind::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
    pub duration: Duration,
}

pub trait Rasterizer {
    fn rasterize(
        &self,
        target: &CardTarget,
        options: RasterOptions,
    ) -> impl Future<Output = Result<RasterImage>>;
}

pub trait FileEmitter {
    /// Writes `image` as `file_name` and returns where it landed.
    fn emit(&self, image: &RasterImage, format: ExportFormat, file_name: &str) -> Result<PathBuf>;
}

pub trait Notifier {
    fn notify(&self, notice: Notice);
}

impl<T: Rasterizer + ?Sized> Rasterizer for &T {
    fn rasterize(
        &self,
        target: &CardTarget,
        options: RasterOptions,
    ) -> impl Future<Output = Result<RasterImage>> {
        (**self).rasterize(target, options)
    }
}

impl<T: FileEmitter + ?Sized> FileEmitter for &T {
    fn emit(&self, image: &RasterImage, format: ExportFormat, file_name: &str) -> Result<PathBuf> {
        (**self).emit(image, format, file_name)
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    Exporting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub record_id: String,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported(ExportReport),
    /// Rasterizing or writing failed. History and draft are untouched.
    Failed(String),
    /// The card is missing a required field. No collaborator was invoked.
    Invalid(String),
    /// Another export is still running.
    Busy,
}

/// Resets the phase to idle however the export future ends, including
/// being dropped mid-flight.
struct PhaseGuard<'a>(&'a Cell<ExportPhase>);

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a Cell<ExportPhase>) -> Self {
        phase.set(ExportPhase::Exporting);
        Self(phase)
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.set(ExportPhase::Idle);
    }
}

pub struct Exporter<R, E, N> {
    rasterizer: R,
    emitter: E,
    notifier: N,
    options: RasterOptions,
    deadline: Option<Duration>,
    phase: Cell<ExportPhase>,
}

impl<R: Rasterizer, E: FileEmitter, N: Notifier> Exporter<R, E, N> {
    pub fn new(rasterizer: R, emitter: E, notifier: N) -> Self {
        Self {
            rasterizer,
            emitter,
            notifier,
            options: RasterOptions::default(),
            deadline: None,
            phase: Cell::new(ExportPhase::Idle),
        }
    }

    pub fn with_options(mut self, options: RasterOptions) -> Self {
        self.options = options;
        self
    }

    /// Bounds how long rasterizing may take. Awaiting an export with a
    /// deadline requires a tokio runtime with the time driver enabled.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline.filter(|d| !d.is_zero());
        self
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase.get()
    }

    /// Exports the session's current card as `format`.
    ///
    /// The session is borrowed only briefly: once to snapshot the card
    /// before rendering and once to record the history entry after the file
    /// is written. Edits made while rendering is in flight do not leak into
    /// the exported file or its history record.
    pub async fn export<B: KeyValueStore>(
        &self,
        session: &RefCell<Session<B>>,
        format: ExportFormat,
    ) -> ExportOutcome {
        if self.phase.get() == ExportPhase::Exporting {
            log::debug!("export requested while another is in flight, ignoring");
            return ExportOutcome::Busy;
        }
        let _guard = PhaseGuard::enter(&self.phase);

        let (mut card, author) = session.borrow().snapshot();
        card.export_format = format;
        if let Err(e) = card.validate_for_export() {
            let reason = match e {
                CardError::Validation(reason) => reason,
                other => other.to_string(),
            };
            self.notifier.notify(Notice {
                kind: NoticeKind::Invalid,
                title: INVALID_TITLE.to_string(),
                description: reason.clone(),
                duration: NOTICE_DURATION,
            });
            return ExportOutcome::Invalid(reason);
        }

        let target = CardTarget::new(&card, &author);
        let file_name = export_file_name(&card);
        log::info!(
            "exporting `{}` as {} ({})",
            target.title,
            format.label(),
            card.card_size.label()
        );

        let (path, width, height) = match self.render_and_emit(&target, format, &file_name).await {
            Ok(done) => done,
            Err(e) => {
                log::warn!("export failed: {}", e);
                let description = e.to_string();
                self.notifier.notify(Notice {
                    kind: NoticeKind::Failure,
                    title: FAILURE_TITLE.to_string(),
                    description: description.clone(),
                    duration: NOTICE_DURATION,
                });
                return ExportOutcome::Failed(description);
            }
        };

        let record = session
            .borrow_mut()
            .record_export(&card, &author, Utc::now());
        log::debug!("recorded export as {}", record.id);
        self.notifier.notify(Notice {
            kind: NoticeKind::Success,
            title: SUCCESS_TITLE.to_string(),
            description: format!("已保存到 {}", path.display()),
            duration: NOTICE_DURATION,
        });

        ExportOutcome::Exported(ExportReport {
            path,
            record_id: record.id,
            format,
            width,
            height,
        })
    }

    async fn render_and_emit(
        &self,
        target: &CardTarget,
        format: ExportFormat,
        file_name: &str,
    ) -> Result<(PathBuf, u32, u32)> {
        let render = self.rasterizer.rasterize(target, self.options);
        let image = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, render)
                .await
                .map_err(|_| CardError::Timeout(deadline.as_secs()))??,
            None => render.await?,
        };
        let path = self.emitter.emit(&image, format, file_name)?;
        Ok((path, image.width(), image.height()))
    }
}

/// `<subject>_<size label>.<ext>`, falling back to a generic name for an
/// empty subject. Path separators and other characters unsafe in file names
/// become underscores.
pub fn export_file_name(card: &CardState) -> String {
    let subject = card.subject.trim();
    let subject = if subject.is_empty() {
        FALLBACK_SUBJECT
    } else {
        subject
    };
    format!(
        "{}_{}.{}",
        sanitize(subject),
        card.card_size.label(),
        card.export_format.extension()
    )
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
