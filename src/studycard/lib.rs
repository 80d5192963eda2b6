//! # Studycard Architecture
//!
//! Studycard composes a single study card (subject, date, numbered highlights,
//! color scheme, size preset) and exports it as PNG, JPG or PDF, keeping the
//! last fifty exports as a reusable history. The library owns all state and
//! rules; the binary is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prints previews and notices            │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session + Exporter (session.rs, export/)                   │
//! │  - Every mutation of the draft, author and history          │
//! │  - Export pipeline with a single in-flight export           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model (model.rs, highlights.rs, history.rs, preview.rs)    │
//! │  - Plain values and their invariants, no I/O                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Persistence (persist.rs, store/)                           │
//! │  - Versioned codecs with legacy migration                   │
//! │  - KeyValueStore trait: FsBackend, MemBackend (testing)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: the session is the only writer
//!
//! Draft, author profile and history change only through [`session::Session`]
//! methods. Each method keeps the invariants (at least one highlight, unique
//! ids, history capped at fifty) and marks what needs saving; loading never
//! fails, so a corrupt or legacy store degrades to defaults with a warning
//! in the log.
//!
//! ## Testing Strategy
//!
//! 1. Model and session logic: unit tests over [`store::memory::MemBackend`].
//! 2. Filesystem and image output: `tempfile` directories.
//! 3. Export orchestration: async tests with fake collaborators, polling an
//!    export mid-flight to check re-entry.
//! 4. Binary: `assert_cmd` tests under `tests/` with a throwaway data dir.
//!
//! ## Module Overview
//!
//! - [`model`]: Card, author, history record and the preset enums
//! - [`highlights`]: The ordered highlight list
//! - [`history`]: Capped newest-first export history
//! - [`session`]: The aggregate that applies and saves every change
//! - [`inline_edit`]: Edit-in-place state for the preview surface
//! - [`persist`]: Store keys, codecs and legacy migration
//! - [`store`]: Key-value storage abstraction and implementations
//! - [`preview`]: Render-ready card view and terminal rendering
//! - [`export`]: Export orchestration, rasterizer, file output
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod export;
pub mod highlights;
pub mod history;
pub mod inline_edit;
pub mod model;
pub mod persist;
pub mod preview;
pub mod session;
pub mod store;
