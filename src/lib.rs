//! # edgequake-pdf2video
//!
//! Turn a PDF slide deck into a slideshow video by submitting it to a remote
//! conversion service, following the job's progress live and saving the
//! finished video locally.
//!
//! ## What runs where?
//!
//! The heavy lifting (rasterising pages, composing transitions, encoding
//! H.264) happens on the service. This crate is the client: it validates and
//! inspects the file, collects the generation parameters, estimates the
//! running time, submits the job, listens for progress and saves the result.
//!
//! ## Session Overview
//!
//! ```text
//! PDF (path or URL)
//!  │
//!  ├─ 1. Intake    resolve, check declared type is application/pdf
//!  ├─ 2. Estimate  count `/Type /Page` markers → slides × duration
//!  ├─ 3. Submit    multipart POST /generate-video   ┐ concurrent,
//!  ├─ 4. Progress  WebSocket `progress:<n>` frames  ┘ keyed by client id
//!  └─ 5. Deliver   fetch video → save prompt, else download directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2video::{ClientConfig, DirectorySaver, NoopObserver, Session};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Service address from PDF2VIDEO_API_URL, default http://localhost:8000
//!     let mut session = Session::start(ClientConfig::from_env(), Arc::new(NoopObserver))?;
//!
//!     session.select_input("deck.pdf").await?;
//!     session.generation.toggle_transition("crossfade");
//!     eprintln!("estimated: {:?}", session.estimated_duration());
//!
//!     if let Some(url) = session.submit().await? {
//!         eprintln!("video at {url}");
//!         session.download(None, &DirectorySaver::new(".")).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2video` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2video = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod delivery;
pub mod error;
pub mod estimate;
pub mod intake;
pub mod progress;
pub mod session;
pub mod submit;
pub mod transition;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, GenerationConfig, GenerationConfigBuilder};
pub use delivery::{DeliveryOutcome, DirectorySaver, PromptSaver, SaveStrategy};
pub use error::{Pdf2VideoError, SaveError};
pub use estimate::{count_pages, format_duration};
pub use intake::CandidateFile;
pub use progress::{
    parse_progress, ChannelState, NoopObserver, ProgressChannel, ProgressState, SessionObserver,
    SharedObserver,
};
pub use session::{AcceptedFile, ClientId, Session};
pub use submit::JobRequest;
pub use transition::{Quality, TransitionSet, KNOWN_TRANSITIONS, NO_TRANSITION};
