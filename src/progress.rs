//! Progress channel and session observer.
//!
//! The service pushes `progress:<percent>` text frames over a WebSocket
//! addressed by the session's client id. [`ProgressChannel`] owns the single
//! connection a session opens; it runs as its own tokio task, independent of
//! the job request, and writes into a shared [`ProgressState`].
//!
//! The two tasks are only correlated by the client id, so a frame can arrive
//! after the job already finished. [`ProgressState`] drops frames that arrive
//! while no job is in flight, which keeps the reset-to-0 after completion from
//! being overwritten by a stale percentage.
//!
//! # Observers
//!
//! Inject an [`Arc<dyn SessionObserver>`] into the session to receive events.
//! All methods default to no-ops.
//!
//! ```rust
//! use edgequake_pdf2video::SessionObserver;
//! use std::sync::atomic::{AtomicU8, Ordering};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl SessionObserver for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//! ```

use futures::StreamExt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

// ── Observer ─────────────────────────────────────────────────────────────

/// Receives session events as they happen.
///
/// `on_channel_state` and `on_progress` are called from the progress channel
/// task, concurrently with the other methods, so implementations must be
/// `Send + Sync` and guard their own state.
pub trait SessionObserver: Send + Sync {
    /// The progress channel moved to `state`.
    fn on_channel_state(&self, state: ChannelState) {
        let _ = state;
    }

    /// A progress frame was accepted while a job is in flight.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// A job request is about to be sent.
    ///
    /// # Arguments
    /// * `file_name`       — name of the PDF being submitted
    /// * `estimated_pages` — heuristic page count, 0 when unknown
    fn on_submission_start(&self, file_name: &str, estimated_pages: usize) {
        let _ = (file_name, estimated_pages);
    }

    /// The service returned a video URL.
    fn on_submission_success(&self, video_url: &str) {
        let _ = video_url;
    }

    /// The job failed; `message` is what the session stored as its error.
    fn on_submission_error(&self, message: &str) {
        let _ = message;
    }

    /// The finished video was written to `path`.
    fn on_saved(&self, path: &Path) {
        let _ = path;
    }
}

/// A no-op observer; the default when none is configured.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type a session stores.
pub type SharedObserver = Arc<dyn SessionObserver>;

// ── Shared state ─────────────────────────────────────────────────────────

/// Lifecycle of the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// Not opened yet.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving frames.
    Connected,
    /// Torn down, failed, or closed by the server. Never reopened.
    Closed,
}

#[derive(Debug, Default)]
struct Inner {
    percent: u8,
    in_flight: bool,
    channel: ChannelState,
}

/// Progress percentage shared between the channel task and the session.
///
/// The percent is advisory display data; job completion is signalled by the
/// job request returning, never by this value reaching 100.
#[derive(Debug, Default)]
pub struct ProgressState {
    inner: Mutex<Inner>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current percentage, 0–100.
    pub fn percent(&self) -> u8 {
        self.lock().percent
    }

    /// Whether a job request is currently in flight.
    pub fn in_flight(&self) -> bool {
        self.lock().in_flight
    }

    pub fn channel_state(&self) -> ChannelState {
        self.lock().channel
    }

    /// Reset to 0 and start accepting frames.
    pub fn begin_job(&self) {
        let mut inner = self.lock();
        inner.percent = 0;
        inner.in_flight = true;
    }

    /// Reset to 0 and stop accepting frames.
    pub fn end_job(&self) {
        let mut inner = self.lock();
        inner.percent = 0;
        inner.in_flight = false;
    }

    /// Record a percentage from the channel.
    ///
    /// Returns `false` (and changes nothing) when no job is in flight.
    pub fn apply(&self, percent: u8) -> bool {
        let mut inner = self.lock();
        if !inner.in_flight {
            return false;
        }
        inner.percent = percent.min(100);
        true
    }

    fn set_channel_state(&self, state: ChannelState) {
        self.lock().channel = state;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding this lock cannot leave Inner half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse a `progress:<integer>` frame. Values above 100 are clamped.
///
/// Returns `None` for any other message.
pub fn parse_progress(message: &str) -> Option<u8> {
    let digits = message.trim().strip_prefix("progress:")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Long digit strings overflow u64; they are still "above 100".
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(100) as u8)
}

// ── Channel ──────────────────────────────────────────────────────────────

/// The session's progress connection.
///
/// Dropping the channel aborts its task, which drops the socket.
pub struct ProgressChannel {
    task: JoinHandle<()>,
    state: Arc<ProgressState>,
    observer: SharedObserver,
}

impl std::fmt::Debug for ProgressChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressChannel")
            .field("state", &self.state())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl ProgressChannel {
    /// Spawn the channel task. Must be called from within a tokio runtime.
    ///
    /// The task connects once; if the handshake fails or times out it logs a
    /// warning and the channel ends up [`ChannelState::Closed`]. There is no
    /// reconnect.
    pub fn open(
        url: impl Into<String>,
        connect_timeout: Duration,
        state: Arc<ProgressState>,
        observer: SharedObserver,
    ) -> Self {
        let url = url.into();
        let task = tokio::spawn(run_channel(
            url,
            connect_timeout,
            Arc::clone(&state),
            Arc::clone(&observer),
        ));
        Self {
            task,
            state,
            observer,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state.channel_state()
    }

    /// Whether the task has ended (connection failed or closed).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Tear the connection down.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        self.task.abort();
        let previous = self.state.channel_state();
        self.state.set_channel_state(ChannelState::Closed);
        if previous != ChannelState::Closed {
            self.observer.on_channel_state(ChannelState::Closed);
        }
    }
}

async fn run_channel(
    url: String,
    connect_timeout: Duration,
    state: Arc<ProgressState>,
    observer: SharedObserver,
) {
    let transition = |s: ChannelState| {
        state.set_channel_state(s);
        observer.on_channel_state(s);
    };

    transition(ChannelState::Connecting);
    debug!("Connecting progress channel: {}", url);

    let mut ws = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(e)) => {
            warn!("Progress channel unavailable ({}): {}", url, e);
            transition(ChannelState::Closed);
            return;
        }
        Err(_) => {
            warn!(
                "Progress channel handshake timed out after {:?} ({})",
                connect_timeout, url
            );
            transition(ChannelState::Closed);
            return;
        }
    };

    info!("Progress channel connected");
    transition(ChannelState::Connected);

    while let Some(next) = ws.next().await {
        match next {
            Ok(Message::Text(text)) => match parse_progress(&text) {
                Some(percent) => {
                    if state.apply(percent) {
                        debug!("Progress: {}%", percent);
                        observer.on_progress(percent);
                    } else {
                        debug!("Dropping progress {}% received with no job in flight", percent);
                    }
                }
                None => debug!("Ignoring progress channel message: {:?}", text),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Progress channel read failed: {}", e);
                break;
            }
        }
    }

    info!("Progress channel closed");
    transition(ChannelState::Closed);
}
