//! Configuration types for PDF-to-video job submission.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ClientConfig`] — where the service lives and how long to wait for it.
//!   Fixed for the whole session.
//! * [`GenerationConfig`] — the per-job parameters the user edits between
//!   submissions (slide duration, transitions, quality).
//!
//! Both are built through builders. Ranges on [`GenerationConfig`] are
//! advisory: the service clamps what it receives, so out-of-range values are
//! logged and passed through rather than rejected.

use crate::error::Pdf2VideoError;
use crate::transition::{Quality, TransitionSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable selecting the service base URL.
pub const API_URL_ENV: &str = "PDF2VIDEO_API_URL";

/// Base URL used when [`API_URL_ENV`] is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Advisory bounds for the per-slide duration, in seconds.
pub const DURATION_RANGE: (f64, f64) = (1.0, 60.0);

/// Advisory bounds for the transition overlap, in seconds.
pub const TRANSITION_DURATION_RANGE: (f64, f64) = (0.1, 5.0);

// ── Client ───────────────────────────────────────────────────────────────

/// Connection settings for the remote generation service.
///
/// # Example
/// ```rust
/// use edgequake_pdf2video::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://slides.example.com/")
///     .request_timeout_secs(600)
///     .build()
///     .unwrap();
/// assert_eq!(config.progress_url("client_abc"), "wss://slides.example.com/ws/client_abc");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service base URL without trailing slash. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Upper bound on one job request, in seconds. Default: 900.
    ///
    /// Encoding a long deck can take minutes, so this is generous; it exists
    /// so a stalled service cannot keep the client waiting forever.
    pub request_timeout_secs: u64,

    /// Upper bound on fetching a candidate PDF or the finished video. Default: 300.
    pub download_timeout_secs: u64,

    /// Upper bound on the progress channel handshake. Default: 10.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 900,
            download_timeout_secs: 300,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the base URL taken from `PDF2VIDEO_API_URL` when set.
    pub fn from_env() -> Self {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self {
                base_url: normalise_base_url(&url),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Endpoint receiving the multipart job request.
    pub fn generate_url(&self) -> String {
        format!("{}/generate-video", self.base_url)
    }

    /// Progress channel address for `client_id`: the base URL with its
    /// scheme swapped to the WebSocket equivalent.
    pub fn progress_url(&self, client_id: &str) -> String {
        format!("{}/ws/{}", websocket_base(&self.base_url), client_id)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl AsRef<str>) -> Self {
        self.config.base_url = normalise_base_url(url.as_ref());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, Pdf2VideoError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "API URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 || c.connect_timeout_secs == 0
        {
            return Err(Pdf2VideoError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

fn normalise_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Swap `http`→`ws` and `https`→`wss`.
fn websocket_base(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// Per-job generation parameters.
///
/// # Example
/// ```rust
/// use edgequake_pdf2video::{GenerationConfig, Quality};
///
/// let config = GenerationConfig::builder()
///     .duration(4.0)
///     .transitions(["crossfade", "zoom_in"])
///     .quality(Quality::Low)
///     .build()
///     .unwrap();
/// assert_eq!(config.transitions.to_wire(), "crossfade,zoom_in");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Seconds each slide stays on screen. Advisory range 1–60. Default: 5.
    pub duration: f64,

    /// Selected transition effects. Default: `{"none"}`.
    pub transitions: TransitionSet,

    /// Overlap between slides when a transition is selected. Advisory range
    /// 0.1–5. Default: 1.0.
    pub transition_duration: f64,

    /// Output quality tier. Default: [`Quality::High`].
    pub quality: Quality,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            duration: 5.0,
            transitions: TransitionSet::default(),
            transition_duration: 1.0,
            quality: Quality::default(),
        }
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Set the per-slide duration. Values outside 1–60 s are logged, not rejected.
    pub fn set_duration(&mut self, secs: f64) {
        if !in_range(secs, DURATION_RANGE) {
            warn!(
                "Slide duration {}s is outside the suggested {}–{}s range",
                secs, DURATION_RANGE.0, DURATION_RANGE.1
            );
        }
        self.duration = secs;
    }

    /// Set the transition overlap. Values outside 0.1–5 s are logged, not rejected.
    pub fn set_transition_duration(&mut self, secs: f64) {
        if !in_range(secs, TRANSITION_DURATION_RANGE) {
            warn!(
                "Transition duration {}s is outside the suggested {}–{}s range",
                secs, TRANSITION_DURATION_RANGE.0, TRANSITION_DURATION_RANGE.1
            );
        }
        self.transition_duration = secs;
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    pub fn toggle_transition(&mut self, id: &str) {
        self.transitions.toggle(id);
    }

    pub fn select_all_transitions(&mut self) {
        self.transitions.select_all();
    }

    pub fn clear_transitions(&mut self) {
        self.transitions.clear_all();
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn duration(mut self, secs: f64) -> Self {
        self.config.set_duration(secs);
        self
    }

    pub fn transitions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.transitions = TransitionSet::from_ids(ids);
        self
    }

    pub fn all_transitions(mut self) -> Self {
        self.config.transitions.select_all();
        self
    }

    pub fn transition_duration(mut self, secs: f64) -> Self {
        self.config.set_transition_duration(secs);
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.config.quality = quality;
        self
    }

    /// Build the configuration.
    ///
    /// Only values the service cannot interpret at all are rejected:
    /// non-finite or non-positive durations.
    pub fn build(self) -> Result<GenerationConfig, Pdf2VideoError> {
        let c = &self.config;
        if !c.duration.is_finite() || c.duration <= 0.0 {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "Slide duration must be a positive number of seconds, got {}",
                c.duration
            )));
        }
        if !c.transition_duration.is_finite() || c.transition_duration <= 0.0 {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "Transition duration must be a positive number of seconds, got {}",
                c.transition_duration
            )));
        }
        Ok(self.config)
    }
}

fn in_range(v: f64, (lo, hi): (f64, f64)) -> bool {
    v >= lo && v <= hi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, "http://localhost:8000");
        assert_eq!(c.generate_url(), "http://localhost:8000/generate-video");
        assert_eq!(c.progress_url("client_x"), "ws://localhost:8000/ws/client_x");
    }

    #[test]
    fn progress_url_swaps_tls_scheme() {
        let c = ClientConfig::builder()
            .base_url("https://render.example.com/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "https://render.example.com");
        assert_eq!(
            c.progress_url("client_1"),
            "wss://render.example.com/ws/client_1"
        );
    }

    #[test]
    fn client_rejects_non_http_base() {
        let err = ClientConfig::builder()
            .base_url("ftp://host")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn client_rejects_zero_timeout() {
        assert!(ClientConfig::builder().request_timeout_secs(0).build().is_err());
    }

    #[test]
    fn generation_defaults() {
        let g = GenerationConfig::default();
        assert_eq!(g.duration, 5.0);
        assert!(g.transitions.is_none());
        assert_eq!(g.transition_duration, 1.0);
        assert_eq!(g.quality, Quality::High);
    }

    #[test]
    fn out_of_range_duration_is_advisory() {
        let g = GenerationConfig::builder()
            .duration(90.0)
            .transition_duration(7.5)
            .build()
            .unwrap();
        assert_eq!(g.duration, 90.0);
        assert_eq!(g.transition_duration, 7.5);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert!(GenerationConfig::builder().duration(0.0).build().is_err());
        assert!(GenerationConfig::builder().duration(f64::NAN).build().is_err());
        assert!(GenerationConfig::builder()
            .transition_duration(-1.0)
            .build()
            .is_err());
    }

    #[test]
    fn setters_edit_in_place() {
        let mut g = GenerationConfig::default();
        g.toggle_transition("crossfade");
        g.toggle_transition("zoom_in");
        g.set_quality(Quality::Low);
        assert_eq!(g.transitions.to_wire(), "crossfade,zoom_in");
        g.clear_transitions();
        assert!(g.transitions.is_none());
        g.select_all_transitions();
        assert!(g.transitions.has_effect());
        assert_eq!(g.quality, Quality::Low);
    }
}
