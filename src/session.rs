//! The client session: one owner for every piece of state.
//!
//! A [`Session`] corresponds to one run of the client. It holds the accepted
//! file, the generation parameters, the page estimate, the loading flag, the
//! result URL and the single error slot, and exposes explicit operations that
//! move between them:
//!
//! ```text
//!            select_file ──▶ (estimate) ──▶ submit ──▶ download
//!                 │                           │           │
//!   error slot ◀──┴───────────────────────────┴───────────┘
//! ```
//!
//! The progress channel is the only other task. It shares
//! [`ProgressState`] with the session and nothing else.
//!
//! Every failing operation records its user-facing message in the error slot
//! and leaves the session usable; the next successful operation clears it.

use crate::config::{ClientConfig, GenerationConfig};
use crate::delivery::{self, DeliveryOutcome, SaveStrategy};
use crate::error::Pdf2VideoError;
use crate::estimate;
use crate::intake::{self, CandidateFile};
use crate::progress::{
    ChannelState, NoopObserver, ProgressChannel, ProgressState, SharedObserver,
};
use crate::submit::{self, JobRequest};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ── Client identity ──────────────────────────────────────────────────────

/// Prefix of every generated client id.
pub const CLIENT_ID_PREFIX: &str = "client_";

const CLIENT_ID_RANDOM_LEN: usize = 9;

/// Opaque token correlating a session's progress channel with its jobs.
///
/// Generated once per session and never regenerated. It carries no identity
/// the server can verify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// `client_` followed by nine random lowercase alphanumerics.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CLIENT_ID_RANDOM_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        Self(format!("{CLIENT_ID_PREFIX}{suffix}"))
    }

    /// Wrap an existing token.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// A PDF the session accepted.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    pub file: CandidateFile,
    /// Heuristic page count; 0 until the estimate has run.
    pub page_estimate: usize,
}

/// State and operations of one client session.
pub struct Session {
    client_id: ClientId,
    client_config: ClientConfig,
    http: reqwest::Client,
    observer: SharedObserver,
    progress: Arc<ProgressState>,
    channel: Option<ProgressChannel>,

    /// Job parameters; edit freely between submissions.
    pub generation: GenerationConfig,

    file: Option<AcceptedFile>,
    loading: bool,
    result_url: Option<String>,
    error: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("client_config", &self.client_config)
            .field("generation", &self.generation)
            .field("file", &self.file.as_ref().map(|a| &a.file.name))
            .field("page_estimate", &self.page_estimate())
            .field("loading", &self.loading)
            .field("progress", &self.progress.percent())
            .field("channel", &self.channel_state())
            .field("result_url", &self.result_url)
            .field("error", &self.error)
            .finish()
    }
}

impl Session {
    /// Create a session without opening the progress channel.
    pub fn new(client_config: ClientConfig) -> Result<Self, Pdf2VideoError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Pdf2VideoError::Internal(format!("HTTP client: {e}")))?;

        let client_id = ClientId::generate();
        debug!("Session client id: {}", client_id);

        Ok(Self {
            client_id,
            client_config,
            http,
            observer: Arc::new(NoopObserver),
            progress: Arc::new(ProgressState::new()),
            channel: None,
            generation: GenerationConfig::default(),
            file: None,
            loading: false,
            result_url: None,
            error: None,
        })
    }

    /// Create a session and open its progress channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        client_config: ClientConfig,
        observer: SharedObserver,
    ) -> Result<Self, Pdf2VideoError> {
        let mut session = Self::new(client_config)?.with_observer(observer);
        session.open_progress_channel();
        Ok(session)
    }

    /// Replace the observer. Affects a progress channel only if it is opened
    /// afterwards.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Open the session's single progress channel. Later calls are no-ops.
    pub fn open_progress_channel(&mut self) {
        if self.channel.is_some() {
            return;
        }
        let url = self.client_config.progress_url(self.client_id.as_str());
        self.channel = Some(ProgressChannel::open(
            url,
            Duration::from_secs(self.client_config.connect_timeout_secs),
            Arc::clone(&self.progress),
            Arc::clone(&self.observer),
        ));
    }

    /// Close the progress channel, releasing its socket.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    pub fn file(&self) -> Option<&AcceptedFile> {
        self.file.as_ref()
    }

    /// Heuristic page count, 0 when no file is accepted yet.
    pub fn page_estimate(&self) -> usize {
        self.file.as_ref().map_or(0, |a| a.page_estimate)
    }

    /// Estimated running time, formatted, when a page estimate exists.
    pub fn estimated_duration(&self) -> Option<String> {
        estimate::describe_estimate(self.page_estimate(), self.generation.duration)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Advisory progress percentage of the job in flight.
    pub fn progress(&self) -> u8 {
        self.progress.percent()
    }

    pub fn progress_state(&self) -> Arc<ProgressState> {
        Arc::clone(&self.progress)
    }

    pub fn channel_state(&self) -> ChannelState {
        self.progress.channel_state()
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Resolve `input` (path or URL) and offer it to [`Session::select_file`].
    pub async fn select_input(&mut self, input: &str) -> Result<(), Pdf2VideoError> {
        let timeout = Duration::from_secs(self.client_config.download_timeout_secs);
        match intake::resolve_candidate(&self.http, input, timeout).await {
            Ok(candidate) => self.select_file(candidate).await,
            Err(e) => Err(self.record(e)),
        }
    }

    /// Validate and accept a candidate file.
    ///
    /// A non-PDF candidate is rejected; the previously accepted file and
    /// result stay as they were. An accepted file clears the error slot and
    /// any previous result, then runs the page estimate.
    pub async fn select_file(&mut self, candidate: CandidateFile) -> Result<(), Pdf2VideoError> {
        if let Err(e) = intake::validate(&candidate) {
            warn!("Rejected '{}' ({})", candidate.name, candidate.media_type);
            return Err(self.record(e));
        }

        info!("Accepted '{}' ({} bytes)", candidate.name, candidate.len());
        self.error = None;
        self.result_url = None;
        self.file = Some(AcceptedFile {
            file: candidate,
            page_estimate: 0,
        });

        self.run_estimate().await;
        Ok(())
    }

    async fn run_estimate(&mut self) {
        let Some(accepted) = self.file.as_mut() else {
            return;
        };
        let bytes = accepted.file.bytes.clone();
        let pages = match tokio::task::spawn_blocking(move || estimate::count_pages(&bytes)).await
        {
            Ok(n) => n,
            Err(e) => {
                warn!("Page estimate task failed: {}", e);
                1
            }
        };
        accepted.page_estimate = pages;
        info!("Estimated {} pages", pages);
    }

    /// Submit the accepted file with the current generation parameters.
    ///
    /// Returns `Ok(None)` without doing anything when no file is accepted.
    /// On success the video URL is stored and returned. On failure the
    /// message is stored in the error slot. Either way the loading flag is
    /// cleared and progress is back to 0 afterwards.
    pub async fn submit(&mut self) -> Result<Option<String>, Pdf2VideoError> {
        let Some(accepted) = self.file.as_ref() else {
            debug!("submit() with no file selected; ignoring");
            return Ok(None);
        };

        let job = JobRequest::new(
            accepted.file.clone(),
            self.generation.clone(),
            self.client_id.clone(),
        );
        let page_estimate = accepted.page_estimate;

        self.error = None;

        let start = Instant::now();
        let outcome = {
            // Dropping this future mid-request still resets loading and progress.
            let _job = JobGuard::begin(&mut self.loading, &self.progress);
            self.observer
                .on_submission_start(&job.file.name, page_estimate);
            submit::send_job(
                &self.http,
                &self.client_config.generate_url(),
                &job,
                Duration::from_secs(self.client_config.request_timeout_secs),
            )
            .await
        };

        match outcome {
            Ok(url) => {
                info!(
                    "Video ready in {}ms: {}",
                    start.elapsed().as_millis(),
                    url
                );
                self.result_url = Some(url.clone());
                self.observer.on_submission_success(&url);
                Ok(Some(url))
            }
            Err(e) => {
                let e = self.record(e);
                self.observer.on_submission_error(&e.user_message());
                Err(e)
            }
        }
    }

    /// Fetch the video and save it.
    ///
    /// `primary` is tried first when present; a cancelled primary ends the
    /// download quietly, any other primary failure falls back to `fallback`.
    /// Returns `Ok(None)` when there is no result to download.
    pub async fn download(
        &mut self,
        primary: Option<&dyn SaveStrategy>,
        fallback: &dyn SaveStrategy,
    ) -> Result<Option<DeliveryOutcome>, Pdf2VideoError> {
        let Some(url) = self.result_url.clone() else {
            debug!("download() with no result; ignoring");
            return Ok(None);
        };

        let bytes = match delivery::fetch_artifact(
            &self.http,
            &url,
            Duration::from_secs(self.client_config.download_timeout_secs),
        )
        .await
        {
            Ok(b) => b,
            Err(e) => return Err(self.record(e)),
        };

        let file_name = delivery::artifact_filename(&url);
        match delivery::deliver(&bytes, &file_name, primary, fallback).await {
            Ok(outcome) => {
                self.error = None;
                if let DeliveryOutcome::Saved { ref path, .. } = outcome {
                    self.observer.on_saved(path);
                }
                Ok(Some(outcome))
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Store `e`'s message in the error slot and hand `e` back.
    fn record(&mut self, e: Pdf2VideoError) -> Pdf2VideoError {
        self.error = Some(e.user_message());
        e
    }
}

/// Loading flag and in-flight progress for the lifetime of one job request.
struct JobGuard<'a> {
    loading: &'a mut bool,
    progress: &'a ProgressState,
}

impl<'a> JobGuard<'a> {
    fn begin(loading: &'a mut bool, progress: &'a ProgressState) -> Self {
        *loading = true;
        progress.begin_job();
        Self { loading, progress }
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        *self.loading = false;
        self.progress.end_job();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NOT_A_PDF_MESSAGE;

    fn session() -> Session {
        Session::new(ClientConfig::default()).unwrap()
    }

    fn pdf(pages: usize) -> CandidateFile {
        let mut body = String::from("%PDF-1.4\n");
        for _ in 0..pages {
            body.push_str("<< /Type /Page >>\n");
        }
        CandidateFile::new("deck.pdf", body.into_bytes())
    }

    #[test]
    fn client_id_shape() {
        let id = ClientId::generate();
        let s = id.as_str();
        assert!(s.starts_with(CLIENT_ID_PREFIX));
        let suffix = &s[CLIENT_ID_PREFIX.len()..];
        assert_eq!(suffix.len(), 9);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn client_id_is_stable_per_session() {
        let s = session();
        let first = s.client_id().clone();
        assert_eq!(s.client_id(), &first);
        assert_ne!(session().client_id(), &first);
    }

    #[tokio::test]
    async fn accepting_a_pdf_runs_estimate() {
        let mut s = session();
        assert_eq!(s.page_estimate(), 0);
        assert_eq!(s.estimated_duration(), None);

        s.select_file(pdf(7)).await.unwrap();
        assert_eq!(s.page_estimate(), 7);
        assert_eq!(s.estimated_duration().as_deref(), Some("35s"));
        assert_eq!(s.error(), None);
    }

    #[tokio::test]
    async fn markerless_pdf_estimates_one_page() {
        let mut s = session();
        s.select_file(CandidateFile::new("odd.pdf", b"%PDF-1.5".to_vec()))
            .await
            .unwrap();
        assert_eq!(s.page_estimate(), 1);
    }

    #[tokio::test]
    async fn rejection_keeps_previous_file_and_result() {
        let mut s = session();
        s.select_file(pdf(3)).await.unwrap();
        s.result_url = Some("http://localhost:8000/videos/a.mp4".into());

        let err = s
            .select_file(CandidateFile::new("notes.txt", b"hello".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2VideoError::NotAPdf { .. }));
        assert_eq!(s.error(), Some(NOT_A_PDF_MESSAGE));
        assert_eq!(s.file().unwrap().file.name, "deck.pdf");
        assert_eq!(s.page_estimate(), 3);
        assert_eq!(s.result_url(), Some("http://localhost:8000/videos/a.mp4"));
    }

    #[tokio::test]
    async fn rejection_with_no_prior_file_leaves_none() {
        let mut s = session();
        let _ = s
            .select_file(CandidateFile::new("img.png", vec![0x89, b'P']))
            .await;
        assert!(s.file().is_none());
        assert_eq!(s.error(), Some(NOT_A_PDF_MESSAGE));
    }

    #[tokio::test]
    async fn new_file_clears_error_and_result() {
        let mut s = session();
        s.select_file(pdf(2)).await.unwrap();
        s.result_url = Some("http://localhost:8000/videos/old.mp4".into());
        let _ = s
            .select_file(CandidateFile::new("x.docx", vec![]))
            .await;
        assert!(s.error().is_some());

        s.select_file(pdf(4)).await.unwrap();
        assert_eq!(s.error(), None);
        assert_eq!(s.result_url(), None);
        assert_eq!(s.page_estimate(), 4);
    }

    #[test]
    fn job_guard_resets_on_drop() {
        let progress = ProgressState::new();
        let mut loading = false;
        {
            let _job = JobGuard::begin(&mut loading, &progress);
            assert!(progress.in_flight());
            assert!(progress.apply(40));
        }
        assert!(!loading);
        assert!(!progress.in_flight());
        assert_eq!(progress.percent(), 0);
        assert!(!progress.apply(100));
    }

    #[tokio::test]
    async fn submit_without_file_is_noop() {
        let mut s = session();
        assert_eq!(s.submit().await.unwrap(), None);
        assert!(!s.is_loading());
        assert_eq!(s.error(), None);
    }

    #[tokio::test]
    async fn download_without_result_is_noop() {
        let mut s = session();
        let fallback = crate::delivery::DirectorySaver::new("/nonexistent");
        assert_eq!(s.download(None, &fallback).await.unwrap(), None);
    }
}
