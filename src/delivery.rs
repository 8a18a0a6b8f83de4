//! Result delivery: fetch the finished video and save it locally.
//!
//! Saving tries two strategies in order:
//!
//! 1. a *primary* strategy, when the host offers one (in the CLI, an
//!    interactive prompt asking where to save, [`PromptSaver`]);
//! 2. a *fallback* strategy that needs no interaction and writes into a
//!    download directory ([`DirectorySaver`]).
//!
//! A primary strategy that reports [`SaveError::Cancelled`] ends delivery
//! without an error and without trying the fallback. Any other primary failure
//! falls through to the fallback.

use crate::error::{Pdf2VideoError, SaveError};
use crate::intake::filename_from_url;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name used when the video URL has no usable trailing segment.
pub const DEFAULT_VIDEO_NAME: &str = "video.mp4";

/// A way of persisting the video bytes.
#[async_trait]
pub trait SaveStrategy: Send + Sync {
    /// Short label used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Save `bytes`, suggesting `file_name` to the user where applicable.
    ///
    /// Returns the path written.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, SaveError>;
}

/// What happened to the video.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    /// Written to `path` by the strategy named `via`.
    Saved { path: PathBuf, via: &'static str },
    /// The user dismissed the save prompt.
    Cancelled,
}

/// Derive the local file name from the video URL's last path segment.
pub fn artifact_filename(url: &str) -> String {
    filename_from_url(url).unwrap_or_else(|| DEFAULT_VIDEO_NAME.to_string())
}

/// Retrieve the video bytes.
///
/// Any failure, including a non-success status, is reported as
/// [`Pdf2VideoError::DownloadFailed`].
pub async fn fetch_artifact(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, Pdf2VideoError> {
    let failed = |reason: String| Pdf2VideoError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    info!("Fetching video: {}", url);
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    debug!("Fetched {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Save `bytes` with `primary` (if any), falling back to `fallback`.
pub async fn deliver(
    bytes: &[u8],
    file_name: &str,
    primary: Option<&dyn SaveStrategy>,
    fallback: &dyn SaveStrategy,
) -> Result<DeliveryOutcome, Pdf2VideoError> {
    if let Some(primary) = primary {
        match primary.save(file_name, bytes).await {
            Ok(path) => {
                return Ok(DeliveryOutcome::Saved {
                    path,
                    via: primary.name(),
                })
            }
            Err(SaveError::Cancelled) => {
                info!("Save cancelled; video not written");
                return Ok(DeliveryOutcome::Cancelled);
            }
            Err(e) => {
                warn!(
                    "{} save failed, falling back to {}: {}",
                    primary.name(),
                    fallback.name(),
                    e
                );
            }
        }
    }

    match fallback.save(file_name, bytes).await {
        Ok(path) => Ok(DeliveryOutcome::Saved {
            path,
            via: fallback.name(),
        }),
        Err(SaveError::Cancelled) => Ok(DeliveryOutcome::Cancelled),
        Err(SaveError::Failed { path, source }) => Err(Pdf2VideoError::SaveFailed {
            path,
            reason: source.to_string(),
        }),
    }
}

/// Write to a sibling `.part` file, then rename into place, so a crash never
/// leaves a truncated video under the final name.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), SaveError> {
    let failed = |source: std::io::Error| SaveError::Failed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".part");
    let tmp_path = PathBuf::from(tmp_name);

    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    Ok(())
}

// ── Strategies ───────────────────────────────────────────────────────────

/// Non-interactive strategy: writes `<dir>/<file_name>`.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SaveStrategy for DirectorySaver {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, SaveError> {
        let path = self.dir.join(file_name);
        write_atomically(&path, bytes).await?;
        info!("Saved video to {}", path.display());
        Ok(path)
    }
}

type SharedReader = Arc<Mutex<Box<dyn BufRead + Send>>>;
type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Interactive strategy: asks where to save, suggesting `<dir>/<file_name>`.
///
/// An empty answer accepts the suggestion. End of input, `q` or `quit`
/// cancels.
#[derive(Clone)]
pub struct PromptSaver {
    dir: PathBuf,
    input: SharedReader,
    output: SharedWriter,
}

impl std::fmt::Debug for PromptSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSaver").field("dir", &self.dir).finish()
    }
}

impl PromptSaver {
    /// Prompt on stderr, read the answer from stdin.
    pub fn stdio(dir: impl Into<PathBuf>) -> Self {
        Self::new(
            dir,
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stderr()),
        )
    }

    pub fn new(
        dir: impl Into<PathBuf>,
        input: Box<dyn BufRead + Send>,
        output: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            dir: dir.into(),
            input: Arc::new(Mutex::new(input)),
            output: Arc::new(Mutex::new(output)),
        }
    }

    /// Ask for a destination. `Ok(None)` means the user cancelled.
    fn ask(&self, suggested: &Path) -> std::io::Result<Option<PathBuf>> {
        {
            let mut out = self.output.lock().unwrap_or_else(|e| e.into_inner());
            write!(out, "Save video as [{}]: ", suggested.display())?;
            out.flush()?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }

        let answer = line.trim();
        match answer {
            "" => Ok(Some(suggested.to_path_buf())),
            "q" | "quit" => Ok(None),
            other => {
                let path = PathBuf::from(other);
                if path.is_dir() {
                    let name = suggested.file_name().unwrap_or_default();
                    Ok(Some(path.join(name)))
                } else {
                    Ok(Some(path))
                }
            }
        }
    }
}

#[async_trait]
impl SaveStrategy for PromptSaver {
    fn name(&self) -> &'static str {
        "prompt"
    }

    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, SaveError> {
        let suggested = self.dir.join(file_name);
        let this = self.clone();
        let asked = suggested.clone();
        let answer = tokio::task::spawn_blocking(move || this.ask(&asked))
            .await
            .map_err(|e| SaveError::Failed {
                path: suggested.clone(),
                source: std::io::Error::other(e.to_string()),
            })?
            .map_err(|source| SaveError::Failed {
                path: suggested.clone(),
                source,
            })?;

        let Some(path) = answer else {
            return Err(SaveError::Cancelled);
        };

        write_atomically(&path, bytes).await?;
        info!("Saved video to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        result: fn() -> Result<PathBuf, SaveError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SaveStrategy for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn save(&self, _file_name: &str, _bytes: &[u8]) -> Result<PathBuf, SaveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn scripted(result: fn() -> Result<PathBuf, SaveError>) -> Scripted {
        Scripted {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn filename_from_trailing_segment() {
        assert_eq!(
            artifact_filename("http://localhost:8000/videos/3f2a.mp4"),
            "3f2a.mp4"
        );
        assert_eq!(artifact_filename("http://localhost:8000/"), DEFAULT_VIDEO_NAME);
        assert_eq!(artifact_filename(""), DEFAULT_VIDEO_NAME);
    }

    #[tokio::test]
    async fn cancelled_primary_skips_fallback() {
        let primary = scripted(|| Err(SaveError::Cancelled));
        let fallback = scripted(|| Ok(PathBuf::from("/tmp/never")));

        let outcome = deliver(b"v", "v.mp4", Some(&primary), &fallback).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Cancelled);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_primary_uses_fallback() {
        let primary = scripted(|| {
            Err(SaveError::Failed {
                path: PathBuf::from("/ro/v.mp4"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });
        let fallback = scripted(|| Ok(PathBuf::from("/tmp/v.mp4")));

        let outcome = deliver(b"v", "v.mp4", Some(&primary), &fallback).await.unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Saved {
                path: PathBuf::from("/tmp/v.mp4"),
                via: "scripted"
            }
        );
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_primary_goes_straight_to_fallback() {
        let fallback = scripted(|| Ok(PathBuf::from("/tmp/v.mp4")));
        let outcome = deliver(b"v", "v.mp4", None, &fallback).await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Saved { .. }));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_failure_is_save_failed() {
        let fallback = scripted(|| {
            Err(SaveError::Failed {
                path: PathBuf::from("/ro/v.mp4"),
                source: std::io::Error::other("disk full"),
            })
        });
        let err = deliver(b"v", "v.mp4", None, &fallback).await.unwrap_err();
        assert!(matches!(err, Pdf2VideoError::SaveFailed { .. }));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn directory_saver_writes_and_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path().join("out"));

        let path = saver.save("clip.mp4", b"MP4DATA").await.unwrap();
        assert_eq!(path, dir.path().join("out/clip.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"MP4DATA");
        assert!(!dir.path().join("out/clip.mp4.part").exists());
    }

    fn prompt(dir: &Path, answer: &'static str) -> PromptSaver {
        PromptSaver::new(
            dir,
            Box::new(Cursor::new(answer.as_bytes())),
            Box::new(std::io::sink()),
        )
    }

    #[tokio::test]
    async fn prompt_accepts_suggestion_on_empty_answer() {
        let dir = tempfile::tempdir().unwrap();
        let path = prompt(dir.path(), "\n").save("a.mp4", b"x").await.unwrap();
        assert_eq!(path, dir.path().join("a.mp4"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn prompt_uses_typed_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("renamed.mp4");
        let answer: &'static str = Box::leak(format!("{}\n", target.display()).into_boxed_str());
        let path = prompt(dir.path(), answer).save("a.mp4", b"x").await.unwrap();
        assert_eq!(path, target);
        assert!(target.exists());
    }

    #[tokio::test]
    async fn prompt_eof_and_quit_cancel() {
        let dir = tempfile::tempdir().unwrap();
        for answer in ["", "q\n", "quit\n"] {
            let err = prompt(dir.path(), answer).save("a.mp4", b"x").await.unwrap_err();
            assert!(matches!(err, SaveError::Cancelled), "{answer:?}");
        }
        assert!(!dir.path().join("a.mp4").exists());
    }
}
