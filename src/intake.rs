//! File intake: turn a user-supplied path or URL into a candidate PDF.
//!
//! Two intake paths exist, a local file and an HTTP(S) download, and both
//! produce a [`CandidateFile`] that goes through the same [`validate`] check
//! before a session accepts it. Validation looks at the *declared* media type
//! (extension or `Content-Type`), not the content; the service does the real
//! parsing.

use crate::error::Pdf2VideoError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Media type every accepted candidate must declare.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// A file the user picked, not yet validated.
#[derive(Clone)]
pub struct CandidateFile {
    /// Display name, also sent as the multipart file name.
    pub name: String,
    /// Declared media type, e.g. `application/pdf`.
    pub media_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl CandidateFile {
    /// Build a candidate whose media type is inferred from `name`.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = media_type_for_name(&name).to_string();
        Self {
            name,
            media_type,
            bytes,
        }
    }

    /// Build a candidate with an explicit media type.
    pub fn with_media_type(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Reject any candidate that does not declare `application/pdf`.
pub fn validate(candidate: &CandidateFile) -> Result<(), Pdf2VideoError> {
    if !is_pdf_media_type(&candidate.media_type) {
        return Err(Pdf2VideoError::NotAPdf {
            name: candidate.name.clone(),
            media_type: candidate.media_type.clone(),
        });
    }
    if !candidate.bytes.starts_with(b"%PDF") {
        warn!(
            "'{}' is declared as PDF but does not start with %PDF; submitting anyway",
            candidate.name
        );
    }
    Ok(())
}

/// Resolve the input string to a candidate file.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_candidate(
    client: &reqwest::Client,
    input: &str,
    timeout: Duration,
) -> Result<CandidateFile, Pdf2VideoError> {
    if input.trim().is_empty() {
        return Err(Pdf2VideoError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        from_url(client, input, timeout).await
    } else {
        from_path(input).await
    }
}

/// Read a local file. The media type comes from the extension.
pub async fn from_path(path: impl AsRef<Path>) -> Result<CandidateFile, Pdf2VideoError> {
    let path: PathBuf = path.as_ref().to_path_buf();

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2VideoError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2VideoError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local candidate: {} ({} bytes)", path.display(), bytes.len());
    Ok(CandidateFile::new(name, bytes))
}

/// Download a URL. The media type comes from `Content-Type`, falling back to
/// the URL's extension when the server sends none or a generic one.
pub async fn from_url(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<CandidateFile, Pdf2VideoError> {
    info!("Downloading PDF from: {}", url);

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Pdf2VideoError::FetchFailed {
            url: url.to_string(),
            reason: if e.is_timeout() {
                format!("timed out after {}s", timeout.as_secs())
            } else {
                e.to_string()
            },
        })?;

    if !response.status().is_success() {
        return Err(Pdf2VideoError::FetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = filename_from_url(url).unwrap_or_else(|| "downloaded.pdf".to_string());
    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(essence);

    let media_type = match header_type {
        Some(t) if !t.is_empty() && t != "application/octet-stream" => t,
        _ => media_type_for_name(&name).to_string(),
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2VideoError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    info!("Downloaded {} ({} bytes, {})", name, bytes.len(), media_type);
    Ok(CandidateFile::with_media_type(name, media_type, bytes))
}

/// Last non-empty path segment of `url`, if any.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// Media type implied by a file name's extension.
pub fn media_type_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

fn is_pdf_media_type(media_type: &str) -> bool {
    essence(media_type) == PDF_MEDIA_TYPE
}

/// `"application/pdf; charset=binary"` → `"application/pdf"`.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
