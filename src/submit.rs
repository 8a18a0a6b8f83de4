//! Job submission: the multipart request and the mapping of its response.
//!
//! One job is one `POST {base}/generate-video` carrying the PDF and the
//! generation parameters as multipart form fields:
//!
//! | Field                 | Value                                   |
//! |-----------------------|-----------------------------------------|
//! | `file`                | the PDF bytes                           |
//! | `duration`            | seconds per slide                       |
//! | `transition`          | comma-joined transition ids             |
//! | `transition_duration` | seconds of overlap                      |
//! | `quality`             | `low` or `high`                         |
//! | `client_id`           | progress channel correlation id         |
//!
//! The service answers `{"video_url": ...}` on success and, on failure, an
//! error status with an optional `{"error": ...}` body whose text is shown
//! to the user verbatim.

use crate::config::GenerationConfig;
use crate::error::{Pdf2VideoError, PROCESSING_FAILED_MESSAGE};
use crate::intake::{CandidateFile, PDF_MEDIA_TYPE};
use crate::session::ClientId;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The full parameter set for one conversion.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub file: CandidateFile,
    pub config: GenerationConfig,
    pub client_id: ClientId,
}

impl JobRequest {
    pub fn new(file: CandidateFile, config: GenerationConfig, client_id: ClientId) -> Self {
        Self {
            file,
            config,
            client_id,
        }
    }

    /// Text form fields in wire order, excluding `file`.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("duration", self.config.duration.to_string()),
            ("transition", self.config.transitions.to_wire()),
            (
                "transition_duration",
                self.config.transition_duration.to_string(),
            ),
            ("quality", self.config.quality.as_str().to_string()),
            ("client_id", self.client_id.to_string()),
        ]
    }

    /// Assemble the multipart form.
    pub fn to_form(&self) -> Result<Form, Pdf2VideoError> {
        let part = Part::bytes(self.file.bytes.clone())
            .file_name(self.file.name.clone())
            .mime_str(PDF_MEDIA_TYPE)
            .map_err(|e| Pdf2VideoError::Internal(format!("multipart part: {e}")))?;

        let mut form = Form::new().part("file", part);
        for (name, value) in self.text_fields() {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

/// Success body. `message` and `image_count` are informational.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    video_url: Option<String>,
    error: Option<String>,
    message: Option<String>,
    image_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Send `job` to `url` and return the video URL.
///
/// Non-success statuses and transport failures come back as
/// [`Pdf2VideoError::SubmissionFailed`] carrying the user-facing message.
pub async fn send_job(
    client: &reqwest::Client,
    url: &str,
    job: &JobRequest,
    timeout: Duration,
) -> Result<String, Pdf2VideoError> {
    let form = job.to_form()?;
    info!(
        "Submitting '{}' ({} bytes) to {} [transition={}, quality={}]",
        job.file.name,
        job.file.len(),
        url,
        job.config.transitions,
        job.config.quality
    );

    let response = client
        .post(url)
        .multipart(form)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                warn!("Job request timed out after {:?}", timeout);
            } else {
                warn!("Job request failed: {}", e);
            }
            generic_failure(None)
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
        warn!("Failed to read job response body: {}", e);
        generic_failure(Some(status.as_u16()))
    })?;

    interpret_response(status, &body)
}

/// Map a job response to the video URL or a user-facing error.
///
/// * non-success status — the body's `error` field verbatim when present,
///   otherwise `"Server Error: <code> <reason>"`;
/// * success with `video_url` — the URL;
/// * success with only `error` — that error;
/// * anything else — the generic processing-failure message.
pub fn interpret_response(status: StatusCode, body: &[u8]) -> Result<String, Pdf2VideoError> {
    if !status.is_success() {
        let server_message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());

        let message = server_message.unwrap_or_else(|| {
            format!(
                "Server Error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string()
        });
        warn!("Job rejected with HTTP {}: {}", status.as_u16(), message);
        return Err(Pdf2VideoError::SubmissionFailed {
            message,
            status: Some(status.as_u16()),
        });
    }

    let parsed: GenerateResponse = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Malformed job response: {}", e);
            return Err(generic_failure(Some(status.as_u16())));
        }
    };

    match parsed {
        GenerateResponse {
            video_url: Some(url),
            message,
            image_count,
            ..
        } if !url.is_empty() => {
            debug!(
                "Service says: {} ({} slides)",
                message.as_deref().unwrap_or("-"),
                image_count.map_or_else(|| "?".to_string(), |n| n.to_string())
            );
            Ok(url)
        }
        GenerateResponse {
            error: Some(message),
            ..
        } if !message.trim().is_empty() => Err(Pdf2VideoError::SubmissionFailed {
            message,
            status: Some(status.as_u16()),
        }),
        _ => Err(generic_failure(Some(status.as_u16()))),
    }
}

fn generic_failure(status: Option<u16>) -> Pdf2VideoError {
    Pdf2VideoError::SubmissionFailed {
        message: PROCESSING_FAILED_MESSAGE.to_string(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::Quality;

    fn job() -> JobRequest {
        let config = GenerationConfig::builder()
            .duration(4.0)
            .transitions(["crossfade", "zoom_in"])
            .transition_duration(0.5)
            .quality(Quality::Low)
            .build()
            .unwrap();
        JobRequest::new(
            CandidateFile::new("deck.pdf", b"%PDF-1.4".to_vec()),
            config,
            ClientId::from_raw("client_abc123xyz"),
        )
    }

    #[test]
    fn text_fields_in_wire_form() {
        let fields = job().text_fields();
        assert_eq!(
            fields,
            vec![
                ("duration", "4".to_string()),
                ("transition", "crossfade,zoom_in".to_string()),
                ("transition_duration", "0.5".to_string()),
                ("quality", "low".to_string()),
                ("client_id", "client_abc123xyz".to_string()),
            ]
        );
    }

    #[test]
    fn form_builds() {
        assert!(job().to_form().is_ok());
    }

    #[test]
    fn success_returns_video_url() {
        let body = br#"{"video_url":"http://localhost:8000/videos/a.mp4","message":"ok","image_count":3}"#;
        let url = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(url, "http://localhost:8000/videos/a.mp4");
    }

    #[test]
    fn server_error_field_is_used_verbatim() {
        let err = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, br#"{"error":"boom"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn unparseable_error_body_mentions_status() {
        let err = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "got: {msg}");
        assert_eq!(msg, "Server Error: 500 Internal Server Error");

        let err = interpret_response(StatusCode::BAD_GATEWAY, b"").unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn json_error_body_without_error_field_mentions_status() {
        let err = interpret_response(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("422"));
    }

    #[test]
    fn success_status_with_error_body_is_a_failure() {
        let err = interpret_response(StatusCode::OK, br#"{"error":"No images found in the PDF"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "No images found in the PDF");
    }

    #[test]
    fn malformed_success_body_is_generic_failure() {
        let err = interpret_response(StatusCode::OK, b"not json").unwrap_err();
        assert_eq!(err.to_string(), PROCESSING_FAILED_MESSAGE);

        let err = interpret_response(StatusCode::OK, br#"{"message":"done"}"#).unwrap_err();
        assert_eq!(err.to_string(), PROCESSING_FAILED_MESSAGE);
    }
}
