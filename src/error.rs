//! Error types for the edgequake-pdf2video library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2VideoError`] — every failure a session operation can report
//!   (rejected input, failed job, failed download). None of them is fatal to
//!   the [`crate::session::Session`]: the session records the user-facing
//!   message in its single error slot and stays re-triggerable.
//!
//! * [`SaveError`] — returned by a [`crate::delivery::SaveStrategy`]. The
//!   `Cancelled` variant is not a failure; it tells the delivery step to stop
//!   without trying the fallback strategy.

use std::path::PathBuf;
use thiserror::Error;

/// Fixed message shown when the selected file is not a PDF.
pub const NOT_A_PDF_MESSAGE: &str = "Please upload a PDF file.";

/// Generic message for submissions that failed below the HTTP layer.
pub const PROCESSING_FAILED_MESSAGE: &str = "An error occurred while processing the PDF.";

/// Generic message for a failed artifact retrieval.
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Failed to download file.";

/// All errors returned by the edgequake-pdf2video library.
#[derive(Debug, Error)]
pub enum Pdf2VideoError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but fetching the candidate failed.
    #[error("Failed to fetch '{url}': {reason}\nCheck your internet connection.")]
    FetchFailed { url: String, reason: String },

    /// The declared media type of the candidate is not `application/pdf`.
    #[error("{}", NOT_A_PDF_MESSAGE)]
    NotAPdf { name: String, media_type: String },

    // ── Submission errors ─────────────────────────────────────────────────
    /// The generation service rejected the job or could not be reached.
    ///
    /// `message` is the user-facing text: the server's own `error` field when
    /// it sent one, otherwise a synthesised or generic message.
    #[error("{message}")]
    SubmissionFailed {
        message: String,
        status: Option<u16>,
    },

    // ── Delivery errors ───────────────────────────────────────────────────
    /// Retrieving the generated video failed.
    #[error("{}", DOWNLOAD_FAILED_MESSAGE)]
    DownloadFailed { url: String, reason: String },

    /// Both save strategies failed to persist the video.
    #[error("Failed to save video to '{path}': {reason}")]
    SaveFailed { path: PathBuf, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2VideoError {
    /// The message a session stores in its error slot for this error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// HTTP status reported by the service, for submission failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Pdf2VideoError::SubmissionFailed { status, .. } => *status,
            _ => None,
        }
    }
}

/// Outcome of a failed [`crate::delivery::SaveStrategy::save`] call.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The user dismissed the save prompt. Not an error for the session.
    #[error("save cancelled by user")]
    Cancelled,

    /// The strategy could not write the file.
    #[error("failed to save '{path}': {source}")]
    Failed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_uses_fixed_message() {
        let e = Pdf2VideoError::NotAPdf {
            name: "slides.pptx".into(),
            media_type: "application/octet-stream".into(),
        };
        assert_eq!(e.user_message(), NOT_A_PDF_MESSAGE);
        assert_eq!(e.to_string(), NOT_A_PDF_MESSAGE);
    }

    #[test]
    fn submission_failed_displays_message_verbatim() {
        let e = Pdf2VideoError::SubmissionFailed {
            message: "boom".into(),
            status: Some(500),
        };
        assert_eq!(e.to_string(), "boom");
        assert_eq!(e.status(), Some(500));
    }

    #[test]
    fn download_failed_hides_transport_detail() {
        let e = Pdf2VideoError::DownloadFailed {
            url: "http://localhost:8000/videos/a.mp4".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(e.user_message(), DOWNLOAD_FAILED_MESSAGE);
        assert_eq!(e.to_string(), DOWNLOAD_FAILED_MESSAGE);
        assert_eq!(e.status(), None);
    }

    #[test]
    fn save_failed_display() {
        let e = Pdf2VideoError::SaveFailed {
            path: PathBuf::from("/tmp/out/video.mp4"),
            reason: "read-only file system".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("video.mp4"), "got: {msg}");
        assert!(msg.contains("read-only"), "got: {msg}");
    }

    #[test]
    fn save_cancelled_display() {
        assert!(SaveError::Cancelled.to_string().contains("cancelled"));
    }
}
