//! Error types for the aegis-verify library.
//!
//! Two error types mirror the two ways a document can go wrong:
//!
//! * [`VerifyError`] is **fatal**: the request cannot be served at all
//!   (unsupported file, corrupt PDF, no recognition engine, malformed
//!   eligibility payload). Returned as `Err(VerifyError)` from the
//!   `process_*` and `check_eligibility*` entry points.
//!
//! * [`PageError`] is **non-fatal**: recognition failed for one page while the
//!   others succeeded. Logged and reported through the progress callback; the
//!   document is still extracted from the pages that were read.
//!
//! A field that cannot be found in the recognized text is *not* an error of
//! either kind. Extraction records it as absent and lowers the confidence.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the aegis-verify library.
#[derive(Debug, Error)]
pub enum VerifyError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The file extension is not one the service accepts.
    #[error("Unsupported file type '{extension}'. Allowed: {allowed}")]
    UnsupportedFileType { extension: String, allowed: String },

    /// The upload contained zero bytes.
    #[error("Uploaded file '{filename}' is empty")]
    EmptyFile { filename: String },

    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes do not decode as the format the filename claims.
    #[error("Document '{filename}' is corrupt or not a valid {kind}: {detail}")]
    CorruptDocument {
        filename: String,
        kind: String,
        detail: String,
    },

    /// PDF requires a password but none was provided.
    #[error("PDF '{filename}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { filename: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{filename}'")]
    WrongPassword { filename: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Image uploads (PNG, JPEG, …) do not need pdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Recognition errors ────────────────────────────────────────────────
    /// The selected recognition engine could not be set up.
    #[error("Recognition engine '{engine}' is not configured.\n{hint}")]
    RecognizerNotConfigured { engine: String, hint: String },

    /// Every page failed recognition; nothing to extract from.
    #[error("Recognition failed on all {total} pages.\nFirst error: {first_error}")]
    RecognitionFailed { total: usize, first_error: String },

    /// Recognition succeeded but produced no text at all.
    ///
    /// Surfaced instead of a "successful" all-absent record so that callers
    /// can tell a blank scan from a document that lacks the fields.
    #[error("No text could be recognized in '{filename}'")]
    NoTextRecognized { filename: String },

    // ── Request / config errors ───────────────────────────────────────────
    /// The eligibility request payload is missing a field or is not numeric.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerifyError {
    /// HTTP-style status code for hosts that expose the library over a
    /// request/response boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            VerifyError::UnsupportedFileType { .. } => 415,
            VerifyError::EmptyFile { .. }
            | VerifyError::InvalidRequest(_)
            | VerifyError::PasswordRequired { .. }
            | VerifyError::WrongPassword { .. } => 400,
            VerifyError::FileNotFound { .. } => 404,
            VerifyError::CorruptDocument { .. } | VerifyError::NoTextRecognized { .. } => 422,
            _ => 500,
        }
    }

    /// True when the caller sent something unusable, as opposed to a
    /// failure on our side or in a collaborator.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// A non-fatal recognition error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The engine returned an error after all retries.
    #[error("Page {page}: recognition failed after {retries} retries: {detail}")]
    RecognitionFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// The engine did not answer within the configured timeout.
    #[error("Page {page}: recognition timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_lists_allowed() {
        let e = VerifyError::UnsupportedFileType {
            extension: "docx".into(),
            allowed: "pdf, png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("docx"), "got: {msg}");
        assert!(msg.contains("pdf, png"), "got: {msg}");
        assert_eq!(e.status_code(), 415);
    }

    #[test]
    fn invalid_request_is_client_error() {
        let e = VerifyError::InvalidRequest("ielts_score is required".into());
        assert!(e.is_client_error());
        assert!(e.to_string().contains("ielts_score"));
    }

    #[test]
    fn recognition_failure_is_server_error() {
        let e = VerifyError::RecognitionFailed {
            total: 2,
            first_error: "engine crashed".into(),
        };
        assert_eq!(e.status_code(), 500);
        assert!(!e.is_client_error());
        assert!(e.to_string().contains("all 2 pages"));
    }

    #[test]
    fn page_timeout_display() {
        let e = PageError::Timeout { page: 3, secs: 60 };
        assert!(e.to_string().contains("Page 3"));
        assert!(e.to_string().contains("60s"));
    }
}
