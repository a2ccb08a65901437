//! Upload validation and input loading.
//!
//! Every document passes [`classify_upload`] before any rendering or
//! recognition work starts. The checks run cheapest first: extension
//! allow-list, empty body, then magic bytes. A file that fails here costs
//! nothing downstream and the caller gets a precise client error instead of
//! a pdfium or decoder failure.
//!
//! [`load_document`] is the CLI's front door: it turns a local path or an
//! HTTP(S) URL into bytes plus a filename, which then go through the same
//! validation as an in-memory upload.

use crate::error::VerifyError;
use image::ImageFormat;
use std::path::Path;
use tracing::{debug, info};

/// Extensions accepted for upload (lowercase, without the dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// What an upload turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// A raster image; the format is sniffed from the bytes, not the name.
    Image(ImageFormat),
}

/// A document read from disk or downloaded, not yet validated.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Lowercase extension of `filename`, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// Validate an upload and decide how to render it.
pub fn classify_upload(bytes: &[u8], filename: &str) -> Result<DocumentKind, VerifyError> {
    let extension = file_extension(filename);
    let ext = match extension.as_deref() {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext) => ext,
        other => {
            return Err(VerifyError::UnsupportedFileType {
                extension: other.unwrap_or("(none)").to_string(),
                allowed: ALLOWED_EXTENSIONS.join(", "),
            })
        }
    };

    if bytes.is_empty() {
        return Err(VerifyError::EmptyFile {
            filename: filename.to_string(),
        });
    }

    if ext == "pdf" {
        if !bytes.starts_with(b"%PDF") {
            return Err(VerifyError::CorruptDocument {
                filename: filename.to_string(),
                kind: "PDF".to_string(),
                detail: format!("missing %PDF header (starts with {:?})", magic(bytes)),
            });
        }
        debug!("'{}': PDF, {} bytes", filename, bytes.len());
        return Ok(DocumentKind::Pdf);
    }

    let format = image::guess_format(bytes).map_err(|e| VerifyError::CorruptDocument {
        filename: filename.to_string(),
        kind: "image".to_string(),
        detail: e.to_string(),
    })?;
    debug!("'{}': {:?} image, {} bytes", filename, format, bytes.len());
    Ok(DocumentKind::Image(format))
}

fn magic(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(4)]).into_owned()
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a local path or download a URL.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<LoadedDocument, VerifyError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<LoadedDocument, VerifyError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VerifyError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => VerifyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => VerifyError::Internal(format!("reading {}: {e}", path.display())),
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedDocument { filename, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedDocument, VerifyError> {
    info!("Downloading document from: {}", url);

    let failed = |reason: String| VerifyError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            VerifyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = filename_from_url(url)
        .unwrap_or_else(|| fallback_filename(content_type.as_deref()));

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            VerifyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    info!("Downloaded '{}' ({} bytes)", filename, bytes.len());
    Ok(LoadedDocument {
        filename,
        bytes: bytes.to_vec(),
    })
}

/// Last path segment of a URL when it looks like a filename.
fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}

/// Name a download after its content type when the URL has no filename.
fn fallback_filename(content_type: Option<&str>) -> String {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase());
    let ext = match mime.as_deref() {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("image/bmp") => "bmp",
        Some("image/tiff") => "tiff",
        Some("image/webp") => "webp",
        _ => "pdf",
    };
    format!("downloaded.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/transcript.pdf"));
        assert!(is_url("http://example.com/card.png"));
        assert!(!is_url("/tmp/transcript.pdf"));
        assert!(!is_url("transcript.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Marks.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("scan.tar.Tif").as_deref(), Some("tif"));
        assert_eq!(file_extension("README"), None);
    }

    #[test]
    fn disallowed_extension_is_rejected_before_content() {
        let err = classify_upload(b"", "letter.docx").unwrap_err();
        assert_eq!(err.status_code(), 415);
        assert!(err.to_string().contains("docx"));

        let err = classify_upload(b"%PDF-1.7", "noext").unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedFileType { ref extension, .. } if extension == "(none)"));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let err = classify_upload(b"", "transcript.pdf").unwrap_err();
        assert!(matches!(err, VerifyError::EmptyFile { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn pdf_requires_magic_bytes() {
        assert_eq!(classify_upload(b"%PDF-1.4\n...", "a.pdf").unwrap(), DocumentKind::Pdf);
        let err = classify_upload(b"<html>", "a.pdf").unwrap_err();
        assert!(matches!(err, VerifyError::CorruptDocument { ref kind, .. } if kind == "PDF"));
    }

    #[test]
    fn image_format_is_sniffed() {
        // A PNG uploaded with a .jpg name is still accepted as PNG.
        assert_eq!(
            classify_upload(PNG_SIGNATURE, "photo.jpg").unwrap(),
            DocumentKind::Image(ImageFormat::Png)
        );
        let err = classify_upload(b"not an image", "photo.png").unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn url_filenames() {
        assert_eq!(
            filename_from_url("https://example.com/docs/card.png?x=1").as_deref(),
            Some("card.png")
        );
        assert_eq!(filename_from_url("https://example.com/download"), None);
        assert_eq!(fallback_filename(Some("image/jpeg; charset=binary")), "downloaded.jpg");
        assert_eq!(fallback_filename(None), "downloaded.pdf");
    }

    #[tokio::test]
    async fn local_file_is_read_with_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let doc = load_document(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.filename, "statement.pdf");
        assert_eq!(doc.bytes, b"%PDF-1.4");
    }

    #[test]
    fn missing_local_file_is_not_found() {
        let err = tokio_test::block_on(load_document("/nonexistent/transcript.pdf", 5)).unwrap_err();
        assert!(matches!(err, VerifyError::FileNotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }
}
