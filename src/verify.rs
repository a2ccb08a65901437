//! Entry points: extract a record from text or from an uploaded document.
//!
//! [`extract_record`] is the pure core: text in, [`ExtractedRecord`] out, no
//! I/O. [`process_document`] is the upload contract wrapped around it:
//!
//! ```text
//! bytes + filename
//!  │
//!  ├─ 1. Validate   extension allow-list, empty body, magic bytes
//!  ├─ 2. Engine     injected recognizer, else vision / tesseract
//!  ├─ 3. Render     PDF pages via pdfium, or decode the image
//!  ├─ 4. Recognize  pages concurrently, per-page timeout, failures isolated
//!  └─ 5. Extract    normalize → fields → scale → confidence
//! ```

use crate::config::{ScoringPolicy, VerifyConfig};
use crate::error::{PageError, VerifyError};
use crate::pipeline::confidence::{score_confidence, FieldPresence};
use crate::pipeline::extract::extract_fields;
use crate::pipeline::input::{classify_upload, load_document};
use crate::pipeline::normalize::normalize_text;
use crate::pipeline::recognize::{build_recognizer, PageImage, RecognizedText, TextRecognizer};
use crate::pipeline::render::render_document;
use crate::pipeline::scale::resolve_scale;
use crate::record::{ExtractedRecord, UploadResponse};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Name reported by [`health`].
pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Liveness payload for hosts that embed the library behind a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

pub fn health() -> HealthStatus {
    HealthStatus {
        status: "active".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Extract a record from recognized text.
///
/// Never fails. Empty or unrecognisable text yields a record with every
/// field absent and zero confidence.
pub fn extract_record(raw_text: &str, policy: &ScoringPolicy) -> ExtractedRecord {
    let text = normalize_text(raw_text);
    if text.is_empty() {
        debug!("No text to extract from");
        return ExtractedRecord::empty();
    }

    let fields = extract_fields(&text);
    let academic = fields.academic.and_then(|raw| resolve_scale(&raw));
    let presence = FieldPresence::from_fields(&fields, academic.is_some());
    let confidence = score_confidence(&presence, &policy.weights);

    let record = ExtractedRecord {
        name: fields.name.map(|m| m.value),
        academic,
        balance: fields.balance.map(|m| m.value),
        confidence,
    };
    debug!(
        "Extracted name={:?} academic={:?} balance={:?} confidence={}",
        record.name, record.academic, record.balance, record.confidence
    );
    record
}

/// Run the upload contract on an in-memory document.
///
/// # Errors
/// Fatal errors only: unsupported or empty upload, corrupt document, no
/// usable recognition engine, every page failing recognition, or no text
/// at all. A document that simply lacks a field is a success with that
/// field `None`.
pub async fn process_document(
    bytes: &[u8],
    filename: &str,
    config: &VerifyConfig,
) -> Result<UploadResponse, VerifyError> {
    let start = Instant::now();
    info!("Processing upload '{}' ({} bytes)", filename, bytes.len());

    // ── Step 1: Validate ─────────────────────────────────────────────────
    let kind = classify_upload(bytes, filename)?;

    // ── Step 2: Engine ───────────────────────────────────────────────────
    let recognizer = build_recognizer(config).await?;

    // ── Step 3: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let pages = render_document(bytes.to_vec(), kind, filename, config).await?;
    info!(
        "Rendered {} page(s) in {}ms",
        pages.len(),
        render_start.elapsed().as_millis()
    );
    if pages.is_empty() {
        return Err(VerifyError::NoTextRecognized {
            filename: filename.to_string(),
        });
    }

    // ── Step 4: Recognize ────────────────────────────────────────────────
    let total_pages = pages.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(total_pages);
    }

    let mut results = recognize_pages(&recognizer, pages, config).await;
    results.sort_by_key(|(page_num, _)| *page_num);

    let mut texts = Vec::with_capacity(total_pages);
    let mut first_error: Option<String> = None;
    for (_, result) in results {
        match result {
            Ok(recognized) => texts.push(recognized),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(total_pages, texts.len());
    }

    if texts.is_empty() {
        return Err(VerifyError::RecognitionFailed {
            total: total_pages,
            first_error: first_error.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    let raw_text = texts
        .iter()
        .map(|t| t.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if normalize_text(&raw_text).is_empty() {
        return Err(VerifyError::NoTextRecognized {
            filename: filename.to_string(),
        });
    }

    // ── Step 5: Extract ──────────────────────────────────────────────────
    let policy = &config.policy;
    let record = extract_record(&raw_text, policy);

    info!(
        "Upload '{}' done: {}/{} pages recognized, confidence {:.2}, {}ms",
        filename,
        texts.len(),
        total_pages,
        record.confidence,
        start.elapsed().as_millis()
    );

    Ok(UploadResponse::success(
        filename,
        raw_text,
        texts.len(),
        &record,
        policy.percentage_divisor,
    ))
}

/// Run the upload contract on a local file or HTTP(S) URL.
pub async fn process_path(
    input: impl AsRef<str>,
    config: &VerifyConfig,
) -> Result<UploadResponse, VerifyError> {
    let doc = load_document(input.as_ref(), config.download_timeout_secs).await?;
    process_document(&doc.bytes, &doc.filename, config).await
}

/// Synchronous wrapper around [`process_document`].
///
/// Creates a temporary tokio runtime internally; do not call it from inside
/// an async context.
pub fn process_document_sync(
    bytes: &[u8],
    filename: &str,
    config: &VerifyConfig,
) -> Result<UploadResponse, VerifyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| VerifyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_document(bytes, filename, config))
}

type PageOutcome = (usize, Result<RecognizedText, PageError>);

/// Recognize pages with at most `config.concurrency` in flight.
async fn recognize_pages(
    recognizer: &Arc<dyn TextRecognizer>,
    pages: Vec<PageImage>,
    config: &VerifyConfig,
) -> Vec<PageOutcome> {
    let total_pages = pages.len();
    let page_timeout = Duration::from_secs(config.api_timeout_secs);

    stream::iter(pages.into_iter().map(|page| {
        let recognizer = Arc::clone(recognizer);
        let callback = config.progress_callback.clone();
        let secs = config.api_timeout_secs;
        async move {
            let page_num = page.page_num;
            if let Some(ref cb) = callback {
                cb.on_page_start(page_num, total_pages);
            }
            let result = match timeout(page_timeout, recognizer.recognize(&page)).await {
                Ok(result) => result,
                Err(_) => Err(PageError::Timeout {
                    page: page_num,
                    secs,
                }),
            };
            match &result {
                Ok(recognized) => {
                    debug!(
                        "Page {}: {} chars via {} (engine confidence {:?})",
                        page_num,
                        recognized.text.len(),
                        recognizer.name(),
                        recognized.engine_confidence
                    );
                    if let Some(ref cb) = callback {
                        cb.on_page_complete(page_num, total_pages, recognized.text.len());
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    if let Some(ref cb) = callback {
                        cb.on_page_error(page_num, total_pages, &e.to_string());
                    }
                }
            }
            (page_num, result)
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}
