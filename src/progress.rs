//! Progress-callback trait for per-page recognition events.
//!
//! Inject an [`Arc<dyn RecognitionProgressCallback>`] via
//! [`crate::config::VerifyConfigBuilder::progress_callback`] to follow a
//! multi-page upload as each page is recognized. Pages run concurrently, so
//! events for different pages may interleave and arrive out of order.
//!
//! # Example
//!
//! ```rust
//! use aegis_verify::{RecognitionProgressCallback, VerifyConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognized: AtomicUsize,
//! }
//!
//! impl RecognitionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, chars: usize) {
//!         self.recognized.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {chars} chars");
//!     }
//! }
//!
//! let config = VerifyConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { recognized: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the upload pipeline as it recognizes each page.
///
/// All methods default to no-ops. Implementations must be `Send + Sync` and
/// guard shared state themselves (`Mutex`, atomics).
pub trait RecognitionProgressCallback: Send + Sync {
    /// Called once after rendering, before any page is recognized.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is handed to the recognition engine.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page was recognized; `chars` is the text length.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called when a page failed recognition.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// No-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl RecognitionProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::VerifyConfig`].
pub type ProgressCallback = Arc<dyn RecognitionProgressCallback>;
