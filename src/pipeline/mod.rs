//! Pipeline stages, one transformation per module.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ recognize ──▶ normalize ──▶ extract ──▶ scale ──▶ confidence
//! (bytes)   (pages)    (raw text)    (clean text)  (fields)    (Score)   ([0,1])
//! ```
//!
//! 1. [`input`]     : validate an upload, load a path or URL
//! 2. [`render`]    : PDF pages via pdfium, or decode a raster image; runs
//!    in `spawn_blocking`
//! 3. [`encode`]    : PNG / base64 for the engines
//! 4. [`recognize`] : the [`recognize::TextRecognizer`] seam and the two
//!    built-in engines; the only stage with network or process I/O
//! 5. [`normalize`] : deterministic cleanup of recognized text
//! 6. [`extract`]   : ordered label patterns for name, score and balance
//! 7. [`scale`]     : TEN vs HUNDRED for the academic score
//! 8. [`confidence`]: weighted presence score
//!
//! Stages 5–8 are pure and synchronous.

pub mod confidence;
pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod recognize;
pub mod render;
pub mod scale;
