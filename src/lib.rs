//! # aegis-verify
//!
//! Recover the student name, academic score and bank balance from a scanned
//! admission document, and check a student against the eligibility rule.
//!
//! ## Why this crate?
//!
//! Grade cards and bank letters come in as phone photos and scanned PDFs.
//! OCR output from them is noisy: labels drift, `0` reads as `O`, a CGPA of
//! 8.5 and a percentage of 85 look alike once the label is lost. This crate
//! turns that text into a typed record with an explicit scale and an honest
//! confidence value, then applies the eligibility rule to it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / image)
//!  │
//!  ├─ 1. Validate    extension, empty body, magic bytes
//!  ├─ 2. Render      pdfium / image decode (spawn_blocking)
//!  ├─ 3. Recognize   vision LLM or tesseract, concurrent per page
//!  ├─ 4. Normalize   whitespace, invisible chars, O→0 / l→1 in numbers
//!  ├─ 5. Extract     ordered label patterns per field
//!  ├─ 6. Scale       TEN vs HUNDRED, canonical 10-point GPA
//!  └─ 7. Confidence  weighted field presence
//!
//! canonical GPA + IELTS ──▶ eligibility ──▶ verdict + reasons
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use aegis_verify::{evaluate, extract_record, ScoringPolicy};
//!
//! let policy = ScoringPolicy::default();
//! let record = extract_record("Student Name: Jane Doe\nCGPA: 8.5/10", &policy);
//! assert_eq!(record.academic_score(), Some(8.5));
//!
//! let gpa = record.canonical_gpa(policy.percentage_divisor).unwrap();
//! let verdict = evaluate(gpa, 8.0, &policy.thresholds);
//! assert!(verdict.eligible);
//! ```
//!
//! Processing an uploaded document needs a recognition engine:
//!
//! ```rust,no_run
//! use aegis_verify::{process_document, RecognitionEngine, VerifyConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("marksheet.pdf")?;
//! let config = VerifyConfig::builder()
//!     .engine(RecognitionEngine::Tesseract)
//!     .build()?;
//! let response = process_document(&bytes, "marksheet.pdf", &config).await?;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `aegis-verify` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod eligibility;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod verify;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConfidenceWeights, EligibilityThresholds, RecognitionEngine, ScoringPolicy, VerifyConfig,
    VerifyConfigBuilder, PERCENTAGE_TO_TEN_POINT_DIVISOR,
};
pub use eligibility::{
    check_eligibility, check_eligibility_json, evaluate, EligibilityRequest, NumericInput,
};
pub use error::{PageError, VerifyError};
pub use pipeline::recognize::{
    PageImage, RecognizedText, TesseractRecognizer, TextRecognizer, VisionRecognizer,
};
pub use progress::{NoopProgressCallback, ProgressCallback, RecognitionProgressCallback};
pub use record::{
    AcademicScale, EligibilityVerdict, ExtractedData, ExtractedRecord, MatchStrength, Score,
    UploadResponse,
};
pub use verify::{
    extract_record, health, process_document, process_document_sync, process_path, HealthStatus,
    SERVICE_NAME,
};
