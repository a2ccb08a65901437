//! Configuration types for document verification.
//!
//! Two layers live here:
//!
//! * [`ScoringPolicy`]: the pure-policy knobs the core consults: confidence
//!   weights, eligibility thresholds and the percentage→GPA divisor. It has
//!   no I/O and is what [`crate::extract_record`] and
//!   [`crate::check_eligibility`] take.
//! * [`VerifyConfig`]: everything the document boundary needs on top of
//!   the policy (rendering, recognition engine, retries, timeouts), built via
//!   [`VerifyConfigBuilder`].

use crate::error::VerifyError;
use crate::pipeline::recognize::TextRecognizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Divisor that maps a 0–100 percentage onto the 0–10 GPA scale.
///
/// A flat `/ 10` is the admissions office's conversion, not a statistically
/// derived one; override it through [`ScoringPolicy::percentage_divisor`].
pub const PERCENTAGE_TO_TEN_POINT_DIVISOR: f64 = 10.0;

/// Minimum 10-point academic score for eligibility.
pub const DEFAULT_GPA_THRESHOLD: f64 = 8.0;

/// Minimum IELTS band for eligibility.
pub const DEFAULT_TEST_THRESHOLD: f64 = 8.0;

/// Weights used by the confidence scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    /// Contribution of a found student name. Default: 0.4.
    pub name_weight: f64,
    /// Contribution of a found academic score. Default: 0.4.
    pub gpa_weight: f64,
    /// Contribution of a found balance (optional field). Default: 0.2.
    pub balance_weight: f64,
    /// Multiplier applied to a field located only by the fallback pattern.
    /// Default: 0.5.
    pub fallback_penalty: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            name_weight: 0.4,
            gpa_weight: 0.4,
            balance_weight: 0.2,
            fallback_penalty: 0.5,
        }
    }
}

impl ConfidenceWeights {
    pub fn total(&self) -> f64 {
        self.name_weight + self.gpa_weight + self.balance_weight
    }

    fn validate(&self) -> Result<(), VerifyError> {
        for (label, w) in [
            ("name_weight", self.name_weight),
            ("gpa_weight", self.gpa_weight),
            ("balance_weight", self.balance_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(VerifyError::InvalidConfig(format!(
                    "{label} must be a finite non-negative number, got {w}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(VerifyError::InvalidConfig(
                "confidence weights must not all be zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fallback_penalty) {
            return Err(VerifyError::InvalidConfig(format!(
                "fallback_penalty must be within 0–1, got {}",
                self.fallback_penalty
            )));
        }
        Ok(())
    }
}

/// Pass marks for the eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityThresholds {
    /// Minimum academic score on the 10-point scale. Default: 8.0.
    pub gpa_threshold: f64,
    /// Minimum test (IELTS) score. Default: 8.0.
    pub test_threshold: f64,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        Self {
            gpa_threshold: DEFAULT_GPA_THRESHOLD,
            test_threshold: DEFAULT_TEST_THRESHOLD,
        }
    }
}

/// All policy constants in one place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub weights: ConfidenceWeights,
    pub thresholds: EligibilityThresholds,
    /// See [`PERCENTAGE_TO_TEN_POINT_DIVISOR`].
    pub percentage_divisor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
            thresholds: EligibilityThresholds::default(),
            percentage_divisor: PERCENTAGE_TO_TEN_POINT_DIVISOR,
        }
    }
}

impl ScoringPolicy {
    /// Check every constant is usable.
    pub fn validate(&self) -> Result<(), VerifyError> {
        self.weights.validate()?;
        if !self.percentage_divisor.is_finite() || self.percentage_divisor <= 0.0 {
            return Err(VerifyError::InvalidConfig(format!(
                "percentage_divisor must be positive, got {}",
                self.percentage_divisor
            )));
        }
        let t = &self.thresholds;
        if !t.gpa_threshold.is_finite() || !t.test_threshold.is_finite() {
            return Err(VerifyError::InvalidConfig(
                "eligibility thresholds must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Which built-in engine turns page images into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecognitionEngine {
    /// A vision LLM transcribes each page (edgequake-llm provider). (default)
    #[default]
    Vision,
    /// The `tesseract` command-line program.
    Tesseract,
}

/// Configuration for processing an uploaded document.
///
/// Built via [`VerifyConfig::builder()`] or [`VerifyConfig::default()`].
///
/// # Example
/// ```rust
/// use aegis_verify::{RecognitionEngine, VerifyConfig};
///
/// let config = VerifyConfig::builder()
///     .engine(RecognitionEngine::Tesseract)
///     .dpi(300)
///     .max_pages(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VerifyConfig {
    /// Rendering DPI for PDF pages. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Cap on either rendered dimension in pixels. Default: 3000.
    pub max_rendered_pixels: u32,

    /// Only the first `n` pages are recognized. Default: all.
    pub max_pages: Option<usize>,

    /// Pages recognized concurrently. Default: 4.
    pub concurrency: usize,

    /// Built-in engine used when no `recognizer` is injected.
    pub engine: RecognitionEngine,

    /// Pre-constructed recognizer. Takes precedence over `engine`.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// LLM provider name for the vision engine (e.g. "openai", "ollama").
    pub provider_name: Option<String>,

    /// LLM model for the vision engine. Provider default if None.
    pub model: Option<String>,

    /// Pre-constructed LLM provider for the vision engine.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the vision engine. Default: 0.0.
    pub temperature: f32,

    /// Max tokens the vision engine may emit per page. Default: 2048.
    pub max_tokens: usize,

    /// Retries per page after a failed vision call. Default: 3.
    pub max_retries: u32,

    /// Initial backoff in milliseconds, doubled per retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Tesseract executable. Default: "tesseract".
    pub tesseract_binary: String,

    /// Tesseract language pack. Default: "eng".
    pub tesseract_lang: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-page recognition timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Confidence weights, thresholds and the percentage divisor.
    pub policy: ScoringPolicy,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 3000,
            max_pages: None,
            concurrency: 4,
            engine: RecognitionEngine::default(),
            recognizer: None,
            provider_name: None,
            model: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            tesseract_binary: "tesseract".to_string(),
            tesseract_lang: "eng".to_string(),
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
            policy: ScoringPolicy::default(),
        }
    }
}

impl fmt::Debug for VerifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("engine", &self.engine)
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|r| r.name().to_string()),
            )
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field("tesseract_binary", &self.tesseract_binary)
            .field("tesseract_lang", &self.tesseract_lang)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("policy", &self.policy)
            .finish()
    }
}

impl VerifyConfig {
    /// Create a new builder for `VerifyConfig`.
    pub fn builder() -> VerifyConfigBuilder {
        VerifyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VerifyConfig`].
#[derive(Debug)]
pub struct VerifyConfigBuilder {
    config: VerifyConfig,
}

impl VerifyConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn engine(mut self, engine: RecognitionEngine) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn tesseract_binary(mut self, path: impl Into<String>) -> Self {
        self.config.tesseract_binary = path.into();
        self
    }

    pub fn tesseract_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_lang = lang.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn policy(mut self, policy: ScoringPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn gpa_threshold(mut self, t: f64) -> Self {
        self.config.policy.thresholds.gpa_threshold = t;
        self
    }

    pub fn test_threshold(mut self, t: f64) -> Self {
        self.config.policy.thresholds.test_threshold = t;
        self
    }

    pub fn percentage_divisor(mut self, d: f64) -> Self {
        self.config.policy.percentage_divisor = d;
        self
    }

    pub fn confidence_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.config.policy.weights = weights;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VerifyConfig, VerifyError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(VerifyError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(VerifyError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.max_pages == Some(0) {
            return Err(VerifyError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.tesseract_lang.trim().is_empty() {
            return Err(VerifyError::InvalidConfig(
                "tesseract_lang must not be empty".into(),
            ));
        }
        c.policy.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_admissions_policy() {
        let p = ScoringPolicy::default();
        assert_eq!(p.thresholds.gpa_threshold, 8.0);
        assert_eq!(p.thresholds.test_threshold, 8.0);
        assert_eq!(p.percentage_divisor, 10.0);
        assert!((p.weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn builder_clamps_dpi_and_concurrency() {
        let c = VerifyConfig::builder()
            .dpi(10_000)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_rejects_negative_weight() {
        let err = VerifyConfig::builder()
            .confidence_weights(ConfidenceWeights {
                name_weight: -0.1,
                ..ConfidenceWeights::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("name_weight"), "got: {err}");
    }

    #[test]
    fn builder_rejects_penalty_above_one() {
        let err = VerifyConfig::builder()
            .confidence_weights(ConfidenceWeights {
                fallback_penalty: 1.5,
                ..ConfidenceWeights::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_divisor_and_zero_pages() {
        assert!(VerifyConfig::builder().percentage_divisor(0.0).build().is_err());
        assert!(VerifyConfig::builder().max_pages(0).build().is_err());
    }

    #[test]
    fn threshold_setters_reach_policy() {
        let c = VerifyConfig::builder()
            .gpa_threshold(7.5)
            .test_threshold(6.5)
            .build()
            .unwrap();
        assert_eq!(c.policy.thresholds.gpa_threshold, 7.5);
        assert_eq!(c.policy.thresholds.test_threshold, 6.5);
    }
}
