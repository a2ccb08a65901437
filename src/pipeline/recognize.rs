//! Text recognition: page image → raw text.
//!
//! Recognition is the one collaborator the extraction core depends on, so it
//! sits behind the [`TextRecognizer`] trait. Two engines ship with the crate:
//!
//! * [`VisionRecognizer`] sends the page to a vision LLM through
//!   `edgequake-llm` and asks for a verbatim transcription.
//! * [`TesseractRecognizer`] shells out to the `tesseract` CLI.
//!
//! Callers with their own OCR service implement the trait and inject it via
//! [`crate::config::VerifyConfigBuilder::recognizer`].
//!
//! ## Retry Strategy
//!
//! Vision APIs answer 429/503 under concurrent load. The vision engine retries
//! with exponential backoff (`retry_backoff_ms * 2^attempt`): with a 500 ms
//! base and 3 retries the waits are 500 ms → 1 s → 2 s. Tesseract failures are
//! deterministic and are not retried.

use crate::config::{RecognitionEngine, VerifyConfig};
use crate::error::{PageError, VerifyError};
use crate::pipeline::encode::{encode_page, encode_png};
use crate::prompts::TRANSCRIPTION_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Model used when a vision provider is named without a model.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// One rendered page, ready for recognition.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number.
    pub page_num: usize,
    pub image: DynamicImage,
}

/// Text recognized on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub page_num: usize,
    pub text: String,
    /// The engine's own certainty in `[0, 1]`, when it reports one.
    pub engine_confidence: Option<f32>,
}

/// An engine that turns a page image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs and errors.
    fn name(&self) -> &str;

    /// Recognize one page. Failure is per page and never aborts the document.
    async fn recognize(&self, page: &PageImage) -> Result<RecognizedText, PageError>;
}

// ── Vision engine ────────────────────────────────────────────────────────────

/// Vision-LLM transcription through an `edgequake-llm` provider.
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VisionRecognizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &VerifyConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Build the engine from the config, resolving the provider.
    pub fn from_config(config: &VerifyConfig) -> Result<Self, VerifyError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(&self, page: &PageImage) -> Result<RecognizedText, PageError> {
        let start = Instant::now();
        let page_num = page.page_num;
        let retries = self.max_retries.min(u8::MAX as u32) as u8;

        let image_data = encode_page(&page.image).map_err(|e| PageError::RecognitionFailed {
            page: page_num,
            retries: 0,
            detail: format!("image encoding failed: {e}"),
        })?;

        // The image carries the content; the user turn text stays empty.
        let messages = vec![
            ChatMessage::system(TRANSCRIPTION_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&self.options)).await {
                Ok(response) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens, {:?}",
                        page_num,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(RecognizedText {
                        page_num,
                        text: strip_outer_fences(&response.content),
                        engine_confidence: None,
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(PageError::RecognitionFailed {
            page: page_num,
            retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

fn build_options(config: &VerifyConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Upper bound on a single retry pause.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff before retry `attempt` (1-based), capped at
/// [`MAX_BACKOFF_MS`].
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| base_ms.saturating_mul(factor))
        .min(MAX_BACKOFF_MS)
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

/// Models sometimes wrap the transcription in a code fence despite the prompt.
fn strip_outer_fences(content: &str) -> String {
    let trimmed = content.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. Pre-built provider (`config.provider`).
/// 2. Named provider + model (`config.provider_name`); the factory reads the
///    matching API key from the environment.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI when `OPENAI_API_KEY` is present.
/// 5. Full auto-detection via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &VerifyConfig) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| VerifyError::RecognizerNotConfigured {
            engine: "vision".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY or ANTHROPIC_API_KEY, or use --engine tesseract.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        VerifyError::RecognizerNotConfigured {
            engine: format!("vision ({provider_name})"),
            hint: format!("{e}"),
        }
    })
}

// ── Tesseract engine ─────────────────────────────────────────────────────────

/// Bridge to the `tesseract` command-line program.
///
/// Each page is written to a temporary PNG and recognized with
/// `tesseract <png> stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
    lang: String,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            lang: lang.into(),
        }
    }

    pub fn from_config(config: &VerifyConfig) -> Self {
        Self::new(&config.tesseract_binary, &config.tesseract_lang)
    }

    /// Check the binary can be executed (`tesseract --version`).
    pub async fn probe(&self) -> Result<(), VerifyError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| VerifyError::RecognizerNotConfigured {
                engine: "tesseract".to_string(),
                hint: format!(
                    "Could not run '{}': {e}\nInstall tesseract-ocr or pass --tesseract-binary.",
                    self.binary
                ),
            })?;
        if !output.status.success() {
            return Err(VerifyError::RecognizerNotConfigured {
                engine: "tesseract".to_string(),
                hint: format!("'{} --version' exited with {}", self.binary, output.status),
            });
        }
        let version = String::from_utf8_lossy(&output.stdout);
        debug!(
            "Using {}",
            version.lines().next().unwrap_or("tesseract (unknown version)")
        );
        Ok(())
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, page: &PageImage) -> Result<RecognizedText, PageError> {
        let page_num = page.page_num;
        let fail = |detail: String| PageError::RecognitionFailed {
            page: page_num,
            retries: 0,
            detail,
        };

        let png = encode_png(&page.image).map_err(|e| fail(format!("image encoding failed: {e}")))?;
        let mut tmp = tempfile::Builder::new()
            .prefix("aegis-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| fail(format!("tempfile: {e}")))?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| fail(format!("tempfile write: {e}")))?;

        let start = Instant::now();
        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .await
            .map_err(|e| fail(format!("could not run '{}': {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(
            "Page {}: tesseract produced {} chars in {:?}",
            page_num,
            text.len(),
            start.elapsed()
        );
        Ok(RecognizedText {
            page_num,
            text,
            engine_confidence: None,
        })
    }
}

// ── Engine selection ─────────────────────────────────────────────────────────

/// Pick the recognizer for a config: the injected one, else the configured
/// built-in engine.
pub async fn build_recognizer(
    config: &VerifyConfig,
) -> Result<Arc<dyn TextRecognizer>, VerifyError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }
    match config.engine {
        RecognitionEngine::Vision => {
            let engine = VisionRecognizer::from_config(config)?;
            info!("Recognition engine: vision");
            Ok(Arc::new(engine))
        }
        RecognitionEngine::Tesseract => {
            let engine = TesseractRecognizer::from_config(config);
            engine.probe().await?;
            info!("Recognition engine: tesseract ({})", config.tesseract_lang);
            Ok(Arc::new(engine))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn blank_page() -> PageImage {
        PageImage {
            page_num: 1,
            image: DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255]))),
        }
    }

    #[test]
    fn options_follow_config() {
        let config = VerifyConfig::builder()
            .temperature(0.2)
            .max_tokens(512)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(512));
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_outer_fences("```\nCGPA: 8.5\n```"), "CGPA: 8.5");
        assert_eq!(strip_outer_fences("```text\nName: Jane Doe\n```\n"), "Name: Jane Doe");
        assert_eq!(strip_outer_fences("  Plain text  "), "Plain text");
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 3), 2000);
        assert_eq!(backoff_delay_ms(500, 65), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(u64::MAX, 2), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(0, 200), 0);
    }

    #[tokio::test]
    async fn missing_tesseract_binary_fails_probe() {
        let engine = TesseractRecognizer::new("/nonexistent/tesseract-binary", "eng");
        let err = engine.probe().await.unwrap_err();
        assert!(matches!(err, VerifyError::RecognizerNotConfigured { .. }));
    }

    #[tokio::test]
    async fn missing_tesseract_binary_fails_page_not_document() {
        let engine = TesseractRecognizer::new("/nonexistent/tesseract-binary", "eng");
        let err = engine.recognize(&blank_page()).await.unwrap_err();
        assert!(matches!(err, PageError::RecognitionFailed { page: 1, .. }));
    }

    struct Fixed;

    #[async_trait]
    impl TextRecognizer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, page: &PageImage) -> Result<RecognizedText, PageError> {
            Ok(RecognizedText {
                page_num: page.page_num,
                text: "CGPA: 9.0".into(),
                engine_confidence: Some(0.9),
            })
        }
    }

    #[tokio::test]
    async fn injected_recognizer_wins_over_engine() {
        let config = VerifyConfig::builder()
            .engine(RecognitionEngine::Tesseract)
            .tesseract_binary("/nonexistent/tesseract-binary")
            .recognizer(Arc::new(Fixed))
            .build()
            .unwrap();
        let engine = build_recognizer(&config).await.unwrap();
        assert_eq!(engine.name(), "fixed");
    }
}
