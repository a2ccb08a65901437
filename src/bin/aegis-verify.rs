//! CLI binary for aegis-verify.
//!
//! A thin shim over the library crate: `extract` maps flags to
//! `VerifyConfig` and prints the upload response, `check` runs the
//! eligibility contract and reports the verdict through the exit code.

use aegis_verify::{
    check_eligibility, evaluate, extract_record, process_path, EligibilityRequest,
    EligibilityVerdict, NumericInput, ProgressCallback, RecognitionEngine,
    RecognitionProgressCallback, ScoringPolicy, UploadResponse, VerifyConfig,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Exit status of `check` when the student is not eligible.
const EXIT_NOT_ELIGIBLE: i32 = 2;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per recognized page. Pages finish
/// out of order when recognized concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RecognitionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Recognizing");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, chars: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} page(s) recognized", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} page(s) recognized  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract fields from a scanned marksheet (vision engine, auto-detected provider)
  aegis-verify extract marksheet.pdf

  # Use the local tesseract engine and print JSON
  aegis-verify extract --engine tesseract --json bank-letter.jpg

  # Extract from text that was already recognized elsewhere
  aegis-verify extract --text ocr-output.txt

  # Extract and check eligibility in one go
  aegis-verify extract marksheet.pdf --ielts 8.0

  # Check eligibility (exit code 0 = eligible, 2 = not eligible)
  aegis-verify check --gpa 8.5 --ielts 7.5
  aegis-verify check --gpa 85% --ielts 8 --json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (vision engine)
  ANTHROPIC_API_KEY       Anthropic API key (vision engine)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for PDF uploads
  RUST_LOG                Log filter, e.g. aegis_verify=debug
"#;

/// Extract admission fields from scanned documents and check eligibility.
#[derive(Parser, Debug)]
#[command(
    name = "aegis-verify",
    version,
    about = "Extract name, GPA and balance from scanned documents and check eligibility",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "AEGIS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "AEGIS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognize a document and extract name, academic score and balance.
    Extract(ExtractArgs),
    /// Evaluate the eligibility rule for a GPA and an IELTS score.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local file path or HTTP/HTTPS URL (PDF, JPG, PNG, BMP, TIFF, WEBP).
    /// With --text: a text file, or `-` for stdin.
    input: String,

    /// Treat the input as already-recognized text and skip recognition.
    #[arg(long)]
    text: bool,

    /// Recognition engine.
    #[arg(long, env = "AEGIS_ENGINE", value_enum, default_value = "vision")]
    engine: EngineArg,

    /// LLM provider for the vision engine: openai, anthropic, gemini, ollama.
    #[arg(long, env = "AEGIS_PROVIDER")]
    provider: Option<String>,

    /// LLM model for the vision engine.
    #[arg(long, env = "AEGIS_MODEL")]
    model: Option<String>,

    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "AEGIS_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Only recognize the first N pages.
    #[arg(long, env = "AEGIS_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Pages recognized concurrently.
    #[arg(short, long, env = "AEGIS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "AEGIS_PASSWORD")]
    password: Option<String>,

    /// Tesseract executable.
    #[arg(long, env = "AEGIS_TESSERACT_BINARY", default_value = "tesseract")]
    tesseract_binary: String,

    /// Tesseract language pack.
    #[arg(long, env = "AEGIS_TESSERACT_LANG", default_value = "eng")]
    tesseract_lang: String,

    /// Retries per page on vision engine failure.
    #[arg(long, env = "AEGIS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "AEGIS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-page recognition timeout in seconds.
    #[arg(long, env = "AEGIS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Also check eligibility against this IELTS score.
    #[arg(long)]
    ielts: Option<f64>,

    #[command(flatten)]
    policy: PolicyArgs,

    /// Print JSON instead of a summary.
    #[arg(long, env = "AEGIS_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "AEGIS_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Academic score: 10-point GPA or a percentage such as `85%`.
    #[arg(long)]
    gpa: String,

    /// IELTS band.
    #[arg(long)]
    ielts: String,

    #[command(flatten)]
    policy: PolicyArgs,

    /// Print JSON instead of a summary.
    #[arg(long, env = "AEGIS_JSON")]
    json: bool,
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Minimum 10-point GPA.
    #[arg(long, env = "AEGIS_GPA_THRESHOLD", default_value_t = 8.0)]
    gpa_threshold: f64,

    /// Minimum IELTS band.
    #[arg(long, env = "AEGIS_TEST_THRESHOLD", default_value_t = 8.0)]
    test_threshold: f64,

    /// Divisor mapping a percentage onto the 10-point scale.
    #[arg(long, env = "AEGIS_PERCENTAGE_DIVISOR", default_value_t = 10.0)]
    percentage_divisor: f64,
}

impl PolicyArgs {
    fn to_policy(&self) -> Result<ScoringPolicy> {
        let mut policy = ScoringPolicy::default();
        policy.thresholds.gpa_threshold = self.gpa_threshold;
        policy.thresholds.test_threshold = self.test_threshold;
        policy.percentage_divisor = self.percentage_divisor;
        policy.validate().context("Invalid scoring policy")?;
        Ok(policy)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Vision,
    Tesseract,
}

impl From<EngineArg> for RecognitionEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Vision => RecognitionEngine::Vision,
            EngineArg::Tesseract => RecognitionEngine::Tesseract,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is shown.
    let show_progress = match &cli.command {
        Command::Extract(args) => !cli.quiet && !args.no_progress && !args.json && !args.text,
        Command::Check(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract(ref args) => run_extract(args, show_progress, cli.quiet).await,
        Command::Check(ref args) => run_check(args),
    }
}

async fn run_extract(args: &ExtractArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let policy = args.policy.to_policy()?;

    let response = if args.text {
        let raw = read_text_input(&args.input).await?;
        let record = extract_record(&raw, &policy);
        UploadResponse::success(&args.input, raw, 1, &record, policy.percentage_divisor)
    } else {
        let progress: Option<ProgressCallback> = if show_progress {
            Some(CliProgressCallback::new() as Arc<dyn RecognitionProgressCallback>)
        } else {
            None
        };
        let config = build_config(args, policy, progress)?;
        process_path(&args.input, &config)
            .await
            .context("Document processing failed")?
    };

    let verdict = match (args.ielts, response.data.extracted_gpa) {
        (Some(ielts), Some(gpa)) => Some(evaluate(gpa, ielts, &policy.thresholds)),
        (Some(_), None) => {
            if !quiet {
                eprintln!("{} No academic score found; eligibility not checked", cyan("⚠"));
            }
            None
        }
        (None, _) => None,
    };

    if args.json {
        let mut value = serde_json::to_value(&response).context("Failed to serialise output")?;
        if let Some(ref v) = verdict {
            value["eligibility"] = serde_json::to_value(v).context("Failed to serialise verdict")?;
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise output")?
        );
    } else {
        print_summary(&response);
        if let Some(ref v) = verdict {
            println!();
            print_verdict(v);
        }
    }

    match verdict {
        Some(v) if !v.eligible => std::process::exit(EXIT_NOT_ELIGIBLE),
        _ => Ok(()),
    }
}

fn run_check(args: &CheckArgs) -> Result<()> {
    let policy = args.policy.to_policy()?;
    let request = EligibilityRequest {
        extracted_gpa: Some(NumericInput::Text(args.gpa.clone())),
        ielts_score: Some(NumericInput::Text(args.ielts.clone())),
    };
    let verdict = check_eligibility(&request, &policy).context("Eligibility check failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&verdict).context("Failed to serialise verdict")?
        );
    } else {
        print_verdict(&verdict);
    }

    if !verdict.eligible {
        std::process::exit(EXIT_NOT_ELIGIBLE);
    }
    Ok(())
}

/// Map CLI args to `VerifyConfig`.
fn build_config(
    args: &ExtractArgs,
    policy: ScoringPolicy,
    progress: Option<ProgressCallback>,
) -> Result<VerifyConfig> {
    let mut builder = VerifyConfig::builder()
        .engine(args.engine.into())
        .dpi(args.dpi)
        .concurrency(args.concurrency)
        .tesseract_binary(&args.tesseract_binary)
        .tesseract_lang(&args.tesseract_lang)
        .max_retries(args.max_retries)
        .download_timeout_secs(args.download_timeout)
        .api_timeout_secs(args.api_timeout)
        .policy(policy);

    if let Some(n) = args.max_pages {
        builder = builder.max_pages(n);
    }
    if let Some(ref p) = args.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref m) = args.model {
        builder = builder.model(m);
    }
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_text_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read text from stdin")?;
        Ok(buf)
    } else {
        let path = PathBuf::from(input);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read text from {:?}", path))
    }
}

fn print_summary(response: &UploadResponse) {
    let data = &response.data;
    let absent = || dim("not found");
    println!("{}", bold(&response.filename));
    println!(
        "  Name:        {}",
        data.extracted_name.clone().unwrap_or_else(absent)
    );
    println!(
        "  GPA (/10):   {}",
        match (data.extracted_gpa, data.academic_scale) {
            (Some(gpa), Some(scale)) => format!("{gpa:.2}  {}", dim(&format!("reported on {scale} scale"))),
            (Some(gpa), None) => format!("{gpa:.2}"),
            _ => absent(),
        }
    );
    println!(
        "  Balance:     {}",
        data.extracted_balance
            .map(|b| format!("{b:.2}"))
            .unwrap_or_else(absent)
    );
    println!("  Confidence:  {:.2}", data.confidence_score);
}

fn print_verdict(verdict: &EligibilityVerdict) {
    if verdict.eligible {
        println!("{} {}", green("✔"), bold("Eligible"));
    } else {
        println!("{} {}", red("✘"), bold("Not eligible"));
    }
    for reason in &verdict.reasons {
        let mark = if reason.ends_with("pass") { green("✓") } else { red("✗") };
        println!("  {mark} {reason}");
    }
}
