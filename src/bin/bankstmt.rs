//! CLI binary for edgequake-bankstmt.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_bankstmt::{
    extract_statements_partial, format_balance_summary, inspect, render_report, write_report,
    ExtractionConfig, ExtractionUnit, MediaKind, ProgressCallback, ReportFormat,
    RunProgressCallback, StatementReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar per file, sized once the file's page count is
/// known, plus a log line per extracted page.
struct CliProgressCallback {
    bar: ProgressBar,
    unit_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Initializing...");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            unit_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total_units: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(style);
        self.bar.set_length(total_units as u64);
        self.bar.set_position(0);
    }

    fn elapsed_secs(&self) -> f64 {
        self.unit_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_files: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, file_index: usize, total_files: usize, file_name: &str) {
        self.bar
            .set_prefix(format!("File {}/{}", file_index + 1, total_files));
        self.bar.set_message(file_name.to_string());
    }

    fn on_unit_start(&self, unit: &ExtractionUnit, label: &str) {
        if unit.source_page_index == 0 {
            self.activate_bar(unit.total_units_in_source);
        }
        if let Ok(mut started) = self.unit_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(label.to_string());
    }

    fn on_unit_complete(&self, unit: &ExtractionUnit, transactions_found: usize) {
        let what = match unit.kind {
            MediaKind::Paged => format!(
                "Page {:>3}/{:<3}",
                unit.source_page_index + 1,
                unit.total_units_in_source
            ),
            MediaKind::Image => "Image        ".to_string(),
        };
        self.bar.println(format!(
            "  {} {}  {:<16}  {}",
            green("✓"),
            what,
            dim(&format!("{transactions_found:>4} transactions")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_files: usize, total_transactions: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} transactions from {} file(s)",
            green("✔"),
            bold(&total_transactions.to_string()),
            total_files
        );
    }

    fn on_run_failed(&self, error: &str) {
        self.bar.finish_and_clear();
        let msg = if error.chars().count() > 100 {
            format!("{}\u{2026}", error.chars().take(99).collect::<String>())
        } else {
            error.to_string()
        };
        eprintln!("{} {}", red("✘"), red(&msg));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract to stdout as TSV (paste straight into a spreadsheet)
  bankstmt april.pdf

  # Several statements in one run; balances carry across files
  bankstmt april.pdf may.pdf june-scan.jpg -o q2.tsv

  # Full JSON report (transactions + balances + stats)
  bankstmt --format json statement.pdf -o statement.json

  # Password-protected statement
  bankstmt --password 1234 statement.pdf

  # Use a specific model
  bankstmt --model gpt-4.1 --provider openai statement.pdf

  # Show how files would be split into pages (no API key needed)
  bankstmt --inspect-only april.pdf scan.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Extract:         bankstmt statement.pdf -o statement.tsv
"#;

/// Extract transactions and balances from bank statements using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "bankstmt",
    version,
    about = "Extract transactions and balances from bank statements using Vision LLMs",
    long_about = "Extract transactions, opening and closing balances from bank statements \
(PDF files, scans and photos, local or by URL) using Vision Language Models. Files are \
processed in the order given and balances carry across them.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local statement files (PDF or image) or HTTP/HTTPS URLs, in order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "BANKSTMT_OUTPUT")]
    output: Option<PathBuf>,

    /// Report format: tsv or json.
    #[arg(long, env = "BANKSTMT_FORMAT", value_enum, default_value = "tsv")]
    format: FormatArg,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// PDF user password for encrypted statements.
    #[arg(long, env = "BANKSTMT_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction instruction.
    #[arg(long, env = "BANKSTMT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "BANKSTMT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "BANKSTMT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// JPEG quality for rendered pages (1–100).
    #[arg(long, env = "BANKSTMT_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Shorthand for `--format json`.
    #[arg(long, env = "BANKSTMT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BANKSTMT_NO_PROGRESS")]
    no_progress: bool,

    /// Print how each input would be split into pages, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BANKSTMT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BANKSTMT_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BANKSTMT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-page LLM call timeout in seconds (0 disables).
    #[arg(long, env = "BANKSTMT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Tsv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Tsv => ReportFormat::Tsv,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.json {
        ReportFormat::Json
    } else {
        cli.format.into()
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None).await?;
        let plan = inspect(cli.inputs.as_slice(), &config)
            .await
            .context("Failed to inspect inputs")?;

        if matches!(format, ReportFormat::Json) {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?
            );
        } else {
            let mut total = 0;
            for (i, file) in plan.iter().enumerate() {
                let kind = match file.kind {
                    Some(MediaKind::Paged) => "pdf".to_string(),
                    Some(MediaKind::Image) => "image".to_string(),
                    None => red("unsupported"),
                };
                println!(
                    "{:>3}. {:<40} {:<24} {:<11} {} page(s)",
                    i + 1,
                    file.name,
                    file.mime_type,
                    kind,
                    file.units
                );
                total += file.units;
            }
            println!("Total extraction calls: {total}");
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let report = match extract_statements_partial(cli.inputs.as_slice(), &config).await {
        Ok(report) => report,
        Err(failed) => {
            // Keep whatever was extracted before the failure.
            if !failed.partial.transactions.is_empty() || failed.partial.stats.total_units > 0 {
                emit_report(&cli, format, &failed.partial)?;
                if !cli.quiet {
                    eprint!("{}", format_balance_summary(&failed.partial.balances));
                    eprintln!(
                        "{}  partial results: {} transactions from {} page(s); the run failed",
                        red("⚠"),
                        failed.partial.stats.total_transactions,
                        failed.partial.stats.total_units,
                    );
                }
            }
            return Err(anyhow::Error::new(failed.error).context("Extraction failed"));
        }
    };
    emit_report(&cli, format, &report)?;

    if let Some(ref output_path) = cli.output {
        if !cli.quiet {
            eprintln!(
                "{}  {} transactions  {}ms  →  {}",
                green("✔"),
                report.stats.total_transactions,
                report.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    }

    if !cli.quiet {
        eprint!("{}", format_balance_summary(&report.balances));
        if !show_progress {
            eprintln!(
                "{}",
                dim(&format!(
                    "{} file(s), {} page(s), {}ms",
                    report.stats.total_files,
                    report.stats.total_units,
                    report.stats.total_duration_ms
                ))
            );
        }
    }

    Ok(())
}

/// Write `report` to `-o` atomically, or to stdout.
fn emit_report(cli: &Cli, format: ReportFormat, report: &StatementReport) -> Result<()> {
    if let Some(ref output_path) = cli.output {
        write_report(output_path, format, report)?;
        return Ok(());
    }

    let rendered = render_report(report, format).context("Failed to render report")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(rendered.as_bytes())
        .context("Failed to write to stdout")?;
    if !rendered.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .jpeg_quality(cli.jpeg_quality)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
