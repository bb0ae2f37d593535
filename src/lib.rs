//! # edgequake-bankstmt
//!
//! Extract transactions and balances from bank statements using Vision
//! Language Models (VLMs).
//!
//! Statements arrive as PDFs or as photos and scans. Each PDF page is
//! rasterised and each image is passed through as-is; a VLM reads every
//! page and returns structured JSON, which is validated and folded into one
//! running transaction list with an opening and a closing balance.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files / URLs
//!  │
//!  ├─ 1. Input      read local files or download URLs, detect MIME type
//!  ├─ 2. Decompose  one unit per PDF page, one unit per image
//!  ├─ 3. Render     rasterise PDF pages at 2× via pdfium (spawn_blocking)
//!  ├─ 4. Encode     JPEG → base64 ImageData
//!  ├─ 5. Extract    one VLM call per unit, strictly in order
//!  ├─ 6. Validate   drop malformed transactions, keep the rest
//!  └─ 7. Aggregate  append transactions, carry balances forward, publish
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_bankstmt::{extract_statements, format_balance_summary, to_tsv, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let report = extract_statements(&["april.pdf", "may.jpg"], &config).await?;
//!     print!("{}", to_tsv(&report.transactions));
//!     eprint!("{}", format_balance_summary(&report.balances));
//!     Ok(())
//! }
//! ```
//!
//! ## Observing a run
//!
//! [`StatementPipeline::subscribe`] returns a `watch` receiver that sees a
//! fresh [`RunSnapshot`] after every page, and [`extract_stream`] wraps the
//! same channel as a `Stream`. Per-event hooks are available through
//! [`RunProgressCallback`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bankstmt` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-bankstmt = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::StatementError;
pub use export::{
    format_balance_summary, render_report, to_json, to_tsv, write_report, ReportFormat,
};
pub use extract::{
    extract_statements, extract_statements_partial, extract_statements_sync, extract_to_file,
    inspect, FailedRun, PlannedFile, StatementPipeline,
};
pub use output::{
    AggregateState, BalanceSummary, PageResult, RunSnapshot, RunStats, RunStatus,
    StatementReport, Transaction,
};
pub use pipeline::aggregate::Aggregator;
pub use pipeline::decompose::{ExtractionUnit, MediaKind};
pub use pipeline::encode::ImagePayload;
pub use pipeline::input::InputFile;
pub use pipeline::llm::{ExtractionClient, VisionExtractionClient};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer, RENDER_SCALE};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use stream::{extract_stream, snapshot_stream, SnapshotStream};
