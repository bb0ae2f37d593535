//! Pipeline controller and top-level extraction entry points.
//!
//! [`StatementPipeline`] owns the only mutable state of a run: the
//! [`Aggregator`] and the run status. Observers never touch it directly;
//! after every folded unit the controller publishes an owned
//! [`RunSnapshot`] on a `tokio::sync::watch` channel.
//!
//! Units are processed strictly one at a time in batch order: the next page
//! is not rendered until the current page's result has been folded. The
//! carry-forward rules for balances and the order of the transaction list
//! both rely on this, so the loop below is a plain sequential fold.
//!
//! Fatal errors are caught once, in [`StatementPipeline::run`], turned into
//! `RunStatus::Failed`, and returned. Whatever was folded before the failure
//! stays in the published snapshot.

use crate::config::ExtractionConfig;
use crate::error::StatementError;
use crate::export::{write_report, ReportFormat};
use crate::output::{
    RunSnapshot, RunStats, RunStatus, StatementReport, FAILED_STATUS_LABEL,
};
use crate::pipeline::aggregate::Aggregator;
use crate::pipeline::decompose::{self, ExtractionUnit, MediaKind};
use crate::pipeline::encode::{self, ImagePayload};
use crate::pipeline::input::{self, InputFile};
use crate::pipeline::llm::{ExtractionClient, VisionExtractionClient};
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer, RENDER_SCALE};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Drives a batch of files through decomposition, extraction and aggregation.
///
/// `run` takes `&mut self`, so one pipeline can never drive two runs at once.
/// Starting a new run resets all state.
pub struct StatementPipeline {
    rasterizer: Arc<dyn PageRasterizer>,
    client: Arc<dyn ExtractionClient>,
    progress: ProgressCallback,
    jpeg_quality: u8,
    state_tx: watch::Sender<RunSnapshot>,
}

impl StatementPipeline {
    /// Build a pipeline from explicit collaborators.
    pub fn new(
        config: &ExtractionConfig,
        rasterizer: Arc<dyn PageRasterizer>,
        client: Arc<dyn ExtractionClient>,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunSnapshot::idle());
        Self {
            rasterizer,
            client,
            progress: config
                .progress_callback
                .clone()
                .unwrap_or_else(|| Arc::new(NoopProgressCallback)),
            jpeg_quality: config.jpeg_quality,
            state_tx,
        }
    }

    /// Build a pipeline with the pdfium rasteriser and the configured LLM provider.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, StatementError> {
        let provider = resolve_provider(config)?;
        let client = VisionExtractionClient::new(provider, config);
        let rasterizer = PdfiumRasterizer::new(config.password.clone(), config.max_rendered_pixels);
        Ok(Self::new(config, Arc::new(rasterizer), Arc::new(client)))
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state_tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> RunSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Process `files` in order.
    ///
    /// # Errors
    /// The first fatal error. The run is then marked failed and the snapshot
    /// keeps every unit folded before the failure.
    pub async fn run(&mut self, files: &[InputFile]) -> Result<StatementReport, StatementError> {
        let start = Instant::now();
        info!("Starting extraction run: {} file(s)", files.len());

        let mut aggregator = Aggregator::new();
        let mut units_processed = 0usize;
        self.publish_running(&aggregator, units_processed, "Initializing...".to_string());
        self.progress.on_run_start(files.len());

        if let Err(err) = self
            .process_files(files, &mut aggregator, &mut units_processed)
            .await
        {
            let message = err.to_string();
            warn!("Extraction run failed after {} unit(s): {}", units_processed, message);

            let state = aggregator.state();
            self.state_tx.send_replace(RunSnapshot {
                status: RunStatus::Failed(message.clone()),
                status_line: FAILED_STATUS_LABEL.to_string(),
                error: Some(message.clone()),
                transactions: state.transactions.clone(),
                opening_balance: state.opening_balance,
                closing_balance: state.closing_balance,
                summary: None,
                units_processed,
            });
            self.progress.on_run_failed(&message);
            return Err(err);
        }

        let (state, summary) = aggregator.finish();
        let label = format!(
            "Successfully processed {} file(s) and extracted {} transactions.",
            files.len(),
            state.transactions.len()
        );
        info!("{}", label);

        self.state_tx.send_replace(RunSnapshot {
            status: RunStatus::Succeeded(label.clone()),
            status_line: label,
            error: None,
            transactions: state.transactions.clone(),
            opening_balance: state.opening_balance,
            closing_balance: state.closing_balance,
            summary: Some(summary),
            units_processed,
        });
        self.progress
            .on_run_complete(files.len(), state.transactions.len());

        Ok(StatementReport {
            stats: RunStats {
                total_files: files.len(),
                total_units: units_processed,
                total_transactions: state.transactions.len(),
                total_duration_ms: start.elapsed().as_millis() as u64,
            },
            transactions: state.transactions,
            balances: summary,
        })
    }

    /// Like [`Self::run`], but a failure also hands back everything folded
    /// before it.
    pub async fn run_keeping_partial(
        &mut self,
        files: &[InputFile],
    ) -> Result<StatementReport, FailedRun> {
        match self.run(files).await {
            Ok(report) => Ok(report),
            Err(error) => {
                let mut partial = self.snapshot().partial_report();
                partial.stats.total_files = files.len();
                Err(FailedRun { error, partial })
            }
        }
    }

    async fn process_files(
        &self,
        files: &[InputFile],
        aggregator: &mut Aggregator,
        units_processed: &mut usize,
    ) -> Result<(), StatementError> {
        let total_files = files.len();

        for (file_index, file) in files.iter().enumerate() {
            self.publish_running(
                aggregator,
                *units_processed,
                format!(
                    "Processing file {} of {}: {}",
                    file_index + 1,
                    total_files,
                    file.name
                ),
            );
            self.progress.on_file_start(file_index, total_files, &file.name);

            // Decomposed only when reached: a bad file later in the batch
            // must not stop the files before it.
            let units = decompose::decompose_file(file_index, file, self.rasterizer.as_ref()).await?;

            for unit in &units {
                let label = unit_label(unit, file, total_files);
                self.publish_running(aggregator, *units_processed, label.clone());
                self.progress.on_unit_start(unit, &label);

                let payload = self.payload_for(file, unit).await?;
                let page = self.client.extract(payload).await?;
                let found = page.transactions.len();

                aggregator.fold(unit, page);
                *units_processed += 1;
                debug!(
                    "Folded file {} unit {}/{}: {} transaction(s)",
                    file_index + 1,
                    unit.source_page_index + 1,
                    unit.total_units_in_source,
                    found
                );

                self.publish_running(aggregator, *units_processed, label);
                self.progress.on_unit_complete(unit, found);
            }
        }

        Ok(())
    }

    async fn payload_for(
        &self,
        file: &InputFile,
        unit: &ExtractionUnit,
    ) -> Result<ImagePayload, StatementError> {
        match unit.kind {
            MediaKind::Paged => {
                let image = self
                    .rasterizer
                    .render_page(file, unit.source_page_index, RENDER_SCALE)
                    .await?;
                encode::encode_page(&image, self.jpeg_quality).map_err(|e| {
                    StatementError::RasterisationFailed {
                        file: file.name.clone(),
                        page_index: unit.source_page_index,
                        detail: format!("Image encoding failed: {}", e),
                    }
                })
            }
            MediaKind::Image => Ok(encode::encode_file(file)),
        }
    }

    fn publish_running(&self, aggregator: &Aggregator, units_processed: usize, label: String) {
        let state = aggregator.state();
        self.state_tx.send_replace(RunSnapshot {
            status: RunStatus::Running(label.clone()),
            status_line: label,
            error: None,
            transactions: state.transactions.clone(),
            opening_balance: state.opening_balance,
            closing_balance: state.closing_balance,
            summary: None,
            units_processed,
        });
    }
}

fn unit_label(unit: &ExtractionUnit, file: &InputFile, total_files: usize) -> String {
    match unit.kind {
        MediaKind::Paged => format!(
            "Processing page {} of {} (File {}/{})",
            unit.source_page_index + 1,
            unit.total_units_in_source,
            unit.source_file_index + 1,
            total_files
        ),
        MediaKind::Image => format!("Processing image: {}", file.name),
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Extract transactions and balances from a batch of statement files or URLs.
///
/// This is the primary entry point for the library. Inputs are read in
/// order, then processed in that same order.
///
/// # Example
/// ```rust,no_run
/// use edgequake_bankstmt::{extract_statements, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let report = extract_statements(&["april.pdf", "may-scan.jpg"], &config).await?;
/// println!("{} transactions, closing {:?}",
///     report.transactions.len(), report.balances.closing_balance);
/// # Ok(())
/// # }
/// ```
pub async fn extract_statements<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<StatementReport, StatementError> {
    let files = input::resolve_inputs(inputs, config.download_timeout_secs).await?;
    let mut pipeline = StatementPipeline::from_config(config)?;
    pipeline.run(&files).await
}

/// A run that stopped on a fatal error.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct FailedRun {
    #[source]
    pub error: StatementError,
    /// Transactions and balances from the units folded before the error.
    /// Empty when the run never started (bad input, no provider).
    pub partial: StatementReport,
}

impl FailedRun {
    fn before_start(error: StatementError) -> Self {
        Self {
            error,
            partial: StatementReport::default(),
        }
    }
}

/// Like [`extract_statements`], but a failed run still returns the
/// transactions and balances extracted before the failure.
pub async fn extract_statements_partial<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<StatementReport, FailedRun> {
    let files = input::resolve_inputs(inputs, config.download_timeout_secs)
        .await
        .map_err(FailedRun::before_start)?;
    let mut pipeline = StatementPipeline::from_config(config).map_err(FailedRun::before_start)?;
    pipeline.run_keeping_partial(&files).await
}

/// Synchronous wrapper around [`extract_statements`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_statements_sync<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<StatementReport, StatementError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StatementError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_statements(inputs, config))
}

/// Extract and write the report to `output_path` atomically.
pub async fn extract_to_file<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    format: ReportFormat,
    config: &ExtractionConfig,
) -> Result<StatementReport, StatementError> {
    let report = extract_statements(inputs, config).await?;

    let path = output_path.as_ref().to_path_buf();
    let to_write = report.clone();
    tokio::task::spawn_blocking(move || write_report(&path, format, &to_write))
        .await
        .map_err(|e| StatementError::Internal(format!("Write task panicked: {}", e)))??;

    Ok(report)
}

/// How one input would be processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFile {
    pub name: String,
    pub mime_type: String,
    /// `None` when the file would stop the run as unsupported.
    pub kind: Option<MediaKind>,
    /// Extraction calls the file would cost.
    pub units: usize,
}

/// Resolve inputs and report how each would be decomposed.
///
/// Does not require an LLM provider or API key. Unsupported files are
/// reported rather than treated as errors.
pub async fn inspect<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<Vec<PlannedFile>, StatementError> {
    let files = input::resolve_inputs(inputs, config.download_timeout_secs).await?;
    let rasterizer = PdfiumRasterizer::new(config.password.clone(), config.max_rendered_pixels);
    plan_files(&files, &rasterizer).await
}

async fn plan_files(
    files: &[InputFile],
    rasterizer: &dyn PageRasterizer,
) -> Result<Vec<PlannedFile>, StatementError> {
    let mut planned = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let kind = MediaKind::classify(&file.mime_type);
        let units = match kind {
            Some(_) => decompose::decompose_file(index, file, rasterizer).await?.len(),
            None => 0,
        };
        planned.push(PlannedFile {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            kind,
            units,
        });
    }
    Ok(planned)
}

// ── Provider resolution ──────────────────────────────────────────────────

const DEFAULT_MODEL: &str = "gpt-4.1-mini";

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, StatementError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StatementError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. pre-built provider (`config.provider`)
/// 2. named provider + model (`config.provider_name`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. `ProviderFactory::from_env()` auto-detection
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, StatementError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
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
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StatementError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, GEMINI_API_KEY, or ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
