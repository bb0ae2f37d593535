//! Streaming API: observe a run as it progresses.
//!
//! A run publishes a [`RunSnapshot`] after every folded unit. These
//! functions expose that channel as a `Stream`, so callers can render the
//! running transaction list and balances while later pages are still being
//! extracted.
//!
//! The channel holds only the latest snapshot. A slow consumer skips
//! intermediate snapshots but never misses the last one: the stream ends
//! only after the pipeline is dropped, and the last value it yields is the
//! terminal state of the run.

use crate::config::ExtractionConfig;
use crate::error::StatementError;
use crate::extract::StatementPipeline;
use crate::output::{RunSnapshot, StatementReport};
use crate::pipeline::input;
use std::pin::Pin;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of run snapshots.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = RunSnapshot> + Send>>;

/// Wrap a snapshot receiver as a stream. The current value is yielded first.
pub fn snapshot_stream(rx: watch::Receiver<RunSnapshot>) -> SnapshotStream {
    Box::pin(WatchStream::new(rx))
}

impl StatementPipeline {
    /// Snapshots of this pipeline's runs, starting with the current one.
    pub fn snapshots(&self) -> SnapshotStream {
        snapshot_stream(self.subscribe())
    }
}

/// Start an extraction run in the background and stream its snapshots.
///
/// Input resolution and provider setup happen before this returns, so
/// missing files and unconfigured providers fail here. Everything after
/// that is reported through the stream and the returned task handle.
///
/// # Example
/// ```rust,no_run
/// use edgequake_bankstmt::{extract_stream, ExtractionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let (mut snapshots, handle) = extract_stream(&["statement.pdf"], &config).await?;
/// while let Some(snap) = snapshots.next().await {
///     eprintln!("{} ({} transactions)", snap.status_line, snap.transactions.len());
/// }
/// let report = handle.await??;
/// println!("closing balance: {:?}", report.balances.closing_balance);
/// # Ok(())
/// # }
/// ```
pub async fn extract_stream<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<
    (
        SnapshotStream,
        JoinHandle<Result<StatementReport, StatementError>>,
    ),
    StatementError,
> {
    let files = input::resolve_inputs(inputs, config.download_timeout_secs).await?;
    let mut pipeline = StatementPipeline::from_config(config)?;
    let snapshots = pipeline.snapshots();

    info!("Starting streamed extraction of {} file(s)", files.len());
    let handle = tokio::spawn(async move { pipeline.run(&files).await });

    Ok((snapshots, handle))
}
