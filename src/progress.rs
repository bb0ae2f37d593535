//! Progress-callback trait for per-file and per-unit run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the batch. Callers who prefer pulling state
//! over receiving events can subscribe to the controller's snapshot channel
//! instead (see [`crate::extract::StatementPipeline::subscribe`]).
//!
//! Units are processed strictly one at a time, so events arrive in batch
//! order and never concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_bankstmt::{ExtractionConfig, ExtractionUnit, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     found: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, _unit: &ExtractionUnit, transactions_found: usize) {
//!         self.found.fetch_add(transactions_found, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { found: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::decompose::ExtractionUnit;
use std::sync::Arc;

/// Called by the pipeline controller as it processes the batch.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RunProgressCallback: Send + Sync {
    /// Called once, after state has been reset and before the first file.
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when the controller reaches a file, before it is decomposed.
    ///
    /// `file_index` is 0-based.
    fn on_file_start(&self, file_index: usize, total_files: usize, file_name: &str) {
        let _ = (file_index, total_files, file_name);
    }

    /// Called before a unit is rasterised/encoded and sent for extraction.
    fn on_unit_start(&self, unit: &ExtractionUnit, label: &str) {
        let _ = (unit, label);
    }

    /// Called after a unit's result has been folded into the aggregate.
    fn on_unit_complete(&self, unit: &ExtractionUnit, transactions_found: usize) {
        let _ = (unit, transactions_found);
    }

    /// Called once when every unit has been folded.
    fn on_run_complete(&self, total_files: usize, total_transactions: usize) {
        let _ = (total_files, total_transactions);
    }

    /// Called once when a fatal error stops the run.
    fn on_run_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
