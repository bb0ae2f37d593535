//! Data model shared by the pipeline stages and exposed to callers.
//!
//! The only mutable object of a run is the aggregate owned by the
//! controller; everything a caller can hold on to ([`RunSnapshot`],
//! [`StatementReport`]) is an owned copy taken at publication time.

use serde::{Deserialize, Serialize};

/// One transaction line extracted from a statement page.
///
/// Never mutated after it has been appended to the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction date as reported by the service (DD-MM-YYYY).
    pub date: String,
    /// Short description or merchant name.
    pub description: String,
    /// Signed amount: negative for debits, positive for credits.
    pub amount: f64,
    /// Suggested spending category.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The validated output of one extraction call.
///
/// Balances are per-page observations; most pages report neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub transactions: Vec<Transaction>,
    pub opening_balance: Option<f64>,
    pub closing_balance: Option<f64>,
}

impl PageResult {
    /// An empty page: no transactions, no balances.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Running state folded from every successfully processed unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateState {
    /// Append-only, in unit-processing order.
    pub transactions: Vec<Transaction>,
    /// Captured at most once, from the first page of the first file.
    pub opening_balance: Option<f64>,
    /// Last non-null closing balance observed so far.
    pub closing_balance: Option<f64>,
}

/// Final balance figures for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub opening_balance: Option<f64>,
    /// Sum of all positive amounts.
    pub total_credits: f64,
    /// Sum of all negative amounts (itself negative or zero).
    pub total_debits: f64,
    pub closing_balance: Option<f64>,
}

impl BalanceSummary {
    /// Compute the summary with a full pass over the final transaction list.
    pub fn from_state(state: &AggregateState) -> Self {
        let total_credits = state
            .transactions
            .iter()
            .map(|t| t.amount)
            .filter(|a| *a > 0.0)
            .sum();
        let total_debits = state
            .transactions
            .iter()
            .map(|t| t.amount)
            .filter(|a| *a < 0.0)
            .sum();

        Self {
            opening_balance: state.opening_balance,
            total_credits,
            total_debits,
            closing_balance: state.closing_balance,
        }
    }
}

/// Lifecycle of a pipeline run. Transitions only move forward;
/// returning to `Idle` requires starting a new run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    /// Human-readable progress label.
    Running(String),
    /// Summary label naming files and transactions processed.
    Succeeded(String),
    /// The fatal error message that stopped the run.
    Failed(String),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded(_) | RunStatus::Failed(_))
    }
}

/// Status line shown once a run has failed; the reason lives in
/// [`RunSnapshot::error`].
pub const FAILED_STATUS_LABEL: &str = "Processing failed.";

/// Status line before any run has started.
pub const IDLE_STATUS_LABEL: &str = "Ready to process your bank statements.";

/// Read-only view of a run, republished after every processed unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub status: RunStatus,
    /// Status line text. Mirrors the running/success label and switches to
    /// [`FAILED_STATUS_LABEL`] on failure.
    pub status_line: String,
    /// Populated only when the run failed.
    pub error: Option<String>,
    pub transactions: Vec<Transaction>,
    pub opening_balance: Option<f64>,
    pub closing_balance: Option<f64>,
    /// Available once the run has succeeded.
    pub summary: Option<BalanceSummary>,
    /// Units folded so far.
    pub units_processed: usize,
}

impl RunSnapshot {
    pub fn idle() -> Self {
        Self {
            status_line: IDLE_STATUS_LABEL.to_string(),
            ..Self::default()
        }
    }

    /// The transactions and balances this snapshot holds, as a report.
    ///
    /// After a failed run this is everything folded before the failure.
    /// `summary` is ignored; totals are recomputed from the transactions.
    pub fn partial_report(&self) -> StatementReport {
        let state = AggregateState {
            transactions: self.transactions.clone(),
            opening_balance: self.opening_balance,
            closing_balance: self.closing_balance,
        };
        let balances = BalanceSummary::from_state(&state);
        StatementReport {
            stats: RunStats {
                total_units: self.units_processed,
                total_transactions: state.transactions.len(),
                ..RunStats::default()
            },
            transactions: state.transactions,
            balances,
        }
    }
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_files: usize,
    pub total_units: usize,
    pub total_transactions: usize,
    pub total_duration_ms: u64,
}

/// The result of a successful run, or the partial result of a failed one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementReport {
    pub transactions: Vec<Transaction>,
    pub balances: BalanceSummary,
    pub stats: RunStats,
}
