//! Aggregation: fold page results into one running [`AggregateState`].
//!
//! Balance carry-forward rules:
//!
//! - the opening balance is captured at most once, and only from the first
//!   page of the first file; later pages never set it, even when the first
//!   page reported none;
//! - every non-null closing balance overwrites the previous one, whichever
//!   file it came from, so the final value is the last one observed.
//!
//! Credit/debit totals are not tracked here. They are computed once from the
//! final list by [`BalanceSummary::from_state`].

use crate::output::{AggregateState, BalanceSummary, PageResult};
use crate::pipeline::decompose::ExtractionUnit;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Aggregator {
    state: AggregateState,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one successfully extracted unit. Must be called in unit order.
    pub fn fold(&mut self, unit: &ExtractionUnit, page: PageResult) {
        let PageResult {
            transactions,
            opening_balance,
            closing_balance,
        } = page;

        self.state.transactions.extend(transactions);

        if self.state.opening_balance.is_none() && unit.is_batch_start() {
            if let Some(opening) = opening_balance {
                debug!("Opening balance captured: {}", opening);
                self.state.opening_balance = Some(opening);
            }
        }

        if let Some(closing) = closing_balance {
            debug!(
                "Closing balance now {} (file {}, page {})",
                closing,
                unit.source_file_index + 1,
                unit.source_page_index + 1
            );
            self.state.closing_balance = Some(closing);
        }
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Freeze the state and compute the final summary.
    pub fn finish(self) -> (AggregateState, BalanceSummary) {
        let summary = BalanceSummary::from_state(&self.state);
        (self.state, summary)
    }
}
