//! Report rendering: TSV for spreadsheets, JSON for programs, and a plain
//! text balance summary for terminals.

use crate::error::StatementError;
use crate::output::{BalanceSummary, StatementReport, Transaction};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Header row of the TSV export.
pub const TSV_HEADER: &str = "Date\tDescription\tAmount\tCategory\tNotes";

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\n|\r").unwrap());

/// Output format for written reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Tab-separated transactions, ready to paste into a spreadsheet.
    #[default]
    Tsv,
    /// The full [`StatementReport`] as pretty-printed JSON.
    Json,
}

/// Cells must stay on one line and inside one column.
fn tsv_cell(value: &str) -> String {
    RE_LINE_BREAKS.replace_all(value, " ").replace('\t', " ")
}

/// Render transactions as TSV: a header row, then one row per transaction.
/// Missing notes become an empty cell.
pub fn to_tsv(transactions: &[Transaction]) -> String {
    let mut out = String::with_capacity(64 * (transactions.len() + 1));
    out.push_str(TSV_HEADER);
    out.push('\n');

    for t in transactions {
        let row = [
            tsv_cell(&t.date),
            tsv_cell(&t.description),
            t.amount.to_string(),
            tsv_cell(&t.category),
            tsv_cell(t.notes.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}

pub fn to_json(report: &StatementReport) -> Result<String, StatementError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| StatementError::Internal(format!("Failed to serialise report: {e}")))
}

/// Render `report` in `format`.
pub fn render_report(report: &StatementReport, format: ReportFormat) -> Result<String, StatementError> {
    match format {
        ReportFormat::Tsv => Ok(to_tsv(&report.transactions)),
        ReportFormat::Json => to_json(report),
    }
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"))
}

/// Four-line balance summary. Debits are shown as a positive magnitude;
/// unknown balances print as `N/A`.
pub fn format_balance_summary(summary: &BalanceSummary) -> String {
    format!(
        "Opening Balance: {}\nTotal Credits:   {:.2}\nTotal Debits:    {:.2}\nClosing Balance: {}\n",
        money(summary.opening_balance),
        summary.total_credits,
        summary.total_debits.abs(),
        money(summary.closing_balance),
    )
}

/// Write `report` to `path` atomically: the content goes to a temporary
/// file in the same directory, which is then renamed over `path`.
pub fn write_report(
    path: &Path,
    format: ReportFormat,
    report: &StatementReport,
) -> Result<(), StatementError> {
    let content = render_report(report, format)?;
    let write_err = |source: std::io::Error| StatementError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!(
        "Wrote {} transaction(s) to {}",
        report.transactions.len(),
        path.display()
    );
    Ok(())
}
