//! Response parsing: untrusted service text → strict [`PageResult`].
//!
//! The service's output is validated field by field. Parsing has exactly
//! one failure mode: the text is not a JSON document at all. Everything
//! past that point is total:
//!
//! - a top level that is not an object with a `transactions` array becomes
//!   an empty page with null balances;
//! - a transaction missing `date`, `description`, a numeric `amount` or
//!   `category` is dropped and its siblings kept;
//! - a missing, null or non-numeric balance is `None`.

use crate::error::StatementError;
use crate::output::{PageResult, Transaction};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?```\s*$").unwrap());

/// Remove an outer markdown code fence (```` ```json ... ``` ````) that
/// models sometimes wrap JSON in despite being told not to.
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str().trim()),
        None => trimmed,
    }
}

/// Parse the service's raw text answer.
pub fn parse_response(text: &str) -> Result<PageResult, StatementError> {
    let body = strip_code_fences(text);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        StatementError::extraction(format!(
            "the document might be unclear or in an unsupported format (response was not JSON: {e})"
        ))
    })?;
    Ok(page_result_from_value(&value))
}

/// Validate an already-parsed response. Never fails.
pub fn page_result_from_value(value: &Value) -> PageResult {
    let Some(entries) = value.get("transactions").and_then(Value::as_array) else {
        warn!("Response has no transactions array; treating page as empty");
        return PageResult::empty();
    };

    let transactions: Vec<Transaction> = entries.iter().filter_map(transaction_from_value).collect();

    let dropped = entries.len() - transactions.len();
    if dropped > 0 {
        warn!("Dropped {} malformed transaction(s) from page", dropped);
    }
    debug!("Parsed {} transaction(s)", transactions.len());

    PageResult {
        transactions,
        opening_balance: number_field(value, "openingBalance"),
        closing_balance: number_field(value, "closingBalance"),
    }
}

/// A transaction entry is kept only when every required field is present
/// and non-empty and `amount` is a JSON number.
fn transaction_from_value(entry: &Value) -> Option<Transaction> {
    let amount = entry.get("amount").filter(|v| v.is_number())?.as_f64()?;

    Some(Transaction {
        date: text_field(entry, "date")?,
        description: text_field(entry, "description")?,
        amount,
        category: text_field(entry, "category")?,
        notes: text_field(entry, "notes"),
    })
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}
