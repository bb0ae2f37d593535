//! Instruction and output schema sent with every extraction call.
//!
//! Both live here so the contract with the extraction service can be read
//! and tested in one place. Callers can override the instruction via
//! [`crate::config::ExtractionConfig::system_prompt`]; the schema is always
//! appended so the response shape stays fixed.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Default instruction for extracting transactions from one statement page.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert financial assistant specializing in bank statement analysis. Analyze this image of a bank statement page and extract all transactional data and summary balances.

Your task is to:
1.  Identify every individual transaction line.
2.  For each transaction, extract the date, a short 2-3 word description, and the amount.
3.  Format the date as DD-MM-YYYY. If the year is not explicitly mentioned, infer it from the statement's context.
4.  Keep the description concise, only 2-3 words.
5.  Represent debits, withdrawals, and expenses as NEGATIVE numbers.
6.  Represent credits and deposits as POSITIVE numbers.
7.  Assign a relevant financial category to each transaction.
8.  Identify the Opening Balance and Closing Balance for the period shown on this page. If a value is not present on the page, return null for that field.
9.  Respond ONLY with a single JSON object that strictly adheres to the provided schema. Do not include any other text, explanations, or markdown formatting."#;

/// JSON schema the service must answer with.
pub static STATEMENT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "openingBalance": {
                "type": ["number", "null"],
                "description": "The opening balance for the statement period on this page. Return null if not explicitly found."
            },
            "closingBalance": {
                "type": ["number", "null"],
                "description": "The closing balance for the statement period on this page. Return null if not explicitly found."
            },
            "transactions": {
                "type": "array",
                "description": "A list of all transactions found on the statement page.",
                "items": {
                    "type": "object",
                    "properties": {
                        "date": {
                            "type": "string",
                            "description": "Transaction date in DD-MM-YYYY format. Infer the year if missing."
                        },
                        "description": {
                            "type": "string",
                            "description": "A concise 2-3 word transaction description or merchant name."
                        },
                        "amount": {
                            "type": "number",
                            "description": "Transaction amount. Use a negative number for debits/expenses/withdrawals and a positive number for credits/deposits."
                        },
                        "category": {
                            "type": "string",
                            "description": "A suggested category based on the description, e.g., \"Groceries\", \"Salary\", \"Utilities\", \"Shopping\", \"Dining\", \"Travel\"."
                        }
                    },
                    "required": ["date", "description", "amount", "category"]
                }
            }
        },
        "required": ["transactions"]
    })
});

/// Build the full system message: instruction followed by the schema.
pub fn system_message(instruction: &str) -> String {
    let schema = serde_json::to_string_pretty(&*STATEMENT_SCHEMA).unwrap_or_default();
    format!("{instruction}\n\nJSON schema:\n{schema}")
}
