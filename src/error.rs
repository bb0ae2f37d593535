//! Error types for the edgequake-bankstmt library.
//!
//! Every variant of [`StatementError`] is **fatal** for the run that raised
//! it: the pipeline stops at the failing unit, marks the run
//! [`crate::output::RunStatus::Failed`] and keeps whatever was folded before
//! the failure visible in the last published snapshot.
//!
//! Malformed *content* inside an otherwise successful extraction response is
//! not an error at all. Invalid transaction entries are dropped and a
//! response of the wrong shape becomes an empty page (see
//! [`crate::pipeline::parse`]).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-bankstmt library.
#[derive(Debug, Error)]
pub enum StatementError {
    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The file's declared media kind is neither `application/pdf` nor `image/*`.
    #[error("Unsupported file type: {file}. Please upload PDF or image files.")]
    UnsupportedInputKind { file: String },

    /// The rendering engine could not produce a raster for a page, including
    /// when the engine is unavailable or the document no longer loads.
    ///
    /// Before any page is rendered, while a PDF is only being counted, the
    /// same conditions surface as the more specific [`Self::PdfiumBindingFailed`],
    /// [`Self::CorruptPdf`], [`Self::PasswordRequired`] or [`Self::WrongPassword`].
    #[error("Rasterisation failed for '{file}' page {}: {detail}", page_index + 1)]
    RasterisationFailed {
        file: String,
        page_index: usize,
        detail: String,
    },

    /// Transport or service-level failure talking to the extraction service.
    #[error("Failed to extract transactions: {reason}")]
    ExtractionFailed { reason: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Statement file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{file}' is corrupt: {detail}")]
    CorruptPdf { file: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{file}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { file: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{file}'")]
    WrongPassword { file: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StatementError {
    pub(crate) fn extraction(reason: impl Into<String>) -> Self {
        StatementError::ExtractionFailed {
            reason: reason.into(),
        }
    }
}
