//! Pipeline stages for statement extraction.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the rendering engine or extraction service can be swapped
//! behind its trait.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decompose ──▶ render ──▶ encode ──▶ llm ──▶ parse ──▶ aggregate
//! (path/URL)  (units)    (pdfium)   (base64)   (VLM)   (validate)  (fold)
//! ```
//!
//! 1. [`input`]     — read each path or URL into memory with a declared MIME type
//! 2. [`decompose`] — classify files and expand them into ordered extraction units
//! 3. [`render`]    — rasterise one PDF page at 2× scale via `spawn_blocking`
//! 4. [`encode`]    — JPEG/base64 rendered pages; pass uploaded images through
//! 5. [`llm`]       — the only stage with network I/O
//! 6. [`parse`]     — total validation of the untrusted response
//! 7. [`aggregate`] — append transactions and carry balances forward

pub mod aggregate;
pub mod decompose;
pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
