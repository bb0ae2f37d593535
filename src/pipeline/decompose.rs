//! Document decomposition: input files → ordered [`ExtractionUnit`]s.
//!
//! Units come out in strict file order and, within a PDF, strict ascending
//! page order. The aggregator's balance rules depend on that order.

use crate::error::StatementError;
use crate::pipeline::input::InputFile;
use crate::pipeline::render::PageRasterizer;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a file is turned into units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// `application/pdf`: one unit per page.
    Paged,
    /// `image/*`: exactly one unit.
    Image,
}

impl MediaKind {
    /// Classify a declared MIME type. `None` means unsupported.
    pub fn classify(mime_type: &str) -> Option<Self> {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime == "application/pdf" {
            Some(MediaKind::Paged)
        } else if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

/// One submittable image within the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionUnit {
    /// 0-based position of the source file in the batch.
    pub source_file_index: usize,
    /// 0-based page within the source; always 0 for images.
    pub source_page_index: usize,
    pub total_units_in_source: usize,
    pub kind: MediaKind,
}

impl ExtractionUnit {
    /// The first page of the first file: the only unit allowed to set the
    /// opening balance.
    pub fn is_batch_start(&self) -> bool {
        self.source_file_index == 0 && self.source_page_index == 0
    }
}

/// Classify a file, failing with `UnsupportedInputKind` when it is neither
/// a PDF nor an image.
pub fn classify(file: &InputFile) -> Result<MediaKind, StatementError> {
    MediaKind::classify(&file.mime_type).ok_or_else(|| StatementError::UnsupportedInputKind {
        file: file.name.clone(),
    })
}

/// Decompose one file into its units.
pub async fn decompose_file(
    file_index: usize,
    file: &InputFile,
    rasterizer: &dyn PageRasterizer,
) -> Result<Vec<ExtractionUnit>, StatementError> {
    let kind = classify(file)?;
    let total = match kind {
        MediaKind::Paged => rasterizer.page_count(file).await?,
        MediaKind::Image => 1,
    };
    debug!(
        "File {} '{}' ({:?}) → {} unit(s)",
        file_index + 1,
        file.name,
        kind,
        total
    );

    Ok((0..total)
        .map(|page| ExtractionUnit {
            source_file_index: file_index,
            source_page_index: page,
            total_units_in_source: total,
            kind,
        })
        .collect())
}
