//! PDF rasterisation: page counts and per-page rasters.
//!
//! The pipeline only depends on the [`PageRasterizer`] trait. The shipped
//! implementation, [`PdfiumRasterizer`], wraps pdfium, which is not safe to
//! drive from async contexts; every call runs inside
//! `tokio::task::spawn_blocking`.
//!
//! A pdfium document borrows its library binding, so nothing is kept open
//! between calls. Each call binds, loads the document from the in-memory
//! bytes, and drops both before returning.

use crate::error::StatementError;
use crate::pipeline::input::InputFile;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Scale factor applied to every rendered page.
///
/// 2× keeps small statement print legible for OCR while keeping the
/// payload well below upload limits.
pub const RENDER_SCALE: f32 = 2.0;

/// Capability the pipeline needs from a rendering engine.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in a paged document.
    async fn page_count(&self, file: &InputFile) -> Result<usize, StatementError>;

    /// Render one page (0-based) at the given scale.
    async fn render_page(
        &self,
        file: &InputFile,
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, StatementError>;
}

/// [`PageRasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    password: Option<String>,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    pub fn new(password: Option<String>, max_pixels: u32) -> Self {
        Self {
            password,
            max_pixels,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn page_count(&self, file: &InputFile) -> Result<usize, StatementError> {
        let file = file.clone();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || page_count_blocking(&file, password.as_deref()))
            .await
            .map_err(|e| StatementError::Internal(format!("Page count task panicked: {}", e)))?
    }

    async fn render_page(
        &self,
        file: &InputFile,
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, StatementError> {
        let file = file.clone();
        let password = self.password.clone();
        let max_pixels = self.max_pixels;

        tokio::task::spawn_blocking(move || {
            render_page_blocking(&file, password.as_deref(), page_index, scale, max_pixels)
        })
        .await
        .map_err(|e| StatementError::Internal(format!("Render task panicked: {}", e)))?
    }
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library.
fn bind_pdfium() -> Result<Pdfium, StatementError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| StatementError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    file: &'a InputFile,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, StatementError> {
    pdfium
        .load_pdf_from_byte_slice(&file.bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    StatementError::WrongPassword {
                        file: file.name.clone(),
                    }
                } else {
                    StatementError::PasswordRequired {
                        file: file.name.clone(),
                    }
                }
            } else {
                StatementError::CorruptPdf {
                    file: file.name.clone(),
                    detail: err_str,
                }
            }
        })
}

fn page_count_blocking(file: &InputFile, password: Option<&str>) -> Result<usize, StatementError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, file, password)?;
    let total = document.pages().len() as usize;
    info!("PDF '{}' loaded: {} pages", file.name, total);
    Ok(total)
}

fn render_page_blocking(
    file: &InputFile,
    password: Option<&str>,
    page_index: usize,
    scale: f32,
    max_pixels: u32,
) -> Result<DynamicImage, StatementError> {
    let raster_err = |detail: String| StatementError::RasterisationFailed {
        file: file.name.clone(),
        page_index,
        detail,
    };

    // Engine or document failures while rendering are failures of this page.
    let pdfium = bind_pdfium().map_err(|e| raster_err(e.to_string()))?;
    let document = load_document(&pdfium, file, password).map_err(|e| raster_err(e.to_string()))?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let page = document
        .pages()
        .get(page_index as u16)
        .map_err(|e| raster_err(format!("{:?}", e)))?;

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| raster_err(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered '{}' page {} → {}x{} px",
        file.name,
        page_index + 1,
        image.width(),
        image.height()
    );

    Ok(image)
}
