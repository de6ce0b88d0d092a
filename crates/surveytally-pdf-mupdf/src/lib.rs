use std::future::Future;
use std::pin::Pin;

use mupdf::{Colorspace, Document, ImageFormat, Matrix};

use surveytally_core::{PageImage, RasterizeError, Rasterizer};

/// MuPDF-based implementation of [`Rasterizer`].
///
/// This crate is the sole AGPL island — it isolates the mupdf dependency
/// (which is AGPL-3.0) so that non-PDF code paths do not transitively
/// depend on it.
///
/// PDF pages are rendered to PNG at 2x scale by default; scanned survey
/// sheets rendered at 1x lose checkbox marks the analyzer needs. Single
/// image inputs (`image/*`) are passed through untouched as a one-page
/// document.
pub struct MupdfRasterizer {
    /// Render scale applied to both axes. Default 2.0.
    scale: f32,
}

impl Default for MupdfRasterizer {
    fn default() -> Self {
        Self { scale: 2.0 }
    }
}

impl MupdfRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the render scale. Values at or below zero fall back to 1.0.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = if scale > 0.0 { scale } else { 1.0 };
        self
    }
}

/// Render every page of a PDF to a PNG. Blocking; run off the async runtime.
fn render_pdf(data: &[u8], scale: f32) -> Result<Vec<PageImage>, RasterizeError> {
    let document =
        Document::from_bytes(data, "pdf").map_err(|e| RasterizeError::Open(e.to_string()))?;

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let mut images = Vec::new();

    for (index, page_result) in document
        .pages()
        .map_err(|e| RasterizeError::Open(e.to_string()))?
        .enumerate()
    {
        let render = |message: String| RasterizeError::Render {
            page: index,
            message,
        };

        let page = page_result.map_err(|e| render(e.to_string()))?;
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, false)
            .map_err(|e| render(e.to_string()))?;

        let mut png = Vec::new();
        pixmap
            .write_to(&mut png, ImageFormat::PNG)
            .map_err(|e| render(e.to_string()))?;

        images.push(PageImage {
            data: png,
            mime_type: "image/png".to_string(),
        });
    }

    Ok(images)
}

impl Rasterizer for MupdfRasterizer {
    fn rasterize<'a>(
        &'a self,
        data: &'a [u8],
        mime_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PageImage>, RasterizeError>> + Send + 'a>> {
        let scale = self.scale;
        Box::pin(async move {
            if mime_type.starts_with("image/") {
                return Ok(vec![PageImage {
                    data: data.to_vec(),
                    mime_type: mime_type.to_string(),
                }]);
            }
            if mime_type != "application/pdf" {
                return Err(RasterizeError::Unsupported(mime_type.to_string()));
            }

            let owned = data.to_vec();
            tokio::task::spawn_blocking(move || render_pdf(&owned, scale))
                .await
                .map_err(|e| RasterizeError::Open(e.to_string()))?
        })
    }
}
