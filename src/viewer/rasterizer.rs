//! Page rasterization backends.

use async_trait::async_trait;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ViewerError;

/// Loads a fixed document and rasterizes its pages.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Open the document and return its page count.
    async fn load(&self) -> Result<u32, ViewerError>;

    /// Rasterize a 1-based page at the given zoom factor.
    async fn render(&self, page: u32, scale: f32) -> Result<RgbaImage, ViewerError>;
}

/// Pdfium-backed rasterizer. Pdfium is bound at construction; the document bytes are
/// read from disk on `load`.
pub struct PdfiumRasterizer {
    pdfium: Option<Arc<Pdfium>>,
    bind_error: Option<String>,
    path: PathBuf,
    bytes: parking_lot::RwLock<Option<Arc<Vec<u8>>>>,
}

impl PdfiumRasterizer {
    /// Bind to Pdfium in `library_dir` if given, falling back to the system library.
    /// A binding failure is reported by `load`, so the viewer can draw its fallback.
    pub fn new(path: impl Into<PathBuf>, library_dir: Option<&Path>) -> Self {
        let bindings = match library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                .or_else(|_| Pdfium::bind_to_system_library()),
            None => Pdfium::bind_to_system_library(),
        };

        let (pdfium, bind_error) = match bindings {
            Ok(bindings) => (Some(Arc::new(Pdfium::new(bindings))), None),
            Err(e) => {
                log::error!("Failed to bind Pdfium: {:?}", e);
                (None, Some(format!("Pdfium library unavailable: {e:?}")))
            }
        };

        Self {
            pdfium,
            bind_error,
            path: path.into(),
            bytes: parking_lot::RwLock::new(None),
        }
    }

    fn pdfium(&self) -> Result<Arc<Pdfium>, ViewerError> {
        self.pdfium.clone().ok_or_else(|| {
            ViewerError::Load(
                self.bind_error
                    .clone()
                    .unwrap_or_else(|| "Pdfium library unavailable".to_string()),
            )
        })
    }

    fn loaded_bytes(&self) -> Result<Arc<Vec<u8>>, ViewerError> {
        self.bytes
            .read()
            .clone()
            .ok_or_else(|| ViewerError::Load("document not loaded".to_string()))
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn load(&self) -> Result<u32, ViewerError> {
        log::info!("Loading PDF from: {}", self.path.display());
        let pdfium = self.pdfium()?;
        let bytes = Arc::new(
            tokio::fs::read(&self.path)
                .await
                .map_err(|e| ViewerError::Load(e.to_string()))?,
        );

        let source = bytes.clone();
        let page_count = tokio::task::spawn_blocking(move || {
            let document = pdfium
                .load_pdf_from_byte_slice(&source, None)
                .map_err(|e| ViewerError::Load(format!("{e:?}")))?;
            Ok::<u32, ViewerError>(u32::from(document.pages().len()))
        })
        .await
        .map_err(|e| ViewerError::Load(e.to_string()))??;

        *self.bytes.write() = Some(bytes);
        log::info!("PDF loaded successfully: {} pages", page_count);
        Ok(page_count)
    }

    async fn render(&self, page: u32, scale: f32) -> Result<RgbaImage, ViewerError> {
        let pdfium = self.pdfium()?;
        let bytes = self.loaded_bytes()?;
        let index = page
            .checked_sub(1)
            .and_then(|index| u16::try_from(index).ok())
            .ok_or(ViewerError::PageOutOfRange(page))?;

        tokio::task::spawn_blocking(move || {
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| ViewerError::Render(page, format!("{e:?}")))?;
            let pdf_page = document
                .pages()
                .get(index)
                .map_err(|_| ViewerError::PageOutOfRange(page))?;
            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let bitmap = pdf_page
                .render_with_config(&config)
                .map_err(|e| ViewerError::Render(page, format!("{e:?}")))?;
            Ok(bitmap.as_image().into_rgba8())
        })
        .await
        .map_err(|e| ViewerError::Render(page, e.to_string()))?
    }
}
