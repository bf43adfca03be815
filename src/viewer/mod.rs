//! PDF viewer: loads the agreement and paints requested pages into a single canvas.
//!
//! - `scheduler` - the render request slot policy
//! - `canvas` - the drawing surface and its fallback frames
//! - `rasterizer` - page rasterization backends

pub mod canvas;
pub mod handlers;
pub mod rasterizer;
pub mod scheduler;

pub use canvas::{FallbackFrame, PageCanvas, PageFrame};
pub use rasterizer::{PageRasterizer, PdfiumRasterizer};
pub use scheduler::{RenderState, RenderTicket};

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_SCALE: f32 = 1.5;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViewerError {
    #[error("{0}")]
    Load(String),
    #[error("page {0} rendering failed: {1}")]
    Render(u32, String),
    #[error("page {0} does not exist")]
    PageOutOfRange(u32),
}

/// A loaded document and its render bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentHandle {
    pub page_count: u32,
    pub state: RenderState,
}

pub struct DocumentViewer {
    rasterizer: Arc<dyn PageRasterizer>,
    scale: f32,
    document: Mutex<Option<DocumentHandle>>,
    canvas: Mutex<PageCanvas>,
}

impl DocumentViewer {
    /// Load the document and show page 1. Load failures are painted, never returned.
    pub async fn open(rasterizer: Arc<dyn PageRasterizer>, scale: f32) -> Self {
        let viewer = Self {
            rasterizer,
            scale,
            document: Mutex::new(None),
            canvas: Mutex::new(PageCanvas::new()),
        };

        match viewer.rasterizer.load().await {
            Ok(page_count) => {
                *viewer.document.lock() = Some(DocumentHandle {
                    page_count,
                    state: RenderState::new(),
                });
                viewer.show_page(1).await;
            }
            Err(e) => {
                log::error!("Error loading PDF: {}", e);
                let mut canvas = viewer.canvas.lock();
                let (width, height) = canvas.dimensions();
                canvas.paint_fallback(FallbackFrame::load_failure(width, height, &e.to_string()));
            }
        }

        viewer
    }

    pub fn document(&self) -> Option<DocumentHandle> {
        self.document.lock().clone()
    }

    pub fn frame(&self) -> PageFrame {
        self.canvas.lock().frame()
    }

    /// Request a page. Returns once this request's render chain has drained, or
    /// immediately when another render is already in flight.
    pub async fn show_page(&self, page: u32) -> RenderTicket {
        let ticket = match self.document.lock().as_mut() {
            Some(handle) => handle.state.request(page),
            None => {
                log::error!("No PDF document loaded");
                return RenderTicket::NoDocument;
            }
        };

        if let RenderTicket::Started { page } = ticket {
            self.drive(page).await;
        }
        ticket
    }

    async fn drive(&self, first: u32) {
        let mut page = first;
        loop {
            log::info!("Rendering page {}", page);
            match self.rasterizer.render(page, self.scale).await {
                Ok(bitmap) => {
                    self.canvas.lock().paint_page(page, bitmap);
                    log::info!("Page {} rendered successfully", page);
                }
                Err(e) => {
                    log::warn!("Error rendering page {}: {}", page, e);
                    let mut canvas = self.canvas.lock();
                    let (width, height) = canvas.dimensions();
                    canvas.paint_fallback(FallbackFrame::page_failure(width, height, page));
                }
            }

            let next = self
                .document
                .lock()
                .as_mut()
                .and_then(|handle| handle.state.finish());
            match next {
                Some(pending) => page = pending,
                None => break,
            }
        }
    }
}
