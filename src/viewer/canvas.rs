//! The drawing surface the document viewer paints into.

use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::data_url;

pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 800;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TextLine {
    pub text: String,
    pub color: String,
    pub font: String,
    pub x: u32,
    pub y: u32,
}

/// A flat background with explanatory text, drawn instead of a page image.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FallbackFrame {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub lines: Vec<TextLine>,
}

impl FallbackFrame {
    pub fn load_failure(width: u32, height: u32, message: &str) -> Self {
        Self {
            width,
            height,
            background: "#f1f1f1".to_string(),
            lines: vec![
                TextLine {
                    text: "PDF preview not available.".to_string(),
                    color: "red".to_string(),
                    font: "20px Arial".to_string(),
                    x: 50,
                    y: 100,
                },
                TextLine {
                    text: format!("Error: {message}"),
                    color: "red".to_string(),
                    font: "16px Arial".to_string(),
                    x: 50,
                    y: 130,
                },
            ],
        }
    }

    pub fn page_failure(width: u32, height: u32, page: u32) -> Self {
        Self {
            width,
            height,
            background: "#f8f9fa".to_string(),
            lines: vec![TextLine {
                text: format!("Page {page} rendering issue. You can still continue."),
                color: "#495057".to_string(),
                font: "16px Arial".to_string(),
                x: 50,
                y: 100,
            }],
        }
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
enum Content {
    Blank,
    Page { page: u32, bitmap: Arc<RgbaImage> },
    Fallback(FallbackFrame),
}

#[derive(Debug, Clone)]
pub struct PageCanvas {
    width: u32,
    height: u32,
    content: Content,
}

impl Default for PageCanvas {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            content: Content::Blank,
        }
    }
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize to the page bitmap and show it.
    pub fn paint_page(&mut self, page: u32, bitmap: RgbaImage) {
        self.width = bitmap.width();
        self.height = bitmap.height();
        self.content = Content::Page {
            page,
            bitmap: Arc::new(bitmap),
        };
    }

    /// Fallback frames keep the current canvas size.
    pub fn paint_fallback(&mut self, fallback: FallbackFrame) {
        self.width = fallback.width;
        self.height = fallback.height;
        self.content = Content::Fallback(fallback);
    }

    pub fn shown_page(&self) -> Option<u32> {
        match &self.content {
            Content::Page { page, .. } => Some(*page),
            _ => None,
        }
    }

    pub fn fallback(&self) -> Option<&FallbackFrame> {
        match &self.content {
            Content::Fallback(fallback) => Some(fallback),
            _ => None,
        }
    }

    /// Snapshot for serving; page bitmaps are encoded as PNG data URLs.
    pub fn frame(&self) -> PageFrame {
        match &self.content {
            Content::Blank => PageFrame::Blank {
                width: self.width,
                height: self.height,
            },
            Content::Page { page, bitmap } => {
                let image = DynamicImage::ImageRgba8(bitmap.as_ref().clone());
                match data_url::encode_png(&image) {
                    Ok(data_url) => PageFrame::Page {
                        page: *page,
                        width: self.width,
                        height: self.height,
                        data_url,
                    },
                    Err(e) => {
                        log::warn!("Failed to encode page {} bitmap: {}", page, e);
                        PageFrame::Fallback(FallbackFrame::page_failure(
                            self.width,
                            self.height,
                            *page,
                        ))
                    }
                }
            }
            Content::Fallback(fallback) => PageFrame::Fallback(fallback.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageFrame {
    Blank {
        width: u32,
        height: u32,
    },
    Page {
        page: u32,
        width: u32,
        height: u32,
        data_url: String,
    },
    Fallback(FallbackFrame),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_load_failure_frame_is_deterministic() {
        let frame = FallbackFrame::load_failure(600, 800, "file not found");
        assert_eq!(frame.background, "#f1f1f1");
        assert_eq!(
            frame.text(),
            "PDF preview not available.\nError: file not found"
        );
        assert_eq!(frame, FallbackFrame::load_failure(600, 800, "file not found"));
    }

    #[test]
    fn test_page_resizes_canvas_and_fallback_keeps_size() {
        let mut canvas = PageCanvas::new();
        canvas.paint_page(2, RgbaImage::from_pixel(918, 1188, Rgba([255, 255, 255, 255])));
        assert_eq!(canvas.dimensions(), (918, 1188));
        assert_eq!(canvas.shown_page(), Some(2));

        let (w, h) = canvas.dimensions();
        canvas.paint_fallback(FallbackFrame::page_failure(w, h, 3));
        assert_eq!(canvas.dimensions(), (918, 1188));
        assert!(canvas.shown_page().is_none());
        assert!(canvas.fallback().unwrap().text().contains("Page 3"));
    }

    #[test]
    fn test_page_frame_carries_png() {
        let mut canvas = PageCanvas::new();
        canvas.paint_page(1, RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        match canvas.frame() {
            PageFrame::Page { page, data_url: url, .. } => {
                assert_eq!(page, 1);
                assert!(url.starts_with(data_url::PNG_DATA_URL_PREFIX));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
