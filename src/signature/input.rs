//! Pointer and touch input normalized into pad-local coordinates.

use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Client-space position of the pad's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
pub struct PadBounds {
    pub left: f32,
    pub top: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PointerSample {
    /// Mouse offsets are already pad-local.
    Mouse { offset_x: f32, offset_y: f32 },
    /// First touch point in client space, with the pad's bounding rect.
    Touch {
        client_x: f32,
        client_y: f32,
        bounds: PadBounds,
    },
}

impl PointerSample {
    pub fn local_point(&self) -> Point {
        match *self {
            PointerSample::Mouse { offset_x, offset_y } => Point::new(offset_x, offset_y),
            PointerSample::Touch {
                client_x,
                client_y,
                bounds,
            } => Point::new(client_x - bounds.left, client_y - bounds.top),
        }
    }

    pub fn is_touch(&self) -> bool {
        matches!(self, PointerSample::Touch { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PadEvent {
    Down { sample: PointerSample },
    Move { sample: PointerSample },
    /// Mouse-up or touch-end.
    Up { touch: bool },
    /// Pointer left the pad.
    Leave,
}

impl PadEvent {
    /// Touch events suppress the browser's default scrolling and zooming.
    pub fn suppresses_default(&self) -> bool {
        match self {
            PadEvent::Down { sample } | PadEvent::Move { sample } => sample.is_touch(),
            PadEvent::Up { touch } => *touch,
            PadEvent::Leave => false,
        }
    }
}
