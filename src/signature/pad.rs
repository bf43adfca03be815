//! The drawable signature surface.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use serde::Serialize;
use utoipa::ToSchema;

use super::input::{PadEvent, Point};
use crate::data_url::{self, DataUrlError};

pub const DEFAULT_PAD_WIDTH: u32 = 500;
pub const DEFAULT_PAD_HEIGHT: u32 = 200;

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);
/// Half of the 2px stroke width; stamped discs give round caps and joins.
const STROKE_RADIUS: i32 = 1;

pub const ACCEPTED_LABEL: &str = "Accepted!";
pub const ACCEPTED_NOTICE: &str = "Signature accepted!";
pub const SUBMITTED_OVERLAY: &str = "Signature Submitted";

/// Transient confirmation shown after a signature is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AcceptFeedback {
    pub label: String,
    pub notice: String,
    pub visible_ms: u64,
    pub fade_ms: u64,
}

impl Default for AcceptFeedback {
    fn default() -> Self {
        Self {
            label: ACCEPTED_LABEL.to_string(),
            notice: ACCEPTED_NOTICE.to_string(),
            visible_ms: 2000,
            fade_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct EventOutcome {
    /// Whether the client must suppress the event's default action.
    pub prevent_default: bool,
    pub drawing: bool,
}

#[derive(Debug, Clone)]
pub struct SignaturePad {
    raster: GrayImage,
    last: Option<Point>,
    dirty: bool,
    accepted: Option<String>,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(DEFAULT_PAD_WIDTH, DEFAULT_PAD_HEIGHT)
    }
}

impl SignaturePad {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: GrayImage::from_pixel(width.max(1), height.max(1), PAPER),
            last: None,
            dirty: false,
            accepted: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_drawing(&self) -> bool {
        self.last.is_some()
    }

    pub fn accepted(&self) -> Option<&str> {
        self.accepted.as_deref()
    }

    pub fn raster(&self) -> &GrayImage {
        &self.raster
    }

    pub fn begin(&mut self, at: Point) {
        self.last = Some(at);
    }

    /// Draw a segment from the previous point. Ignored when no stroke is active.
    pub fn extend(&mut self, to: Point) {
        let Some(from) = self.last else {
            return;
        };
        self.stroke(from, to);
        self.last = Some(to);
    }

    pub fn end(&mut self) {
        self.last = None;
    }

    pub fn handle(&mut self, event: PadEvent) -> EventOutcome {
        match event {
            PadEvent::Down { sample } => self.begin(sample.local_point()),
            PadEvent::Move { sample } => self.extend(sample.local_point()),
            PadEvent::Up { .. } | PadEvent::Leave => self.end(),
        }
        EventOutcome {
            prevent_default: event.suppresses_default(),
            drawing: self.is_drawing(),
        }
    }

    /// Fill white and drop any accepted value.
    pub fn clear(&mut self) {
        for pixel in self.raster.pixels_mut() {
            *pixel = PAPER;
        }
        self.last = None;
        self.dirty = false;
        self.accepted = None;
    }

    pub fn to_data_url(&self) -> Result<String, DataUrlError> {
        data_url::encode_png(&DynamicImage::ImageLuma8(self.raster.clone()))
    }

    /// Serialize the current drawing and keep it as the accepted signature.
    pub fn accept(&mut self) -> Result<AcceptFeedback, DataUrlError> {
        self.accepted = Some(self.to_data_url()?);
        Ok(AcceptFeedback::default())
    }

    /// Freeze the pad. The drawing survives; the drawing operations do not.
    pub fn lock(self) -> LockedSignaturePad {
        LockedSignaturePad {
            raster: self.raster,
            accepted: self.accepted,
        }
    }

    fn stroke(&mut self, from: Point, to: Point) {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let steps = (dx.abs().max(dy.abs()) * 2.0).ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = (from.x + dx * t).round() as i32;
            let y = (from.y + dy * t).round() as i32;
            draw_filled_circle_mut(&mut self.raster, (x, y), STROKE_RADIUS, INK);
        }
        self.dirty = true;
    }
}

/// A pad after submission: read-only, with an overlay label.
#[derive(Debug, Clone)]
pub struct LockedSignaturePad {
    raster: GrayImage,
    accepted: Option<String>,
}

impl LockedSignaturePad {
    pub fn overlay(&self) -> &'static str {
        SUBMITTED_OVERLAY
    }

    pub fn accepted(&self) -> Option<&str> {
        self.accepted.as_deref()
    }

    pub fn raster(&self) -> &GrayImage {
        &self.raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::input::PointerSample;

    fn ink_count(pad: &SignaturePad) -> usize {
        pad.raster().pixels().filter(|p| p.0[0] == 0).count()
    }

    #[test]
    fn test_moves_without_a_stroke_draw_nothing() {
        let mut pad = SignaturePad::new(100, 50);
        pad.extend(Point::new(10.0, 10.0));
        pad.extend(Point::new(40.0, 10.0));
        assert_eq!(ink_count(&pad), 0);
        assert!(!pad.is_dirty());
    }

    #[test]
    fn test_stroke_inks_the_segment() {
        let mut pad = SignaturePad::new(100, 50);
        pad.begin(Point::new(10.0, 10.0));
        pad.extend(Point::new(40.0, 10.0));
        pad.end();

        assert!(pad.is_dirty());
        assert_eq!(pad.raster().get_pixel(25, 10).0[0], 0);
        assert_eq!(pad.raster().get_pixel(25, 30).0[0], 255);
        assert!(!pad.is_drawing());
    }

    #[test]
    fn test_leave_ends_the_stroke() {
        let mut pad = SignaturePad::new(100, 50);
        let at = |x: f32| PadEvent::Move {
            sample: PointerSample::Mouse {
                offset_x: x,
                offset_y: 20.0,
            },
        };
        pad.handle(PadEvent::Down {
            sample: PointerSample::Mouse {
                offset_x: 5.0,
                offset_y: 20.0,
            },
        });
        pad.handle(at(20.0));
        let outcome = pad.handle(PadEvent::Leave);
        assert!(!outcome.drawing);
        assert!(!outcome.prevent_default);

        let before = ink_count(&pad);
        pad.handle(at(90.0));
        assert_eq!(ink_count(&pad), before);
    }

    #[test]
    fn test_clear_resets_to_white_and_drops_accepted() {
        let mut pad = SignaturePad::new(100, 50);
        pad.begin(Point::new(0.0, 0.0));
        pad.extend(Point::new(99.0, 49.0));
        pad.accept().unwrap();
        assert!(pad.accepted().is_some());

        pad.clear();
        assert_eq!(ink_count(&pad), 0);
        assert!(pad.accepted().is_none());
        assert!(!pad.is_dirty());
    }

    #[test]
    fn test_accept_feedback() {
        let mut pad = SignaturePad::default();
        let feedback = pad.accept().unwrap();
        assert_eq!(feedback.label, "Accepted!");
        assert_eq!(feedback.notice, "Signature accepted!");
        assert_eq!((feedback.visible_ms, feedback.fade_ms), (2000, 500));
        assert!(pad
            .accepted()
            .unwrap()
            .starts_with(data_url::PNG_DATA_URL_PREFIX));
    }

    #[test]
    fn test_lock_keeps_the_drawing() {
        let mut pad = SignaturePad::new(20, 20);
        pad.begin(Point::new(2.0, 2.0));
        pad.extend(Point::new(18.0, 18.0));
        let locked = pad.lock();
        assert_eq!(locked.overlay(), "Signature Submitted");
        assert_eq!(locked.raster().get_pixel(10, 10).0[0], 0);
    }
}
