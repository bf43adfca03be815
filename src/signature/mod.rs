//! Signature capture.
//!
//! - `input` - pointer and touch samples in pad-local coordinates
//! - `pad` - the drawable surface and its locked form

pub mod input;
pub mod pad;

pub use input::{PadBounds, PadEvent, Point, PointerSample};
pub use pad::{AcceptFeedback, EventOutcome, LockedSignaturePad, SignaturePad};

/// Default minimum data URL length of a real signature.
pub const EMPTY_SIGNATURE_THRESHOLD: usize = 1000;

/// A serialized signature shorter than `threshold` bytes counts as not drawn.
pub fn is_blank_signature(value: &str, threshold: usize) -> bool {
    value.trim().len() < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scribble(pad: &mut SignaturePad) {
        let (width, height) = pad.dimensions();
        let mut seed: u32 = 7;
        let mut next = |bound: u32| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((seed >> 16) % bound) as f32
        };
        pad.begin(Point::new(next(width), next(height)));
        for _ in 0..120 {
            let point = Point::new(next(width), next(height));
            pad.extend(point);
        }
        pad.end();
    }

    #[test]
    fn test_cleared_pad_is_blank() {
        let mut pad = SignaturePad::default();
        scribble(&mut pad);
        pad.clear();
        pad.accept().unwrap();
        assert!(is_blank_signature(
            pad.accepted().unwrap(),
            EMPTY_SIGNATURE_THRESHOLD
        ));
    }

    #[test]
    fn test_drawn_pad_is_not_blank() {
        let mut pad = SignaturePad::default();
        scribble(&mut pad);
        pad.accept().unwrap();
        assert!(!is_blank_signature(
            pad.accepted().unwrap(),
            EMPTY_SIGNATURE_THRESHOLD
        ));
    }

    #[test]
    fn test_empty_value_is_blank() {
        assert!(is_blank_signature("", EMPTY_SIGNATURE_THRESHOLD));
        assert!(is_blank_signature("data:image/png;base64,", 100));
        assert!(!is_blank_signature("abc", 3));
    }
}
