//! Normal appearance streams for filled text fields.
//!
//! Values are drawn in Helvetica with WinAnsi encoding. The font size comes from the
//! field's `/DA` string, or is fitted to the widget when `/DA` asks for auto size (0).

use lazy_static::lazy_static;
use lopdf::{dictionary, Object, Stream};
use regex::Regex;

lazy_static! {
    static ref DA_FONT_SIZE: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s+Tf").unwrap();
}

pub const FONT_RESOURCE: &str = "Helv";
const MAX_AUTO_SIZE: f32 = 12.0;
const MIN_AUTO_SIZE: f32 = 4.0;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const PADDING: f32 = 2.0;

/// Font size requested by a default appearance string. `None` means auto size.
pub fn requested_font_size(da: &str) -> Option<f32> {
    DA_FONT_SIZE
        .captures(da)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|size| *size > 0.0)
}

pub fn fit_font_size(text: &str, width: f32, height: f32) -> f32 {
    let by_height = (height - PADDING * 2.0) * 0.8;
    let glyphs = text.chars().count().max(1) as f32;
    let by_width = (width - PADDING * 2.0) / (glyphs * AVG_GLYPH_WIDTH);
    by_height.min(by_width).clamp(MIN_AUTO_SIZE, MAX_AUTO_SIZE)
}

/// Encode for a WinAnsi literal string; characters outside Latin-1 become `?`.
pub fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn escape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            escaped.push(b'\\');
        }
        escaped.push(b);
    }
    escaped
}

/// Content and resources of a single-line text appearance.
pub fn text_appearance(text: &str, da: Option<&str>, width: f32, height: f32) -> Stream {
    let size = da
        .and_then(requested_font_size)
        .unwrap_or_else(|| fit_font_size(text, width, height));
    let baseline = ((height - size) / 2.0 + size * 0.22).max(PADDING / 2.0);

    let mut content = format!(
        "/Tx BMC\nq\n{PADDING} {PADDING} {w:.2} {h:.2} re W n\nBT\n/{FONT_RESOURCE} {size:.2} Tf\n0 g\n{PADDING} {baseline:.2} Td\n(",
        w = (width - PADDING * 2.0).max(0.0),
        h = (height - PADDING * 2.0).max(0.0),
    )
    .into_bytes();
    content.extend(escape_literal(&win_ansi_bytes(text)));
    content.extend_from_slice(b") Tj\nET\nQ\nEMC\n");

    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    FONT_RESOURCE => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica",
                        "Encoding" => "WinAnsiEncoding",
                    },
                },
            },
        },
        content,
    )
}
