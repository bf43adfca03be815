//! Signature image placement on the last page.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use thiserror::Error;
use utoipa::ToSchema;

use crate::data_url;

const IMAGE_NAME: &str = "AgreementSignature";

/// Signature rectangle as fractions of the last page's MediaBox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignaturePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for SignaturePlacement {
    fn default() -> Self {
        Self {
            x: 0.12,
            y: 0.28,
            width: 0.20,
            height: 0.04,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct StampRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SignaturePlacement {
    /// Resolve against a `[llx lly urx ury]` media box.
    pub fn resolve(&self, media_box: [f32; 4]) -> StampRect {
        let [llx, lly, urx, ury] = media_box;
        let (page_width, page_height) = ((urx - llx).abs(), (ury - lly).abs());
        StampRect {
            x: llx + page_width * self.x,
            y: lly + page_height * self.y,
            width: page_width * self.width,
            height: page_height * self.height,
        }
    }
}

#[derive(Debug, Error)]
pub enum StampError {
    #[error("signature is not a PNG data URL: {0}")]
    DataUrl(#[from] data_url::DataUrlError),
    #[error("failed to decode signature image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to compress signature image: {0}")]
    Compress(#[from] std::io::Error),
    #[error("document has no pages")]
    NoPages,
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// First value of `key` on the page or its `/Parent` chain. Each node is visited once.
fn inherited_entry<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut visited = HashSet::new();
    let mut current = page_id;
    while visited.insert(current) {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return doc.dereference(value).ok().map(|(_, value)| value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    log::warn!("Page tree cycle above page {:?}", page_id);
    None
}

/// MediaBox of a page, inherited through the page tree when absent.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let array = inherited_entry(doc, page_id, b"MediaBox")?.as_array().ok()?;
    let values: Vec<f32> = array.iter().filter_map(|v| v.as_float().ok()).collect();
    <[f32; 4]>::try_from(values).ok()
}

/// Inline sub-dictionary `key`, created when absent.
fn inline_dictionary<'a>(
    dict: &'a mut Dictionary,
    key: &[u8],
) -> Result<&'a mut Dictionary, lopdf::Error> {
    if !matches!(dict.get(key), Ok(Object::Dictionary(_))) {
        dict.set(key.to_vec(), Dictionary::new());
    }
    dict.get_mut(key)?.as_dict_mut()
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    inherited_entry(doc, page_id, b"Resources")?.as_dict().ok().cloned()
}

/// The page's `/Resources /XObject` dictionary, ready for a new entry.
fn xobject_dictionary(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, lopdf::Error> {
    if !doc.get_dictionary(page_id)?.has(b"Resources") {
        let inherited = inherited_resources(doc, page_id).unwrap_or_default();
        doc.get_dictionary_mut(page_id)?.set("Resources", inherited);
    }

    let resources_ref = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    let xobject_ref = match resources_ref {
        Some(id) => doc.get_dictionary(id)?.get(b"XObject"),
        None => doc.get_dictionary(page_id)?.get(b"Resources")?.as_dict()?.get(b"XObject"),
    }
    .and_then(Object::as_reference)
    .ok();

    if let Some(id) = xobject_ref {
        return doc.get_dictionary_mut(id);
    }
    let resources = match resources_ref {
        Some(id) => doc.get_dictionary_mut(id)?,
        None => inline_dictionary(doc.get_dictionary_mut(page_id)?, b"Resources")?,
    };
    inline_dictionary(resources, b"XObject")
}

/// Embed the PNG carried by `signature` and draw it on the last page.
pub fn stamp_signature(
    doc: &mut Document,
    signature: &str,
    placement: &SignaturePlacement,
) -> Result<StampRect, StampError> {
    let png = data_url::decode_png(signature)?;
    let rgba = image::load_from_memory_with_format(&png, image::ImageFormat::Png)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let page_id = doc
        .get_pages()
        .values()
        .next_back()
        .copied()
        .ok_or(StampError::NoPages)?;
    let rect = placement.resolve(media_box(doc, page_id).unwrap_or([0.0, 0.0, 612.0, 792.0]));

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha)?,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => Object::Reference(smask_id),
        },
        deflate(&rgb)?,
    ));

    let xobject_dict = xobject_dictionary(doc, page_id)?;
    xobject_dict.set(IMAGE_NAME, Object::Reference(image_id));

    let draw = format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
        rect.width, rect.height, rect.x, rect.y, IMAGE_NAME
    );

    let page = doc.get_dictionary_mut(page_id)?;
    let existing = match page.remove(b"Contents") {
        Some(Object::Reference(id)) => vec![Object::Reference(id)],
        Some(Object::Array(parts)) => parts,
        _ => Vec::new(),
    };

    // Existing content runs inside its own q/Q; the stamp draws under the default CTM.
    let contents = if existing.is_empty() {
        vec![Object::Reference(
            doc.add_object(Stream::new(dictionary! {}, draw.into_bytes())),
        )]
    } else {
        let save = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let restore_and_draw = format!("\nQ\n{}", draw);
        let stamp = doc.add_object(Stream::new(dictionary! {}, restore_and_draw.into_bytes()));
        let mut parts = Vec::with_capacity(existing.len() + 2);
        parts.push(Object::Reference(save));
        parts.extend(existing);
        parts.push(Object::Reference(stamp));
        parts
    };
    doc.get_dictionary_mut(page_id)?.set("Contents", contents);

    Ok(rect)
}
