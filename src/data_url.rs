//! PNG data URL encoding, the format canvas surfaces hand to the browser.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("value is not a PNG data URL")]
    NotPngDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Encode an image as a `data:image/png;base64,...` string.
pub fn encode_png(image: &DynamicImage) -> Result<String, DataUrlError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(DataUrlError::Encode)?;
    Ok(format!(
        "{}{}",
        PNG_DATA_URL_PREFIX,
        BASE64.encode(buffer.into_inner())
    ))
}

/// Decode the PNG bytes carried by a data URL.
pub fn decode_png(value: &str) -> Result<Vec<u8>, DataUrlError> {
    let payload = value
        .trim()
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or(DataUrlError::NotPngDataUrl)?;
    Ok(BASE64.decode(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_encode_produces_png_data_url() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])));
        let url = encode_png(&image).unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));

        let bytes = decode_png(&url).unwrap();
        assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn test_decode_rejects_other_schemes() {
        assert!(matches!(
            decode_png("data:image/jpeg;base64,AAAA"),
            Err(DataUrlError::NotPngDataUrl)
        ));
        assert!(matches!(
            decode_png("data:image/png;base64,@@@"),
            Err(DataUrlError::Base64(_))
        ));
    }
}
