//! Image encoding for the recognition engines.
//!
//! Both engines consume PNG: the vision engine as a base64 attachment, the
//! Tesseract bridge as a file on disk. PNG is lossless, which keeps digits
//! and decimal points crisp; JPEG artefacts around a "." are enough to turn
//! `8.5` into `85`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a page image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a page image as a base64 PNG attachment for the vision engine.
///
/// `detail: "high"` lets the provider tile the image at full resolution so
/// small print such as a grade card footer is still legible.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let buf = encode_png(img)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} page → {} bytes base64", img.width(), img.height(), b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, GrayImage};

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(12, 8, Luma([255])))
    }

    #[test]
    fn png_bytes_start_with_signature() {
        let bytes = encode_png(&page()).expect("encode should succeed");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn attachment_is_base64_png() {
        let data = encode_page(&page()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        let img = image::load_from_memory(&decoded).expect("decodes back");
        assert_eq!((img.width(), img.height()), (12, 8));
    }
}
