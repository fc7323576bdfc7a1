//! Image encoding: [`DecodedImage`] → base64 payload for the `inline_data` part.
//!
//! PNG and JPEG uploads go out exactly as uploaded, with their own MIME type.
//! Only pixels without an uploaded encoding are re-encoded, as lossless PNG.

use crate::pipeline::model::DecodedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type of re-encoded inline images.
pub const INLINE_IMAGE_MIME: &str = "image/png";

/// A base64 image payload and the MIME type it is declared as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// Build the inline payload for a decoded image.
pub fn encode_inline(img: &DecodedImage) -> Result<InlineImage, image::ImageError> {
    match img.passthrough {
        Some((mime_type, ref bytes)) => {
            debug!("Sending {} as uploaded ({} bytes)", img.name, bytes.len());
            Ok(InlineImage {
                mime_type: mime_type.to_string(),
                data: STANDARD.encode(bytes),
            })
        }
        None => Ok(InlineImage {
            mime_type: INLINE_IMAGE_MIME.to_string(),
            data: encode_image(&img.image)?,
        }),
    }
}

/// Encode a decoded image as a base64 PNG string.
pub fn encode_image(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(b64)
}
