use std::io::Cursor;

use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};

/// Decode encoded image bytes into a premultiplied [`Raster`].
pub fn decode_image(bytes: &[u8]) -> HoloResult<Raster> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| HoloError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(HoloError::decode("decoded image has no pixels"));
    }
    Raster::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Read and decode an image file.
pub fn decode_image_file(path: &std::path::Path) -> HoloResult<Raster> {
    let bytes = std::fs::read(path)
        .map_err(|e| HoloError::decode(format!("read '{}': {e}", path.display())))?;
    decode_image(&bytes)
}

/// Encode a raster as PNG bytes (the still-image export format).
pub fn encode_png(raster: &Raster) -> HoloResult<Vec<u8>> {
    use anyhow::Context as _;

    let img = raster.to_rgba_image()?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/media/decode.rs"]
mod tests;
