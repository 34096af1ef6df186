use image::imageops::FilterType;

use crate::foundation::error::{HoloError, HoloResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Opaque black, the background of every hologram canvas.
pub const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

/// An owned 2-D pixel buffer.
///
/// Pixels are **premultiplied** RGBA8, tightly packed, row-major. A raster is treated as
/// immutable once produced, except when a caller explicitly reuses it as a render target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl Raster {
    /// Allocate a fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; byte_len(width, height)],
        }
    }

    /// Allocate a raster filled with a single premultiplied color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut out = Self::new(width, height);
        out.fill(rgba);
        out
    }

    /// Wrap premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> HoloResult<Self> {
        if data.len() != byte_len(width, height) {
            return Err(HoloError::validation(format!(
                "raster data is {} bytes, expected {} for {width}x{height}",
                data.len(),
                byte_len(width, height)
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap straight-alpha RGBA8 bytes, premultiplying in place.
    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> HoloResult<Self> {
        premultiply_rgba8_in_place(&mut data);
        Self::from_premul_rgba8(width, height, data)
    }

    /// Return `true` when the raster has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The larger of width and height.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Read one premultiplied pixel. Out-of-bounds reads return transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Overwrite every pixel with `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Reuse this buffer as a `width x height` target filled with `rgba`.
    ///
    /// The allocation is kept when the size is unchanged.
    pub fn reset(&mut self, width: u32, height: u32, rgba: [u8; 4]) {
        self.width = width;
        self.height = height;
        self.data.resize(byte_len(width, height), 0);
        self.fill(rgba);
    }

    /// Copy out straight-alpha RGBA8 bytes (what image codecs expect).
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }

    /// Copy out a straight-alpha `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> HoloResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba8())
            .ok_or_else(|| HoloError::validation("raster buffer does not match its dimensions"))
    }

    /// Downscale so that neither side exceeds `max_dim`, preserving aspect ratio.
    ///
    /// Rasters that already fit are returned as a copy.
    pub fn fit_within(&self, max_dim: u32) -> HoloResult<Self> {
        if max_dim == 0 {
            return Err(HoloError::validation("max raster dimension must be > 0"));
        }
        if self.is_empty() || self.max_dimension() <= max_dim {
            return Ok(self.clone());
        }
        let scale = f64::from(max_dim) / f64::from(self.max_dimension());
        let w = ((f64::from(self.width) * scale).round() as u32).clamp(1, max_dim);
        let h = ((f64::from(self.height) * scale).round() as u32).clamp(1, max_dim);

        // Resampling premultiplied values directly avoids dark fringes at alpha edges.
        let premul = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| HoloError::validation("raster buffer does not match its dimensions"))?;
        let resized = image::imageops::resize(&premul, w, h, FilterType::Triangle);
        Self::from_premul_rgba8(w, h, resized.into_raw())
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
