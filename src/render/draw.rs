use rayon::prelude::*;

use crate::foundation::core::{Affine, Point, Raster, Rect};
use crate::foundation::error::{HoloError, HoloResult};
use crate::foundation::math::{mul_div255_u8, opacity_to_u8};
use crate::geometry::layout::ClipRegion;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over compositing of premultiplied pixels with an extra opacity factor.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    over_op(dst, src, opacity_to_u8(opacity))
}

fn over_op(dst: PremulRgba8, src: PremulRgba8, op: u16) -> PremulRgba8 {
    if op == 0 || src[3] == 0 {
        return dst;
    }

    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Placement of one image draw.
#[derive(Clone, Copy, Debug)]
pub struct DrawParams<'a> {
    /// Maps source pixel space into destination pixel space.
    pub transform: Affine,
    /// Optional clip in destination pixel space.
    pub clip: Option<&'a dyn ClipRegion>,
    /// Extra opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Affine that scales a `src_w x src_h` image to *cover* a `target_w x target_h` box and
/// centers it on the origin.
pub fn centered_cover(src_w: u32, src_h: u32, target_w: f64, target_h: f64) -> Affine {
    let sw = f64::from(src_w.max(1));
    let sh = f64::from(src_h.max(1));
    let scale = (target_w / sw).max(target_h / sh);
    Affine::scale(scale) * Affine::translate((-sw / 2.0, -sh / 2.0))
}

/// Draw `src` into `dst` through `params`, sampling bilinearly at destination pixel centers.
///
/// A pixel is touched only when its center is inside the clip and maps inside the source. An
/// integer-aligned unscaled placement copies source pixels exactly.
pub fn draw_image(dst: &mut Raster, src: &Raster, params: DrawParams<'_>) -> HoloResult<()> {
    let op = opacity_to_u8(params.opacity);
    if op == 0 || src.is_empty() || dst.is_empty() {
        return Ok(());
    }
    if params.transform.determinant().abs() < 1e-12 {
        return Err(HoloError::validation("draw transform is not invertible"));
    }
    let inv = params.transform.inverse();

    let src_rect = Rect::new(0.0, 0.0, f64::from(src.width), f64::from(src.height));
    let mut bounds = params.transform.transform_rect_bbox(src_rect);
    if let Some(clip) = params.clip {
        bounds = bounds.intersect(clip.bounding_box());
    }
    bounds = bounds.intersect(Rect::new(
        0.0,
        0.0,
        f64::from(dst.width),
        f64::from(dst.height),
    ));
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Ok(());
    }

    let x0 = bounds.x0.floor().max(0.0) as usize;
    let x1 = (bounds.x1.ceil() as usize).min(dst.width as usize);
    let y0 = bounds.y0.floor().max(0.0) as usize;
    let y1 = (bounds.y1.ceil() as usize).min(dst.height as usize);

    let sw = f64::from(src.width);
    let sh = f64::from(src.height);
    let row_bytes = dst.width as usize * 4;
    let clip = params.clip;

    dst.data
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            for x in x0..x1 {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if let Some(clip) = clip
                    && !clip.contains(p)
                {
                    continue;
                }
                let s = inv * p;
                if s.x < 0.0 || s.y < 0.0 || s.x >= sw || s.y >= sh {
                    continue;
                }
                let sample = sample_bilinear(src, s.x, s.y);
                let i = x * 4;
                let d = [row[i], row[i + 1], row[i + 2], row[i + 3]];
                row[i..i + 4].copy_from_slice(&over_op(d, sample, op));
            }
        });
    Ok(())
}

/// Bilinear sample at source coordinate `(sx, sy)` with texel centers at `+0.5`.
fn sample_bilinear(src: &Raster, sx: f64, sy: f64) -> PremulRgba8 {
    let u = sx - 0.5;
    let v = sy - 0.5;
    let fu = u.floor();
    let fv = v.floor();
    // 8-bit fixed-point weights keep the sampler exact on texel centers.
    let wx = ((u - fu) * 256.0).round() as u32;
    let wy = ((v - fv) * 256.0).round() as u32;

    let max_x = i64::from(src.width) - 1;
    let max_y = i64::from(src.height) - 1;
    let xa = (fu as i64).clamp(0, max_x) as u32;
    let xb = (fu as i64 + 1).clamp(0, max_x) as u32;
    let ya = (fv as i64).clamp(0, max_y) as u32;
    let yb = (fv as i64 + 1).clamp(0, max_y) as u32;

    let p00 = src.pixel(xa, ya);
    let p10 = src.pixel(xb, ya);
    let p01 = src.pixel(xa, yb);
    let p11 = src.pixel(xb, yb);

    let w00 = (256 - wx) * (256 - wy);
    let w10 = wx * (256 - wy);
    let w01 = (256 - wx) * wy;
    let w11 = wx * wy;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let acc = u32::from(p00[c]) * w00
            + u32::from(p10[c]) * w10
            + u32::from(p01[c]) * w01
            + u32::from(p11[c]) * w11;
        out[c] = ((acc + 32_768) >> 16).min(255) as u8;
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u8(x, y)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/draw.rs"]
mod tests;
