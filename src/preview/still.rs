use crate::foundation::core::{Affine, OPAQUE_BLACK, Raster};
use crate::foundation::error::{HoloError, HoloResult};
use crate::render::draw::{DrawParams, draw_image, over};

/// Default preview width in pixels.
pub const DEFAULT_PREVIEW_MAX_WIDTH: u32 = 800;

const GUIDE_DASH: u32 = 6;
const GUIDE_OPACITY: f32 = 0.25;

/// Scale factor that fits `width x height` inside a `max_width` square without upscaling.
pub fn preview_scale(width: u32, height: u32, max_width: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let m = f64::from(max_width);
    (m / f64::from(width)).min(m / f64::from(height)).min(1.0)
}

/// Produce the on-screen version of a hologram frame.
pub fn render_still_preview(raster: &Raster, max_width: u32, guides: bool) -> HoloResult<Raster> {
    let mut out = Raster::new(0, 0);
    fit_preview_into(raster, max_width, guides, &mut out)?;
    Ok(out)
}

/// Fit `src` for display into `out`, reusing its allocation.
pub(crate) fn fit_preview_into(
    src: &Raster,
    max_width: u32,
    guides: bool,
    out: &mut Raster,
) -> HoloResult<()> {
    if max_width == 0 {
        return Err(HoloError::validation("preview max width must be > 0"));
    }
    if src.is_empty() {
        return Err(HoloError::validation("cannot preview an empty raster"));
    }
    let scale = preview_scale(src.width, src.height, max_width);
    if scale >= 1.0 {
        out.clone_from(src);
    } else {
        let tw = ((f64::from(src.width) * scale).round() as u32).max(1);
        let th = ((f64::from(src.height) * scale).round() as u32).max(1);
        out.reset(tw, th, OPAQUE_BLACK);
        draw_image(
            out,
            src,
            DrawParams {
                transform: Affine::scale_non_uniform(
                    f64::from(tw) / f64::from(src.width),
                    f64::from(th) / f64::from(src.height),
                ),
                clip: None,
                opacity: 1.0,
            },
        )?;
    }
    if guides {
        draw_cross_guides(out);
    }
    Ok(())
}

/// Dashed lines through the center, for aligning the prism. Never part of exported frames.
pub fn draw_cross_guides(raster: &mut Raster) {
    if raster.is_empty() {
        return;
    }
    let white = [255, 255, 255, 255];
    let (w, h) = (raster.width, raster.height);
    let (cx, cy) = (w / 2, h / 2);
    let stride = w as usize * 4;
    let dash_on = |i: u32| (i / GUIDE_DASH).is_multiple_of(2);

    for y in (0..h).filter(|&y| dash_on(y)) {
        let off = y as usize * stride + cx as usize * 4;
        let px = &mut raster.data[off..off + 4];
        let blended = over([px[0], px[1], px[2], px[3]], white, GUIDE_OPACITY);
        px.copy_from_slice(&blended);
    }
    for x in (0..w).filter(|&x| dash_on(x) && x != cx) {
        let off = cy as usize * stride + x as usize * 4;
        let px = &mut raster.data[off..off + 4];
        let blended = over([px[0], px[1], px[2], px[3]], white, GUIDE_OPACITY);
        px.copy_from_slice(&blended);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preview/still.rs"]
mod tests;
