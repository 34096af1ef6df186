//! Cross-layout compositing of one (or two blended) source rasters.
//!
//! Every function here is a deterministic pure function of its inputs.

use crate::foundation::core::{Affine, OPAQUE_BLACK, Raster};
use crate::foundation::error::{HoloError, HoloResult};
use crate::geometry::layout::{PanelLayout, PanelSide};
use crate::render::draw::{DrawParams, centered_cover, draw_image};

/// Composite `source` into a new four-panel hologram canvas.
#[tracing::instrument(skip_all, fields(w = source.width, h = source.height, face = layout.face_size))]
pub fn composite(source: &Raster, layout: &PanelLayout) -> HoloResult<Raster> {
    let mut out = Raster::new(0, 0);
    composite_into(source, layout, &mut out)?;
    Ok(out)
}

/// Composite `source` into a caller-owned render target.
///
/// `target` is resized to the layout's canvas and fully overwritten, so a single buffer can be
/// reused across the frames of a pacing loop.
pub fn composite_into(source: &Raster, layout: &PanelLayout, target: &mut Raster) -> HoloResult<()> {
    if source.is_empty() {
        return Err(HoloError::validation("cannot composite an empty source"));
    }
    let size = layout.canvas_size();
    target.reset(size, size, OPAQUE_BLACK);
    if layout.draw_size == 0 {
        return Ok(());
    }

    let draw = f64::from(layout.draw_size);
    let cover = centered_cover(source.width, source.height, draw, draw);
    for side in PanelSide::ALL {
        let clip = layout.clip(side);
        draw_image(
            target,
            source,
            DrawParams {
                transform: layout.panel_transform(side) * cover,
                clip: Some(&clip),
                opacity: 1.0,
            },
        )?;
    }
    Ok(())
}

/// Blend `a` and `b` into one intermediate source over opaque black.
///
/// The intermediate has the larger of the two inputs' dimensions, optionally shrunk so neither
/// side exceeds `max_dim`. `a` is drawn at `1 - alpha_b`, then `b` at `alpha_b`, both
/// cover-fitted and centered. A zero-opacity input is skipped entirely.
pub fn blend_sources(
    a: &Raster,
    b: &Raster,
    alpha_b: f32,
    max_dim: Option<u32>,
) -> HoloResult<Raster> {
    if a.is_empty() || b.is_empty() {
        return Err(HoloError::validation("cannot blend an empty source"));
    }
    let alpha_b = alpha_b.clamp(0.0, 1.0);
    let (width, height) = blend_size(a, b, max_dim);

    let mut out = Raster::filled(width, height, OPAQUE_BLACK);
    let (tw, th) = (f64::from(width), f64::from(height));
    let center = Affine::translate((tw / 2.0, th / 2.0));

    let a_opacity = 1.0 - alpha_b;
    if a_opacity > 0.0 {
        draw_image(
            &mut out,
            a,
            DrawParams {
                transform: center * centered_cover(a.width, a.height, tw, th),
                clip: None,
                opacity: a_opacity,
            },
        )?;
    }
    if alpha_b > 0.0 {
        draw_image(
            &mut out,
            b,
            DrawParams {
                transform: center * centered_cover(b.width, b.height, tw, th),
                clip: None,
                opacity: alpha_b,
            },
        )?;
    }
    Ok(out)
}

/// Blend `a` and `b` at `alpha_b` and composite the result.
///
/// `alpha_b = 0` reproduces `composite(a)` and `alpha_b = 1` reproduces `composite(b)`, up to
/// the intermediate's own cover-fit when the inputs differ in size.
pub fn composite_blend(
    a: &Raster,
    b: &Raster,
    alpha_b: f32,
    layout: &PanelLayout,
) -> HoloResult<Raster> {
    let blended = blend_sources(a, b, alpha_b, None)?;
    composite(&blended, layout)
}

/// Layout for the intermediate produced by [`blend_sources`] with the same `max_dim`.
pub fn blend_layout(a: &Raster, b: &Raster, max_dim: Option<u32>) -> HoloResult<PanelLayout> {
    let (w, h) = blend_size(a, b, max_dim);
    PanelLayout::for_source(w, h)
}

fn blend_size(a: &Raster, b: &Raster, max_dim: Option<u32>) -> (u32, u32) {
    let width = a.width.max(b.width);
    let height = a.height.max(b.height);
    match max_dim {
        Some(cap) if cap > 0 && width.max(height) > cap => {
            let scale = f64::from(cap) / f64::from(width.max(height));
            (
                ((f64::from(width) * scale).round() as u32).clamp(1, cap),
                ((f64::from(height) * scale).round() as u32).clamp(1, cap),
            )
        }
        _ => (width, height),
    }
}

/// Render each side's rotated view on its own `face_size x face_size` canvas.
///
/// Faces come back in [`PanelSide::ALL`] order (TOP, RIGHT, BOTTOM, LEFT), full-cover and
/// without the panel gap or trapezoid clip.
pub fn extract_faces(source: &Raster) -> HoloResult<Vec<Raster>> {
    if source.is_empty() {
        return Err(HoloError::validation("cannot extract faces from an empty source"));
    }
    let face = source.max_dimension();
    let half = f64::from(face) / 2.0;
    let cover = centered_cover(source.width, source.height, f64::from(face), f64::from(face));

    let mut faces = Vec::with_capacity(PanelSide::ALL.len());
    for side in PanelSide::ALL {
        let mut canvas = Raster::filled(face, face, OPAQUE_BLACK);
        draw_image(
            &mut canvas,
            source,
            DrawParams {
                transform: Affine::translate((half, half)) * Affine::rotate(side.rotation()) * cover,
                clip: None,
                opacity: 1.0,
            },
        )?;
        faces.push(canvas);
    }
    Ok(faces)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
