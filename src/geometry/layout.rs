//! Panel geometry for the four-view cross layout.
//!
//! All functions here are pure arithmetic over a face size and two fixed ratios. Canvas space is
//! y-down with clockwise-positive rotation, matching raster row order.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, SQRT_2};

use crate::foundation::core::{Affine, BezPath, Point, Rect, Vec2};
use crate::foundation::error::{HoloError, HoloResult};

/// Distance from the canvas center to each panel center, as a fraction of the face size.
pub const CENTER_GAP_RATIO: f64 = 0.25;
/// Allowed growth of the draw square beyond the `gap * sqrt(2)` no-overlap bound.
pub const OVERLAP_MARGIN: f64 = 1.05;
/// Half-width of the center-facing trapezoid edge relative to the outer edge.
pub const NARROW_EDGE_RATIO: f64 = 0.45;

/// One of the four rendered views of the hologram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelSide {
    /// Above the center, upright.
    Top,
    /// Right of the center, rotated a quarter turn clockwise.
    Right,
    /// Below the center, upside down.
    Bottom,
    /// Left of the center, rotated a quarter turn counter-clockwise.
    Left,
}

impl PanelSide {
    /// Drawing order used by the compositor and face extraction.
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// Fixed rotation of this panel in radians.
    ///
    /// Each angle maps local `+y` onto the direction of the shared center.
    pub fn rotation(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Right => FRAC_PI_2,
            Self::Bottom => PI,
            Self::Left => -FRAC_PI_2,
        }
    }

    /// Unit offset from the canvas center towards this panel.
    pub fn outward(self) -> Vec2 {
        match self {
            Self::Top => Vec2::new(0.0, -1.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Bottom => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
        }
    }

    /// The side whose quadrant holds `offset` from the canvas center.
    ///
    /// Quadrants are bounded by the two canvas diagonals and are half-open, so every offset
    /// belongs to exactly one side.
    pub fn owning(offset: Vec2) -> Self {
        // 0 points at TOP, growing clockwise in y-down space.
        let angle = offset.x.atan2(-offset.y);
        match (((angle + FRAC_PI_4) / FRAC_PI_2).floor() as i64).rem_euclid(4) {
            0 => Self::Top,
            1 => Self::Right,
            2 => Self::Bottom,
            _ => Self::Left,
        }
    }
}

/// A region pixels are tested against when drawing.
pub trait ClipRegion: Sync + std::fmt::Debug {
    /// Axis-aligned bounds; nothing outside is ever inside the region.
    fn bounding_box(&self) -> Rect;
    /// Return `true` when `p` is inside the region.
    fn contains(&self, p: Point) -> bool;
}

/// Derived placement of the four panels for one face size.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PanelLayout {
    /// Side of the square each view is sized from (the source's larger dimension).
    pub face_size: u32,
    /// Distance from canvas center to each panel center.
    pub gap: u32,
    /// Side of the square each panel is drawn into.
    pub draw_size: u32,
    /// Narrow/wide edge ratio of the trapezoid clip.
    pub narrow_edge_ratio: f64,
}

/// Compute the panel layout for `face_size`.
///
/// `gap = round(face_size * center_gap_ratio)` and
/// `draw_size = min(face_size, floor(gap * sqrt(2) * overlap_margin))`. Callers pass
/// `face_size >= 2`.
pub fn compute_layout(face_size: u32, center_gap_ratio: f64, overlap_margin: f64) -> PanelLayout {
    debug_assert!(face_size >= 2, "face size must be at least 2");
    let gap = (f64::from(face_size) * center_gap_ratio).round().max(0.0) as u32;
    let bound = (f64::from(gap) * SQRT_2 * overlap_margin).floor().max(0.0) as u32;
    PanelLayout {
        face_size,
        gap,
        draw_size: face_size.min(bound),
        narrow_edge_ratio: NARROW_EDGE_RATIO,
    }
}

/// Panel center for `side` around `canvas_center`.
pub fn panel_center(side: PanelSide, canvas_center: Point, gap: u32) -> Point {
    canvas_center + side.outward() * f64::from(gap)
}

/// Trapezoid clip for `side` in the panel's local (post-rotation) frame.
///
/// The narrow edge (half-width `half_draw_size * narrow_edge_ratio`) lies at local `+y`, which
/// every side's rotation points at the shared center; the wide edge lies at local `-y`.
pub fn trapezoid_path(_side: PanelSide, half_draw_size: f64, narrow_edge_ratio: f64) -> Trapezoid {
    let h = half_draw_size;
    let n = half_draw_size * narrow_edge_ratio;
    Trapezoid {
        points: [
            Point::new(-h, -h),
            Point::new(h, -h),
            Point::new(n, h),
            Point::new(-n, h),
        ],
    }
}

impl PanelLayout {
    /// Layout for a `width x height` source, using the fixed ratios.
    pub fn for_source(width: u32, height: u32) -> HoloResult<Self> {
        if width == 0 || height == 0 {
            return Err(HoloError::validation(format!(
                "cannot lay out an empty {width}x{height} source"
            )));
        }
        Ok(compute_layout(
            width.max(height).max(2),
            CENTER_GAP_RATIO,
            OVERLAP_MARGIN,
        ))
    }

    /// Side of the square output canvas: `2 * gap + face_size`.
    pub fn canvas_size(&self) -> u32 {
        2 * self.gap + self.face_size
    }

    /// Center of the output canvas.
    pub fn canvas_center(&self) -> Point {
        let c = f64::from(self.canvas_size()) / 2.0;
        Point::new(c, c)
    }

    /// Half of the draw square side.
    pub fn half_draw_size(&self) -> f64 {
        f64::from(self.draw_size) / 2.0
    }

    /// Center of the panel for `side` in canvas space.
    pub fn panel_center(&self, side: PanelSide) -> Point {
        panel_center(side, self.canvas_center(), self.gap)
    }

    /// Map from the panel's local frame into canvas space.
    pub fn panel_transform(&self, side: PanelSide) -> Affine {
        Affine::translate(self.panel_center(side).to_vec2()) * Affine::rotate(side.rotation())
    }

    /// The panel's clip in canvas space: its trapezoid cut to the side's quadrant.
    ///
    /// Near the diagonals the trapezoids of neighbouring sides reach into each other; the
    /// quadrant cut leaves every pixel center to exactly one panel.
    pub fn clip(&self, side: PanelSide) -> PanelClip {
        PanelClip {
            trapezoid: trapezoid_path(side, self.half_draw_size(), self.narrow_edge_ratio)
                .transformed(self.panel_transform(side)),
            side,
            center: self.canvas_center(),
        }
    }
}

/// Canvas-space clip of one panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelClip {
    /// The panel's trapezoid.
    pub trapezoid: Trapezoid,
    /// Side whose quadrant bounds the clip.
    pub side: PanelSide,
    /// Canvas center the quadrants meet at.
    pub center: Point,
}

impl ClipRegion for PanelClip {
    fn bounding_box(&self) -> Rect {
        self.trapezoid.bounding_box()
    }

    fn contains(&self, p: Point) -> bool {
        PanelSide::owning(p - self.center) == self.side && self.trapezoid.contains(p)
    }
}

/// A convex four-point clip polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trapezoid {
    /// Corners in drawing order: wide edge first, then the narrow edge.
    pub points: [Point; 4],
}

impl Trapezoid {
    /// Apply `affine` to every corner.
    pub fn transformed(&self, affine: Affine) -> Self {
        Self {
            points: self.points.map(|p| affine * p),
        }
    }

    /// Axis-aligned bounds of the corners.
    pub fn bounding_box(&self) -> Rect {
        let [a, b, c, d] = self.points;
        Rect::from_points(a, b).union_pt(c).union_pt(d)
    }

    /// Return `true` when `p` lies inside or on the boundary.
    pub fn contains(&self, p: Point) -> bool {
        let mut pos = false;
        let mut neg = false;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            let cross = (b - a).cross(p - a);
            if cross > 1e-9 {
                pos = true;
            } else if cross < -1e-9 {
                neg = true;
            }
            if pos && neg {
                return false;
            }
        }
        true
    }

    /// Length of the edge between corners `i` and `i + 1`.
    pub fn edge_len(&self, i: usize) -> f64 {
        (self.points[(i + 1) % 4] - self.points[i % 4]).hypot()
    }

    /// The clip as a closed path, e.g. for vector export or debugging overlays.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.points[0]);
        for p in &self.points[1..] {
            path.line_to(*p);
        }
        path.close_path();
        path
    }
}

impl ClipRegion for Trapezoid {
    fn bounding_box(&self) -> Rect {
        Trapezoid::bounding_box(self)
    }

    fn contains(&self, p: Point) -> bool {
        Trapezoid::contains(self, p)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/layout.rs"]
mod tests;
