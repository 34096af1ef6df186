//! Cross-fade animation between two images, rendered as hologram frames.

use std::borrow::Cow;

use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};
use crate::media::decode::decode_image;
use crate::policy::resource::{
    CapabilityProbe, ResourceBudget, budget_for, detect_capability_class,
};
use crate::render::compositor::{blend_layout, blend_sources, composite};

/// Playback order of the fade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A to B.
    Forward,
    /// B to A.
    Reverse,
    /// A to B and back, without repeating the endpoints.
    #[default]
    Pingpong,
}

impl std::str::FromStr for Direction {
    type Err = HoloError;

    fn from_str(s: &str) -> HoloResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(Self::Forward),
            "reverse" => Ok(Self::Reverse),
            "pingpong" | "ping-pong" | "ping_pong" => Ok(Self::Pingpong),
            other => Err(HoloError::validation(format!("unknown direction '{other}'"))),
        }
    }
}

/// Requested fade animation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationSpec {
    /// Length of one forward pass in seconds.
    pub duration_seconds: f64,
    /// Requested frame rate, capped by the active budget.
    pub fps: u32,
    /// Playback order.
    pub direction: Direction,
    /// Whether players should loop the result.
    #[serde(rename = "loop")]
    pub loop_playback: bool,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            fps: 24,
            direction: Direction::Pingpong,
            loop_playback: true,
        }
    }
}

impl AnimationSpec {
    /// Check ranges.
    pub fn validate(&self) -> HoloResult<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(HoloError::validation("durationSeconds must be finite and > 0"));
        }
        if self.fps == 0 {
            return Err(HoloError::validation("fps must be > 0"));
        }
        Ok(())
    }
}

/// Resolved frame timing of one fade, fixed before any frame is rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct FadePlan {
    /// Effective frame rate after the budget cap.
    pub fps: u32,
    /// Frames in one forward pass.
    pub forward_frames: u32,
    /// Blend factor of B for every emitted frame, in emission order.
    pub alphas: Vec<f32>,
}

impl FadePlan {
    /// Resolve `spec` under `budget`.
    ///
    /// The emitted frame count never exceeds `budget.max_frames`; for pingpong the forward pass
    /// is shortened so that `2 * forward - 2` still fits.
    pub fn new(spec: &AnimationSpec, budget: &ResourceBudget) -> HoloResult<Self> {
        spec.validate()?;
        let fps = budget.clamp_fps(spec.fps).max(1);
        let requested = (spec.duration_seconds * f64::from(fps)).round().max(2.0);
        let requested = if requested >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            requested as u32
        };

        let max_frames = budget.max_frames.max(2);
        let forward_cap = match spec.direction {
            Direction::Pingpong => (max_frames + 2) / 2,
            Direction::Forward | Direction::Reverse => max_frames,
        };
        let forward_frames = requested.min(forward_cap).max(2);

        let mut alphas = forward_alphas(forward_frames);
        match spec.direction {
            Direction::Forward => {}
            Direction::Reverse => alphas.reverse(),
            Direction::Pingpong => {
                if alphas.len() > 2 {
                    let back: Vec<f32> = alphas[1..alphas.len() - 1].iter().rev().copied().collect();
                    alphas.extend(back);
                }
            }
        }

        Ok(Self {
            fps,
            forward_frames,
            alphas,
        })
    }

    /// Number of emitted frames.
    pub fn len(&self) -> usize {
        self.alphas.len()
    }

    /// Return `true` when the plan emits nothing.
    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }
}

fn forward_alphas(frames: u32) -> Vec<f32> {
    if frames <= 1 {
        return vec![1.0];
    }
    let last = (frames - 1) as f32;
    (0..frames).map(|i| i as f32 / last).collect()
}

/// Produces hologram-formatted fade frames under a fixed [`ResourceBudget`].
#[derive(Clone, Copy, Debug)]
pub struct FadeSequencer {
    budget: ResourceBudget,
}

impl FadeSequencer {
    /// Sequencer with an explicit budget.
    pub fn new(budget: ResourceBudget) -> Self {
        Self { budget }
    }

    /// Sequencer whose budget is derived once from `probe`.
    pub fn from_probe(probe: &dyn CapabilityProbe) -> Self {
        Self::new(budget_for(detect_capability_class(probe)))
    }

    /// The budget this sequencer renders under.
    pub fn budget(&self) -> ResourceBudget {
        self.budget
    }

    /// Resolve the frame plan for `spec` without rendering.
    pub fn plan(&self, spec: &AnimationSpec) -> HoloResult<FadePlan> {
        FadePlan::new(spec, &self.budget)
    }

    /// Render every frame in plan order, handing each to `on_frame` as soon as it exists.
    ///
    /// At most one intermediate blend and one output frame are alive at a time.
    pub fn for_each_frame(
        &self,
        image_a: &Raster,
        image_b: &Raster,
        spec: &AnimationSpec,
        mut on_frame: impl FnMut(usize, Raster) -> HoloResult<()>,
    ) -> HoloResult<FadePlan> {
        let plan = self.plan(spec)?;
        if image_a.is_empty() || image_b.is_empty() {
            return Err(HoloError::decode("fade source image has no pixels"));
        }

        let max_dim = self.budget.max_raster_dimension;
        let a = prescale(image_a, max_dim)?;
        let b = prescale(image_b, max_dim)?;
        let layout = blend_layout(&a, &b, Some(max_dim))?;
        tracing::debug!(
            frames = plan.len(),
            fps = plan.fps,
            face = layout.face_size,
            "fade plan resolved"
        );

        for (i, &alpha) in plan.alphas.iter().enumerate() {
            let blended = blend_sources(&a, &b, alpha, Some(max_dim))?;
            let frame = composite(&blended, &layout)?;
            drop(blended);
            on_frame(i, frame)?;
        }
        Ok(plan)
    }

    /// Render all frames into memory.
    #[tracing::instrument(skip_all, fields(direction = ?spec.direction))]
    pub fn generate(
        &self,
        image_a: &Raster,
        image_b: &Raster,
        spec: &AnimationSpec,
    ) -> HoloResult<Vec<Raster>> {
        let mut frames = Vec::new();
        self.for_each_frame(image_a, image_b, spec, |_, frame| {
            frames.push(frame);
            Ok(())
        })?;
        Ok(frames)
    }

    /// Decode both images, then render. A decode failure yields no frames.
    pub fn generate_from_bytes(
        &self,
        bytes_a: &[u8],
        bytes_b: &[u8],
        spec: &AnimationSpec,
    ) -> HoloResult<Vec<Raster>> {
        let a = decode_image(bytes_a)?;
        let b = decode_image(bytes_b)?;
        self.generate(&a, &b, spec)
    }
}

fn prescale(image: &Raster, max_dim: u32) -> HoloResult<Cow<'_, Raster>> {
    if image.max_dimension() <= max_dim {
        return Ok(Cow::Borrowed(image));
    }
    Ok(Cow::Owned(image.fit_within(max_dim)?))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/fade.rs"]
mod tests;
