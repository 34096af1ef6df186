//! Capture backends: where video frames go once they are drawn.

use std::time::{Duration, Instant};

use crate::encode::job::{CancelToken, Container, EncodedMedia};
use crate::foundation::core::{Affine, OPAQUE_BLACK, Raster};
use crate::foundation::error::{HoloError, HoloResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::draw::{DrawParams, centered_cover, draw_image};

/// Geometry and rate of one recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Surface width, always even.
    pub width: u32,
    /// Surface height, always even.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

impl CaptureConfig {
    /// Validate dimensions and rate.
    pub fn validate(&self) -> HoloResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(HoloError::validation("capture width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(HoloError::validation("capture fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(HoloError::validation(
                "capture width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(())
    }
}

/// Something that can open a video recorder.
///
/// `open` reports a missing codec or capture path as [`HoloError::EncoderUnsupported`] and a
/// refused device as [`HoloError::CaptureDenied`]; callers may fall back on either.
pub trait CaptureBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Start a recording.
    fn open(&self, cfg: &CaptureConfig) -> HoloResult<Box<dyn VideoRecorder>>;
}

/// An open recording. Frames must match the [`CaptureConfig`] it was opened with.
pub trait VideoRecorder: Send {
    /// Container the finished bytes will be in.
    fn container(&self) -> Container;

    /// Append one frame.
    fn push_frame(&mut self, frame: &Raster) -> HoloResult<()>;

    /// Stop recording and collect the output.
    fn finish(self: Box<Self>) -> HoloResult<EncodedMedia>;

    /// Stop recording and discard everything.
    fn abort(self: Box<Self>);

    /// Whether the recorder timestamps frames by wall-clock arrival, so the producer must pace
    /// pushes at the frame interval.
    fn paced(&self) -> bool {
        false
    }
}

/// Round a size up to the next even value.
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width + (width & 1), height + (height & 1))
}

/// Reused, even-sized surface that frames are drawn onto before capture.
#[derive(Debug)]
pub(crate) struct RenderSurface {
    raster: Raster,
}

impl RenderSurface {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        let (w, h) = even_dimensions(width.max(1), height.max(1));
        Self {
            raster: Raster::filled(w, h, OPAQUE_BLACK),
        }
    }

    pub(crate) fn config(&self, fps: u32) -> CaptureConfig {
        CaptureConfig {
            width: self.raster.width,
            height: self.raster.height,
            fps,
        }
    }

    /// Overwrite the surface with `frame`; a same-size frame lands at the origin, any other
    /// size is cover-fitted.
    pub(crate) fn draw(&mut self, frame: &Raster) -> HoloResult<&Raster> {
        if frame.is_empty() {
            return Err(HoloError::validation("cannot capture an empty frame"));
        }
        self.raster.fill(OPAQUE_BLACK);
        let (sw, sh) = (self.raster.width, self.raster.height);
        if frame.width <= sw && frame.height <= sh && sw - frame.width <= 1 && sh - frame.height <= 1
        {
            // Premultiplied over black keeps the color channels as they are.
            let row = frame.width as usize * 4;
            let stride = sw as usize * 4;
            for (y, src) in frame.data.chunks_exact(row).enumerate() {
                let off = y * stride;
                let dst = &mut self.raster.data[off..off + row];
                for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                    d[..3].copy_from_slice(&s[..3]);
                    d[3] = 255;
                }
            }
        } else {
            let (tw, th) = (f64::from(sw), f64::from(sh));
            draw_image(
                &mut self.raster,
                frame,
                DrawParams {
                    transform: Affine::translate((tw / 2.0, th / 2.0))
                        * centered_cover(frame.width, frame.height, tw, th),
                    clip: None,
                    opacity: 1.0,
                },
            )?;
        }
        Ok(&self.raster)
    }
}

/// Fixed-interval clock for real-time pacing loops.
#[derive(Debug)]
pub(crate) struct Pacer {
    interval: Duration,
    next: Option<Instant>,
}

impl Pacer {
    pub(crate) fn new(rate_hz: f64) -> Self {
        let interval = if rate_hz.is_finite() && rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / rate_hz)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            next: None,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next tick. The first call returns immediately. Returns early with
    /// [`HoloError::Cancelled`] once `cancel` fires.
    pub(crate) fn wait(&mut self, cancel: &CancelToken) -> HoloResult<()> {
        let now = Instant::now();
        let Some(deadline) = self.next else {
            self.next = Some(now + self.interval);
            return cancel.check();
        };
        const SLICE: Duration = Duration::from_millis(5);
        loop {
            cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(SLICE));
        }
        // Skip missed ticks instead of bursting to catch up.
        let mut next = deadline + self.interval;
        let now = Instant::now();
        if next < now {
            next = now + self.interval;
        }
        self.next = Some(next);
        Ok(())
    }
}

/// Composite premultiplied RGBA8 over an opaque background, producing opaque straight RGBA8.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    bg_rgba: [u8; 4],
) -> HoloResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(HoloError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - u16::from(s[3]);
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/recorder.rs"]
mod tests;
