//! Pull-based video sources feeding the encoder and the live preview.

use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};

/// A decodable, seekable stream of frames.
///
/// `next_frame` lends the current frame until the next call, so implementations can decode into
/// one reused buffer.
pub trait VideoSource: Send {
    /// Frame size in pixels. `(0, 0)` for a source without frames.
    fn dimensions(&self) -> (u32, u32);

    /// Nominal frame rate.
    fn fps(&self) -> f64;

    /// Total frame count when known up front.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }

    /// Advance and return the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> HoloResult<Option<&Raster>>;

    /// Return to the first frame.
    fn rewind(&mut self) -> HoloResult<()> {
        self.seek(0.0)
    }

    /// Position so that the next frame is the one displayed at `seconds`.
    fn seek(&mut self, seconds: f64) -> HoloResult<()>;

    /// Hint that playback started. Sources with no playback clock ignore it.
    fn play(&mut self) {}

    /// Hint that playback stopped.
    fn pause(&mut self) {}
}

/// In-memory frames played back at a fixed rate.
#[derive(Clone, Debug)]
pub struct FrameSequenceSource {
    frames: Vec<Raster>,
    fps: f64,
    cursor: usize,
    playing: bool,
}

impl FrameSequenceSource {
    /// Wrap `frames`. All frames must share one size.
    pub fn new(frames: Vec<Raster>, fps: f64) -> HoloResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(HoloError::validation("source fps must be finite and > 0"));
        }
        if let Some(first) = frames.first() {
            if frames
                .iter()
                .any(|f| f.width != first.width || f.height != first.height)
            {
                return Err(HoloError::validation("source frames differ in size"));
            }
        }
        Ok(Self {
            frames,
            fps,
            cursor: 0,
            playing: false,
        })
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Return `true` for a source without frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the frame the next `next_frame` call returns.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Whether the last `play`/`pause` hint was `play`.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Give back the frames.
    pub fn into_frames(self) -> Vec<Raster> {
        self.frames
    }
}

impl VideoSource for FrameSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn next_frame(&mut self) -> HoloResult<Option<&Raster>> {
        let Some(frame) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn seek(&mut self, seconds: f64) -> HoloResult<()> {
        if !seconds.is_finite() {
            return Err(HoloError::validation("seek target must be finite"));
        }
        let idx = (seconds.max(0.0) * self.fps).floor();
        self.cursor = if idx >= self.frames.len() as f64 {
            self.frames.len()
        } else {
            idx as usize
        };
        Ok(())
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/source.rs"]
mod tests;
