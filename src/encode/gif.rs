use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};

/// Per-frame delay for `fps`, floored at 20 ms (browsers clamp faster GIFs).
pub fn gif_delay_ms(fps: u32) -> u32 {
    let ideal = (1000.0 / f64::from(fps.max(1))).round() as u32;
    ideal.max(20)
}

/// Encode `frames` as an animated GIF, calling `after_frame(i)` once frame `i` is written.
///
/// An error returned from `after_frame` stops encoding immediately.
#[cfg(feature = "gif")]
pub(crate) fn encode_gif(
    frames: &[Raster],
    fps: u32,
    loop_playback: bool,
    mut after_frame: impl FnMut(usize) -> HoloResult<()>,
) -> HoloResult<Vec<u8>> {
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame};

    let delay = Delay::from_numer_denom_ms(gif_delay_ms(fps), 1);
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buf, 10);
        let repeat = if loop_playback {
            Repeat::Infinite
        } else {
            Repeat::Finite(0)
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| HoloError::encode(format!("gif repeat: {e}")))?;
        for (i, frame) in frames.iter().enumerate() {
            let img = frame.to_rgba_image()?;
            encoder
                .encode_frame(Frame::from_parts(img, 0, 0, delay))
                .map_err(|e| HoloError::encode(format!("gif frame {i}: {e}")))?;
            after_frame(i)?;
        }
    }
    Ok(buf)
}

#[cfg(not(feature = "gif"))]
pub(crate) fn encode_gif(
    _frames: &[Raster],
    _fps: u32,
    _loop_playback: bool,
    _after_frame: impl FnMut(usize) -> HoloResult<()>,
) -> HoloResult<Vec<u8>> {
    Err(HoloError::unavailable(
        "GIF export requires the 'gif' feature",
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
