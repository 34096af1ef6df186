//! Video decoding through the system `ffprobe`/`ffmpeg` binaries.

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::media::source::VideoSource;

/// Stream facts reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    /// Source file.
    pub path: PathBuf,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Container duration in seconds, 0 when unknown.
    pub duration_sec: f64,
}

impl VideoInfo {
    /// Frame rate as a float.
    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Read stream facts from `path`. Every failure is reported as [`HoloError::Decode`].
pub fn probe_video(path: &Path) -> HoloResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| HoloError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(HoloError::decode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| HoloError::decode(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| HoloError::decode("no video stream found"))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(HoloError::decode("video stream has no usable size")),
    };
    let (fps_num, fps_den) = parse_ff_ratio(stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .filter(|(n, _)| *n > 0)
        .ok_or_else(|| HoloError::decode("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        path: path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

/// A video file decoded frame by frame from one long-lived `ffmpeg` child.
///
/// Seeking restarts the child at the new position.
pub struct FfmpegVideoSource {
    info: VideoInfo,
    child: Option<(Child, ChildStdout)>,
    frame: Raster,
    start_sec: f64,
}

impl FfmpegVideoSource {
    /// Probe `path` and prepare to decode from its start.
    pub fn open(path: impl AsRef<Path>) -> HoloResult<Self> {
        let info = probe_video(path.as_ref())?;
        tracing::debug!(
            path = %info.path.display(),
            w = info.width,
            h = info.height,
            fps = info.fps(),
            "opened video source"
        );
        let frame = Raster::new(info.width, info.height);
        Ok(Self {
            info,
            child: None,
            frame,
            start_sec: 0.0,
        })
    }

    /// Probed stream facts.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn spawn(&self) -> HoloResult<(Child, ChildStdout)> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{:.6}", self.start_sec)])
            .arg("-i")
            .arg(&self.info.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HoloError::decode(format!("failed to spawn ffmpeg for decode: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HoloError::decode("ffmpeg stdout missing"))?;
        Ok((child, stdout))
    }

    fn stop_child(&mut self) {
        if let Some((mut child, stdout)) = self.child.take() {
            drop(stdout);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl VideoSource for FfmpegVideoSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn fps(&self) -> f64 {
        self.info.fps()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        let n = (self.info.duration_sec * self.info.fps()).round();
        (n > 0.0).then_some(n as u64)
    }

    fn next_frame(&mut self) -> HoloResult<Option<&Raster>> {
        if self.child.is_none() {
            self.child = Some(self.spawn()?);
        }
        let Some((_, stdout)) = self.child.as_mut() else {
            return Ok(None);
        };
        match stdout.read_exact(&mut self.frame.data) {
            Ok(()) => {
                premultiply_rgba8_in_place(&mut self.frame.data);
                Ok(Some(&self.frame))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Keep the exhausted child parked so further calls stay at end of stream.
                if let Some((child, _)) = self.child.as_mut() {
                    let _ = child.wait();
                }
                Ok(None)
            }
            Err(e) => Err(HoloError::decode(format!("read decoded frame: {e}"))),
        }
    }

    fn seek(&mut self, seconds: f64) -> HoloResult<()> {
        if !seconds.is_finite() {
            return Err(HoloError::validation("seek target must be finite"));
        }
        self.stop_child();
        self.start_sec = seconds.max(0.0);
        Ok(())
    }
}

impl Drop for FfmpegVideoSource {
    fn drop(&mut self) {
        self.stop_child();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
