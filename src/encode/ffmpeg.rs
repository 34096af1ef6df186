//! Video capture through the system `ffmpeg` binary, entirely in memory.

use std::io::{Read as _, Write as _};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::job::{Container, EncodedMedia};
use crate::encode::recorder::{
    CaptureBackend, CaptureConfig, VideoRecorder, flatten_to_opaque_rgba8,
};
use crate::foundation::core::{OPAQUE_BLACK, Raster};
use crate::foundation::error::{HoloError, HoloResult};

/// Return `true` if an `ffmpeg` binary runs from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streaming codec/container pairs, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    /// H.264 in fragmented MP4.
    H264Mp4,
    /// VP9 in WebM.
    Vp9WebM,
    /// VP8 in WebM.
    Vp8WebM,
}

impl VideoCodec {
    /// Negotiation order.
    pub const PREFERENCE: [Self; 3] = [Self::H264Mp4, Self::Vp9WebM, Self::Vp8WebM];

    /// `ffmpeg` encoder name.
    pub fn encoder_name(self) -> &'static str {
        match self {
            Self::H264Mp4 => "libx264",
            Self::Vp9WebM => "libvpx-vp9",
            Self::Vp8WebM => "libvpx",
        }
    }

    /// Output container.
    pub fn container(self) -> Container {
        match self {
            Self::H264Mp4 => Container::Mp4,
            Self::Vp9WebM | Self::Vp8WebM => Container::WebM,
        }
    }

    fn output_args(self) -> &'static [&'static str] {
        match self {
            // A seekable MP4 needs a rewind for its index; fragments stream to a pipe.
            Self::H264Mp4 => &[
                "-preset",
                "veryfast",
                "-movflags",
                "frag_keyframe+empty_moov+default_base_moof",
                "-f",
                "mp4",
            ],
            Self::Vp9WebM => &[
                "-b:v",
                "0",
                "-crf",
                "32",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-f",
                "webm",
            ],
            Self::Vp8WebM => &["-b:v", "4M", "-deadline", "realtime", "-f", "webm"],
        }
    }
}

/// Pick the best codec listed in `ffmpeg -encoders` output.
pub fn pick_codec(encoders_listing: &str) -> Option<VideoCodec> {
    let available: Vec<&str> = encoders_listing
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let flags = cols.next()?;
            // Video encoders carry a `V` flag column, e.g. ` V....D libx264  ...`.
            if !flags.starts_with('V') {
                return None;
            }
            cols.next()
        })
        .collect();
    VideoCodec::PREFERENCE
        .into_iter()
        .find(|c| available.contains(&c.encoder_name()))
}

/// [`CaptureBackend`] that pipes raw frames into `ffmpeg` and reads the container from stdout.
#[derive(Clone, Debug, Default)]
pub struct FfmpegCapture {
    forced: Option<VideoCodec>,
}

impl FfmpegCapture {
    /// Capture with negotiated codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture with one fixed codec, skipping negotiation.
    pub fn with_codec(codec: VideoCodec) -> Self {
        Self {
            forced: Some(codec),
        }
    }

    /// Probe `ffmpeg -encoders` for the best supported codec.
    pub fn negotiate(&self) -> HoloResult<VideoCodec> {
        if let Some(codec) = self.forced {
            return Ok(codec);
        }
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| spawn_error("ffmpeg", e))?;
        if !out.status.success() {
            return Err(HoloError::unsupported("ffmpeg could not list its encoders"));
        }
        let listing = String::from_utf8_lossy(&out.stdout);
        pick_codec(&listing).ok_or_else(|| {
            HoloError::unsupported("ffmpeg has none of libx264, libvpx-vp9, libvpx")
        })
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> HoloError {
    match e.kind() {
        std::io::ErrorKind::NotFound => {
            HoloError::unsupported(format!("{program} was not found on PATH"))
        }
        std::io::ErrorKind::PermissionDenied => {
            HoloError::capture_denied(format!("not permitted to run {program}: {e}"))
        }
        _ => HoloError::encode(format!("failed to spawn {program}: {e}")),
    }
}

impl CaptureBackend for FfmpegCapture {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn open(&self, cfg: &CaptureConfig) -> HoloResult<Box<dyn VideoRecorder>> {
        cfg.validate()?;
        let codec = self.negotiate()?;
        tracing::debug!(encoder = codec.encoder_name(), ?cfg, "opening ffmpeg recorder");

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", cfg.width, cfg.height),
                "-r",
                &cfg.fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                codec.encoder_name(),
                "-pix_fmt",
                "yuv420p",
            ])
            .args(codec.output_args())
            .arg("pipe:1");

        let mut child = cmd.spawn().map_err(|e| spawn_error("ffmpeg", e))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HoloError::encode("failed to open ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HoloError::encode("failed to open ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HoloError::encode("failed to open ffmpeg stderr"))?;

        let stdout_thread = std::thread::spawn(move || {
            let mut stdout = stdout;
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let stderr_thread = std::thread::spawn(move || {
            let mut stderr = stderr;
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).trim().to_owned()
        });

        Ok(Box::new(FfmpegRecorder {
            cfg: *cfg,
            codec,
            child,
            stdin: Some(stdin),
            stdout_thread: Some(stdout_thread),
            stderr_thread: Some(stderr_thread),
            scratch: vec![0u8; cfg.width as usize * cfg.height as usize * 4],
        }))
    }
}

struct FfmpegRecorder {
    cfg: CaptureConfig,
    codec: VideoCodec,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_thread: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    stderr_thread: Option<JoinHandle<String>>,
    scratch: Vec<u8>,
}

impl FfmpegRecorder {
    fn stderr_text(&mut self) -> String {
        self.stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }

    fn shutdown(&mut self) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(h) = self.stdout_thread.take() {
            let _ = h.join();
        }
        let _ = self.stderr_text();
    }
}

impl VideoRecorder for FfmpegRecorder {
    fn container(&self) -> Container {
        self.codec.container()
    }

    fn push_frame(&mut self, frame: &Raster) -> HoloResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(HoloError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        flatten_to_opaque_rgba8(&mut self.scratch, &frame.data, OPAQUE_BLACK)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(HoloError::encode("ffmpeg recorder is already finalized"));
        };
        if let Err(e) = stdin.write_all(&self.scratch) {
            drop(self.stdin.take());
            let _ = self.child.wait();
            let stderr = self.stderr_text();
            return Err(HoloError::encode(format!(
                "failed to write frame to ffmpeg stdin: {e}: {stderr}"
            )));
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> HoloResult<EncodedMedia> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| HoloError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        let bytes = match self.stdout_thread.take().map(|h| h.join()) {
            Some(Ok(Ok(bytes))) => bytes,
            Some(Ok(Err(e))) => return Err(HoloError::encode(format!("read ffmpeg output: {e}"))),
            _ => return Err(HoloError::encode("ffmpeg output reader failed")),
        };
        let stderr = self.stderr_text();
        if !status.success() {
            return Err(HoloError::encode(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        if bytes.is_empty() {
            return Err(HoloError::encode("ffmpeg produced no output"));
        }
        Ok(EncodedMedia {
            bytes,
            container: self.codec.container(),
        })
    }

    fn abort(mut self: Box<Self>) {
        self.shutdown();
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
