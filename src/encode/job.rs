use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::error::{HoloError, HoloResult};

/// Export target of an encoding job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Streaming video container.
    Video,
    /// Animated GIF.
    Gif,
}

/// Lifecycle of an [`EncodingJob`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum JobState {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// Frames are being encoded.
    Running,
    /// Finished with output.
    Done,
    /// Finished with an error.
    Failed,
    /// Stopped on request.
    Cancelled,
}

impl JobState {
    /// Return `true` for `Done`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// Snapshot of the current or most recent export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct EncodingJob {
    /// Target format, `None` before the first job.
    pub format: Option<ExportFormat>,
    /// Frame rate the job encodes at.
    pub fps: u32,
    /// Number of input frames.
    pub total_frames: usize,
    /// Last reported progress, 0..=100.
    pub progress_percent: u8,
    /// Lifecycle state.
    pub state: JobState,
}

/// Output container of an encoded blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// H.264 in (fragmented) MP4.
    Mp4,
    /// VP8/VP9 in WebM.
    WebM,
    /// Animated GIF.
    Gif,
}

impl Container {
    /// MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::WebM => "video/webm",
            Self::Gif => "image/gif",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
            Self::Gif => "gif",
        }
    }

    /// `requested` with its extension replaced when it does not name this container.
    ///
    /// Matching is case-insensitive, so `OUT.MP4` is kept for [`Container::Mp4`].
    pub fn output_path(self, requested: &Path) -> PathBuf {
        let matches = requested
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension()));
        if matches {
            requested.to_path_buf()
        } else {
            requested.with_extension(self.extension())
        }
    }
}

/// Encoded bytes plus the container they are in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedMedia {
    /// Complete file contents.
    pub bytes: Vec<u8>,
    /// Container of `bytes`.
    pub container: Container,
}

/// Shared cancellation flag.
///
/// Clones observe the same flag; cancelling is sticky.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> HoloResult<()> {
        if self.is_cancelled() {
            Err(HoloError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The single job slot of one encoder.
#[derive(Clone, Debug, Default)]
pub(crate) struct JobSlot(Arc<Mutex<EncodingJob>>);

impl JobSlot {
    fn lock(&self) -> MutexGuard<'_, EncodingJob> {
        // A panic while holding the lock leaves a plain-data snapshot behind; keep using it.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn snapshot(&self) -> EncodingJob {
        *self.lock()
    }

    /// Claim the slot, or fail with [`HoloError::EncoderBusy`] while another job runs.
    pub(crate) fn try_begin(
        &self,
        format: ExportFormat,
        fps: u32,
        total_frames: usize,
    ) -> HoloResult<JobGuard> {
        let mut job = self.lock();
        if job.state == JobState::Running {
            return Err(HoloError::EncoderBusy);
        }
        *job = EncodingJob {
            format: Some(format),
            fps,
            total_frames,
            progress_percent: 0,
            state: JobState::Running,
        };
        Ok(JobGuard {
            slot: self.clone(),
            finished: false,
        })
    }
}

/// Exclusive claim on a [`JobSlot`]; records a terminal state on every exit path.
pub(crate) struct JobGuard {
    slot: JobSlot,
    finished: bool,
}

impl JobGuard {
    pub(crate) fn set_progress(&self, percent: u8) {
        let mut job = self.slot.lock();
        job.progress_percent = job.progress_percent.max(percent.min(100));
    }

    /// Record the outcome of `result` and pass it through.
    pub(crate) fn finish<T>(mut self, result: HoloResult<T>) -> HoloResult<T> {
        let state = match &result {
            Ok(_) => JobState::Done,
            Err(HoloError::Cancelled) => JobState::Cancelled,
            Err(_) => JobState::Failed,
        };
        self.slot.lock().state = state;
        self.finished = true;
        result
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.slot.lock().state = JobState::Failed;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/job.rs"]
mod tests;
