//! Frame-sequence export with progress, cancellation, and a one-job guard.

use std::borrow::Cow;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::encode::ffmpeg::FfmpegCapture;
use crate::encode::gif::encode_gif;
use crate::encode::job::{
    CancelToken, Container, EncodedMedia, EncodingJob, ExportFormat, JobGuard, JobSlot,
};
use crate::encode::recorder::{CaptureBackend, Pacer, RenderSurface, VideoRecorder};
use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};
use crate::geometry::layout::PanelLayout;
use crate::media::decode::encode_png;
use crate::media::source::VideoSource;
use crate::policy::resource::{
    CapabilityClass, CapabilityProbe, ResourceBudget, budget_for, detect_capability_class,
};
use crate::render::compositor::{composite, composite_into};

/// Where the representative still is taken when video capture is unavailable.
pub const FALLBACK_FRAME_SECONDS: f64 = 0.1;

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as f64 * 100.0 / total as f64).round() as u8).min(100)
}

/// Options for [`Encoder::process_source_video_to_hologram`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HologramVideoOptions {
    /// Output frame rate; defaults to the source's rate. Capped by `budget`.
    pub fps: Option<u32>,
    /// Limits for this run.
    pub budget: ResourceBudget,
}

impl Default for HologramVideoOptions {
    fn default() -> Self {
        Self {
            fps: None,
            budget: budget_for(CapabilityClass::Normal),
        }
    }
}

impl HologramVideoOptions {
    /// Options with the budget derived from `probe`.
    pub fn from_probe(probe: &dyn CapabilityProbe) -> Self {
        Self {
            fps: None,
            budget: budget_for(detect_capability_class(probe)),
        }
    }
}

/// Result of converting a source video.
#[derive(Debug)]
pub enum HologramVideo {
    /// The full hologram recording.
    Video(EncodedMedia),
    /// Recording was not possible; one composited frame instead.
    StillFallback {
        /// Composited representative frame.
        frame: Raster,
        /// `frame` as PNG bytes.
        png: Vec<u8>,
        /// Why recording was skipped.
        reason: HoloError,
    },
}

impl HologramVideo {
    /// Return `true` for [`HologramVideo::StillFallback`].
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::StillFallback { .. })
    }
}

/// A background export started by [`Encoder::spawn_video`] or [`Encoder::spawn_gif`].
#[derive(Debug)]
pub struct EncodeTask {
    cancel: CancelToken,
    handle: JoinHandle<HoloResult<EncodedMedia>>,
}

impl EncodeTask {
    /// Request cancellation. No progress is reported afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the worker.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Whether the worker has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the export completes.
    pub fn wait(self) -> HoloResult<EncodedMedia> {
        self.handle
            .join()
            .map_err(|_| HoloError::Other(anyhow::anyhow!("encode worker panicked")))?
    }
}

/// Exports frame sequences as video or GIF, one job at a time.
///
/// Clones share the job slot, so the one-job guard holds across clones and worker threads.
#[derive(Clone)]
pub struct Encoder {
    capture: Arc<dyn CaptureBackend>,
    slot: JobSlot,
    gif_loop: bool,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegCapture::new()))
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("capture", &self.capture.name())
            .field("job", &self.slot.snapshot())
            .field("gif_loop", &self.gif_loop)
            .finish()
    }
}

impl Encoder {
    /// Encoder recording video through `capture`.
    pub fn new(capture: Arc<dyn CaptureBackend>) -> Self {
        Self {
            capture,
            slot: JobSlot::default(),
            gif_loop: true,
        }
    }

    /// Whether exported GIFs repeat forever (default) or play once.
    pub fn with_gif_loop(mut self, loop_playback: bool) -> Self {
        self.gif_loop = loop_playback;
        self
    }

    /// Snapshot of the current or most recent job.
    pub fn job(&self) -> EncodingJob {
        self.slot.snapshot()
    }

    fn begin(&self, format: ExportFormat, frames: &[Raster], fps: u32) -> HoloResult<JobGuard> {
        if frames.is_empty() {
            return Err(HoloError::NoFrames);
        }
        if fps == 0 {
            return Err(HoloError::validation("export fps must be > 0"));
        }
        self.slot.try_begin(format, fps, frames.len())
    }

    /// Record `frames` at `fps` into a video container.
    ///
    /// `on_progress` receives `round(100 * drawn / total)` after each frame.
    #[tracing::instrument(skip_all, fields(frames = frames.len(), fps = fps))]
    pub fn encode_to_video(
        &self,
        frames: &[Raster],
        fps: u32,
        mut on_progress: impl FnMut(u8),
        cancel: &CancelToken,
    ) -> HoloResult<EncodedMedia> {
        let guard = self.begin(ExportFormat::Video, frames, fps)?;
        let result = self.record(frames, fps, &guard, &mut on_progress, cancel);
        guard.finish(result)
    }

    /// Encode `frames` at `fps` as an animated GIF.
    #[tracing::instrument(skip_all, fields(frames = frames.len(), fps = fps))]
    pub fn encode_to_gif(
        &self,
        frames: &[Raster],
        fps: u32,
        mut on_progress: impl FnMut(u8),
        cancel: &CancelToken,
    ) -> HoloResult<EncodedMedia> {
        let guard = self.begin(ExportFormat::Gif, frames, fps)?;
        let result = self.gif(frames, fps, &guard, &mut on_progress, cancel);
        guard.finish(result)
    }

    /// Run [`Encoder::encode_to_video`] on a worker thread.
    ///
    /// Empty input and a busy encoder are reported here, before the worker starts.
    pub fn spawn_video(
        &self,
        frames: Vec<Raster>,
        fps: u32,
        on_progress: impl FnMut(u8) + Send + 'static,
    ) -> HoloResult<EncodeTask> {
        self.spawn(ExportFormat::Video, frames, fps, on_progress)
    }

    /// Run [`Encoder::encode_to_gif`] on a worker thread.
    pub fn spawn_gif(
        &self,
        frames: Vec<Raster>,
        fps: u32,
        on_progress: impl FnMut(u8) + Send + 'static,
    ) -> HoloResult<EncodeTask> {
        self.spawn(ExportFormat::Gif, frames, fps, on_progress)
    }

    fn spawn(
        &self,
        format: ExportFormat,
        frames: Vec<Raster>,
        fps: u32,
        mut on_progress: impl FnMut(u8) + Send + 'static,
    ) -> HoloResult<EncodeTask> {
        let guard = self.begin(format, &frames, fps)?;
        let cancel = CancelToken::new();
        let encoder = self.clone();
        let worker_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name(format!("holoprism-encode-{format:?}").to_lowercase())
            .spawn(move || {
                let result = match format {
                    ExportFormat::Video => {
                        encoder.record(&frames, fps, &guard, &mut on_progress, &worker_cancel)
                    }
                    ExportFormat::Gif => {
                        encoder.gif(&frames, fps, &guard, &mut on_progress, &worker_cancel)
                    }
                };
                guard.finish(result)
            })
            .map_err(|e| HoloError::Other(anyhow::anyhow!("spawn encode worker: {e}")))?;
        Ok(EncodeTask { cancel, handle })
    }

    fn record(
        &self,
        frames: &[Raster],
        fps: u32,
        guard: &JobGuard,
        on_progress: &mut dyn FnMut(u8),
        cancel: &CancelToken,
    ) -> HoloResult<EncodedMedia> {
        cancel.check()?;
        let first = &frames[0];
        let mut surface = RenderSurface::new(first.width, first.height);
        let mut recorder = self.capture.open(&surface.config(fps))?;
        tracing::debug!(
            backend = self.capture.name(),
            container = ?recorder.container(),
            "recorder opened"
        );

        let total = frames.len();
        let mut pacer = Pacer::new(f64::from(fps));
        let paced = recorder.paced();
        let pushed = (|| -> HoloResult<()> {
            for (i, frame) in frames.iter().enumerate() {
                if paced {
                    pacer.wait(cancel)?;
                }
                cancel.check()?;
                recorder.push_frame(surface.draw(frame)?)?;
                report(guard, on_progress, cancel, percent(i + 1, total))?;
            }
            Ok(())
        })();
        finish_recorder(recorder, pushed)
    }

    fn gif(
        &self,
        frames: &[Raster],
        fps: u32,
        guard: &JobGuard,
        on_progress: &mut dyn FnMut(u8),
        cancel: &CancelToken,
    ) -> HoloResult<EncodedMedia> {
        cancel.check()?;
        let total = frames.len();
        let bytes = encode_gif(frames, fps, self.gif_loop, |i| {
            report(guard, on_progress, cancel, percent(i + 1, total))
        })?;
        Ok(EncodedMedia {
            bytes,
            container: Container::Gif,
        })
    }

    /// Play `source` from the start, composite every frame, and record the result.
    ///
    /// When no recorder can be opened ([`HoloError::EncoderUnsupported`],
    /// [`HoloError::EncoderUnavailable`] or [`HoloError::CaptureDenied`]) one composited frame
    /// near the start is returned as [`HologramVideo::StillFallback`] instead.
    #[tracing::instrument(skip_all, fields(fps = ?opts.fps))]
    pub fn process_source_video_to_hologram(
        &self,
        source: &mut dyn VideoSource,
        opts: &HologramVideoOptions,
        mut on_progress: impl FnMut(u8),
        cancel: &CancelToken,
    ) -> HoloResult<HologramVideo> {
        let (src_w, src_h) = source.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(HoloError::decode("source video has no frames"));
        }
        let max_dim = opts.budget.max_raster_dimension;
        let (w, h) = scaled_size(src_w, src_h, max_dim);
        let layout = PanelLayout::for_source(w, h)?;
        let requested = opts
            .fps
            .unwrap_or_else(|| source.fps().round().clamp(1.0, 240.0) as u32);
        let fps = opts.budget.clamp_fps(requested).max(1);
        let total = source
            .frame_count_hint()
            .map(|n| {
                let scaled = n as f64 * f64::from(fps) / source.fps().max(1e-3);
                scaled.round() as usize
            })
            .unwrap_or(0);

        let guard = self.slot.try_begin(ExportFormat::Video, fps, total)?;
        let canvas = layout.canvas_size();
        let surface = RenderSurface::new(canvas, canvas);
        let result = match self.capture.open(&surface.config(fps)) {
            Ok(recorder) => {
                tracing::debug!(
                    backend = self.capture.name(),
                    container = ?recorder.container(),
                    fps,
                    "recording source video"
                );
                self.record_source(
                    source,
                    SourceRun {
                        layout: &layout,
                        max_dim,
                        fps,
                        total,
                    },
                    recorder,
                    surface,
                    &guard,
                    &mut on_progress,
                    cancel,
                )
                .map(HologramVideo::Video)
            }
            Err(
                reason @ (HoloError::EncoderUnsupported(_)
                | HoloError::EncoderUnavailable(_)
                | HoloError::CaptureDenied(_)),
            ) => {
                tracing::warn!(%reason, "video capture unavailable, exporting a still frame");
                still_fallback(source, &layout, max_dim, reason)
            }
            Err(e) => Err(e),
        };
        guard.finish(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn record_source(
        &self,
        source: &mut dyn VideoSource,
        run: SourceRun<'_>,
        mut recorder: Box<dyn VideoRecorder>,
        mut surface: RenderSurface,
        guard: &JobGuard,
        on_progress: &mut dyn FnMut(u8),
        cancel: &CancelToken,
    ) -> HoloResult<EncodedMedia> {
        let mut buffer = Raster::new(0, 0);
        let mut pacer = Pacer::new(f64::from(run.fps));
        let paced = recorder.paced();
        // Source frames advanced per output frame; above 1 when the budget lowers the rate.
        let step = (source.fps() / f64::from(run.fps)).max(1.0);

        let pushed = (|| -> HoloResult<()> {
            source.rewind()?;
            source.play();
            let mut next_index = 0usize;
            let mut drawn = 0usize;
            'frames: loop {
                if paced {
                    pacer.wait(cancel)?;
                }
                cancel.check()?;
                let target = (drawn as f64 * step).floor() as usize;
                while next_index < target {
                    if source.next_frame()?.is_none() {
                        break 'frames;
                    }
                    next_index += 1;
                }
                let Some(frame) = source.next_frame()? else {
                    break;
                };
                next_index += 1;
                let fitted = fit_frame(frame, run.max_dim)?;
                composite_into(&fitted, run.layout, &mut buffer)?;
                recorder.push_frame(surface.draw(&buffer)?)?;
                drawn += 1;
                if run.total > 0 {
                    report(guard, on_progress, cancel, percent(drawn, run.total).min(99))?;
                }
            }
            if drawn == 0 {
                return Err(HoloError::NoFrames);
            }
            Ok(())
        })();
        source.pause();
        let media = finish_recorder(recorder, pushed)?;
        report(guard, on_progress, cancel, 100)?;
        Ok(media)
    }
}

struct SourceRun<'a> {
    layout: &'a PanelLayout,
    max_dim: u32,
    fps: u32,
    total: usize,
}

fn report(
    guard: &JobGuard,
    on_progress: &mut dyn FnMut(u8),
    cancel: &CancelToken,
    pct: u8,
) -> HoloResult<()> {
    cancel.check()?;
    guard.set_progress(pct);
    on_progress(pct);
    Ok(())
}

fn finish_recorder(
    recorder: Box<dyn VideoRecorder>,
    pushed: HoloResult<()>,
) -> HoloResult<EncodedMedia> {
    match pushed {
        Ok(()) => recorder.finish(),
        Err(e) => {
            recorder.abort();
            Err(e)
        }
    }
}

fn scaled_size(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let largest = width.max(height);
    if max_dim == 0 || largest <= max_dim {
        return (width, height);
    }
    let scale = f64::from(max_dim) / f64::from(largest);
    (
        ((f64::from(width) * scale).round() as u32).clamp(1, max_dim),
        ((f64::from(height) * scale).round() as u32).clamp(1, max_dim),
    )
}

fn fit_frame(frame: &Raster, max_dim: u32) -> HoloResult<Cow<'_, Raster>> {
    if frame.max_dimension() <= max_dim {
        Ok(Cow::Borrowed(frame))
    } else {
        Ok(Cow::Owned(frame.fit_within(max_dim)?))
    }
}

fn still_fallback(
    source: &mut dyn VideoSource,
    layout: &PanelLayout,
    max_dim: u32,
    reason: HoloError,
) -> HoloResult<HologramVideo> {
    source.seek(FALLBACK_FRAME_SECONDS)?;
    let frame = match source.next_frame()? {
        Some(f) => {
            let fitted = fit_frame(f, max_dim)?;
            composite(&fitted, layout)?
        }
        None => {
            // Shorter than the fallback offset: use the first frame.
            source.rewind()?;
            let f = source
                .next_frame()?
                .ok_or_else(|| HoloError::decode("source video has no frames"))?;
            let fitted = fit_frame(f, max_dim)?;
            composite(&fitted, layout)?
        }
    };
    let png = encode_png(&frame)?;
    Ok(HologramVideo::StillFallback { frame, png, reason })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
