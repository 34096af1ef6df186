//! Continuous on-screen preview of a playing source.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::encode::job::CancelToken;
use crate::encode::recorder::Pacer;
use crate::foundation::core::Raster;
use crate::foundation::error::{HoloError, HoloResult};
use crate::geometry::layout::PanelLayout;
use crate::media::source::VideoSource;
use crate::preview::still::{DEFAULT_PREVIEW_MAX_WIDTH, fit_preview_into};
use crate::render::compositor::composite_into;

/// Display target of a preview loop.
pub trait PreviewSurface: Send {
    /// Show `frame`. The reference is only valid for the duration of the call.
    fn present(&mut self, frame: &Raster) -> HoloResult<()>;
}

/// In-memory surface that keeps a copy of the last presented frame.
#[derive(Clone, Debug, Default)]
pub struct LatestFrameSurface {
    inner: Arc<Mutex<(Option<Raster>, u64)>>,
}

impl LatestFrameSurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last presented frame.
    pub fn latest(&self) -> Option<Raster> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).0.clone()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}

impl PreviewSurface for LatestFrameSurface {
    fn present(&mut self, frame: &Raster) -> HoloResult<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.0.as_mut() {
            Some(last) => last.clone_from(frame),
            None => inner.0 = Some(frame.clone()),
        }
        inner.1 += 1;
        Ok(())
    }
}

/// Preview loop settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewOptions {
    /// Largest displayed side; frames are never upscaled.
    pub max_width: u32,
    /// Restart the source at its end instead of stopping.
    pub loop_playback: bool,
    /// Composite each source frame into the hologram layout. Off for sources that already
    /// carry hologram frames, such as a generated fade.
    pub composite: bool,
    /// Draw dashed alignment guides on the displayed frame.
    pub cross_guides: bool,
    /// Refresh cap for [`start_preview`].
    pub max_rate_hz: f64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_PREVIEW_MAX_WIDTH,
            loop_playback: true,
            composite: true,
            cross_guides: false,
            max_rate_hz: 60.0,
        }
    }
}

/// Result of one [`LivePreview::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep scheduling.
    Continue,
    /// The source ended and looping is off.
    Ended,
}

type FrameHook = Box<dyn FnMut(&Raster) + Send>;
type DrawHook = Box<dyn FnMut() + Send>;

/// Preview state: the source, the display, and the reused render buffers.
pub struct LivePreview {
    source: Box<dyn VideoSource>,
    surface: Box<dyn PreviewSurface>,
    opts: PreviewOptions,
    layout: Option<((u32, u32), PanelLayout)>,
    buffer: Raster,
    display: Raster,
    on_frame: Option<FrameHook>,
    on_after_draw: Option<DrawHook>,
}

impl std::fmt::Debug for LivePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePreview")
            .field("opts", &self.opts)
            .field("source_dims", &self.source.dimensions())
            .finish_non_exhaustive()
    }
}

impl LivePreview {
    /// Preview `source` on `surface`.
    pub fn new(
        source: Box<dyn VideoSource>,
        surface: Box<dyn PreviewSurface>,
        opts: PreviewOptions,
    ) -> HoloResult<Self> {
        if opts.max_width == 0 {
            return Err(HoloError::validation("preview max width must be > 0"));
        }
        Ok(Self {
            source,
            surface,
            opts,
            layout: None,
            buffer: Raster::new(0, 0),
            display: Raster::new(0, 0),
            on_frame: None,
            on_after_draw: None,
        })
    }

    /// Called with the full-resolution frame after compositing, before display.
    pub fn on_frame(mut self, hook: impl FnMut(&Raster) + Send + 'static) -> Self {
        self.on_frame = Some(Box::new(hook));
        self
    }

    /// Called after each frame is presented.
    pub fn on_after_draw(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_after_draw = Some(Box::new(hook));
        self
    }

    /// Active options.
    pub fn options(&self) -> &PreviewOptions {
        &self.opts
    }

    /// The previewed source.
    pub fn source_mut(&mut self) -> &mut dyn VideoSource {
        self.source.as_mut()
    }

    /// Draw the source's next frame.
    ///
    /// At the end of the source, a looping preview rewinds (the first frame is drawn on the next
    /// tick); otherwise [`TickOutcome::Ended`] is returned and nothing is drawn.
    pub fn tick(&mut self) -> HoloResult<TickOutcome> {
        let frame = match self.source.next_frame()? {
            Some(frame) => frame,
            None => {
                if !self.opts.loop_playback {
                    return Ok(TickOutcome::Ended);
                }
                self.source.rewind()?;
                return Ok(TickOutcome::Continue);
            }
        };

        let shown: &Raster = if self.opts.composite {
            let dims = (frame.width, frame.height);
            let layout = match self.layout {
                Some((cached, layout)) if cached == dims => layout,
                _ => {
                    let layout = PanelLayout::for_source(frame.width, frame.height)?;
                    self.layout = Some((dims, layout));
                    layout
                }
            };
            composite_into(frame, &layout, &mut self.buffer)?;
            &self.buffer
        } else {
            frame
        };

        if let Some(hook) = self.on_frame.as_mut() {
            hook(shown);
        }
        fit_preview_into(
            shown,
            self.opts.max_width,
            self.opts.cross_guides,
            &mut self.display,
        )?;
        self.surface.present(&self.display)?;
        if let Some(hook) = self.on_after_draw.as_mut() {
            hook();
        }
        Ok(TickOutcome::Continue)
    }
}

/// Handle to a preview running on its own thread.
///
/// Stopping is idempotent and also happens on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    stop: CancelToken,
    worker: Option<JoinHandle<HoloResult<()>>>,
}

impl PreviewHandle {
    /// Halt scheduling and pause the source. Safe to call any number of times.
    pub fn stop(&mut self) {
        self.stop.cancel();
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "preview stopped with an error"),
                Err(_) => tracing::warn!("preview worker panicked"),
            }
        }
    }

    /// Whether the loop is still scheduling frames.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Block until the loop ends by itself (non-looping sources) and return its outcome.
    pub fn wait(mut self) -> HoloResult<()> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| HoloError::Other(anyhow::anyhow!("preview worker panicked")))?,
            None => Ok(()),
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drive `preview` on a worker thread at most `max_rate_hz` times per second.
pub fn start_preview(mut preview: LivePreview) -> HoloResult<PreviewHandle> {
    let stop = CancelToken::new();
    let worker_stop = stop.clone();
    let rate = preview.opts.max_rate_hz;
    let worker = std::thread::Builder::new()
        .name("holoprism-preview".to_owned())
        .spawn(move || {
            let mut pacer = Pacer::new(rate);
            preview.source.play();
            let result = loop {
                if pacer.wait(&worker_stop).is_err() {
                    break Ok(());
                }
                match preview.tick() {
                    Ok(TickOutcome::Continue) => {}
                    Ok(TickOutcome::Ended) => break Ok(()),
                    Err(e) => break Err(e),
                }
            };
            preview.source.pause();
            tracing::debug!(ok = result.is_ok(), "preview loop exited");
            result
        })
        .map_err(|e| HoloError::Other(anyhow::anyhow!("spawn preview worker: {e}")))?;
    Ok(PreviewHandle {
        stop,
        worker: Some(worker),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/preview/live.rs"]
mod tests;
