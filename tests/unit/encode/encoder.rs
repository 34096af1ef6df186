use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::*;
use crate::encode::job::JobState;
use crate::media::source::FrameSequenceSource;
use crate::policy::resource::CapabilityClass;

#[derive(Default)]
struct MemoryCapture {
    opened: AtomicUsize,
    paced: bool,
    sizes: Mutex<Vec<(u32, u32)>>,
}

impl MemoryCapture {
    fn paced() -> Self {
        Self {
            paced: true,
            ..Self::default()
        }
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

struct MemoryRecorder {
    cfg: crate::encode::recorder::CaptureConfig,
    frames: usize,
    paced: bool,
}

impl CaptureBackend for MemoryCapture {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(
        &self,
        cfg: &crate::encode::recorder::CaptureConfig,
    ) -> HoloResult<Box<dyn VideoRecorder>> {
        cfg.validate()?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.sizes.lock().unwrap().push((cfg.width, cfg.height));
        Ok(Box::new(MemoryRecorder {
            cfg: *cfg,
            frames: 0,
            paced: self.paced,
        }))
    }
}

impl VideoRecorder for MemoryRecorder {
    fn container(&self) -> Container {
        Container::WebM
    }

    fn push_frame(&mut self, frame: &Raster) -> HoloResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(HoloError::validation("frame size mismatch"));
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> HoloResult<EncodedMedia> {
        Ok(EncodedMedia {
            bytes: vec![self.frames as u8],
            container: Container::WebM,
        })
    }

    fn abort(self: Box<Self>) {}

    fn paced(&self) -> bool {
        self.paced
    }
}

struct RefusingCapture(fn() -> HoloError);

impl CaptureBackend for RefusingCapture {
    fn name(&self) -> &str {
        "refusing"
    }

    fn open(
        &self,
        _cfg: &crate::encode::recorder::CaptureConfig,
    ) -> HoloResult<Box<dyn VideoRecorder>> {
        Err((self.0)())
    }
}

fn frames(n: u8, w: u32, h: u32) -> Vec<Raster> {
    (0..n)
        .map(|i| Raster::filled(w, h, [i.wrapping_mul(30), 0, 0, 255]))
        .collect()
}

#[test]
fn empty_input_fails_before_any_recorder_exists() {
    let capture = Arc::new(MemoryCapture::default());
    let encoder = Encoder::new(capture.clone());
    let cancel = CancelToken::new();

    let err = encoder
        .encode_to_video(&[], 24, |_| {}, &cancel)
        .unwrap_err();
    assert!(matches!(err, HoloError::NoFrames), "{err:?}");
    let err = encoder.encode_to_gif(&[], 24, |_| {}, &cancel).unwrap_err();
    assert!(matches!(err, HoloError::NoFrames), "{err:?}");
    assert!(matches!(
        encoder.spawn_gif(Vec::new(), 24, |_| {}),
        Err(HoloError::NoFrames)
    ));

    assert_eq!(capture.opened(), 0);
    assert_eq!(encoder.job().state, JobState::Idle);
}

#[test]
fn video_progress_is_monotonic_and_reaches_100() {
    let capture = Arc::new(MemoryCapture::default());
    let encoder = Encoder::new(capture.clone());
    let mut progress = Vec::new();

    let media = encoder
        .encode_to_video(&frames(5, 3, 3), 10, |p| progress.push(p), &CancelToken::new())
        .unwrap();

    assert_eq!(progress, vec![20, 40, 60, 80, 100]);
    assert_eq!(media.bytes, vec![5]);
    assert_eq!(media.container, Container::WebM);
    assert_eq!(capture.sizes.lock().unwrap().as_slice(), &[(4, 4)]);

    let job = encoder.job();
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.progress_percent, 100);
    assert_eq!(job.format, Some(ExportFormat::Video));
    assert_eq!(job.total_frames, 5);
}

#[test]
fn cancelling_from_progress_stops_further_callbacks() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::default()));
    let cancel = CancelToken::new();
    let mut progress = Vec::new();

    let err = encoder
        .encode_to_video(
            &frames(5, 2, 2),
            10,
            |p| {
                progress.push(p);
                if p >= 40 {
                    cancel.cancel();
                }
            },
            &cancel,
        )
        .unwrap_err();

    assert!(matches!(err, HoloError::Cancelled), "{err:?}");
    assert_eq!(progress, vec![20, 40]);
    assert_eq!(encoder.job().state, JobState::Cancelled);
}

#[test]
fn a_second_job_is_rejected_while_one_runs() {
    let capture = Arc::new(MemoryCapture::paced());
    let encoder = Encoder::new(capture);

    let task = encoder.spawn_video(frames(8, 2, 2), 2, |_| {}).unwrap();
    assert_eq!(encoder.job().state, JobState::Running);

    let err = encoder
        .encode_to_video(&frames(1, 2, 2), 2, |_| {}, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, HoloError::EncoderBusy), "{err:?}");
    assert!(matches!(
        encoder.clone().spawn_gif(frames(1, 2, 2), 2, |_| {}),
        Err(HoloError::EncoderBusy)
    ));

    task.cancel();
    assert!(matches!(task.wait(), Err(HoloError::Cancelled)));
    assert_eq!(encoder.job().state, JobState::Cancelled);

    let media = encoder
        .encode_to_video(&frames(1, 2, 2), 30, |_| {}, &CancelToken::new())
        .unwrap();
    assert_eq!(media.bytes, vec![1]);
}

#[test]
fn a_shared_cancel_token_stops_a_spawned_export() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::paced()));
    let task = encoder.spawn_video(frames(8, 2, 2), 2, |_| {}).unwrap();

    let token = task.cancel_token().clone();
    assert!(!token.is_cancelled());
    std::thread::spawn(move || token.cancel()).join().unwrap();

    assert!(task.cancel_token().is_cancelled());
    assert!(matches!(task.wait(), Err(HoloError::Cancelled)));
    assert_eq!(encoder.job().state, JobState::Cancelled);
}

#[test]
fn spawned_export_reports_through_wait() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::default()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let task = encoder
        .spawn_video(frames(4, 2, 2), 12, move |p| sink.lock().unwrap().push(p))
        .unwrap();
    let media = task.wait().unwrap();
    assert_eq!(media.bytes, vec![4]);
    assert_eq!(*seen.lock().unwrap(), vec![25, 50, 75, 100]);
}

#[test]
fn codec_failures_are_not_downgraded() {
    let encoder = Encoder::new(Arc::new(RefusingCapture(|| {
        HoloError::unsupported("no codec")
    })));
    let err = encoder
        .encode_to_video(&frames(2, 2, 2), 10, |_| {}, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, HoloError::EncoderUnsupported(_)), "{err:?}");
    assert_eq!(encoder.job().state, JobState::Failed);
}

#[cfg(feature = "gif")]
#[test]
fn gif_export_reports_progress() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::default())).with_gif_loop(false);
    let mut progress = Vec::new();
    let media = encoder
        .encode_to_gif(&frames(4, 4, 4), 8, |p| progress.push(p), &CancelToken::new())
        .unwrap();
    assert_eq!(media.container, Container::Gif);
    assert!(media.bytes.starts_with(b"GIF89a"));
    assert_eq!(progress, vec![25, 50, 75, 100]);
    assert_eq!(encoder.job().format, Some(ExportFormat::Gif));
}

#[cfg(not(feature = "gif"))]
#[test]
fn gif_export_is_unavailable_without_feature() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::default()));
    let err = encoder
        .encode_to_gif(&frames(1, 2, 2), 8, |_| {}, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, HoloError::EncoderUnavailable(_)));
}

#[test]
fn source_video_is_composited_and_recorded() {
    let capture = Arc::new(MemoryCapture::default());
    let encoder = Encoder::new(capture.clone());
    let mut source = FrameSequenceSource::new(frames(6, 8, 6), 10.0).unwrap();
    let mut progress = Vec::new();

    let out = encoder
        .process_source_video_to_hologram(
            &mut source,
            &HologramVideoOptions::default(),
            |p| progress.push(p),
            &CancelToken::new(),
        )
        .unwrap();

    let HologramVideo::Video(media) = out else {
        panic!("expected a recording");
    };
    assert_eq!(media.bytes, vec![6]);
    assert_eq!(*progress.last().unwrap(), 100);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    let canvas = PanelLayout::for_source(8, 6).unwrap().canvas_size();
    let even = canvas + canvas % 2;
    assert_eq!(capture.sizes.lock().unwrap().as_slice(), &[(even, even)]);
    assert!(!source.is_playing());
}

#[test]
fn constrained_budget_drops_frames_to_the_rate_cap() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::default()));
    let mut source = FrameSequenceSource::new(frames(6, 4, 4), 32.0).unwrap();
    let opts = HologramVideoOptions {
        fps: None,
        budget: budget_for(CapabilityClass::Constrained),
    };
    let out = encoder
        .process_source_video_to_hologram(&mut source, &opts, |_| {}, &CancelToken::new())
        .unwrap();
    let HologramVideo::Video(media) = out else {
        panic!("expected a recording");
    };
    assert_eq!(media.bytes, vec![3]);
    assert_eq!(encoder.job().fps, 16);
}

#[test]
fn unsupported_capture_falls_back_to_a_still() {
    for refusal in [
        (|| HoloError::unsupported("no codec")) as fn() -> HoloError,
        || HoloError::capture_denied("no"),
    ] {
        let encoder = Encoder::new(Arc::new(RefusingCapture(refusal)));
        let mut source = FrameSequenceSource::new(frames(3, 8, 8), 10.0).unwrap();

        let out = encoder
            .process_source_video_to_hologram(
                &mut source,
                &HologramVideoOptions::default(),
                |_| {},
                &CancelToken::new(),
            )
            .unwrap();
        assert!(out.is_fallback());
        let HologramVideo::StillFallback { frame, png, reason } = out else {
            unreachable!();
        };

        let layout = PanelLayout::for_source(8, 8).unwrap();
        let expected = composite(&frames(3, 8, 8)[1], &layout).unwrap();
        assert_eq!(frame, expected);
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(matches!(
            reason,
            HoloError::EncoderUnsupported(_) | HoloError::CaptureDenied(_)
        ));
        assert_eq!(encoder.job().state, JobState::Done);
    }
}

#[test]
fn short_sources_fall_back_to_their_first_frame() {
    let encoder = Encoder::new(Arc::new(RefusingCapture(|| {
        HoloError::unavailable("none")
    })));
    let mut source = FrameSequenceSource::new(frames(1, 4, 4), 5.0).unwrap();
    let out = encoder
        .process_source_video_to_hologram(
            &mut source,
            &HologramVideoOptions::default(),
            |_| {},
            &CancelToken::new(),
        )
        .unwrap();
    assert!(out.is_fallback());
}

#[test]
fn other_capture_errors_propagate() {
    let encoder = Encoder::new(Arc::new(RefusingCapture(|| HoloError::encode("boom"))));
    let mut source = FrameSequenceSource::new(frames(2, 4, 4), 10.0).unwrap();
    let err = encoder
        .process_source_video_to_hologram(
            &mut source,
            &HologramVideoOptions::default(),
            |_| {},
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, HoloError::Encode(_)), "{err:?}");
    assert_eq!(encoder.job().state, JobState::Failed);
}

#[test]
fn empty_sources_are_decode_errors() {
    let encoder = Encoder::new(Arc::new(MemoryCapture::default()));
    let mut source = FrameSequenceSource::new(Vec::new(), 10.0).unwrap();
    let err = encoder
        .process_source_video_to_hologram(
            &mut source,
            &HologramVideoOptions::default(),
            |_| {},
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, HoloError::Decode(_)), "{err:?}");
}

fn small_budget() -> HologramVideoOptions {
    HologramVideoOptions {
        fps: None,
        budget: crate::policy::resource::ResourceBudget {
            max_raster_dimension: 8,
            max_frames: 160,
            max_fps: None,
        },
    }
}

#[test]
fn oversized_source_frames_are_shrunk_before_recording() {
    let capture = Arc::new(MemoryCapture::default());
    let encoder = Encoder::new(capture.clone());
    let mut source = FrameSequenceSource::new(frames(3, 16, 16), 10.0).unwrap();
    let out = encoder
        .process_source_video_to_hologram(&mut source, &small_budget(), |_| {}, &CancelToken::new())
        .unwrap();
    let HologramVideo::Video(media) = out else {
        panic!("expected a recording");
    };
    assert_eq!(media.bytes, vec![3]);

    let canvas = PanelLayout::for_source(8, 8).unwrap().canvas_size();
    let even = canvas + canvas % 2;
    assert_eq!(capture.sizes.lock().unwrap().as_slice(), &[(even, even)]);
}

#[test]
fn oversized_fallback_frame_matches_the_shrunk_composite() {
    let encoder = Encoder::new(Arc::new(RefusingCapture(|| {
        HoloError::unsupported("no codec")
    })));
    let mut source = FrameSequenceSource::new(frames(3, 16, 16), 10.0).unwrap();
    let out = encoder
        .process_source_video_to_hologram(&mut source, &small_budget(), |_| {}, &CancelToken::new())
        .unwrap();
    let HologramVideo::StillFallback { frame, .. } = out else {
        panic!("expected a still");
    };
    let shrunk = frames(3, 16, 16)[1].fit_within(8).unwrap();
    let layout = PanelLayout::for_source(8, 8).unwrap();
    assert_eq!(frame, composite(&shrunk, &layout).unwrap());
}
