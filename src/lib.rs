//! Holoprism renders images and videos as four-panel "pyramid hologram" frames.
//!
//! A source is drawn four times around a shared center, each copy rotated to face outward and
//! clipped to a trapezoid, so a reflective prism placed on the screen shows a floating image.
//!
//! - Compute a [`PanelLayout`] and [`composite`] a [`Raster`] into it
//! - Generate cross-fade animations with a [`FadeSequencer`] under a [`ResourceBudget`]
//! - Export frame sequences with an [`Encoder`] (video through `ffmpeg`, or GIF)
//! - Preview a playing [`VideoSource`] with [`LivePreview`] / [`start_preview`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
/// JSON configuration.
pub mod config;
pub(crate) mod encode;
pub(crate) mod geometry;
pub(crate) mod media;
pub(crate) mod policy;
pub(crate) mod preview;
pub(crate) mod render;

pub use crate::foundation::core::{Affine, BezPath, OPAQUE_BLACK, Point, Raster, Rect, Vec2};
pub use crate::foundation::error::{HoloError, HoloResult};

pub use crate::animation::fade::{AnimationSpec, Direction, FadePlan, FadeSequencer};
pub use crate::config::{CapabilityOverride, HologramConfig};
pub use crate::encode::encoder::{
    EncodeTask, Encoder, FALLBACK_FRAME_SECONDS, HologramVideo, HologramVideoOptions,
};
pub use crate::encode::ffmpeg::{FfmpegCapture, VideoCodec, is_ffmpeg_on_path, pick_codec};
pub use crate::encode::gif::gif_delay_ms;
pub use crate::encode::job::{
    CancelToken, Container, EncodedMedia, EncodingJob, ExportFormat, JobState,
};
pub use crate::encode::recorder::{CaptureBackend, CaptureConfig, VideoRecorder, even_dimensions};
pub use crate::geometry::layout::{
    CENTER_GAP_RATIO, ClipRegion, NARROW_EDGE_RATIO, OVERLAP_MARGIN, PanelClip, PanelLayout,
    PanelSide, Trapezoid, compute_layout, panel_center, trapezoid_path,
};
pub use crate::media::decode::{decode_image, decode_image_file, encode_png};
#[cfg(feature = "media-ffmpeg")]
pub use crate::media::ffmpeg::{FfmpegVideoSource, VideoInfo, probe_video};
pub use crate::media::source::{FrameSequenceSource, VideoSource};
pub use crate::policy::resource::{
    CONSTRAINED_MEMORY_GB, CapabilityClass, CapabilityProbe, CapabilitySnapshot, ResourceBudget,
    StaticProbe, SystemProbe, budget_for, classify, detect_capability_class,
};
pub use crate::preview::live::{
    LatestFrameSurface, LivePreview, PreviewHandle, PreviewOptions, PreviewSurface, TickOutcome,
    start_preview,
};
pub use crate::preview::still::{
    DEFAULT_PREVIEW_MAX_WIDTH, draw_cross_guides, preview_scale, render_still_preview,
};
pub use crate::render::compositor::{
    blend_layout, blend_sources, composite, composite_blend, composite_into, extract_faces,
};
pub use crate::render::draw::{DrawParams, PremulRgba8, centered_cover, draw_image, over};
