pub(crate) mod decode;
#[cfg(feature = "media-ffmpeg")]
pub(crate) mod ffmpeg;
pub(crate) mod source;
