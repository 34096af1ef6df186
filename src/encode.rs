pub(crate) mod encoder;
pub(crate) mod ffmpeg;
pub(crate) mod gif;
pub(crate) mod job;
pub(crate) mod recorder;
