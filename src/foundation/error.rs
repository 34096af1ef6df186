/// Convenience result type used across holoprism.
pub type HoloResult<T> = Result<T, HoloError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Every failure kind is distinct so that a UI layer can pick an actionable message
/// (see [`HoloError::hint`]).
#[derive(thiserror::Error, Debug)]
pub enum HoloError {
    /// A source image or video could not be decoded. Fatal, no partial output.
    #[error("decode error: {0}")]
    Decode(String),

    /// An encoder was handed an empty frame sequence.
    #[error("no frames to export")]
    NoFrames,

    /// No capture surface or streaming codec is available for video recording.
    #[error("video encoder unsupported: {0}")]
    EncoderUnsupported(String),

    /// The required encoder library is not part of this build.
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// An external capture device refused access.
    #[error("capture denied: {0}")]
    CaptureDenied(String),

    /// Another encoding job is already running on this encoder.
    #[error("an encoding job is already running")]
    EncoderBusy,

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid user-provided data or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// The external codec process failed while encoding.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HoloError {
    /// Build a [`HoloError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`HoloError::EncoderUnsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::EncoderUnsupported(msg.into())
    }

    /// Build a [`HoloError::EncoderUnavailable`] value.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable(msg.into())
    }

    /// Build a [`HoloError::CaptureDenied`] value.
    pub fn capture_denied(msg: impl Into<String>) -> Self {
        Self::CaptureDenied(msg.into())
    }

    /// Build a [`HoloError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`HoloError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Short, user-facing suggestion for this failure kind.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Decode(_) => "the file could not be read; try a different image or video",
            Self::NoFrames => "nothing to export; generate frames first",
            Self::EncoderUnsupported(_) => "video export is not supported here; try GIF export",
            Self::EncoderUnavailable(_) => "this export format is unavailable; try video export",
            Self::CaptureDenied(_) => "allow camera access or upload a file instead",
            Self::EncoderBusy => "wait for the current export to finish",
            Self::Cancelled => "export cancelled",
            Self::Validation(_) => "check the export settings",
            Self::Encode(_) | Self::Other(_) => "export failed; try again or pick another format",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
