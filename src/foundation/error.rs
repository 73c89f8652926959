/// Convenience result type used across the ingestion pipeline.
pub type IngestResult<T> = Result<T, IngestError>;

/// Error taxonomy for decoding, validation and scheduling.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    /// An image was decoded without any channels.
    #[error("images must have at least one channel")]
    EmptyImage,

    /// A channel's size disagrees with the image's data window.
    #[error(
        "all channels must have the same size as the data window ({channel}:{}x{} != {}x{})",
        .actual.x,
        .actual.y,
        .expected.x,
        .expected.y
    )]
    SizeMismatch {
        /// Offending channel name.
        channel: String,
        /// Size of the offending channel.
        actual: crate::Vec2i,
        /// Size of the data window.
        expected: crate::Vec2i,
    },

    /// A data or display window has non-positive extent.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// The channel selector rejected every channel of the image.
    #[error("no channels match '{0}'")]
    NoMatchingChannels(String),

    /// Alpha was multiplied into channels that are already premultiplied.
    #[error("can't multiply with alpha twice")]
    DoubleMultiply,

    /// Alpha was divided out of channels that are not premultiplied.
    #[error("can't divide by alpha twice")]
    DoubleDivide,

    /// The file's contents could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Reading from the underlying stream failed.
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// A channel selector could not be compiled.
    #[error("selector error: {0}")]
    Selector(String),

    /// Invalid configuration values.
    #[error("config error: {0}")]
    Config(String),

    /// The producer of a task result went away without producing one.
    #[error("task was abandoned before producing a result")]
    TaskAbandoned,

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IngestError {
    /// Build a [`IngestError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`IngestError::InvalidWindow`] value.
    pub fn invalid_window(msg: impl Into<String>) -> Self {
        Self::InvalidWindow(msg.into())
    }

    /// Build a [`IngestError::Selector`] value.
    pub fn selector(msg: impl Into<String>) -> Self {
        Self::Selector(msg.into())
    }

    /// Build a [`IngestError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
