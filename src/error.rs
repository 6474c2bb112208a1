//! Errors reported by the engine.

use std::sync::Arc;

use crate::common::assert_error_traits;

/// Everything that can go wrong while probing, opening or rendering a stream.
#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
    /// No registered recognizer claims the data.
    #[error("Unsupported format: no recognizer matched '{name}'")]
    UnsupportedFormat {
        /// Name of the byte source that was probed.
        name: String,
    },

    /// The requested subsong does not exist in the container.
    #[error("Subsong {requested} is out of range, the stream has {count} subsong(s)")]
    SubsongOutOfRange {
        /// Subsong the caller asked for (1-based).
        requested: u32,
        /// Number of subsongs in the container.
        count: u32,
    },

    /// A recognizer claimed the data but its header failed validation.
    #[error("Corrupt {format} header: {reason}")]
    CorruptHeader {
        /// The format whose recognizer matched.
        format: &'static str,
        /// What failed to validate.
        reason: String,
    },

    /// A block of the payload could not be decoded.
    ///
    /// The block has been replaced with silence and decoding goes on, so these
    /// only reach the decode error hook, never the caller. A payload that
    /// cannot be read at all fails the render call with [`Error::Io`].
    #[error("Decode error at frame {frame}: {reason}")]
    DecodeError {
        /// First stream frame of the affected block.
        frame: u64,
        /// What went wrong.
        reason: String,
    },

    /// The byte source failed to deliver the requested bytes.
    #[error("I/O error reading '{name}' at offset {offset:#x}")]
    Io {
        /// Name of the byte source.
        name: String,
        /// Offset of the failed read.
        offset: u64,
        /// The underlying error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A caller supplied parameter or buffer is unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The stream's decoding resources are gone, usually because it was closed.
    #[error("Stream resources are not loaded")]
    NotLoaded,
}
assert_error_traits! {Error}

impl Error {
    pub(crate) fn corrupt(format: &'static str, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            format,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(name: &str, offset: u64, source: std::io::Error) -> Self {
        Error::Io {
            name: name.to_owned(),
            offset,
            source: Arc::new(source),
        }
    }

    /// Returns true for payload errors the decoder has already recovered from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DecodeError { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
