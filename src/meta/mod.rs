//! Container recognizers.
//!
//! Each recognizer offers a cheap `sniff` that checks magic bytes, and a
//! `parse` that validates the header of the selected subsong and sets up its
//! codec. A recognizer only ever reads through the [`ByteSource`] it is given.
//!
//! [`ByteSource`]: crate::io::ByteSource

use crate::codec::Codec;
use crate::config::PlaybackHints;
use crate::error::{Error, Result};
use crate::format::StreamInfo;

#[cfg(feature = "adx")]
pub(crate) mod adx;
#[cfg(feature = "adx")]
pub(crate) mod afs;
#[cfg(feature = "wav")]
pub(crate) mod riff;

/// Outcome of a successful parse.
#[derive(Debug)]
pub(crate) struct Probed {
    pub info: StreamInfo,
    pub codec: Codec,
    /// Playback preferences embedded in the header.
    pub hints: PlaybackHints,
    /// Byte range (offset, length) of the source the codec reads from, when
    /// the stream lives inside an archive. Codec offsets are relative to it.
    pub window: Option<(u64, u64)>,
}

/// Resolves a requested subsong, where 0 selects the first one, to a 1-based index.
pub(crate) fn select_subsong(requested: u32, count: u32) -> Result<u32> {
    match requested {
        0 if count > 0 => Ok(1),
        n if n >= 1 && n <= count => Ok(n),
        n => Err(Error::SubsongOutOfRange {
            requested: n,
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsong_selection() {
        assert_eq!(select_subsong(0, 1).unwrap(), 1);
        assert_eq!(select_subsong(3, 3).unwrap(), 3);
        assert!(matches!(
            select_subsong(4, 3),
            Err(Error::SubsongOutOfRange {
                requested: 4,
                count: 3
            })
        ));
    }
}
