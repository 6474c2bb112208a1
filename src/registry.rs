//! Format recognition.
//!
//! Recognizers are tried in a fixed order, [`FormatKind::ALL`]. When an
//! extension hint is available the recognizers claiming that extension go
//! first; otherwise, or when none of them matches, every recognizer sniffs
//! the magic bytes in turn. The first positive sniff decides the format for
//! good: if its header then fails to parse the probe fails, rather than
//! falling through to a later recognizer.

use std::io::ErrorKind;

use crate::error::{Error, Result};
use crate::io::ByteSource;
use crate::meta::{self, Probed};

mod extensions;
mod virtual_name;

pub use self::extensions::{common_extensions, extensions, is_valid_extension, ExtensionFilter};
pub(crate) use self::extensions::extension_of;
pub use self::virtual_name::{is_virtual_filename, VirtualName};

/// A container format this build can open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// CRI ADX stream.
    #[cfg(feature = "adx")]
    Adx,
    /// CRI AFS archive of ADX streams.
    #[cfg(feature = "adx")]
    Afs,
    /// RIFF WAVE file.
    #[cfg(feature = "wav")]
    Riff,
}

impl FormatKind {
    /// Every enabled format, in probe priority order.
    pub const ALL: &'static [FormatKind] = &[
        #[cfg(feature = "adx")]
        FormatKind::Adx,
        #[cfg(feature = "adx")]
        FormatKind::Afs,
        #[cfg(feature = "wav")]
        FormatKind::Riff,
    ];

    /// Short name of the format.
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "adx")]
            FormatKind::Adx => "CRI ADX",
            #[cfg(feature = "adx")]
            FormatKind::Afs => "CRI AFS",
            #[cfg(feature = "wav")]
            FormatKind::Riff => "RIFF WAVE",
        }
    }

    /// Lowercase file extensions the format is found under.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "adx")]
            FormatKind::Adx => &["adx"],
            #[cfg(feature = "adx")]
            FormatKind::Afs => &["afs"],
            #[cfg(feature = "wav")]
            FormatKind::Riff => &["wav", "lwav"],
        }
    }

    fn sniff(self, src: &mut dyn ByteSource) -> bool {
        match self {
            #[cfg(feature = "adx")]
            FormatKind::Adx => meta::adx::sniff(src),
            #[cfg(feature = "adx")]
            FormatKind::Afs => meta::afs::sniff(src),
            #[cfg(feature = "wav")]
            FormatKind::Riff => meta::riff::sniff(src),
        }
    }

    fn parse(self, src: &mut dyn ByteSource, subsong: u32) -> Result<Probed> {
        match self {
            #[cfg(feature = "adx")]
            FormatKind::Adx => meta::adx::parse(src, subsong),
            #[cfg(feature = "adx")]
            FormatKind::Afs => meta::afs::parse(src, subsong),
            #[cfg(feature = "wav")]
            FormatKind::Riff => meta::riff::parse(src, subsong),
        }
    }
}

/// Picks the recognizer for a byte source.
///
/// # Examples
///
/// ```
/// use vgmdec::{FormatKind, FormatRegistry, MemorySource};
///
/// let mut wav = b"RIFF\x24\0\0\0WAVE".to_vec();
/// wav.resize(44, 0);
/// let registry = FormatRegistry::default();
/// let kind = registry.identify(&mut MemorySource::new("x", wav), None);
/// # #[cfg(feature = "wav")]
/// assert_eq!(kind, Some(FormatKind::Riff));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatRegistry {
    formats: Vec<FormatKind>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self {
            formats: FormatKind::ALL.to_vec(),
        }
    }
}

impl FormatRegistry {
    /// A registry trying only `formats`, in the given order.
    pub fn with_formats(formats: impl IntoIterator<Item = FormatKind>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
        }
    }

    /// Formats in the order they are tried.
    pub fn formats(&self) -> &[FormatKind] {
        &self.formats
    }

    /// Returns the first format whose magic bytes match, hinted formats first.
    ///
    /// `hint` is an extension or a filename.
    pub fn identify(&self, src: &mut dyn ByteSource, hint: Option<&str>) -> Option<FormatKind> {
        let hint = hint
            .and_then(extension_of)
            .map(|ext| ext.to_ascii_lowercase());
        if let Some(ext) = &hint {
            let hinted = self
                .formats
                .iter()
                .copied()
                .filter(|kind| kind.extensions().contains(&ext.as_str()))
                .find(|kind| kind.sniff(src));
            if hinted.is_some() {
                return hinted;
            }
        }
        self.formats.iter().copied().find(|kind| kind.sniff(src))
    }

    /// Identifies the format and parses the header of `subsong` (0 for the default).
    pub(crate) fn probe(
        &self,
        src: &mut dyn ByteSource,
        hint: Option<&str>,
        subsong: u32,
    ) -> Result<(FormatKind, Probed)> {
        let Some(kind) = self.identify(src, hint) else {
            return Err(Error::UnsupportedFormat {
                name: src.name().to_owned(),
            });
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(format = kind.name(), subsong, "probing '{}'", src.name());

        match kind.parse(src, subsong) {
            Ok(probed) => Ok((kind, probed)),
            // a header running past the end of the data is a header problem
            Err(Error::Io { source, .. }) if source.kind() == ErrorKind::UnexpectedEof => {
                Err(Error::corrupt(kind.name(), "header is truncated"))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    #[test]
    fn unknown_data_is_unsupported() {
        let mut src = MemorySource::new("noise.bin", vec![0x55; 64]);
        let err = FormatRegistry::default()
            .probe(&mut src, None, 0)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { name } if name == "noise.bin"));
    }

    #[cfg(feature = "wav")]
    #[test]
    fn sniff_match_with_bad_header_is_corrupt() {
        let mut src = MemorySource::new("x.wav", b"RIFF\x04\0\0\0WAVE".to_vec());
        assert!(matches!(
            FormatRegistry::default().probe(&mut src, Some("wav"), 0),
            Err(Error::CorruptHeader { .. })
        ));
    }

    #[test]
    fn priority_follows_declaration() {
        assert_eq!(FormatRegistry::default().formats(), FormatKind::ALL);
        let empty = FormatRegistry::with_formats([]);
        let mut src = MemorySource::new("x", b"RIFF\0\0\0\0WAVE".to_vec());
        assert_eq!(empty.identify(&mut src, None), None);
    }
}
