//! Writes rendered streams as RIFF WAVE.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::common::{assert_error_traits, ChannelCount, SampleRate};
use crate::error::Error;
use crate::format::{SampleFormat, StreamFormat};
use crate::stream::Stream;

/// Size of the canonical header written by [`WavWriter`].
pub const HEADER_SIZE: u64 = 44;

/// Size field value used until the real sizes are known.
const SIZE_PLACEHOLDER: u32 = u32::MAX;

#[derive(Debug, thiserror::Error, Clone)]
pub enum ToWavError {
    #[error("Opening file for writing")]
    OpenFile(#[source] Arc<io::Error>),
    #[error("Failed to render the stream")]
    Rendering(#[source] Error),
    #[error("Failed to write samples")]
    Writing(#[source] Arc<io::Error>),
    #[error("Failed to update the wav header")]
    Finishing(#[source] Arc<io::Error>),
}
assert_error_traits!(ToWavError);

/// Writes a 44-byte WAVE header followed by raw little-endian frames.
///
/// The header's size fields start out as `0xFFFFFFFF`, which readers take as
/// "until end of file". [`finish_seekable`](WavWriter::finish_seekable)
/// replaces them with the real sizes when the writer can seek back.
#[derive(Debug)]
pub struct WavWriter<W: Write> {
    writer: W,
    data_bytes: u64,
}

impl<W: Write> WavWriter<W> {
    /// Writes the header for frames of `channels` samples in `format`.
    pub fn new(
        mut writer: W,
        channels: ChannelCount,
        sample_rate: SampleRate,
        format: SampleFormat,
    ) -> io::Result<Self> {
        let block_align = channels as u64 * format.bytes_per_sample() as u64;
        // clamped where the header fields cannot hold the real values
        let byte_rate = u32::try_from(sample_rate as u64 * block_align).unwrap_or(u32::MAX);
        let block_align = u16::try_from(block_align).unwrap_or(u16::MAX);
        writer.write_all(b"RIFF")?;
        writer.write_u32::<LittleEndian>(SIZE_PLACEHOLDER)?;
        writer.write_all(b"WAVEfmt ")?;
        writer.write_u32::<LittleEndian>(16)?;
        writer.write_u16::<LittleEndian>(if format.is_float() { 3 } else { 1 })?;
        writer.write_u16::<LittleEndian>(channels)?;
        writer.write_u32::<LittleEndian>(sample_rate)?;
        writer.write_u32::<LittleEndian>(byte_rate)?;
        writer.write_u16::<LittleEndian>(block_align)?;
        writer.write_u16::<LittleEndian>(format.bits_per_sample())?;
        writer.write_all(b"data")?;
        writer.write_u32::<LittleEndian>(SIZE_PLACEHOLDER)?;
        Ok(Self {
            writer,
            data_bytes: 0,
        })
    }

    /// Writes the header matching a stream's rendered output.
    pub fn for_stream(writer: W, format: &StreamFormat) -> io::Result<Self> {
        Self::new(
            writer,
            format.channels,
            format.sample_rate,
            format.sample_format,
        )
    }

    /// Appends encoded frames, as returned by [`Stream::render`].
    pub fn write_frames(&mut self, frames: &[u8]) -> io::Result<()> {
        self.writer.write_all(frames)?;
        self.data_bytes += frames.len() as u64;
        Ok(())
    }

    /// Bytes of frame data written so far.
    #[inline]
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    fn pad(&mut self) -> io::Result<()> {
        if self.data_bytes % 2 == 1 {
            self.writer.write_all(&[0])?;
        }
        Ok(())
    }

    /// Flushes and returns the writer, leaving the size placeholders in place.
    pub fn finish(mut self) -> io::Result<W> {
        self.pad()?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    /// Patches the real RIFF and data sizes into the header, then flushes.
    pub fn finish_seekable(mut self) -> io::Result<W> {
        self.pad()?;
        let data = u32::try_from(self.data_bytes).unwrap_or(SIZE_PLACEHOLDER);
        let riff = u32::try_from(self.data_bytes + (self.data_bytes & 1) + HEADER_SIZE - 8)
            .unwrap_or(SIZE_PLACEHOLDER);
        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(4))?;
        self.writer.write_u32::<LittleEndian>(riff)?;
        self.writer.seek(SeekFrom::Start(40))?;
        self.writer.write_u32::<LittleEndian>(data)?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn render_into<W: Write>(stream: &mut Stream, writer: &mut WavWriter<W>) -> Result<(), ToWavError> {
    if stream.format().play_forever {
        return Err(ToWavError::Rendering(Error::InvalidArgument(
            "a stream that plays forever cannot be written to a file".to_owned(),
        )));
    }
    while !stream.done() {
        let frames = stream.render().map_err(ToWavError::Rendering)?;
        if frames.is_empty() {
            break;
        }
        writer
            .write_frames(frames)
            .map_err(Arc::new)
            .map_err(ToWavError::Writing)?;
    }
    Ok(())
}

/// Renders what is left of `stream` into `writer` as a complete WAVE file.
///
/// The output uses the stream's channel count and sample format.
///
/// # Example
/// ```no_run
/// use vgmdec::{wav_to_writer, Config, Stream};
///
/// let mut stream = Stream::open_path("bgm.adx", 0, &Config::default())?;
/// let mut writer = std::io::Cursor::new(Vec::new());
/// wav_to_writer(&mut stream, &mut writer)?;
/// let wav_bytes: Vec<u8> = writer.into_inner();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn wav_to_writer(
    stream: &mut Stream,
    writer: &mut (impl Write + Seek),
) -> Result<(), ToWavError> {
    let writer = BufWriter::new(writer);
    let mut wav = WavWriter::for_stream(writer, stream.format())
        .map_err(Arc::new)
        .map_err(ToWavError::Writing)?;
    render_into(stream, &mut wav)?;
    let writer = wav
        .finish_seekable()
        .map_err(Arc::new)
        .map_err(ToWavError::Finishing)?;
    writer
        .into_inner()
        .map_err(|e| ToWavError::Finishing(Arc::new(e.into_error())))?;
    Ok(())
}

/// Renders what is left of `stream` into a WAVE file at `path`.
///
/// If the file already exists it will be overwritten.
pub fn wav_to_file(stream: &mut Stream, path: impl AsRef<Path>) -> Result<(), ToWavError> {
    let mut file = File::create(path)
        .map_err(Arc::new)
        .map_err(ToWavError::OpenFile)?;
    wav_to_writer(stream, &mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn streaming_header_keeps_placeholders() {
        let mut wav = WavWriter::new(Vec::new(), 2, 44_100, SampleFormat::Pcm16).unwrap();
        wav.write_frames(&[1, 2, 3, 4]).unwrap();
        let bytes = wav.finish().unwrap();
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], &[0xff; 4]);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(&bytes[40..44], &[0xff; 4]);
        assert_eq!(&bytes[44..], &[1, 2, 3, 4]);
    }

    #[test]
    fn seekable_header_gets_sizes() {
        let mut wav =
            WavWriter::new(Cursor::new(Vec::new()), 1, 8000, SampleFormat::Float).unwrap();
        wav.write_frames(&[0; 8]).unwrap();
        let bytes = wav.finish_seekable().unwrap().into_inner();
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 44);
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 3);
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 8);
    }

    #[test]
    fn oversized_rates_are_clamped() {
        let bytes = WavWriter::new(Vec::new(), 8, 0x2000_0000, SampleFormat::Pcm16)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 0x2000_0000);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), u32::MAX);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 16);

        let bytes = WavWriter::new(Vec::new(), u16::MAX, 8000, SampleFormat::Float)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), u16::MAX);
    }

    #[test]
    fn odd_data_is_padded() {
        let mut wav =
            WavWriter::new(Cursor::new(Vec::new()), 1, 8000, SampleFormat::Pcm24).unwrap();
        wav.write_frames(&[0; 3]).unwrap();
        let bytes = wav.finish_seekable().unwrap().into_inner();
        assert_eq!(bytes.len(), 48);
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 40);
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 3);
    }
}
