//! An open stream and its render pipeline.
//!
//! Each render call walks the play position forward in runs that are
//! contiguous in the source. For every run the decoder is moved to the
//! right stream frame if needed, frames are decoded, mapped to the output
//! channels, faded, and finally encoded to the output sample format.

use std::fmt;
use std::path::Path;

use crate::codec::CodecDecoder;
use crate::common::Sample;
use crate::config::Config;
use crate::conversions::{encode_samples, ChannelMapper};
use crate::error::{Error, Result};
use crate::format::StreamFormat;
use crate::io::ByteSource;
use crate::loop_fade::{LoopFadeProcessor, LoopState};

mod builder;

pub use self::builder::{StreamBuilder, DEFAULT_BUFFER_FRAMES};
use self::builder::DecodeErrorCallback;

/// Resources held while the stream is open.
struct Loaded {
    source: Box<dyn ByteSource + Send>,
    decoder: CodecDecoder,
    /// Decoder state on first reaching the loop start by linear decoding.
    loop_start_snapshot: Option<CodecDecoder>,
    mapper: ChannelMapper,
    buffer_frames: usize,
    /// Frames as decoded, in the source's channel layout.
    decoded: Vec<Sample>,
    /// Frames mapped to the output channels with the fade applied.
    samples: Vec<Sample>,
    bytes: Vec<u8>,
}

impl Loaded {
    /// Moves the decoder to `target` unless it is already there.
    fn position_decoder(
        &mut self,
        target: u64,
        loop_start: Option<u64>,
        on_error: &mut dyn FnMut(Error),
    ) -> Result<()> {
        if self.decoder.position() != target {
            let at_loop_start = loop_start == Some(target);
            let snapshot = match &self.loop_start_snapshot {
                Some(snapshot) if at_loop_start => Some(snapshot.clone()),
                _ => None,
            };
            if let Some(snapshot) = snapshot {
                self.decoder = snapshot;
            } else if at_loop_start && self.decoder.codec().carries_history() {
                // decode the intro so the loop starts with the same history
                // as in a linear decode
                self.decoder.reset();
                self.skip(target, on_error)?;
            } else {
                self.decoder.seek(&mut *self.source, target, on_error)?;
            }
        }
        if self.loop_start_snapshot.is_none()
            && self.decoder.is_linear()
            && loop_start == Some(self.decoder.position())
        {
            self.loop_start_snapshot = Some(self.decoder.clone());
        }
        Ok(())
    }

    fn skip(&mut self, frames: u64, on_error: &mut dyn FnMut(Error)) -> Result<()> {
        let mut remaining = frames;
        while remaining > 0 {
            self.decoded.clear();
            let max = remaining.min(self.buffer_frames as u64) as usize;
            let read = self
                .decoder
                .read_frames(&mut *self.source, max, &mut self.decoded, on_error)?;
            if read == 0 {
                break;
            }
            remaining -= read as u64;
        }
        Ok(())
    }
}

/// An open stream: the decoding state of one subsong plus its playback position.
///
/// A stream is driven by a single caller. It can be moved to another thread
/// but not shared between threads.
///
/// # Examples
///
/// ```no_run
/// use vgmdec::{Config, Stream};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut stream = Stream::open_path("voice.afs", 2, &Config::default())?;
///     println!("{}", stream.describe());
///
///     let mut pcm = Vec::new();
///     while !stream.done() {
///         pcm.extend_from_slice(stream.render()?);
///     }
///     Ok(())
/// }
/// ```
pub struct Stream {
    /// `None` once closed.
    loaded: Option<Loaded>,
    processor: LoopFadeProcessor,
    format: StreamFormat,
    on_decode_error: DecodeErrorCallback,
    recovered_errors: u64,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("format", &self.format)
            .field("position", &self.processor.position())
            .field("closed", &self.loaded.is_none())
            .field("recovered_errors", &self.recovered_errors)
            .finish_non_exhaustive()
    }
}

impl Stream {
    /// Builder for opening a stream with custom settings.
    pub fn builder() -> StreamBuilder {
        StreamBuilder::new()
    }

    /// Opens subsong `subsong` (0 for the default) of `source`.
    pub fn open(
        source: impl ByteSource + Send + 'static,
        subsong: u32,
        config: &Config,
    ) -> Result<Stream> {
        StreamBuilder::new()
            .with_source(source)
            .with_subsong(subsong)
            .with_config(config.clone())
            .build()
    }

    /// Opens subsong `subsong` of the file at `path`.
    ///
    /// `path` may be a virtual filename, in which case its options apply and
    /// its subsong is used when `subsong` is 0.
    pub fn open_path(path: impl AsRef<Path>, subsong: u32, config: &Config) -> Result<Stream> {
        StreamBuilder::new()
            .with_path(path.as_ref())
            .with_subsong(subsong)
            .with_config(config.clone())
            .build()
    }

    /// Description of the stream.
    #[inline]
    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    /// Human readable multi-line summary of the stream.
    pub fn describe(&self) -> String {
        self.format.describe()
    }

    /// Current play position in frames.
    #[inline]
    pub fn position(&self) -> u64 {
        self.processor.position()
    }

    /// Whether every frame of playback has been rendered.
    #[inline]
    pub fn done(&self) -> bool {
        self.processor.done()
    }

    /// Loop and fade bookkeeping at the current position.
    pub fn loop_state(&self) -> LoopState {
        self.processor.state()
    }

    /// Number of payload errors recovered from so far.
    #[inline]
    pub fn recovered_errors(&self) -> u64 {
        self.recovered_errors
    }

    /// Renders the next batch of frames in the output sample format.
    ///
    /// Returns an empty slice once the stream is done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotLoaded`] after [`close`](Self::close), and
    /// [`Error::Io`] when the payload cannot be read.
    pub fn render(&mut self) -> Result<&[u8]> {
        let frames = self.loaded.as_ref().ok_or(Error::NotLoaded)?.buffer_frames;
        self.render_frames(frames)?;
        self.encode()
    }

    /// Renders the next batch of frames as normalized samples, before encoding.
    pub fn render_samples(&mut self) -> Result<&[Sample]> {
        let frames = self.loaded.as_ref().ok_or(Error::NotLoaded)?.buffer_frames;
        self.render_frames(frames)?;
        let loaded = self.loaded.as_ref().ok_or(Error::NotLoaded)?;
        Ok(&loaded.samples)
    }

    /// Renders as many whole frames as fit into `buf`.
    ///
    /// Returns the number of bytes written, 0 once the stream is done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `buf` cannot hold a single frame.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.loaded.is_none() {
            return Err(Error::NotLoaded);
        }
        let frames = buf.len() / self.format.frame_size;
        if frames == 0 {
            return Err(Error::InvalidArgument(format!(
                "buffer of {} bytes holds no {}-byte frame",
                buf.len(),
                self.format.frame_size
            )));
        }
        self.render_frames(frames)?;
        let bytes = self.encode()?;
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Moves to play position `frame`, clamped to the end of playback.
    ///
    /// The decoder catches up on the next render.
    pub fn seek(&mut self, frame: u64) -> Result<u64> {
        if self.loaded.is_none() {
            return Err(Error::NotLoaded);
        }
        Ok(self.processor.seek(frame))
    }

    /// Returns to the start of playback with fresh decoder state.
    pub fn reset(&mut self) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(Error::NotLoaded)?;
        loaded.decoder.reset();
        loaded.loop_start_snapshot = None;
        self.processor.reset();
        Ok(())
    }

    /// Releases the source and every decoding buffer.
    ///
    /// The format stays available. Closing twice is harmless; rendering,
    /// seeking or resetting afterwards fails with [`Error::NotLoaded`].
    pub fn close(&mut self) {
        if let Some(mut loaded) = self.loaded.take() {
            loaded.decoder.release();
            #[cfg(feature = "tracing")]
            tracing::debug!("closed '{}'", loaded.source.name());
        }
    }

    fn encode(&mut self) -> Result<&[u8]> {
        let loaded = self.loaded.as_mut().ok_or(Error::NotLoaded)?;
        loaded.bytes.clear();
        encode_samples(self.format.sample_format, &loaded.samples, &mut loaded.bytes);
        Ok(&loaded.bytes)
    }

    /// Renders up to `max_frames` frames into the sample buffer.
    fn render_frames(&mut self, max_frames: usize) -> Result<()> {
        let Stream {
            loaded,
            processor,
            format,
            on_decode_error,
            recovered_errors,
        } = self;
        let loaded = loaded.as_mut().ok_or(Error::NotLoaded)?;
        let mut on_error = |e: Error| {
            *recovered_errors += 1;
            on_decode_error(e);
        };

        let loop_start = processor.plan().loop_points().map(|points| points.start);
        let input_channels = format.input_channels as usize;
        let output_channels = format.channels as usize;
        loaded.samples.clear();
        let mut remaining = max_frames;
        while remaining > 0 {
            let run = processor.contiguous_frames(remaining);
            if run == 0 {
                break;
            }
            loaded.position_decoder(processor.source_frame(), loop_start, &mut on_error)?;
            loaded.decoded.clear();
            let read = loaded.decoder.read_frames(
                &mut *loaded.source,
                run,
                &mut loaded.decoded,
                &mut on_error,
            )?;
            if read < run {
                // payload shorter than the header claims
                loaded.decoded.resize(run * input_channels, Sample::default());
            }
            let start = loaded.samples.len();
            loaded.mapper.map(&loaded.decoded, &mut loaded.samples);
            processor.apply(&mut loaded.samples[start..], output_channels);
            processor.advance(run);
            remaining -= run;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Stream>();
    }

    #[cfg(feature = "wav")]
    fn pcm_stream(frames: u16) -> Stream {
        let data: Vec<u8> = (0..frames as i16).flat_map(|v| v.to_le_bytes()).collect();
        let mut file = b"RIFF".to_vec();
        file.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        file.extend_from_slice(b"WAVEfmt ");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes());
        file.extend_from_slice(&8000u32.to_le_bytes());
        file.extend_from_slice(&16_000u32.to_le_bytes());
        file.extend_from_slice(&2u16.to_le_bytes());
        file.extend_from_slice(&16u16.to_le_bytes());
        file.extend_from_slice(b"data");
        file.extend_from_slice(&(data.len() as u32).to_le_bytes());
        file.extend(data);
        Stream::builder()
            .with_source(crate::io::MemorySource::new("t.wav", file))
            .with_buffer_frames(64)
            .build()
            .unwrap()
    }

    #[cfg(feature = "wav")]
    #[test]
    fn render_batches_until_done() {
        let mut stream = pcm_stream(100);
        assert_eq!(stream.render().unwrap().len(), 128);
        assert_eq!(stream.render().unwrap().len(), 72);
        assert!(stream.done());
        assert!(stream.render().unwrap().is_empty());
    }

    #[cfg(feature = "wav")]
    #[test]
    fn fill_rejects_buffers_without_a_frame() {
        let mut stream = pcm_stream(10);
        assert!(matches!(
            stream.fill(&mut [0u8; 1]),
            Err(Error::InvalidArgument(_))
        ));
        let mut buf = [0u8; 7];
        assert_eq!(stream.fill(&mut buf).unwrap(), 6);
        assert_eq!(stream.position(), 3);
    }

    #[cfg(feature = "wav")]
    #[test]
    fn close_is_idempotent() {
        let mut stream = pcm_stream(10);
        stream.close();
        stream.close();
        assert!(matches!(stream.render(), Err(Error::NotLoaded)));
        assert!(matches!(stream.seek(0), Err(Error::NotLoaded)));
        assert!(matches!(stream.reset(), Err(Error::NotLoaded)));
        assert_eq!(stream.format().stream_frames, 10);
    }
}
