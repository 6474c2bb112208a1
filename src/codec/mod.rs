//! Per-format payload decoders.
//!
//! The set of codecs is closed and chosen at build time through cargo
//! features, so dispatch goes through the [`Codec`] enum rather than trait
//! objects. Every codec decodes whole blocks into normalized [`Sample`]s;
//! [`CodecDecoder`] layers a block cursor on top so callers can pull any
//! number of frames and seek to any frame.

use crate::common::{ChannelCount, Sample};
use crate::error::{Error, Result};
use crate::io::ByteSource;

#[cfg(feature = "adx")]
pub(crate) mod adx;
#[cfg(feature = "wav")]
pub(crate) mod ima;
#[cfg(feature = "wav")]
pub(crate) mod pcm;

#[cfg(not(any(feature = "adx", feature = "wav")))]
compile_error!("at least one codec family feature (`adx` or `wav`) must be enabled");

/// A decoder for one codec family, selected by the recognizer that parsed the header.
#[derive(Clone, Debug)]
pub enum Codec {
    /// Uncompressed integer or float PCM.
    #[cfg(feature = "wav")]
    Pcm(pcm::PcmCodec),
    /// Microsoft IMA ADPCM, in self-contained blocks.
    #[cfg(feature = "wav")]
    ImaAdpcm(ima::ImaCodec),
    /// CRI ADX ADPCM.
    #[cfg(feature = "adx")]
    Adx(adx::AdxCodec),
}

impl Codec {
    /// Frames produced by one full block.
    pub fn block_frames(&self) -> usize {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(c) => c.block_frames(),
            #[cfg(feature = "wav")]
            Codec::ImaAdpcm(c) => c.block_frames(),
            #[cfg(feature = "adx")]
            Codec::Adx(c) => c.block_frames(),
        }
    }

    /// Whether random access within the stream is possible.
    pub fn supports_seek(&self) -> bool {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(_) | Codec::ImaAdpcm(_) => true,
            #[cfg(feature = "adx")]
            Codec::Adx(_) => true,
        }
    }

    /// Whether decoding a block depends on the blocks before it.
    pub fn carries_history(&self) -> bool {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(_) | Codec::ImaAdpcm(_) => false,
            #[cfg(feature = "adx")]
            Codec::Adx(_) => true,
        }
    }

    /// Human readable codec name.
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(c) => c.name(),
            #[cfg(feature = "wav")]
            Codec::ImaAdpcm(_) => "Microsoft 4-bit IMA ADPCM",
            #[cfg(feature = "adx")]
            Codec::Adx(c) => c.name(),
        }
    }

    /// How channels are laid out in the payload.
    pub fn layout_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(_) => "flat",
            #[cfg(feature = "wav")]
            Codec::ImaAdpcm(_) => "blocked",
            #[cfg(feature = "adx")]
            Codec::Adx(_) => "interleave",
        }
    }

    /// Bytes of payload behind one codec frame (or block, for blocked layouts).
    pub fn frame_bytes(&self) -> usize {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(c) => c.frame_bytes(),
            #[cfg(feature = "wav")]
            Codec::ImaAdpcm(c) => c.block_bytes(),
            #[cfg(feature = "adx")]
            Codec::Adx(c) => c.frame_bytes(),
        }
    }

    /// Payload bytes covering the whole stream, used for bitrate estimates.
    pub fn payload_bytes(&self) -> u64 {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(c) => c.payload_bytes(),
            #[cfg(feature = "wav")]
            Codec::ImaAdpcm(c) => c.payload_bytes(),
            #[cfg(feature = "adx")]
            Codec::Adx(c) => c.payload_bytes(),
        }
    }

    /// Decodes block `index` into `out` as interleaved samples, producing `frames` frames.
    ///
    /// `sequential` tells codecs with inter-block history whether the previous
    /// block decoded was `index - 1`; otherwise that history is discarded.
    #[cfg_attr(not(feature = "adx"), allow(unused_variables))]
    fn decode_block(
        &mut self,
        src: &mut dyn ByteSource,
        index: u64,
        frames: usize,
        sequential: bool,
        out: &mut Vec<Sample>,
    ) -> Result<()> {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(c) => c.decode_block(src, index, frames, out),
            #[cfg(feature = "wav")]
            Codec::ImaAdpcm(c) => c.decode_block(src, index, frames, out),
            #[cfg(feature = "adx")]
            Codec::Adx(c) => c.decode_block(src, index, frames, sequential, out),
        }
    }

    /// Forgets inter-block history, as at the start of the stream.
    fn reset_history(&mut self) {
        match self {
            #[cfg(feature = "wav")]
            Codec::Pcm(_) | Codec::ImaAdpcm(_) => {}
            #[cfg(feature = "adx")]
            Codec::Adx(c) => c.reset_history(),
        }
    }
}

/// Pulls frames from a [`Codec`] one block at a time.
///
/// Cloning a decoder snapshots its complete state, including inter-block
/// history, which is how loops restart without drift.
#[derive(Clone, Debug)]
pub struct CodecDecoder {
    codec: Codec,
    channels: ChannelCount,
    total_frames: u64,
    /// Decoded samples of the current block.
    block: Vec<Sample>,
    /// Index of the block held in `block`.
    block_index: Option<u64>,
    /// Frame offset within `block` of the next frame to hand out.
    block_pos: usize,
    /// Stream frame of the next frame to hand out.
    position: u64,
    /// Every block so far was decoded in order from the start of the stream.
    linear: bool,
}

impl CodecDecoder {
    pub(crate) fn new(codec: Codec, channels: ChannelCount, total_frames: u64) -> Self {
        Self {
            codec,
            channels,
            total_frames,
            block: Vec::new(),
            block_index: None,
            block_pos: 0,
            position: 0,
            linear: true,
        }
    }

    /// The codec behind this decoder.
    #[inline]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Stream frame that the next call to [`read_frames`](Self::read_frames) starts at.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the decoder state matches a decode from frame 0 without seeking.
    ///
    /// Only then does its inter-block history equal that of a linear decode.
    #[inline]
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// Total frames the stream decodes to.
    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Appends up to `max_frames` interleaved frames to `out`.
    ///
    /// Returns the number of frames appended, 0 once the stream is exhausted.
    /// Recoverable payload corruption replaces the affected block with
    /// silence and is reported through `on_error`.
    pub fn read_frames(
        &mut self,
        src: &mut dyn ByteSource,
        max_frames: usize,
        out: &mut Vec<Sample>,
        on_error: &mut dyn FnMut(Error),
    ) -> Result<usize> {
        let channels = self.channels as usize;
        let mut produced = 0;
        while produced < max_frames && self.position < self.total_frames {
            if self.block_pos >= self.block.len() / channels {
                self.load_next_block(src, on_error)?;
            }
            let available = self.block.len() / channels - self.block_pos;
            let take = available.min(max_frames - produced);
            let start = self.block_pos * channels;
            out.extend_from_slice(&self.block[start..start + take * channels]);
            self.block_pos += take;
            self.position += take as u64;
            produced += take;
        }
        Ok(produced)
    }

    fn load_next_block(
        &mut self,
        src: &mut dyn ByteSource,
        on_error: &mut dyn FnMut(Error),
    ) -> Result<()> {
        let block_frames = self.codec.block_frames() as u64;
        let index = self.position / block_frames;
        self.load_block(src, index, on_error)?;
        self.block_pos = (self.position - index * block_frames) as usize;
        Ok(())
    }

    fn load_block(
        &mut self,
        src: &mut dyn ByteSource,
        index: u64,
        on_error: &mut dyn FnMut(Error),
    ) -> Result<()> {
        let block_frames = self.codec.block_frames() as u64;
        let first = index * block_frames;
        let frames = block_frames.min(self.total_frames.saturating_sub(first)) as usize;
        let sequential = match self.block_index {
            Some(prev) => prev + 1 == index,
            None => index == 0,
        };
        // block 0 always starts from silence, as in a linear decode
        self.linear = index == 0 || (self.linear && sequential);

        self.block.clear();
        match self
            .codec
            .decode_block(src, index, frames, sequential, &mut self.block)
        {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                self.block.clear();
                self.block
                    .resize(frames * self.channels as usize, Sample::default());
                self.codec.reset_history();
                on_error(e);
            }
            Err(e) => {
                self.block.clear();
                self.block_index = None;
                return Err(e);
            }
        }
        debug_assert_eq!(self.block.len(), frames * self.channels as usize);
        self.block_index = Some(index);
        Ok(())
    }

    /// Positions the decoder so the next frame produced is `frame`.
    ///
    /// The containing block is decoded and the frames before `frame` are
    /// discarded. Codecs with inter-block history start that block from
    /// silence, so the first block after a seek may differ slightly from a
    /// linear decode.
    pub fn seek(
        &mut self,
        src: &mut dyn ByteSource,
        frame: u64,
        on_error: &mut dyn FnMut(Error),
    ) -> Result<u64> {
        let frame = frame.min(self.total_frames);
        if !self.codec.supports_seek() {
            return Err(Error::InvalidArgument(format!(
                "{} does not support seeking",
                self.codec.name()
            )));
        }
        if frame == 0 {
            self.reset();
            return Ok(0);
        }
        self.position = frame;
        if frame == self.total_frames {
            self.block.clear();
            self.block_index = None;
            self.block_pos = 0;
            self.linear = false;
            return Ok(frame);
        }
        let block_frames = self.codec.block_frames() as u64;
        let index = frame / block_frames;
        if self.block_index != Some(index) {
            self.codec.reset_history();
            self.block_index = None;
            self.load_block(src, index, on_error)?;
        }
        self.block_pos = (frame - index * block_frames) as usize;
        Ok(frame)
    }

    /// Returns to the start of the stream with fresh codec state.
    pub fn reset(&mut self) {
        self.codec.reset_history();
        self.block.clear();
        self.block_index = None;
        self.block_pos = 0;
        self.position = 0;
        self.linear = true;
    }

    /// Releases decoded buffers.
    pub(crate) fn release(&mut self) {
        self.block = Vec::new();
        self.block_index = None;
        self.block_pos = 0;
    }
}

/// Splits a byte into its high and low nibbles, sign extended.
#[cfg(feature = "adx")]
#[inline]
pub(crate) fn signed_nibbles(byte: u8) -> (i32, i32) {
    (((byte as i8) >> 4) as i32, (((byte << 4) as i8) >> 4) as i32)
}

/// Normalizes a 16-bit sample.
#[inline]
pub(crate) fn from_i16(sample: i32) -> Sample {
    use dasp_sample::Sample as _;
    (sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16).to_sample::<Sample>()
}
