use byteorder::{ByteOrder, LittleEndian};
use dasp_sample::{Sample as _, I24};

use crate::common::{ChannelCount, Sample};
use crate::error::Result;
use crate::format::SampleFormat;
use crate::io::ByteSource;

/// Frames decoded per block. PCM has no natural block size; this only bounds
/// how much is read from the source at once.
const BLOCK_FRAMES: usize = 1024;

/// Little-endian PCM sample encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcmEncoding {
    U8,
    I16,
    I24,
    I32,
    F32,
}

impl PcmEncoding {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PcmEncoding::U8 => 1,
            PcmEncoding::I16 => 2,
            PcmEncoding::I24 => 3,
            PcmEncoding::I32 | PcmEncoding::F32 => 4,
        }
    }

    /// Output encoding that carries this input without loss.
    pub fn natural_format(self) -> SampleFormat {
        match self {
            PcmEncoding::U8 | PcmEncoding::I16 => SampleFormat::Pcm16,
            PcmEncoding::I24 => SampleFormat::Pcm24,
            PcmEncoding::I32 => SampleFormat::Pcm32,
            PcmEncoding::F32 => SampleFormat::Float,
        }
    }

    #[inline]
    fn decode(self, bytes: &[u8]) -> Sample {
        match self {
            PcmEncoding::U8 => bytes[0].to_sample(),
            PcmEncoding::I16 => LittleEndian::read_i16(bytes).to_sample(),
            PcmEncoding::I24 => I24::new_unchecked(LittleEndian::read_i24(bytes)).to_sample(),
            PcmEncoding::I32 => LittleEndian::read_i32(bytes).to_sample(),
            PcmEncoding::F32 => LittleEndian::read_f32(bytes),
        }
    }
}

/// Uncompressed PCM with channels interleaved sample by sample.
#[derive(Clone, Debug)]
pub struct PcmCodec {
    encoding: PcmEncoding,
    channels: ChannelCount,
    data_offset: u64,
    total_frames: u64,
    scratch: Vec<u8>,
}

impl PcmCodec {
    pub fn new(
        encoding: PcmEncoding,
        channels: ChannelCount,
        data_offset: u64,
        total_frames: u64,
    ) -> Self {
        Self {
            encoding,
            channels,
            data_offset,
            total_frames,
            scratch: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.encoding {
            PcmEncoding::U8 => "8-bit unsigned PCM",
            PcmEncoding::I16 => "16-bit little endian PCM",
            PcmEncoding::I24 => "24-bit little endian PCM",
            PcmEncoding::I32 => "32-bit little endian PCM",
            PcmEncoding::F32 => "32-bit float PCM",
        }
    }

    #[inline]
    pub fn block_frames(&self) -> usize {
        BLOCK_FRAMES
    }

    /// Bytes per interleaved frame.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }

    pub fn payload_bytes(&self) -> u64 {
        self.total_frames * self.frame_bytes() as u64
    }

    pub fn decode_block(
        &mut self,
        src: &mut dyn ByteSource,
        index: u64,
        frames: usize,
        out: &mut Vec<Sample>,
    ) -> Result<()> {
        let frame_bytes = self.frame_bytes();
        let offset = self.data_offset + index * (BLOCK_FRAMES * frame_bytes) as u64;
        self.scratch.resize(frames * frame_bytes, 0);
        src.read_at(offset, &mut self.scratch)?;

        let size = self.encoding.bytes_per_sample();
        out.extend(
            self.scratch
                .chunks_exact(size)
                .map(|bytes| self.encoding.decode(bytes)),
        );
        Ok(())
    }
}
