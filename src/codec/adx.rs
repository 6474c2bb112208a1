use byteorder::{BigEndian, ByteOrder};

use crate::common::{ChannelCount, Sample};
use crate::error::{Error, Result};
use crate::io::ByteSource;

use super::{from_i16, signed_nibbles};

/// Most channels an ADX header may declare.
pub const MAX_CHANNELS: usize = 8;

/// How the per-frame scale is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdxScale {
    /// `scale + 1`, the standard encoding (type 3).
    Linear,
    /// `1 << (12 - scale)`, the exponential encoding (type 4).
    Exponential,
}

/// Prediction coefficients derived from the header's high-pass cutoff.
pub fn coefficients(cutoff: u16, sample_rate: u32) -> (i32, i32) {
    let sqrt2 = std::f64::consts::SQRT_2;
    let z = (2.0 * std::f64::consts::PI * cutoff as f64 / sample_rate as f64).cos();
    let a = sqrt2 - z;
    let b = sqrt2 - 1.0;
    let c = (a - ((a + b) * (a - b)).sqrt()) / b;
    ((c * 8192.0) as i32, (c * c * -4096.0) as i32)
}

/// CRI ADX: 4-bit ADPCM in fixed-size frames of one channel each, the frames
/// of all channels interleaved. Each frame opens with a 16-bit scale; the
/// predictor runs on the two previous output samples, so history carries
/// across frames.
#[derive(Clone, Debug)]
pub struct AdxCodec {
    channels: ChannelCount,
    frame_size: usize,
    data_offset: u64,
    total_frames: u64,
    scale: AdxScale,
    coef: (i32, i32),
    hist: [(i32, i32); MAX_CHANNELS],
    scratch: Vec<u8>,
}

impl AdxCodec {
    pub fn new(
        channels: ChannelCount,
        frame_size: usize,
        data_offset: u64,
        total_frames: u64,
        scale: AdxScale,
        coef: (i32, i32),
    ) -> Self {
        Self {
            channels,
            frame_size,
            data_offset,
            total_frames,
            scale,
            coef,
            hist: [(0, 0); MAX_CHANNELS],
            scratch: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.scale {
            AdxScale::Linear => "CRI ADX 4-bit ADPCM",
            AdxScale::Exponential => "CRI ADX 4-bit ADPCM (exponential scale)",
        }
    }

    /// Frames packed into one channel frame after its scale word.
    #[inline]
    pub fn block_frames(&self) -> usize {
        (self.frame_size - 2) * 2
    }

    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.frame_size
    }

    pub fn payload_bytes(&self) -> u64 {
        let blocks = self.total_frames.div_ceil(self.block_frames() as u64);
        blocks * (self.frame_size * self.channels as usize) as u64
    }

    pub fn reset_history(&mut self) {
        self.hist = [(0, 0); MAX_CHANNELS];
    }

    pub fn decode_block(
        &mut self,
        src: &mut dyn ByteSource,
        index: u64,
        frames: usize,
        sequential: bool,
        out: &mut Vec<Sample>,
    ) -> Result<()> {
        if !sequential {
            self.reset_history();
        }
        let channels = self.channels as usize;
        let block_bytes = self.frame_size * channels;
        self.scratch.resize(block_bytes, 0);
        src.read_at(self.data_offset + index * block_bytes as u64, &mut self.scratch)?;

        let start = out.len();
        out.resize(start + frames * channels, Sample::default());
        for ch in 0..channels {
            let frame = &self.scratch[ch * self.frame_size..(ch + 1) * self.frame_size];
            let raw_scale = BigEndian::read_u16(frame) as i32;
            if raw_scale & 0x8000 != 0 {
                // end-of-stream marker or garbage before the declared end
                return Err(Error::DecodeError {
                    frame: index * self.block_frames() as u64,
                    reason: format!("channel {ch} frame has scale {raw_scale:#06x}"),
                });
            }
            let scale = match self.scale {
                AdxScale::Linear => raw_scale + 1,
                AdxScale::Exponential => 1 << (12 - raw_scale.min(12)),
            };

            let (coef1, coef2) = self.coef;
            let (mut hist1, mut hist2) = self.hist[ch];
            for i in 0..frames {
                let (high, low) = signed_nibbles(frame[2 + i / 2]);
                let nibble = if i % 2 == 0 { high } else { low };
                let predicted = (coef1 * hist1 + coef2 * hist2) >> 12;
                let sample = (nibble * scale + predicted).clamp(i16::MIN as i32, i16::MAX as i32);
                hist2 = hist1;
                hist1 = sample;
                out[start + i * channels + ch] = from_i16(sample);
            }
            self.hist[ch] = (hist1, hist2);
        }
        Ok(())
    }
}
