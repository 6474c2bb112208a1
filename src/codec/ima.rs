use crate::common::{ChannelCount, Sample};
use crate::error::{Error, Result};
use crate::io::ByteSource;

use super::from_i16;

const STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408, 449,
    494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066, 2272,
    2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630, 9493,
    10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

const INDEX_TABLE: [i32; 16] = [-1, -1, -1, -1, 2, 4, 6, 8, -1, -1, -1, -1, 2, 4, 6, 8];

/// Per-channel header preceding the nibbles of each block.
const CHANNEL_HEADER_BYTES: usize = 4;

/// Frames held by one block of `block_align` bytes.
pub fn frames_per_block(block_align: usize, channels: usize) -> usize {
    let header = CHANNEL_HEADER_BYTES * channels;
    if block_align <= header {
        return 0;
    }
    (block_align - header) * 2 / channels + 1
}

/// Microsoft IMA ADPCM: fixed-size blocks, each starting with the predictor
/// and step index of every channel, so blocks decode independently.
#[derive(Clone, Debug)]
pub struct ImaCodec {
    channels: ChannelCount,
    block_align: usize,
    data_offset: u64,
    data_size: u64,
    scratch: Vec<u8>,
}

impl ImaCodec {
    pub fn new(channels: ChannelCount, block_align: usize, data_offset: u64, data_size: u64) -> Self {
        Self {
            channels,
            block_align,
            data_offset,
            data_size,
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn block_frames(&self) -> usize {
        frames_per_block(self.block_align, self.channels as usize)
    }

    #[inline]
    pub fn block_bytes(&self) -> usize {
        self.block_align
    }

    pub fn payload_bytes(&self) -> u64 {
        self.data_size
    }

    pub fn decode_block(
        &mut self,
        src: &mut dyn ByteSource,
        index: u64,
        frames: usize,
        out: &mut Vec<Sample>,
    ) -> Result<()> {
        let channels = self.channels as usize;
        let relative = index * self.block_align as u64;
        // the final block may be cut short
        let len = (self.data_size.saturating_sub(relative)).min(self.block_align as u64) as usize;
        self.scratch.resize(len, 0);
        src.read_at(self.data_offset + relative, &mut self.scratch)?;

        let corrupt = |reason: String| Error::DecodeError {
            frame: index * self.block_frames() as u64,
            reason,
        };
        if len < CHANNEL_HEADER_BYTES * channels {
            return Err(corrupt(format!("block of {len} bytes has no channel headers")));
        }

        let start = out.len();
        out.resize(start + frames * channels, Sample::default());
        let block = &self.scratch;
        for ch in 0..channels {
            let header = &block[ch * 4..ch * 4 + 4];
            let mut predictor = i16::from_le_bytes([header[0], header[1]]) as i32;
            let mut step_index = header[2] as i32;
            if step_index > 88 {
                return Err(corrupt(format!(
                    "channel {ch} step index {step_index} out of range"
                )));
            }
            out[start + ch] = from_i16(predictor);

            for k in 1..frames {
                // nibbles come in 4-byte words per channel, low nibble first
                let n = k - 1;
                let byte_pos = CHANNEL_HEADER_BYTES * channels
                    + (n / 8) * 4 * channels
                    + ch * 4
                    + (n % 8) / 2;
                let byte = block.get(byte_pos).copied().unwrap_or(0);
                let nibble = if n % 2 == 0 { byte & 0x0f } else { byte >> 4 };

                let step = STEP_TABLE[step_index as usize];
                let mut diff = step >> 3;
                if nibble & 1 != 0 {
                    diff += step >> 2;
                }
                if nibble & 2 != 0 {
                    diff += step >> 1;
                }
                if nibble & 4 != 0 {
                    diff += step;
                }
                if nibble & 8 != 0 {
                    diff = -diff;
                }
                predictor = (predictor + diff).clamp(i16::MIN as i32, i16::MAX as i32);
                step_index = (step_index + INDEX_TABLE[nibble as usize]).clamp(0, 88);
                out[start + k * channels + ch] = from_i16(predictor);
            }
        }
        Ok(())
    }
}
