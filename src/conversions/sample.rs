use byteorder::{ByteOrder, LittleEndian};
use dasp_sample::{Sample as _, I24};

use crate::common::Sample;
use crate::format::SampleFormat;

const I24_MIN: i32 = -(1 << 23);
const I24_MAX: i32 = (1 << 23) - 1;

/// Appends `samples` to `out` in the little-endian encoding of `format`.
///
/// Integer encodings saturate at full scale; float output is written as is.
pub fn encode_samples(format: SampleFormat, samples: &[Sample], out: &mut Vec<u8>) {
    let size = format.bytes_per_sample();
    let start = out.len();
    out.resize(start + samples.len() * size, 0);
    let dest = out[start..].chunks_exact_mut(size);
    match format {
        SampleFormat::Pcm16 => {
            for (bytes, s) in dest.zip(samples) {
                LittleEndian::write_i16(bytes, s.to_sample::<i16>());
            }
        }
        SampleFormat::Pcm24 => {
            for (bytes, s) in dest.zip(samples) {
                let value = s.to_sample::<I24>().inner().clamp(I24_MIN, I24_MAX);
                LittleEndian::write_i24(bytes, value);
            }
        }
        SampleFormat::Pcm32 => {
            for (bytes, s) in dest.zip(samples) {
                LittleEndian::write_i32(bytes, s.to_sample::<i32>());
            }
        }
        SampleFormat::Float => {
            for (bytes, s) in dest.zip(samples) {
                LittleEndian::write_f32(bytes, *s);
            }
        }
    }
}
