//! RIFF WAVE.

use crate::codec::ima::{frames_per_block, ImaCodec};
use crate::codec::pcm::{PcmCodec, PcmEncoding};
use crate::codec::Codec;
use crate::config::PlaybackHints;
use crate::error::{Error, Result};
use crate::format::{LoopPoints, SampleFormat, StreamInfo};
use crate::io::{ByteSource, ByteSourceExt};

use super::{select_subsong, Probed};

const FORMAT: &str = "RIFF WAVE";

const TAG_PCM: u16 = 0x0001;
const TAG_FLOAT: u16 = 0x0003;
const TAG_IMA_ADPCM: u16 = 0x0011;
const TAG_EXTENSIBLE: u16 = 0xfffe;

pub(crate) fn sniff(src: &mut dyn ByteSource) -> bool {
    src.has_id(0, b"RIFF") && src.has_id(8, b"WAVE")
}

#[derive(Debug)]
struct Fmt {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits: u16,
}

#[derive(Debug, Default)]
struct Chunks {
    fmt: Option<Fmt>,
    /// Offset and clamped size of the payload.
    data: Option<(u64, u64)>,
    fact_frames: Option<u64>,
    /// Loop from the sampler chunk, end exclusive, and its play count.
    smpl: Option<(LoopPoints, u32)>,
    name: Option<String>,
}

fn read_fmt(src: &mut dyn ByteSource, offset: u64, size: u64) -> Result<Fmt> {
    if size < 16 {
        return Err(Error::corrupt(FORMAT, format!("fmt chunk of {size} bytes")));
    }
    let mut tag = src.read_u16_le(offset)?;
    if tag == TAG_EXTENSIBLE {
        if size < 40 {
            return Err(Error::corrupt(FORMAT, "extensible fmt chunk too small"));
        }
        // the sub-format GUID opens with the actual format tag
        tag = src.read_u16_le(offset + 24)?;
    }
    Ok(Fmt {
        tag,
        channels: src.read_u16_le(offset + 2)?,
        sample_rate: src.read_u32_le(offset + 4)?,
        block_align: src.read_u16_le(offset + 12)?,
        bits: src.read_u16_le(offset + 14)?,
    })
}

fn read_smpl(src: &mut dyn ByteSource, offset: u64, size: u64) -> Result<Option<(LoopPoints, u32)>> {
    if size < 36 + 24 || src.read_u32_le(offset + 28)? == 0 {
        return Ok(None);
    }
    let record = offset + 36;
    let start = src.read_u32_le(record + 8)? as u64;
    let end = src.read_u32_le(record + 12)? as u64;
    let play_count = src.read_u32_le(record + 20)?;
    // the sampler chunk stores an inclusive end
    Ok(Some((LoopPoints { start, end: end + 1 }, play_count)))
}

fn read_name(src: &mut dyn ByteSource, offset: u64, size: u64) -> Result<Option<String>> {
    if size < 4 || !src.has_id(offset, b"INFO") {
        return Ok(None);
    }
    let end = offset + size;
    let mut pos = offset + 4;
    while pos + 8 <= end {
        let sub_size = src.read_u32_le(pos + 4)? as u64;
        if src.has_id(pos, b"INAM") && pos + 8 + sub_size <= end {
            let bytes = src.read(pos + 8, sub_size as usize)?;
            let text = String::from_utf8_lossy(&bytes);
            let name = text.trim_end_matches('\0').trim();
            return Ok((!name.is_empty()).then(|| name.to_owned()));
        }
        pos += 8 + sub_size + (sub_size & 1);
    }
    Ok(None)
}

fn read_chunks(src: &mut dyn ByteSource) -> Result<Chunks> {
    let file_size = src.size();
    let riff_end = (src.read_u32_le(4)? as u64 + 8).min(file_size);
    let mut chunks = Chunks::default();
    let mut pos = 12;
    while pos + 8 <= riff_end {
        let id = src.read(pos, 4)?;
        let size = src.read_u32_le(pos + 4)? as u64;
        let body = pos + 8;
        match id.as_slice() {
            b"fmt " => chunks.fmt = Some(read_fmt(src, body, size)?),
            b"data" => {
                // streamed writers leave 0xFFFFFFFF or a size past the end
                let clamped = size.min(file_size - body);
                chunks.data = Some((body, clamped));
                if clamped < size {
                    break;
                }
            }
            b"fact" if size >= 4 => chunks.fact_frames = Some(src.read_u32_le(body)? as u64),
            b"smpl" => chunks.smpl = read_smpl(src, body, size)?,
            b"LIST" => {
                if let Some(name) = read_name(src, body, size)? {
                    chunks.name = Some(name);
                }
            }
            _ => {}
        }
        pos = body + size + (size & 1);
    }
    Ok(chunks)
}

fn pcm_encoding(fmt: &Fmt) -> Result<PcmEncoding> {
    match (fmt.tag, fmt.bits) {
        (TAG_PCM, 8) => Ok(PcmEncoding::U8),
        (TAG_PCM, 16) => Ok(PcmEncoding::I16),
        (TAG_PCM, 24) => Ok(PcmEncoding::I24),
        (TAG_PCM, 32) => Ok(PcmEncoding::I32),
        (TAG_FLOAT, 32) => Ok(PcmEncoding::F32),
        (tag, bits) => Err(Error::corrupt(
            FORMAT,
            format!("format tag {tag:#06x} with {bits} bits per sample"),
        )),
    }
}

/// Frames held by `data_size` bytes of IMA ADPCM, counting a partial last block.
fn ima_frames(data_size: u64, block_align: usize, channels: usize) -> u64 {
    let full = data_size / block_align as u64;
    let rest = (data_size % block_align as u64) as usize;
    full * frames_per_block(block_align, channels) as u64 + frames_per_block(rest, channels) as u64
}

pub(crate) fn parse(src: &mut dyn ByteSource, subsong: u32) -> Result<Probed> {
    let subsong_index = select_subsong(subsong, 1)?;
    let chunks = read_chunks(src)?;
    let fmt = chunks
        .fmt
        .ok_or_else(|| Error::corrupt(FORMAT, "missing fmt chunk"))?;
    let (data_offset, data_size) = chunks
        .data
        .ok_or_else(|| Error::corrupt(FORMAT, "missing data chunk"))?;
    if fmt.channels == 0 {
        return Err(Error::corrupt(FORMAT, "zero channels"));
    }
    if fmt.sample_rate == 0 {
        return Err(Error::corrupt(FORMAT, "zero sample rate"));
    }
    let channels = fmt.channels as usize;

    let (codec, stream_frames, sample_format) = if fmt.tag == TAG_IMA_ADPCM {
        if fmt.bits != 4 {
            return Err(Error::corrupt(FORMAT, format!("{}-bit IMA ADPCM", fmt.bits)));
        }
        let block_align = fmt.block_align as usize;
        if frames_per_block(block_align, channels) == 0 {
            return Err(Error::corrupt(FORMAT, format!("block align {block_align}")));
        }
        let available = ima_frames(data_size, block_align, channels);
        let frames = chunks.fact_frames.map_or(available, |f| f.min(available));
        let codec = ImaCodec::new(fmt.channels, block_align, data_offset, data_size);
        (Codec::ImaAdpcm(codec), frames, SampleFormat::Pcm16)
    } else {
        let encoding = pcm_encoding(&fmt)?;
        let frames = data_size / (encoding.bytes_per_sample() * channels) as u64;
        let codec = PcmCodec::new(encoding, fmt.channels, data_offset, frames);
        (Codec::Pcm(codec), frames, encoding.natural_format())
    };

    let mut hints = PlaybackHints::default();
    let loop_points = chunks.smpl.map(|(points, play_count)| {
        if play_count == 0 {
            hints.play_forever = Some(true);
        } else {
            hints.loop_count = Some(play_count as f64);
        }
        points
    });
    #[cfg(feature = "tracing")]
    if let Some(points) = loop_points {
        tracing::debug!(
            start = points.start,
            end = points.end,
            ?hints,
            "'{}' carries a sampler loop",
            src.name()
        );
    }

    Ok(Probed {
        info: StreamInfo {
            channels: fmt.channels,
            sample_rate: fmt.sample_rate,
            sample_format,
            stream_frames,
            loop_points,
            subsong_index,
            subsong_count: 1,
            meta_name: "RIFF WAVE header",
            stream_name: chunks.name,
        },
        codec,
        hints,
        window: None,
    })
}
