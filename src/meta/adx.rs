//! CRI ADX header.

use crate::codec::adx::{coefficients, AdxCodec, AdxScale, MAX_CHANNELS};
use crate::codec::Codec;
use crate::config::PlaybackHints;
use crate::error::{Error, Result};
use crate::format::{LoopPoints, SampleFormat, StreamInfo};
use crate::io::{ByteSource, ByteSourceExt};

use super::{select_subsong, Probed};

const FORMAT: &str = "CRI ADX";
const COPYRIGHT: &[u8] = b"(c)CRI";

/// Offset where the payload starts, read from the header.
fn data_offset(src: &mut dyn ByteSource) -> Option<u64> {
    if src.read_u16_be(0).ok()? != 0x8000 {
        return None;
    }
    Some(src.read_u16_be(2).ok()? as u64 + 4)
}

pub(crate) fn sniff(src: &mut dyn ByteSource) -> bool {
    match data_offset(src) {
        Some(offset) if offset >= 6 => src.has_id(offset - 6, COPYRIGHT),
        _ => false,
    }
}

pub(crate) fn parse(src: &mut dyn ByteSource, subsong: u32) -> Result<Probed> {
    let subsong_index = select_subsong(subsong, 1)?;
    let data_offset =
        data_offset(src).ok_or_else(|| Error::corrupt(FORMAT, "missing 0x8000 signature"))?;
    if data_offset > src.size() {
        return Err(Error::corrupt(FORMAT, "payload starts past end of file"));
    }

    let scale = match src.read_u8(0x04)? {
        3 => AdxScale::Linear,
        4 => AdxScale::Exponential,
        other => return Err(Error::corrupt(FORMAT, format!("unknown encoding type {other}"))),
    };
    let frame_size = src.read_u8(0x05)? as usize;
    if frame_size <= 2 {
        return Err(Error::corrupt(FORMAT, format!("frame size {frame_size} too small")));
    }
    let bits = src.read_u8(0x06)?;
    if bits != 4 {
        return Err(Error::corrupt(FORMAT, format!("{bits} bits per sample")));
    }
    let channels = src.read_u8(0x07)?;
    if channels == 0 || channels as usize > MAX_CHANNELS {
        return Err(Error::corrupt(FORMAT, format!("{channels} channels")));
    }
    let sample_rate = src.read_u32_be(0x08)?;
    if sample_rate == 0 {
        return Err(Error::corrupt(FORMAT, "zero sample rate"));
    }
    let total_frames = src.read_u32_be(0x0c)? as u64;
    let cutoff = src.read_u16_be(0x10)?;
    let version = src.read_u8(0x12)?;
    let loop_base = match version {
        3 => 0x14,
        4 => 0x24,
        other => return Err(Error::corrupt(FORMAT, format!("unknown version {other}"))),
    };
    if src.read_u8(0x13)? != 0 {
        return Err(Error::corrupt(FORMAT, "encrypted streams are not supported"));
    }

    // the loop block only exists when the header leaves room for it
    let header_end = data_offset - 6;
    let loop_points = if header_end >= loop_base + 0x18 && src.read_u32_be(loop_base + 0x04)? != 0
    {
        Some(LoopPoints {
            start: src.read_u32_be(loop_base + 0x08)? as u64,
            end: src.read_u32_be(loop_base + 0x10)? as u64,
        })
    } else {
        None
    };

    let codec = AdxCodec::new(
        channels as u16,
        frame_size,
        data_offset,
        total_frames,
        scale,
        coefficients(cutoff, sample_rate),
    );

    Ok(Probed {
        info: StreamInfo {
            channels: channels as u16,
            sample_rate,
            sample_format: SampleFormat::Pcm16,
            stream_frames: total_frames,
            loop_points,
            subsong_index,
            subsong_count: 1,
            meta_name: "CRI ADX header",
            stream_name: None,
        },
        codec: Codec::Adx(codec),
        hints: PlaybackHints::default(),
        window: None,
    })
}
