//! Stream metadata as reported by recognizers and exposed to callers.

use std::fmt;

use crate::common::{ChannelCount, SampleRate};
use crate::math::format_time;

/// Encoding of the samples handed out by the render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian integer.
    Pcm16,
    /// Signed 24-bit little-endian integer, packed in three bytes.
    Pcm24,
    /// Signed 32-bit little-endian integer.
    Pcm32,
    /// 32-bit little-endian IEEE float.
    Float,
}

impl SampleFormat {
    /// Bytes used by one sample of one channel.
    #[inline]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Pcm16 => 2,
            SampleFormat::Pcm24 => 3,
            SampleFormat::Pcm32 | SampleFormat::Float => 4,
        }
    }

    /// Bits used by one sample of one channel.
    #[inline]
    pub fn bits_per_sample(self) -> u16 {
        self.bytes_per_sample() as u16 * 8
    }

    /// Whether samples are floating point.
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float)
    }
}

/// Loop bounds in stream frames, `start` inclusive and `end` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopPoints {
    /// First frame of the loop body.
    pub start: u64,
    /// Frame right after the last frame of the loop body.
    pub end: u64,
}

impl LoopPoints {
    /// Length of the loop body in frames.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the loop body is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether the loop is usable for a stream of `frames` frames.
    #[inline]
    pub fn is_valid_for(&self, frames: u64) -> bool {
        !self.is_empty() && self.end <= frames
    }
}

/// What a recognizer learned about the selected subsong, before any playback
/// configuration is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub channels: ChannelCount,
    pub sample_rate: SampleRate,
    /// Natural output encoding for the codec.
    pub sample_format: SampleFormat,
    /// Frames of decodable audio.
    pub stream_frames: u64,
    pub loop_points: Option<LoopPoints>,
    /// 1-based index of the selected subsong.
    pub subsong_index: u32,
    pub subsong_count: u32,
    pub meta_name: &'static str,
    pub stream_name: Option<String>,
}

/// Description of an open stream. Fixed until the stream is reopened.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamFormat {
    /// Channels handed out by the render surface, after track selection and downmix.
    pub channels: ChannelCount,
    /// Channels stored in the source.
    pub input_channels: ChannelCount,
    pub sample_rate: SampleRate,
    pub sample_format: SampleFormat,
    /// Bytes per rendered frame: `channels * sample_format.bytes_per_sample()`.
    pub frame_size: usize,
    /// Frames of decodable audio in the source.
    pub stream_frames: u64,
    /// Frames the stream plays once loops and fade are applied.
    pub play_frames: u64,
    /// Set when the stream never finishes on its own.
    pub play_forever: bool,
    /// Loop in effect after configuration, if any.
    pub loop_points: Option<LoopPoints>,
    pub subsong_index: u32,
    pub subsong_count: u32,
    pub codec_name: &'static str,
    pub layout_name: &'static str,
    pub meta_name: &'static str,
    pub stream_name: Option<String>,
    /// Bytes per codec frame or block in the source.
    pub codec_frame_bytes: usize,
    /// Average bitrate of the payload, in kbps.
    pub bitrate: u32,
}

impl StreamFormat {
    /// Human readable multi-line summary of the stream.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.sample_rate;
        writeln!(f, "sample rate: {rate} Hz")?;
        writeln!(f, "channels: {}", self.channels)?;
        if self.input_channels != self.channels {
            writeln!(f, "input channels: {}", self.input_channels)?;
        }
        if let Some(lp) = self.loop_points {
            writeln!(
                f,
                "loop start: {} samples ({} seconds)",
                lp.start,
                format_time(lp.start, rate)
            )?;
            writeln!(
                f,
                "loop end: {} samples ({} seconds)",
                lp.end,
                format_time(lp.end, rate)
            )?;
        }
        writeln!(
            f,
            "stream total samples: {} ({} seconds)",
            self.stream_frames,
            format_time(self.stream_frames, rate)
        )?;
        if self.play_forever {
            writeln!(f, "play total samples: infinite")?;
        } else {
            writeln!(
                f,
                "play total samples: {} ({} seconds)",
                self.play_frames,
                format_time(self.play_frames, rate)
            )?;
        }
        writeln!(f, "encoding: {}", self.codec_name)?;
        writeln!(f, "layout: {}", self.layout_name)?;
        writeln!(f, "frame size: {:#x} bytes", self.codec_frame_bytes)?;
        writeln!(f, "metadata from: {}", self.meta_name)?;
        writeln!(f, "bitrate: {} kbps", self.bitrate)?;
        writeln!(f, "subsong: {}/{}", self.subsong_index, self.subsong_count)?;
        if let Some(name) = &self.stream_name {
            writeln!(f, "stream name: {name}")?;
        }
        Ok(())
    }
}
