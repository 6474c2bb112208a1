//! Streaming decoder for game audio formats.
//!
//! A [`Stream`] is opened from a [`ByteSource`] (a file, a memory buffer or a
//! window into an archive). The format is recognized from the file extension
//! and the magic bytes, one subsong is selected, and loop and fade settings from
//! a [`Config`] are applied. The caller then pulls PCM with
//! [`render`](Stream::render) or [`fill`](Stream::fill) until
//! [`done`](Stream::done) reports the end of playback.
//!
//! Loops are rendered sample-exact: after the configured number of passes the
//! stream either fades out over [`Config::fade_time`] or plays the part after
//! the loop end.
//!
//! # Supported formats
//!
//! | Feature | Containers | Codecs |
//! |---|---|---|
//! | `adx` | CRI ADX (`.adx`), CRI AFS archives (`.afs`) | CRI ADX ADPCM |
//! | `wav` | RIFF WAVE (`.wav`, `.lwav`) | PCM 8/16/24/32-bit, float, IMA ADPCM |
//!
//! Both are enabled by default.
//!
//! # Example
//!
//! ```no_run
//! use vgmdec::{Config, Stream};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         loop_count: 1.0,
//!         ..Config::default()
//!     };
//!     let mut stream = Stream::open_path("bgm/stage1.adx", 0, &config)?;
//!     println!("{}", stream.describe());
//!
//!     let mut buf = vec![0u8; 4096];
//!     loop {
//!         let written = stream.fill(&mut buf)?;
//!         if written == 0 {
//!             break;
//!         }
//!         // play `buf[..written]`
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Virtual filenames
//!
//! A name such as `voice.afs #12 l1.5.txtp` opens subsong 12 of `voice.afs`
//! with a loop count of 1.5. See [`VirtualName`] for the options.
//!
//! # Logging
//!
//! With the default `tracing` feature, probe decisions are logged at debug
//! level and discarded loops or recovered decode errors at warn level.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod codec;
mod common;
mod config;
mod error;
mod format;
mod io;
mod loop_fade;
mod math;
mod meta;
mod registry;
mod stream;

pub mod conversions;
pub mod wav_output;

pub use crate::codec::{Codec, CodecDecoder};
pub use crate::common::{ChannelCount, Sample, SampleRate};
pub use crate::config::{Config, PlaybackHints, DEFAULT_FADE_TIME, DEFAULT_LOOP_COUNT};
pub use crate::error::{Error, Result};
pub use crate::format::{LoopPoints, SampleFormat, StreamFormat, StreamInfo};
pub use crate::io::{ByteSource, ByteSourceExt, FileSource, MemorySource, SubSource};
pub use crate::loop_fade::{LoopFadeProcessor, LoopState, PlayPlan};
pub use crate::registry::{
    common_extensions, extensions, is_valid_extension, is_virtual_filename, ExtensionFilter,
    FormatKind, FormatRegistry, VirtualName,
};
pub use crate::stream::{Stream, StreamBuilder, DEFAULT_BUFFER_FRAMES};
pub use crate::wav_output::{wav_to_file, wav_to_writer, ToWavError, WavWriter};

/// Library version packed as `major << 24 | minor << 16 | patch`.
///
/// # Examples
///
/// ```
/// let version = vgmdec::version();
/// assert_eq!(version >> 24, env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>().unwrap());
/// ```
pub fn version() -> u32 {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    (part(env!("CARGO_PKG_VERSION_MAJOR")) & 0xff) << 24
        | (part(env!("CARGO_PKG_VERSION_MINOR")) & 0xff) << 16
        | part(env!("CARGO_PKG_VERSION_PATCH")).min(0xffff)
}
