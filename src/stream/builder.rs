//! Builder for opening a [`Stream`] with custom settings.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use vgmdec::Stream;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stream = Stream::builder()
//!         .with_path("bgm/title.adx")
//!         .with_loop_count(3.0)
//!         .with_fade_time(Duration::from_secs(5))
//!         .build()?;
//!
//!     while !stream.done() {
//!         let pcm = stream.render()?;
//!         // hand `pcm` to the output...
//!         # let _ = pcm;
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::codec::CodecDecoder;
use crate::config::{Config, PlaybackHints};
use crate::conversions::ChannelMapper;
use crate::error::{Error, Result};
use crate::format::{SampleFormat, StreamFormat};
use crate::io::{ByteSource, FileSource, SubSource};
use crate::loop_fade::{LoopFadeProcessor, PlayPlan};
use crate::registry::{is_virtual_filename, FormatRegistry, VirtualName};

use super::{Loaded, Stream};

/// Frames rendered per call to [`Stream::render`] unless configured otherwise.
pub const DEFAULT_BUFFER_FRAMES: usize = 1024;

pub(crate) type DecodeErrorCallback = Box<dyn FnMut(Error) + Send>;

fn default_decode_error_callback(err: Error) {
    #[cfg(feature = "tracing")]
    tracing::warn!("recovered from decode error: {err}");
    #[cfg(not(feature = "tracing"))]
    eprintln!("recovered from decode error: {err}");
}

enum Input {
    Source(Box<dyn ByteSource + Send>),
    Path(PathBuf),
}

/// Builder for configuring and opening a [`Stream`].
#[must_use]
pub struct StreamBuilder {
    input: Option<Input>,
    subsong: u32,
    hint: Option<String>,
    config: Config,
    registry: FormatRegistry,
    buffer_frames: usize,
    on_decode_error: DecodeErrorCallback,
}

impl fmt::Debug for StreamBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuilder")
            .field(
                "input",
                &self.input.as_ref().map(|input| match input {
                    Input::Source(src) => src.name().to_owned(),
                    Input::Path(path) => path.display().to_string(),
                }),
            )
            .field("subsong", &self.subsong)
            .field("hint", &self.hint)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("buffer_frames", &self.buffer_frames)
            .finish_non_exhaustive()
    }
}

impl Default for StreamBuilder {
    fn default() -> Self {
        Self {
            input: None,
            subsong: 0,
            hint: None,
            config: Config::default(),
            registry: FormatRegistry::default(),
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            on_decode_error: Box::new(default_decode_error_callback),
        }
    }
}

impl StreamBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the stream from `source`.
    pub fn with_source(mut self, source: impl ByteSource + Send + 'static) -> Self {
        self.input = Some(Input::Source(Box::new(source)));
        self
    }

    /// Reads the stream from the file at `path`, which may be a virtual filename.
    ///
    /// The file extension is used as the format hint unless one is set with
    /// [`with_hint`](Self::with_hint).
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(Input::Path(path.into()));
        self
    }

    /// Selects a subsong, 1-based. 0, the default, selects the first one.
    pub fn with_subsong(mut self, subsong: u32) -> Self {
        self.subsong = subsong;
        self
    }

    /// Extension (or filename) hint tried before magic-byte sniffing.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Replaces the whole playback configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Restricts or reorders the formats tried.
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Frames rendered per call to [`Stream::render`].
    pub fn with_buffer_frames(mut self, frames: usize) -> Self {
        self.buffer_frames = frames;
        self
    }

    /// Called with every payload error the decoder recovered from.
    ///
    /// By default these are logged.
    pub fn with_decode_error_callback(
        mut self,
        callback: impl FnMut(Error) + Send + 'static,
    ) -> Self {
        self.on_decode_error = Box::new(callback);
        self
    }

    pub fn with_disable_config_override(mut self, disable: bool) -> Self {
        self.config.disable_config_override = disable;
        self
    }

    pub fn with_allow_play_forever(mut self, allow: bool) -> Self {
        self.config.allow_play_forever = allow;
        self
    }

    pub fn with_play_forever(mut self, play_forever: bool) -> Self {
        self.config.play_forever = play_forever;
        self
    }

    pub fn with_ignore_loop(mut self, ignore: bool) -> Self {
        self.config.ignore_loop = ignore;
        self
    }

    pub fn with_force_loop(mut self, force: bool) -> Self {
        self.config.force_loop = force;
        self
    }

    pub fn with_really_force_loop(mut self, force: bool) -> Self {
        self.config.really_force_loop = force;
        self
    }

    pub fn with_ignore_fade(mut self, ignore: bool) -> Self {
        self.config.ignore_fade = ignore;
        self
    }

    pub fn with_loop_count(mut self, loop_count: f64) -> Self {
        self.config.loop_count = loop_count;
        self
    }

    pub fn with_fade_time(mut self, fade_time: Duration) -> Self {
        self.config.fade_time = fade_time;
        self
    }

    pub fn with_fade_delay(mut self, fade_delay: Duration) -> Self {
        self.config.fade_delay = fade_delay;
        self
    }

    pub fn with_stereo_track(mut self, track: u16) -> Self {
        self.config.stereo_track = track;
        self
    }

    pub fn with_auto_downmix_channels(mut self, channels: u16) -> Self {
        self.config.auto_downmix_channels = channels;
        self
    }

    pub fn with_sample_format(mut self, format: SampleFormat) -> Self {
        self.config.force_sample_format = Some(format);
        self
    }

    /// Probes the input and opens the stream.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a missing input or unusable settings
    /// - [`Error::UnsupportedFormat`] when no recognizer claims the data
    /// - [`Error::CorruptHeader`] when the claiming recognizer rejects the header
    /// - [`Error::SubsongOutOfRange`] for a subsong the data does not have
    /// - [`Error::Io`] when the input cannot be read
    pub fn build(self) -> Result<Stream> {
        if self.buffer_frames == 0 {
            return Err(Error::InvalidArgument(
                "render buffer must hold at least one frame".to_owned(),
            ));
        }
        self.config.validate()?;

        let mut subsong = self.subsong;
        let mut hint = self.hint;
        let mut name_hints = PlaybackHints::default();
        let mut source: Box<dyn ByteSource + Send> = match self.input {
            None => return Err(Error::InvalidArgument("no input to open".to_owned())),
            Some(Input::Source(source)) => source,
            Some(Input::Path(path)) => {
                let path_str = path.to_string_lossy();
                let path = if is_virtual_filename(&path_str) {
                    let virtual_name = VirtualName::parse(&path_str)?;
                    if subsong == 0 {
                        subsong = virtual_name.subsong.unwrap_or(0);
                    }
                    name_hints = virtual_name.hints;
                    PathBuf::from(virtual_name.base)
                } else {
                    path.clone()
                };
                if hint.is_none() {
                    hint = Some(path.to_string_lossy().into_owned());
                }
                Box::new(FileSource::open(&path)?)
            }
        };

        let (kind, probed) = self
            .registry
            .probe(&mut *source, hint.as_deref(), subsong)?;
        let info = probed.info;
        if let Some((offset, len)) = probed.window {
            let name = format!("{}#{}", source.name(), info.subsong_index);
            source = Box::new(SubSource::new(source, offset, len, name)?);
        }

        let config = self.config.with_hints(&probed.hints.merge(&name_hints));
        config.validate()?;
        let mapper = ChannelMapper::new(
            info.channels,
            config.stereo_track,
            config.auto_downmix_channels,
        )?;
        let plan = PlayPlan::new(
            info.stream_frames,
            info.loop_points,
            &config,
            info.sample_rate,
        );

        let codec = probed.codec;
        let sample_format = config.force_sample_format.unwrap_or(info.sample_format);
        let channels = mapper.output_channels();
        let bitrate = if info.stream_frames == 0 {
            0
        } else {
            let bits = codec.payload_bytes().saturating_mul(8);
            let rate = bits.saturating_mul(info.sample_rate as u64) / info.stream_frames / 1000;
            u32::try_from(rate).unwrap_or(u32::MAX)
        };
        let format = StreamFormat {
            channels,
            input_channels: info.channels,
            sample_rate: info.sample_rate,
            sample_format,
            frame_size: channels as usize * sample_format.bytes_per_sample(),
            stream_frames: info.stream_frames,
            play_frames: plan.play_frames(),
            play_forever: plan.play_forever(),
            loop_points: plan.loop_points(),
            subsong_index: info.subsong_index,
            subsong_count: info.subsong_count,
            codec_name: codec.name(),
            layout_name: codec.layout_name(),
            meta_name: info.meta_name,
            stream_name: info.stream_name,
            codec_frame_bytes: codec.frame_bytes(),
            bitrate,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            format = kind.name(),
            codec = format.codec_name,
            channels = format.channels,
            sample_rate = format.sample_rate,
            play_frames = format.play_frames,
            "opened '{}'",
            source.name()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = kind;

        let decoder = CodecDecoder::new(codec, info.channels, info.stream_frames);
        Ok(Stream {
            loaded: Some(Loaded {
                source,
                decoder,
                loop_start_snapshot: None,
                mapper,
                buffer_frames: self.buffer_frames,
                decoded: Vec::new(),
                samples: Vec::new(),
                bytes: Vec::new(),
            }),
            processor: LoopFadeProcessor::new(plan),
            format,
            on_decode_error: self.on_decode_error,
            recovered_errors: 0,
        })
    }
}
