//! Playback configuration.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::format::SampleFormat;

/// Default number of times a loop body is played.
pub const DEFAULT_LOOP_COUNT: f64 = 2.0;
/// Default length of the fade-out applied after the last loop.
pub const DEFAULT_FADE_TIME: Duration = Duration::from_secs(10);

/// Options controlling how a stream loops, fades and is presented.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vgmdec::Config;
///
/// let config = Config {
///     loop_count: 3.0,
///     fade_time: Duration::from_secs(5),
///     ..Config::default()
/// };
/// assert!(!config.ignore_loop);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Ignore playback hints embedded in the format or a virtual filename.
    pub disable_config_override: bool,
    /// Allow `play_forever` to take effect.
    pub allow_play_forever: bool,
    /// Loop endlessly instead of fading out. Needs `allow_play_forever`.
    pub play_forever: bool,
    /// Discard loop points and play the stream once from start to end.
    pub ignore_loop: bool,
    /// Loop the whole stream when the format declares no loop.
    pub force_loop: bool,
    /// Loop the whole stream even when the format declares a loop, and ignore
    /// any play-forever or no-loop signal the format carries.
    pub really_force_loop: bool,
    /// Stop right after the last loop, then play the post-loop tail, without fading.
    pub ignore_fade: bool,
    /// Times the loop body is played. Fractional values play part of the last pass.
    pub loop_count: f64,
    /// Length of the fade-out.
    pub fade_time: Duration,
    /// Unfaded playback inserted between the last loop and the fade.
    pub fade_delay: Duration,
    /// Selects one stereo pair (1-based) out of a multi-track stream; 0 disables.
    pub stereo_track: u16,
    /// Downmixes to at most this many channels; 0 disables.
    pub auto_downmix_channels: u16,
    /// Overrides the codec's natural output encoding.
    pub force_sample_format: Option<SampleFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disable_config_override: false,
            allow_play_forever: false,
            play_forever: false,
            ignore_loop: false,
            force_loop: false,
            really_force_loop: false,
            ignore_fade: false,
            loop_count: DEFAULT_LOOP_COUNT,
            fade_time: DEFAULT_FADE_TIME,
            fade_delay: Duration::ZERO,
            stereo_track: 0,
            auto_downmix_channels: 0,
            force_sample_format: None,
        }
    }
}

impl Config {
    /// Checks values that cannot be represented by the loop and fade processor.
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.loop_count.is_finite() || self.loop_count <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "loop count must be a positive number, got {}",
                self.loop_count
            )));
        }
        Ok(())
    }

    /// Applies `hints` on top of this config, unless overrides are disabled.
    pub(crate) fn with_hints(&self, hints: &PlaybackHints) -> Config {
        let mut merged = self.clone();
        if self.disable_config_override {
            return merged;
        }
        if let Some(loop_count) = hints.loop_count {
            merged.loop_count = loop_count;
        }
        if let Some(fade_time) = hints.fade_time {
            merged.fade_time = fade_time;
        }
        if let Some(fade_delay) = hints.fade_delay {
            merged.fade_delay = fade_delay;
        }
        if hints.force_loop {
            merged.force_loop = true;
        }
        if !self.really_force_loop {
            if hints.ignore_loop {
                merged.ignore_loop = true;
            }
            if let Some(play_forever) = hints.play_forever {
                merged.play_forever = play_forever;
            }
        }
        merged
    }
}

/// Playback preferences carried by the data itself rather than the caller.
///
/// Formats embed these (for example a RIFF sampler chunk's play count), and so
/// do virtual filenames. They take precedence over [`Config`] unless
/// [`Config::disable_config_override`] is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackHints {
    pub loop_count: Option<f64>,
    pub fade_time: Option<Duration>,
    pub fade_delay: Option<Duration>,
    pub play_forever: Option<bool>,
    pub ignore_loop: bool,
    pub force_loop: bool,
}

impl PlaybackHints {
    /// Combines two sets of hints, `other` winning where both set a value.
    pub(crate) fn merge(mut self, other: &PlaybackHints) -> PlaybackHints {
        self.loop_count = other.loop_count.or(self.loop_count);
        self.fade_time = other.fade_time.or(self.fade_time);
        self.fade_delay = other.fade_delay.or(self.fade_delay);
        self.play_forever = other.play_forever.or(self.play_forever);
        self.ignore_loop |= other.ignore_loop;
        self.force_loop |= other.force_loop;
        self
    }
}
