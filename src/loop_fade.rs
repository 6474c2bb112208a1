//! Loop and fade policy.
//!
//! Playback runs on a *play position*, counted in frames from the start of
//! playback. [`PlayPlan`] maps every play position to the stream frame that is
//! heard there and to the gain applied to it:
//!
//! ```text
//! stream:   [0 ......... ls ====== le ...... N)
//! playback: [0 ......... ls ====== le|ls ====== le|ls === ...]
//!                               loop body repeats
//! ```
//!
//! After the configured number of passes either the post-loop tail plays
//! (`ignore_fade`), or looping continues through the fade delay and a linear
//! fade-out.

use crate::common::{Sample, SampleRate};
use crate::config::Config;
use crate::format::LoopPoints;
use crate::math::{duration_to_frames, lerp};

/// How a stream with `stream_frames` frames is played back.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayPlan {
    stream_frames: u64,
    loop_points: Option<LoopPoints>,
    /// Frames spent in the loop body, over all passes.
    looped_frames: u64,
    fade_delay: u64,
    fade_frames: u64,
    /// After the last pass the post-loop tail plays instead of a fade.
    play_tail: bool,
    play_forever: bool,
}

impl PlayPlan {
    /// Resolves the loop in effect and the play length from `config`.
    ///
    /// A declared loop that does not fit the stream is discarded.
    pub fn new(
        stream_frames: u64,
        declared: Option<LoopPoints>,
        config: &Config,
        sample_rate: SampleRate,
    ) -> Self {
        let declared = declared.filter(|points| {
            let valid = points.is_valid_for(stream_frames);
            #[cfg(feature = "tracing")]
            if !valid {
                tracing::warn!(
                    start = points.start,
                    end = points.end,
                    stream_frames,
                    "discarding invalid loop points"
                );
            }
            valid
        });
        let whole = (stream_frames > 0).then_some(LoopPoints {
            start: 0,
            end: stream_frames,
        });
        let loop_points = if config.really_force_loop {
            whole
        } else if config.ignore_loop {
            None
        } else if config.force_loop {
            declared.or(whole)
        } else {
            declared
        };

        let play_forever =
            loop_points.is_some() && config.allow_play_forever && config.play_forever;
        let looped_frames = loop_points.map_or(0, |points| {
            (points.len() as f64 * config.loop_count).round() as u64
        });
        let (fade_delay, fade_frames) = if config.ignore_fade || play_forever {
            (0, 0)
        } else {
            (
                duration_to_frames(config.fade_delay, sample_rate),
                duration_to_frames(config.fade_time, sample_rate),
            )
        };

        PlayPlan {
            stream_frames,
            loop_points,
            looped_frames,
            fade_delay,
            fade_frames,
            play_tail: config.ignore_fade,
            play_forever,
        }
    }

    /// Loop in effect, if any.
    #[inline]
    pub fn loop_points(&self) -> Option<LoopPoints> {
        self.loop_points
    }

    /// Whether playback never ends.
    #[inline]
    pub fn play_forever(&self) -> bool {
        self.play_forever
    }

    /// Frames played in total, `u64::MAX` when playing forever.
    ///
    /// Loop counts and fades too long to count in frames saturate at `u64::MAX`.
    pub fn play_frames(&self) -> u64 {
        match self.loop_points {
            _ if self.play_forever => u64::MAX,
            None => self.stream_frames,
            Some(points) if self.play_tail => self
                .looping_end(points)
                .saturating_add(self.stream_frames - points.end),
            Some(points) => self
                .looping_end(points)
                .saturating_add(self.fade_delay)
                .saturating_add(self.fade_frames),
        }
    }

    /// Play position where the configured passes through the loop end.
    fn looping_end(&self, points: LoopPoints) -> u64 {
        points.start.saturating_add(self.looped_frames)
    }

    /// Play position where the fade-out begins, if there is one.
    pub fn fade_start(&self) -> Option<u64> {
        match self.loop_points {
            Some(points) if !self.play_tail && !self.play_forever => {
                Some(self.looping_end(points).saturating_add(self.fade_delay))
            }
            _ => None,
        }
    }

    /// End of the looping section, after which the tail plays.
    fn tail_start(&self, points: LoopPoints) -> Option<u64> {
        self.play_tail.then(|| self.looping_end(points))
    }

    /// Stream frame heard at play position `p`.
    pub fn source_frame(&self, p: u64) -> u64 {
        let Some(points) = self.loop_points else {
            return p;
        };
        if p < points.start {
            return p;
        }
        match self.tail_start(points) {
            Some(tail) if p >= tail => points.end + (p - tail),
            _ => points.start + (p - points.start) % points.len(),
        }
    }

    /// Number of frames, up to `max`, that can be read from the stream in one
    /// go starting at play position `p`.
    ///
    /// Runs stop at the loop start, the loop end and the end of playback.
    pub fn contiguous_frames(&self, p: u64, max: usize) -> usize {
        let play_frames = self.play_frames();
        if p >= play_frames {
            return 0;
        }
        let mut limit = play_frames - p;
        if let Some(points) = self.loop_points {
            let source = self.source_frame(p);
            limit = limit.min(if p < points.start {
                points.start - p
            } else {
                match self.tail_start(points) {
                    Some(tail) if p >= tail => self.stream_frames - source,
                    Some(tail) => (points.end - source).min(tail - p),
                    None => points.end - source,
                }
            });
        }
        limit.min(max as u64) as usize
    }

    /// Gain at play position `p`.
    pub fn gain(&self, p: u64) -> f32 {
        match self.fade_start() {
            Some(start) if p >= start => lerp(1.0, 0.0, p - start, self.fade_frames),
            _ => 1.0,
        }
    }

    fn done_at(&self, p: u64) -> bool {
        !self.play_forever && p >= self.play_frames()
    }

    /// Loop bookkeeping at play position `p`.
    pub fn state_at(&self, p: u64) -> LoopState {
        let current_loop = self.loop_points.map_or(0, |points| {
            let looping = match self.tail_start(points) {
                Some(tail) => p.min(tail),
                None => p,
            };
            looping.saturating_sub(points.start) / points.len()
        });
        let fade_start = self.fade_start();
        let fade_progress = match fade_start {
            Some(_) if self.fade_frames == 0 && self.done_at(p) => 1.0,
            Some(start) if p > start && self.fade_frames > 0 => {
                ((p - start) as f64 / self.fade_frames as f64).min(1.0) as f32
            }
            _ => 0.0,
        };
        LoopState {
            current_loop,
            fade_start,
            fade_progress,
        }
    }
}

/// Where playback stands relative to the loop and the fade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopState {
    /// Completed passes through the loop body.
    pub current_loop: u64,
    /// Play position where the fade-out begins.
    pub fade_start: Option<u64>,
    /// How far the fade-out has progressed, from 0.0 to 1.0.
    pub fade_progress: f32,
}

/// Tracks the play position and applies the loop and fade policy.
#[derive(Clone, Debug)]
pub struct LoopFadeProcessor {
    plan: PlayPlan,
    position: u64,
}

impl LoopFadeProcessor {
    pub fn new(plan: PlayPlan) -> Self {
        Self { plan, position: 0 }
    }

    #[inline]
    pub fn plan(&self) -> &PlayPlan {
        &self.plan
    }

    /// Current play position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn play_frames(&self) -> u64 {
        self.plan.play_frames()
    }

    /// Whether the end of playback has been reached.
    #[inline]
    pub fn done(&self) -> bool {
        self.plan.done_at(self.position)
    }

    /// Stream frame to decode next.
    #[inline]
    pub fn source_frame(&self) -> u64 {
        self.plan.source_frame(self.position)
    }

    /// Frames that can be decoded contiguously from the current position.
    #[inline]
    pub fn contiguous_frames(&self, max: usize) -> usize {
        self.plan.contiguous_frames(self.position, max)
    }

    /// Applies the fade to interleaved `samples` starting at the current position.
    pub fn apply(&self, samples: &mut [Sample], channels: usize) {
        let Some(start) = self.plan.fade_start() else {
            return;
        };
        let frames = (samples.len() / channels) as u64;
        if self.position + frames <= start {
            return;
        }
        for (i, frame) in samples.chunks_exact_mut(channels).enumerate() {
            let gain = self.plan.gain(self.position + i as u64);
            if gain != 1.0 {
                frame.iter_mut().for_each(|s| *s *= gain);
            }
        }
    }

    /// Moves the play position forward by `frames`.
    #[inline]
    pub fn advance(&mut self, frames: usize) {
        self.position += frames as u64;
    }

    /// Moves to play position `p`, clamped to the end of playback.
    pub fn seek(&mut self, p: u64) -> u64 {
        self.position = p.min(self.plan.play_frames());
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Loop bookkeeping at the current position.
    pub fn state(&self) -> LoopState {
        self.plan.state_at(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::time::Duration;

    fn plan(loop_points: Option<(u64, u64)>, config: Config) -> PlayPlan {
        PlayPlan::new(
            1000,
            loop_points.map(|(start, end)| LoopPoints { start, end }),
            &config,
            100,
        )
    }

    fn fade(loop_count: f64, fade_secs: u64, delay_secs: u64) -> Config {
        Config {
            loop_count,
            fade_time: Duration::from_secs(fade_secs),
            fade_delay: Duration::from_secs(delay_secs),
            ..Config::default()
        }
    }

    fn tail(loop_count: f64) -> Config {
        Config {
            loop_count,
            ignore_fade: true,
            ..Config::default()
        }
    }

    #[test]
    fn no_loop_plays_once() {
        let plan = plan(None, Config::default());
        assert_eq!(plan.play_frames(), 1000);
        assert_eq!(plan.source_frame(999), 999);
        assert_eq!(plan.gain(999), 1.0);
        assert_eq!(plan.contiguous_frames(900, 512), 100);
    }

    #[test]
    fn loop_then_tail() {
        let plan = plan(Some((100, 300)), tail(2.0));
        assert_eq!(plan.play_frames(), 100 + 400 + 700);
        assert_eq!(plan.source_frame(299), 299);
        assert_eq!(plan.source_frame(300), 100);
        assert_eq!(plan.source_frame(499), 299);
        assert_eq!(plan.source_frame(500), 300);
        assert_eq!(plan.contiguous_frames(250, 1000), 50);
        assert_eq!(plan.contiguous_frames(300, 1000), 200);
        assert_eq!(plan.contiguous_frames(500, 1000), 700);
    }

    #[test]
    fn fractional_pass_cuts_to_tail() {
        let plan = plan(Some((100, 300)), tail(1.5));
        assert_eq!(plan.play_frames(), 100 + 300 + 700);
        assert_eq!(plan.source_frame(399), 199);
        assert_eq!(plan.source_frame(400), 300);
        assert_eq!(plan.contiguous_frames(350, 1000), 50);
    }

    #[test]
    fn loop_then_fade() {
        let plan = plan(Some((100, 300)), fade(2.0, 2, 1));
        // intro, two passes, one second of delay, two seconds of fade
        assert_eq!(plan.play_frames(), 100 + 400 + 100 + 200);
        assert_eq!(plan.fade_start(), Some(600));
        // looping carries on through delay and fade
        assert_eq!(plan.source_frame(650), 150);
        assert_eq!(plan.gain(599), 1.0);
        assert_eq!(plan.gain(600), 1.0);
        assert_eq!(plan.gain(700), 0.5);
        assert_eq!(plan.contiguous_frames(780, 1000), 20);
    }

    #[test]
    fn forced_and_ignored_loops() {
        let forced = plan(
            None,
            Config {
                force_loop: true,
                ..tail(1.0)
            },
        );
        assert_eq!(forced.loop_points(), Some(LoopPoints { start: 0, end: 1000 }));

        let ignored = plan(
            Some((100, 300)),
            Config {
                ignore_loop: true,
                ..Config::default()
            },
        );
        assert_eq!(ignored.loop_points(), None);
        assert_eq!(ignored.play_frames(), 1000);

        let really = plan(
            Some((100, 300)),
            Config {
                really_force_loop: true,
                ignore_loop: true,
                ..Config::default()
            },
        );
        assert_eq!(really.loop_points(), Some(LoopPoints { start: 0, end: 1000 }));
    }

    #[test]
    fn invalid_loop_is_discarded() {
        assert_eq!(plan(Some((300, 100)), Config::default()).loop_points(), None);
        assert_eq!(plan(Some((100, 1001)), Config::default()).loop_points(), None);
    }

    #[test]
    fn play_forever_needs_permission_and_a_loop() {
        let forever = Config {
            play_forever: true,
            allow_play_forever: true,
            ..Config::default()
        };
        let looping = plan(Some((100, 300)), forever.clone());
        assert!(looping.play_forever());
        assert_eq!(looping.fade_start(), None);
        assert_eq!(looping.source_frame(100 + 200 * 1000 + 5), 105);

        assert!(!plan(None, forever).play_forever());
        let denied = Config {
            play_forever: true,
            ..Config::default()
        };
        assert!(!plan(Some((100, 300)), denied).play_forever());
    }

    #[test]
    fn loop_state_follows_position() {
        let plan = plan(Some((100, 300)), fade(2.0, 2, 0));
        let mut processor = LoopFadeProcessor::new(plan);
        assert_eq!(processor.state().current_loop, 0);
        processor.seek(350);
        assert_eq!(processor.state().current_loop, 1);
        processor.seek(600);
        let state = processor.state();
        assert_eq!(state.current_loop, 2);
        assert_eq!(state.fade_start, Some(500));
        assert_eq!(state.fade_progress, 0.5);

        processor.seek(10_000);
        assert!(processor.done());
        assert_eq!(processor.position(), 700);
        processor.reset();
        let fresh = LoopFadeProcessor::new(processor.plan().clone());
        assert_eq!(processor.state(), fresh.state());
    }

    #[test]
    fn apply_scales_frames_in_the_fade() {
        let plan = plan(Some((100, 300)), fade(1.0, 2, 0));
        let mut processor = LoopFadeProcessor::new(plan);
        processor.seek(400);
        let mut samples = vec![1.0; 4];
        processor.apply(&mut samples, 2);
        assert_eq!(samples[..2], [0.5, 0.5]);
        assert_abs_diff_eq!(samples[2], 0.495, epsilon = 1e-6);
        assert_eq!(samples[2], samples[3]);
    }
}
