use std::time::Duration;

use crate::common::SampleRate;

/// Linear interpolation between two gains.
///
/// The result is equivalent to
/// `first * (1 - numerator / denominator) + second * numerator / denominator`.
#[inline]
pub fn lerp(first: f32, second: f32, numerator: u64, denominator: u64) -> f32 {
    if denominator == 0 {
        return second;
    }
    first + (second - first) * (numerator as f64 / denominator as f64) as f32
}

/// Number of whole frames covering `duration` at `sample_rate`, rounded to nearest.
///
/// Saturates at `u64::MAX`.
#[inline]
pub fn duration_to_frames(duration: Duration, sample_rate: SampleRate) -> u64 {
    (duration.as_secs_f64() * sample_rate as f64).round() as u64
}

/// Converts a frame count to a precise duration.
pub fn frames_to_duration(frames: u64, sample_rate: SampleRate) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let sample_rate = sample_rate as u64;
    let secs = frames / sample_rate;
    let nanos = ((frames % sample_rate) * 1_000_000_000) / sample_rate;
    Duration::new(secs, nanos as u32)
}

/// Formats a frame count as `m:ss.mmm`, the way stream descriptions print times.
pub fn format_time(frames: u64, sample_rate: SampleRate) -> String {
    let duration = frames_to_duration(frames, sample_rate);
    let millis = duration.as_millis();
    format!(
        "{}:{:02}.{:03}",
        millis / 60_000,
        (millis / 1000) % 60,
        millis % 1000
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{quickcheck, TestResult};

    quickcheck! {
        fn lerp_random(first: u16, second: u16, numerator: u16, denominator: u16) -> TestResult {
            if denominator == 0 || numerator > denominator {
                return TestResult::discard();
            }

            let a = first as f64;
            let b = second as f64;
            let c = numerator as f64 / denominator as f64;

            let reference = a * (1.0 - c) + b * c;
            let x = lerp(first as f32, second as f32, numerator as u64, denominator as u64) as f64;
            TestResult::from_bool((x - reference).abs() < 0.01)
        }
    }

    #[test]
    fn frames_to_duration_is_precise() {
        assert_eq!(frames_to_duration(44_100, 44_100), Duration::from_secs(1));
        assert_eq!(frames_to_duration(441, 44_100), Duration::from_millis(10));
        assert_eq!(frames_to_duration(0, 44_100), Duration::ZERO);
        assert_eq!(frames_to_duration(1, 44_100).as_nanos(), 22675);
        assert_eq!(frames_to_duration(100, 0), Duration::ZERO);
    }

    #[test]
    fn duration_round_trips_through_frames() {
        assert_eq!(duration_to_frames(Duration::from_secs(10), 8000), 80_000);
        assert_eq!(duration_to_frames(Duration::from_millis(500), 44_100), 22_050);
        assert_eq!(duration_to_frames(Duration::MAX, 44_100), u64::MAX);
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0, 8000), "0:00.000");
        assert_eq!(format_time(8000 * 75 + 4, 8000), "1:15.000");
        assert_eq!(format_time(12_000, 8000), "0:01.500");
    }
}
