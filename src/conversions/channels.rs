use crate::common::{ChannelCount, Sample};
use crate::error::{Error, Result};

/// Maps decoded frames from the source's channel layout to the one handed
/// out, selecting a stereo track and then downmixing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMapper {
    from: ChannelCount,
    /// First input channel of the selected track, with the track's width.
    track: Option<(usize, usize)>,
    to: ChannelCount,
}

impl ChannelMapper {
    /// Builds a mapper for `from` input channels.
    ///
    /// `stereo_track` picks the 1-based pair `2k-2, 2k-1` when non-zero. A
    /// non-zero `downmix` then folds the remaining channels down to at most
    /// that many: output channel `o` is the mean of every input channel `i`
    /// with `i % downmix == o`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the selected track lies outside the
    /// input channels.
    pub fn new(from: ChannelCount, stereo_track: u16, downmix: u16) -> Result<Self> {
        let mut current = from;
        let track = if stereo_track > 0 {
            let first = (stereo_track as usize - 1) * 2;
            if first + 2 > from as usize {
                return Err(Error::InvalidArgument(format!(
                    "stereo track {stereo_track} needs {} channels, the stream has {from}",
                    first + 2
                )));
            }
            current = 2;
            Some((first, 2))
        } else {
            None
        };
        let to = if downmix > 0 && current > downmix {
            downmix
        } else {
            current
        };
        Ok(ChannelMapper { from, track, to })
    }

    /// Channels read from the source.
    #[inline]
    pub fn input_channels(&self) -> ChannelCount {
        self.from
    }

    /// Channels produced.
    #[inline]
    pub fn output_channels(&self) -> ChannelCount {
        self.to
    }

    /// Whether frames pass through untouched.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.track.is_none() && self.from == self.to
    }

    /// Appends the mapped form of the interleaved `input` frames to `out`.
    pub fn map(&self, input: &[Sample], out: &mut Vec<Sample>) {
        if self.is_identity() {
            out.extend_from_slice(input);
            return;
        }
        let (first, width) = self.track.unwrap_or((0, self.from as usize));
        let to = self.to as usize;
        for frame in input.chunks_exact(self.from as usize) {
            let selected = &frame[first..first + width];
            if width == to {
                out.extend_from_slice(selected);
                continue;
            }
            for o in 0..to {
                let (sum, count) = selected
                    .iter()
                    .skip(o)
                    .step_by(to)
                    .fold((0.0, 0u32), |(sum, count), s| (sum + s, count + 1));
                out.push(sum / count as Sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(mapper: &ChannelMapper, input: &[Sample]) -> Vec<Sample> {
        let mut out = Vec::new();
        mapper.map(input, &mut out);
        out
    }

    #[test]
    fn passthrough() {
        let mapper = ChannelMapper::new(2, 0, 0).unwrap();
        assert!(mapper.is_identity());
        assert_eq!(map(&mapper, &[0.1, 0.2, 0.3, 0.4]), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn selects_stereo_track() {
        let mapper = ChannelMapper::new(6, 2, 0).unwrap();
        assert_eq!(mapper.output_channels(), 2);
        let frame = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(map(&mapper, &frame), vec![0.2, 0.3]);
    }

    #[test]
    fn track_out_of_range() {
        assert!(matches!(
            ChannelMapper::new(4, 3, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ChannelMapper::new(1, 1, 0).is_err());
    }

    #[test]
    fn downmix_averages_folded_channels() {
        let mapper = ChannelMapper::new(4, 0, 2).unwrap();
        assert_eq!(mapper.output_channels(), 2);
        assert_eq!(map(&mapper, &[0.25, 0.5, 0.75, 1.0]), vec![0.5, 0.75]);

        let mono = ChannelMapper::new(2, 0, 1).unwrap();
        assert_eq!(map(&mono, &[0.5, -0.5, 1.0, 0.0]), vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_never_adds_channels() {
        let mapper = ChannelMapper::new(2, 0, 6).unwrap();
        assert!(mapper.is_identity());
    }

    #[test]
    fn track_then_downmix() {
        let mapper = ChannelMapper::new(4, 2, 1).unwrap();
        assert_eq!(map(&mapper, &[0.0, 0.0, 0.5, 0.25]), vec![0.375]);
    }
}
