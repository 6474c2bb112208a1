use std::time::Duration;

use crate::config::PlaybackHints;
use crate::error::{Error, Result};

const SUFFIX: &str = ".txtp";

/// Returns true if `name` is a virtual filename: its last path component
/// ends in `.txtp` (any case) and carries `#` options.
///
/// # Examples
///
/// ```
/// assert!(vgmdec::is_virtual_filename("bgm.afs #3 l1.5.txtp"));
/// assert!(!vgmdec::is_virtual_filename("bgm.txtp"));
/// ```
pub fn is_virtual_filename(name: &str) -> bool {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file.contains('#') && has_suffix(file)
}

fn has_suffix(name: &str) -> bool {
    name.len() >= SUFFIX.len()
        && name.is_char_boundary(name.len() - SUFFIX.len())
        && name[name.len() - SUFFIX.len()..].eq_ignore_ascii_case(SUFFIX)
}

/// A virtual filename split into the real file and its playback options.
///
/// The syntax is `base #opt #opt.txtp`, options being separated by `#` or
/// whitespace:
///
/// | option | effect |
/// |---|---|
/// | `N`, `sN` | subsong `N` |
/// | `lX` | loop count `X` |
/// | `i` | ignore the loop |
/// | `e` | force a loop over the whole stream |
/// | `fX` | fade time of `X` seconds |
/// | `dX` | fade delay of `X` seconds |
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualName {
    /// The file holding the audio, with any leading directories kept.
    pub base: String,
    /// Subsong selected by the name, if any.
    pub subsong: Option<u32>,
    /// Playback options carried by the name.
    pub hints: PlaybackHints,
}

impl VirtualName {
    /// Parses `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is not a virtual filename,
    /// names no base file, or carries an option that cannot be parsed.
    pub fn parse(name: &str) -> Result<VirtualName> {
        if !is_virtual_filename(name) {
            return Err(Error::InvalidArgument(format!(
                "'{name}' is not a virtual filename"
            )));
        }
        let stem = &name[..name.len() - SUFFIX.len()];
        let (base, options) = stem.split_once('#').unwrap_or((stem, ""));
        let base = base.trim_end();
        if base.is_empty() || base.ends_with(['/', '\\']) {
            return Err(Error::InvalidArgument(format!(
                "'{name}' does not name a file"
            )));
        }

        let mut parsed = VirtualName {
            base: base.to_owned(),
            subsong: None,
            hints: PlaybackHints::default(),
        };
        for option in options
            .split(|c: char| c == '#' || c.is_whitespace())
            .filter(|o| !o.is_empty())
        {
            parsed.apply(option)?;
        }
        Ok(parsed)
    }

    fn apply(&mut self, option: &str) -> Result<()> {
        let bad = || Error::InvalidArgument(format!("bad virtual filename option '{option}'"));
        let seconds = |value: &str| {
            value
                .parse::<f64>()
                .ok()
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .ok_or_else(bad)
        };

        if option.bytes().all(|b| b.is_ascii_digit()) {
            self.subsong = Some(option.parse().map_err(|_| bad())?);
            return Ok(());
        }
        let mut chars = option.chars();
        let key = chars.next().ok_or_else(bad)?;
        let value = chars.as_str();
        match key {
            's' => self.subsong = Some(value.parse().map_err(|_| bad())?),
            'l' => self.hints.loop_count = Some(value.parse().map_err(|_| bad())?),
            'i' if value.is_empty() => self.hints.ignore_loop = true,
            'e' if value.is_empty() => self.hints.force_loop = true,
            'f' => self.hints.fade_time = Some(seconds(value)?),
            'd' => self.hints.fade_delay = Some(seconds(value)?),
            _ => return Err(bad()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bgm.adx #2.txtp", true)]
    #[case("dir/bgm.adx#l3.TXTP", true)]
    #[case("bgm.txtp", false)]
    #[case("dir#1/bgm.txtp", false)]
    #[case("bgm.adx #2.txt", false)]
    fn virtual_detection(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_virtual_filename(name), expected);
    }

    #[test]
    fn parses_every_option() {
        let name = VirtualName::parse("music/bgm.afs #s3 #l1.5 i e #f4.5 d1.txtp").unwrap();
        assert_eq!(name.base, "music/bgm.afs");
        assert_eq!(name.subsong, Some(3));
        assert_eq!(name.hints.loop_count, Some(1.5));
        assert!(name.hints.ignore_loop);
        assert!(name.hints.force_loop);
        assert_eq!(name.hints.fade_time, Some(Duration::from_millis(4500)));
        assert_eq!(name.hints.fade_delay, Some(Duration::from_secs(1)));
    }

    #[test]
    fn bare_number_is_subsong() {
        let name = VirtualName::parse("voice.afs#12.txtp").unwrap();
        assert_eq!(name.base, "voice.afs");
        assert_eq!(name.subsong, Some(12));
        assert_eq!(name.hints, PlaybackHints::default());
    }

    #[rstest]
    #[case("#2.txtp")]
    #[case("bgm.adx #lx.txtp")]
    #[case("bgm.adx #f-1.txtp")]
    #[case("bgm.adx #z.txtp")]
    #[case("bgm.adx.txtp")]
    fn rejects(#[case] name: &str) {
        assert!(matches!(
            VirtualName::parse(name),
            Err(Error::InvalidArgument(_))
        ));
    }
}
