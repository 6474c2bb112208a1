use std::collections::BTreeSet;

use super::{is_virtual_filename, FormatKind};

/// Extensions shared with general-purpose containers that other decoders in a
/// host application usually claim too.
const COMMON_EXTENSIONS: &[&str] = &["wav"];

/// Every extension claimed by an enabled format, sorted and deduplicated.
pub fn extensions() -> Vec<&'static str> {
    FormatKind::ALL
        .iter()
        .flat_map(|kind| kind.extensions().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The subset of [`extensions`] that overlaps common container types.
pub fn common_extensions() -> Vec<&'static str> {
    extensions()
        .into_iter()
        .filter(|ext| COMMON_EXTENSIONS.contains(ext))
        .collect()
}

/// How [`ExtensionFilter::is_valid`] treats names outside the known set.
///
/// # Examples
///
/// ```
/// use vgmdec::ExtensionFilter;
///
/// let filter = ExtensionFilter::default();
/// assert!(filter.is_valid("bgm_title.ADX"));
/// assert!(!filter.is_valid("cover.png"));
///
/// let strict = ExtensionFilter { accept_common: false, ..ExtensionFilter::default() };
/// assert!(!strict.is_valid("voice.wav"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtensionFilter {
    /// Accept any extension, known or not.
    pub accept_unknown: bool,
    /// Accept extensions listed by [`common_extensions`].
    pub accept_common: bool,
    /// Refuse filenames that have no extension at all.
    pub reject_extensionless: bool,
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self {
            accept_unknown: false,
            accept_common: true,
            reject_extensionless: false,
        }
    }
}

impl ExtensionFilter {
    /// Checks `name`, which may be a bare extension (`"adx"`) or a filename.
    ///
    /// A name holding neither a `.` nor a path separator is taken as a bare
    /// extension. The comparison ignores case. Virtual filenames are always valid.
    pub fn is_valid(&self, name: &str) -> bool {
        if is_virtual_filename(name) {
            return true;
        }
        let Some(ext) = extension_of(name) else {
            return !self.reject_extensionless;
        };
        let ext = ext.to_ascii_lowercase();
        if !self.accept_common && COMMON_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
        self.accept_unknown || extensions().contains(&ext.as_str())
    }
}

/// Checks `name` against the extension table with the default filter.
pub fn is_valid_extension(name: &str) -> bool {
    ExtensionFilter::default().is_valid(name)
}

/// Extension of `name`, `None` for extensionless filenames.
pub(crate) fn extension_of(name: &str) -> Option<&str> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let is_path = file.len() != name.len();
    match file.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        Some(_) => None,
        None if is_path || file.is_empty() => None,
        None => Some(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing() {
        assert_eq!(extension_of("adx"), Some("adx"));
        assert_eq!(extension_of("music/bgm.adx"), Some("adx"));
        assert_eq!(extension_of("dir.v2\\track"), None);
        assert_eq!(extension_of("name."), None);
        assert_eq!(extension_of(""), None);
    }

    #[cfg(feature = "wav")]
    #[test]
    fn common_extensions_are_known() {
        assert_eq!(common_extensions(), vec!["wav"]);
        assert!(extensions().contains(&"lwav"));
    }

    #[cfg(feature = "adx")]
    #[test]
    fn filter_flags() {
        let filter = ExtensionFilter::default();
        assert!(filter.is_valid("afs"));
        assert!(filter.is_valid("DATA/VOICE.AFS"));
        assert!(filter.is_valid("data/voice"));
        assert!(!filter.is_valid("txt"));

        let open = ExtensionFilter {
            accept_unknown: true,
            reject_extensionless: true,
            ..ExtensionFilter::default()
        };
        assert!(open.is_valid("readme.txt"));
        assert!(!open.is_valid("data/voice"));
        assert!(open.is_valid("data/bgm.adx #2.txtp"));
    }
}
