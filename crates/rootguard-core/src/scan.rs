//! Line matchers used by stream-scanning probes.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatcher {
    /// A `mount` line for `mount_point` that is not marked read-only.
    WritableMount { mount_point: String },
    /// A `/proc/<pid>/maps` line whose pathname contains one of `markers`.
    MapsMarker { markers: Vec<String> },
    ContainsIgnoreCase { needle: String },
}

impl LineMatcher {
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::WritableMount { mount_point } => is_writable_mount_line(line, mount_point),
            Self::MapsMarker { markers } => maps_line_marker(line, markers).is_some(),
            Self::ContainsIgnoreCase { needle } => contains_ignore_case(line, needle),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::WritableMount { mount_point } => format!("{} mounted without ro", mount_point),
            Self::MapsMarker { markers } => format!("maps marker in [{}]", markers.join(", ")),
            Self::ContainsIgnoreCase { needle } => format!("'{}' (case-insensitive)", needle),
        }
    }
}

/// Plain substring test on `" <mount_point> "` and `" ro "`. Option lists
/// such as `ro,relatime` are not tokenised.
pub fn is_writable_mount_line(line: &str, mount_point: &str) -> bool {
    let target = format!(" {} ", mount_point);
    line.contains(&target) && !line.contains(" ro ")
}

pub fn maps_line_marker<'a>(line: &str, markers: &'a [String]) -> Option<&'a str> {
    let haystack = maps_pathname(line).unwrap_or(line);
    markers
        .iter()
        .map(String::as_str)
        .find(|marker| !marker.is_empty() && haystack.contains(marker))
}

/// Pathname column of a maps line.
///
/// Format: start-end perms offset dev inode pathname. Returns `None` when the
/// line does not look like a maps entry, and `Some("")` for anonymous
/// mappings.
pub fn maps_pathname(line: &str) -> Option<&str> {
    let line = line.trim();
    let mut parts = line.splitn(6, char::is_whitespace);

    let range = parts.next()?;
    let (start_hex, end_hex) = range.split_once('-')?;
    u64::from_str_radix(start_hex, 16).ok()?;
    u64::from_str_radix(end_hex, 16).ok()?;

    let _perms = parts.next()?;
    let _offset = parts.next();
    let _dev = parts.next();
    let _inode = parts.next();
    Some(parts.next().map(str::trim).unwrap_or_default())
}

fn contains_ignore_case(line: &str, needle: &str) -> bool {
    line.to_lowercase().contains(&needle.to_lowercase())
}
