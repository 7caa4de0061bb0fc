//! C1: the configured prefix-rewrite table for outbound request URLs.
//!
//! Grounded on the original's linked list of `wsp_http_map` entries
//! (`wsp_http_map_url_do_config`/`wsp_http_map_find`/`wsp_http_map_url`);
//! per spec §9 the linked list is an artifact of the source, not a
//! requirement, so this is a plain ordered `Vec`.

use crate::error::UrlMapError;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct MapFlags: u8 {
        const IN_PREFIX = 0b01;
        const OUT_PREFIX = 0b10;
    }
}

#[derive(Debug, Clone)]
struct MapEntry {
    in_pattern: String,
    out_pattern: String,
    flags: MapFlags,
}

/// Reserved logical URL bound by [`UrlMap::config_add_device_home`].
pub const DEVICE_HOME_SRC: &str = "DEVICE:home*";

/// Ordered, first-match-wins collection of prefix-rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct UrlMap {
    entries: Vec<MapEntry>,
}

impl UrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Both `src` and `dst` must be non-empty. A trailing `*`
    /// on either side sets the corresponding prefix flag and is stripped
    /// before being stored.
    pub fn config_add(&mut self, src: &str, dst: &str) -> Result<(), UrlMapError> {
        if src.is_empty() {
            return Err(UrlMapError::EmptySource);
        }
        if dst.is_empty() {
            return Err(UrlMapError::EmptyDestination);
        }

        let mut flags = MapFlags::empty();
        let in_pattern = if let Some(stripped) = src.strip_suffix('*') {
            flags |= MapFlags::IN_PREFIX;
            stripped.to_string()
        } else {
            src.to_string()
        };
        let out_pattern = if let Some(stripped) = dst.strip_suffix('*') {
            flags |= MapFlags::OUT_PREFIX;
            stripped.to_string()
        } else {
            dst.to_string()
        };

        self.entries.push(MapEntry {
            in_pattern,
            out_pattern,
            flags,
        });
        Ok(())
    }

    /// Shorthand binding `DEVICE:home*` to `dst`, auto-appending `*` to
    /// `dst` if the caller didn't.
    pub fn config_add_device_home(&mut self, dst: &str) -> Result<(), UrlMapError> {
        let dst_owned;
        let dst = if dst.ends_with('*') {
            dst
        } else {
            dst_owned = format!("{dst}*");
            &dst_owned
        };
        self.config_add(DEVICE_HOME_SRC, dst)
    }

    /// Scan rules in insertion order; return the rewritten URL, or the
    /// input unchanged if nothing matches.
    pub fn rewrite(&self, url: &str) -> String {
        for entry in &self.entries {
            let in_len = entry.in_pattern.len();
            if url.len() < in_len {
                continue;
            }
            let (head, tail) = url.split_at(in_len);
            let matches = if entry.flags.contains(MapFlags::IN_PREFIX) {
                head.eq_ignore_ascii_case(&entry.in_pattern)
            } else {
                tail.is_empty() && head.eq_ignore_ascii_case(&entry.in_pattern)
            };
            if !matches {
                continue;
            }

            return if entry.flags.contains(MapFlags::IN_PREFIX)
                && entry.flags.contains(MapFlags::OUT_PREFIX)
            {
                format!("{}{}", entry.out_pattern, tail)
            } else {
                entry.out_pattern.clone()
            };
        }
        url.to_string()
    }

    /// Number of configured rules, for `url_map_config_info`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Free all rules.
    pub fn destroy(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rewrite_appends_tail() {
        let mut map = UrlMap::new();
        map.config_add("http://a/*", "http://b/*").unwrap();

        assert_eq!(map.rewrite("http://a/page?x=1"), "http://b/page?x=1");
        assert_eq!(map.rewrite("http://c/page"), "http://c/page");
    }

    #[test]
    fn full_match_without_star() {
        let mut map = UrlMap::new();
        map.config_add("http://a/exact", "http://b/exact2").unwrap();

        assert_eq!(map.rewrite("http://a/exact"), "http://b/exact2");
        // not a full match: trailing data means no match
        assert_eq!(map.rewrite("http://a/exact/more"), "http://a/exact/more");
    }

    #[test]
    fn first_match_wins() {
        let mut map = UrlMap::new();
        map.config_add("http://a/*", "http://first/*").unwrap();
        map.config_add("http://a/*", "http://second/*").unwrap();

        assert_eq!(map.rewrite("http://a/x"), "http://first/x");
    }

    #[test]
    fn matching_is_case_insensitive_tail_preserves_case() {
        let mut map = UrlMap::new();
        map.config_add("HTTP://A/*", "http://b/*").unwrap();

        assert_eq!(map.rewrite("http://a/Page"), "http://b/Page");
    }

    #[test]
    fn device_home_shorthand() {
        let mut map = UrlMap::new();
        map.config_add_device_home("http://home.example/").unwrap();

        assert_eq!(
            map.rewrite("DEVICE:home/settings"),
            "http://home.example/settings"
        );
    }

    #[test]
    fn empty_rules_are_rejected() {
        let mut map = UrlMap::new();
        assert!(matches!(
            map.config_add("", "http://b/*"),
            Err(UrlMapError::EmptySource)
        ));
        assert!(matches!(
            map.config_add("http://a/*", ""),
            Err(UrlMapError::EmptyDestination)
        ));
    }
}
