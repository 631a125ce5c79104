//! Bridges server-stable UIDLs to the numeric message IDs of the current connection.

use std::collections::HashMap;

use crate::parse::{parse_list_line, parse_uidl_line};
use crate::types::{Seq, Uidl};

/// UIDL → message number, and message number → size, for one connection.
///
/// Both maps are rebuilt from scratch from the `UIDL` and `LIST` listings of
/// a connection and cleared whenever the connection goes away, so a message
/// number learned before a reconnect never resolves afterwards.
#[derive(Debug, Default)]
pub struct MessageCache {
    ids: HashMap<Uidl, Seq>,
    sizes: HashMap<Seq, u64>,
}

impl MessageCache {
    /// Forget everything.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.sizes.clear();
    }

    /// Replace the UIDL map with the lines of a `UIDL` listing.
    ///
    /// `None` (a failed listing) leaves the map empty. Unparseable lines are skipped.
    pub fn rebuild_uidls<S: AsRef<str>>(&mut self, lines: Option<&[S]>) {
        self.ids.clear();
        match lines {
            Some(lines) => self.ids.extend(
                lines
                    .iter()
                    .filter_map(|l| parse_uidl_line(l.as_ref()))
                    .map(|(seq, uidl)| (uidl, seq)),
            ),
            None => log::debug!("Error getting UIDL list from server."),
        }
    }

    /// Replace the size map with the lines of a `LIST` listing.
    pub fn rebuild_sizes<S: AsRef<str>>(&mut self, lines: Option<&[S]>) {
        self.sizes.clear();
        match lines {
            Some(lines) => self
                .sizes
                .extend(lines.iter().filter_map(|l| parse_list_line(l.as_ref()))),
            None => log::debug!("Error getting LIST from server."),
        }
    }

    /// The message number for `uidl`, if the current listing has it.
    pub fn id(&self, uidl: &str) -> Option<Seq> {
        self.ids.get(uidl).copied()
    }

    /// The cached size of message `id`, 0 if unknown.
    pub fn size(&self, id: Seq) -> u64 {
        self.sizes.get(&id).copied().unwrap_or(0)
    }

    /// The cached size of the message with this UIDL, 0 if unknown.
    pub fn size_of(&self, uidl: &str) -> u64 {
        self.id(uidl).map_or(0, |id| self.size(id))
    }

    /// Every known UIDL, in no particular order.
    pub fn uidls(&self) -> Vec<Uidl> {
        self.ids.keys().cloned().collect()
    }

    /// Number of known UIDLs.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no UIDL is known.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> MessageCache {
        let mut cache = MessageCache::default();
        cache.rebuild_uidls(Some(&["1 aaa\r", "2 bbb\r", "garbage\r"][..]));
        cache.rebuild_sizes(Some(&["1 100\r", "2 2000\r"][..]));
        cache
    }

    #[test]
    fn resolves_listed_uidls() {
        let cache = cache();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.id("aaa"), Some(1));
        assert_eq!(cache.id("bbb"), Some(2));
        assert_eq!(cache.size_of("bbb"), 2000);
    }

    #[test]
    fn no_partial_matches() {
        let cache = cache();
        assert_eq!(cache.id("aa"), None);
        assert_eq!(cache.id("aaa "), None);
        assert_eq!(cache.id("AAA"), None);
    }

    #[test]
    fn rebuild_replaces() {
        let mut cache = cache();
        cache.rebuild_uidls(Some(&["1 bbb\r"][..]));
        assert_eq!(cache.id("aaa"), None);
        assert_eq!(cache.id("bbb"), Some(1));
    }

    #[test]
    fn failed_listing_empties() {
        let mut cache = cache();
        cache.rebuild_uidls::<&str>(None);
        cache.rebuild_sizes::<&str>(None);
        assert!(cache.is_empty());
        assert_eq!(cache.size(1), 0);
    }

    #[test]
    fn unknown_size_is_zero() {
        let cache = cache();
        assert_eq!(cache.size(7), 0);
        assert_eq!(cache.size_of("zzz"), 0);
    }
}
