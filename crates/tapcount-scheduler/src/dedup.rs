// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Last-dispatched content per session.

use dashmap::DashMap;
use tapcount_core::SessionKey;

/// Concurrent map from session to the content it last received.
///
/// Entries are written only after a successful dispatch and removed when the
/// session is evicted or ended.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: DashMap<SessionKey, String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `content` is byte-identical to what the session already shows.
    pub fn is_current(&self, key: SessionKey, content: &str) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|last| last.as_str() == content)
    }

    pub fn record(&self, key: SessionKey, content: String) {
        self.entries.insert(key, content);
    }

    pub fn evict(&self, key: SessionKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_matches_are_current() {
        let cache = DedupCache::new();
        let key = SessionKey::new(1, 2);
        assert!(!cache.is_current(key, "a"));

        cache.record(key, "a".into());
        assert!(cache.is_current(key, "a"));
        assert!(!cache.is_current(key, "a "));
        assert!(!cache.is_current(SessionKey::new(1, 3), "a"));

        cache.record(key, "b".into());
        assert!(!cache.is_current(key, "a"));
    }

    #[test]
    fn evict_drops_entry() {
        let cache = DedupCache::new();
        let key = SessionKey::new(1, 2);
        cache.record(key, "a".into());
        assert!(cache.evict(key));
        assert!(!cache.evict(key));
        assert!(cache.is_empty());
    }
}
