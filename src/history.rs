//! Per-user recent conversation registry.
//!
//! Each prompt a user sends is recorded as a short title (the first 30
//! characters of the trimmed prompt). Entries are kept newest-first and capped
//! at [`MAX_HISTORY_ENTRIES`] per user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::store::{self, KeyValueStore};

/// Maximum entries kept per user.
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Maximum title length, in characters.
pub const TITLE_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
}

/// History registry backed by an injected [`KeyValueStore`].
pub struct HistoryRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl HistoryRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn key(user: &str) -> String {
        format!("history:{}", user.trim().to_lowercase())
    }

    /// Title shown for a prompt: first 30 characters of the trimmed text.
    pub fn title_for(prompt: &str) -> String {
        prompt.trim().chars().take(TITLE_CHARS).collect()
    }

    /// Record a prompt for `user` and return the new entry.
    pub fn record(&self, user: &str, prompt: &str) -> Result<HistoryEntry> {
        let key = Self::key(user);
        let mut entries: Vec<HistoryEntry> =
            store::load(self.store.as_ref(), &key)?.unwrap_or_default();
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            title: Self::title_for(prompt),
            date: self.clock.now(),
        };
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY_ENTRIES);
        store::save(self.store.as_ref(), &key, &entries)?;
        Ok(entry)
    }

    /// Up to `limit` entries for `user`, newest first.
    pub fn recent(&self, user: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> =
            store::load(self.store.as_ref(), &Self::key(user))?.unwrap_or_default();
        entries.truncate(limit);
        Ok(entries)
    }

    pub fn clear(&self, user: &str) -> Result<()> {
        self.store.remove(&Self::key(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn registry() -> (HistoryRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (
            HistoryRegistry::new(Arc::new(MemoryStore::new()), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_title_truncated_to_thirty_chars() {
        let prompt = "   Explain C# 12 Primary Constructors with examples  ";
        let title = HistoryRegistry::title_for(prompt);
        assert_eq!(title, "Explain C# 12 Primary Construc");
        assert_eq!(title.chars().count(), TITLE_CHARS);
    }

    #[test]
    fn test_title_is_char_safe() {
        let title = HistoryRegistry::title_for(&"é".repeat(40));
        assert_eq!(title.chars().count(), TITLE_CHARS);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let (history, clock) = registry();
        history.record("guest", "first").unwrap();
        clock.advance(Duration::seconds(5));
        history.record("guest", "second").unwrap();
        let recent = history.recent("guest", 10).unwrap();
        let titles: Vec<&str> = recent.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert!(recent[0].date > recent[1].date);
    }

    #[test]
    fn test_history_capped() {
        let (history, _) = registry();
        for i in 0..(MAX_HISTORY_ENTRIES + 5) {
            history.record("a", &format!("prompt {i}")).unwrap();
        }
        let all = history.recent("a", usize::MAX).unwrap();
        assert_eq!(all.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(all[0].title, format!("prompt {}", MAX_HISTORY_ENTRIES + 4));
    }

    #[test]
    fn test_history_is_per_user_and_clearable() {
        let (history, _) = registry();
        history.record("Alice", "hi").unwrap();
        history.record("bob", "yo").unwrap();
        assert_eq!(history.recent("alice", 15).unwrap().len(), 1);
        history.clear("ALICE").unwrap();
        assert!(history.recent("alice", 15).unwrap().is_empty());
        assert_eq!(history.recent("bob", 15).unwrap().len(), 1);
    }
}
