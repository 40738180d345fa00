//! Search history: recent queries, deduplicated case-insensitively.
//!
//! Popular searches rank by frequency. Every entry carries a `count` that is
//! carried forward when the same query is searched again, so the ranking
//! needs no second storage key. Counts of queries that fall off the end of
//! the list are forgotten with them.

use chrono::{DateTime, Duration, Local, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::constants::constants;
use crate::format::{SEARCH_GROUP_ORDER, search_group_label};
use crate::models::{SearchHistoryEntry, fresh_id};
use crate::storage::Persistence;

/// Summary numbers shown above the search history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
  pub total: usize,
  pub unique: usize,
  pub last_24h: usize,
  pub avg_query_len: usize,
}

pub struct SearchHistory {
  entries: Vec<SearchHistoryEntry>,
  persistence: Persistence,
  key: String,
  cap: usize,
}

fn normalize(query: &str) -> String {
  query.trim().to_lowercase()
}

/// Collapse entries whose queries differ only in case or surrounding space.
/// The first (most recent) entry is kept and absorbs the others' counts.
fn merge_duplicates(entries: Vec<SearchHistoryEntry>) -> Vec<SearchHistoryEntry> {
  let mut merged: Vec<SearchHistoryEntry> = Vec::with_capacity(entries.len());
  for entry in entries {
    let needle = normalize(&entry.query);
    match merged.iter_mut().find(|e| normalize(&e.query) == needle) {
      Some(kept) => kept.count = kept.count.saturating_add(entry.count),
      None => merged.push(entry),
    }
  }
  merged
}

impl SearchHistory {
  pub fn load(persistence: Persistence) -> Self {
    Self::load_with(persistence, &constants().search_history_key, constants().search_history_cap)
  }

  pub fn load_with(persistence: Persistence, key: &str, cap: usize) -> Self {
    let mut entries = merge_duplicates(persistence.load(key, Vec::new()));
    entries.truncate(cap);
    debug!(key, entries = entries.len(), "search_history: hydrated");
    Self { entries, persistence, key: key.to_string(), cap }
  }

  pub fn entries(&self) -> &[SearchHistoryEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn add(&mut self, query: &str) -> &[SearchHistoryEntry] {
    self.add_at(query, Utc::now())
  }

  /// Record `query` at `now`. Blank queries are ignored.
  pub fn add_at(&mut self, query: &str, now: DateTime<Utc>) -> &[SearchHistoryEntry] {
    let trimmed = query.trim();
    if trimmed.is_empty() {
      return &self.entries;
    }
    let needle = normalize(trimmed);

    let mut previous: u32 = 0;
    self.entries.retain(|e| {
      if normalize(&e.query) == needle {
        previous = previous.saturating_add(e.count);
        false
      } else {
        true
      }
    });

    let id = fresh_id(now, self.entries.iter().map(|e| e.id));
    let count = previous.saturating_add(1);
    info!(query = %trimmed, count, "search_history: recorded query");
    self.entries.insert(0, SearchHistoryEntry { id, query: trimmed.to_string(), timestamp: now, count });
    self.entries.truncate(self.cap);
    self.persist();
    &self.entries
  }

  pub fn remove(&mut self, id: u64) -> &[SearchHistoryEntry] {
    self.entries.retain(|e| e.id != id);
    self.persist();
    &self.entries
  }

  pub fn clear(&mut self) -> &[SearchHistoryEntry] {
    self.entries.clear();
    self.persist();
    &self.entries
  }

  /// Up to `limit` queries, most frequently searched first; ties keep recency order.
  pub fn popular_searches(&self, limit: usize) -> Vec<String> {
    let mut ranked: Vec<&SearchHistoryEntry> = self.entries.iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.into_iter().take(limit).map(|e| e.query.clone()).collect()
  }

  /// Entries whose query contains `needle`, case-insensitively. A blank needle matches everything.
  pub fn filter(&self, needle: &str) -> Vec<&SearchHistoryEntry> {
    let needle = needle.trim().to_lowercase();
    self.entries.iter().filter(|e| needle.is_empty() || e.query.to_lowercase().contains(&needle)).collect()
  }

  /// Entries bucketed into Today / Yesterday / This Week / Older, empty buckets omitted.
  pub fn grouped(&self, now: DateTime<Local>) -> Vec<(&'static str, Vec<&SearchHistoryEntry>)> {
    SEARCH_GROUP_ORDER
      .iter()
      .map(|&label| {
        let items: Vec<&SearchHistoryEntry> =
          self.entries.iter().filter(|e| search_group_label(e.timestamp, now) == label).collect();
        (label, items)
      })
      .filter(|(_, items)| !items.is_empty())
      .collect()
  }

  pub fn stats(&self, now: DateTime<Utc>) -> SearchStats {
    let total = self.entries.len();
    let unique = self.entries.iter().map(|e| normalize(&e.query)).collect::<HashSet<_>>().len();
    let cutoff = now - Duration::hours(24);
    let last_24h = self.entries.iter().filter(|e| e.timestamp > cutoff).count();
    let chars: usize = self.entries.iter().map(|e| e.query.chars().count()).sum();
    let avg_query_len = if total == 0 { 0 } else { (chars as f64 / total as f64).round() as usize };
    SearchStats { total, unique, last_24h, avg_query_len }
  }

  fn persist(&self) {
    self.persistence.save(&self.key, &self.entries);
  }
}
