use chrono::{DateTime, Local, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::constants::constants;
use crate::format::day_label;
use crate::models::{Video, WatchHistoryEntry};
use crate::storage::Persistence;

/// Watched videos, most recent first, at most one entry per video id.
pub struct WatchHistory {
  entries: Vec<WatchHistoryEntry>,
  persistence: Persistence,
  key: String,
  cap: usize,
}

impl WatchHistory {
  /// Hydrate from storage; absent or corrupt data starts an empty history.
  pub fn load(persistence: Persistence) -> Self {
    Self::load_with(persistence, &constants().watch_history_key, constants().watch_history_cap)
  }

  pub fn load_with(persistence: Persistence, key: &str, cap: usize) -> Self {
    let mut entries: Vec<WatchHistoryEntry> = persistence.load(key, Vec::new());
    // other writers may have left duplicates; the most recent (first) one wins
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.video.id.clone()));
    entries.truncate(cap);
    debug!(key, entries = entries.len(), "history: hydrated");
    Self { entries, persistence, key: key.to_string(), cap }
  }

  pub fn entries(&self) -> &[WatchHistoryEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, video_id: &str) -> bool {
    self.entries.iter().any(|e| e.video.id == video_id)
  }

  pub fn add(&mut self, video: Video) -> &[WatchHistoryEntry] {
    self.add_at(video, Utc::now())
  }

  /// Move (or insert) `video` to the front, stamped with `watched_at`.
  pub fn add_at(&mut self, video: Video, watched_at: DateTime<Utc>) -> &[WatchHistoryEntry] {
    self.entries.retain(|e| e.video.id != video.id);
    info!(video_id = %video.id, "history: recorded watch");
    self.entries.insert(0, WatchHistoryEntry::new(video, watched_at));
    self.entries.truncate(self.cap);
    self.persist();
    &self.entries
  }

  pub fn remove(&mut self, video_id: &str) -> &[WatchHistoryEntry] {
    self.entries.retain(|e| e.video.id != video_id);
    self.persist();
    &self.entries
  }

  pub fn clear(&mut self) -> &[WatchHistoryEntry] {
    self.entries.clear();
    self.persist();
    &self.entries
  }

  /// Group entries by calendar day in list order. Labels come from [`day_label`].
  pub fn grouped_by_day(&self, now: DateTime<Local>) -> Vec<(String, Vec<&WatchHistoryEntry>)> {
    let mut groups: Vec<(String, Vec<&WatchHistoryEntry>)> = Vec::new();
    for entry in &self.entries {
      let label = day_label(entry.watched_at, now);
      match groups.iter_mut().find(|(l, _)| *l == label) {
        Some((_, items)) => items.push(entry),
        None => groups.push((label, vec![entry])),
      }
    }
    groups
  }

  fn persist(&self) {
    self.persistence.save(&self.key, &self.entries);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::KeyValueStore;
  use chrono::{Duration, TimeZone};

  fn video(id: &str) -> Video {
    Video { id: id.to_string(), title: format!("Video {}", id), channel: "Chan".to_string(), ..Default::default() }
  }

  fn ids(entries: &[WatchHistoryEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.video.id.as_str()).collect()
  }

  #[test]
  fn add_prepends_most_recent_first() {
    let mut history = WatchHistory::load(Persistence::in_memory());
    history.add(video("a"));
    history.add(video("b"));
    let entries = history.add(video("c"));
    assert_eq!(ids(entries), ["c", "b", "a"]);
  }

  #[test]
  fn readd_moves_to_front_without_growing() {
    let mut history = WatchHistory::load(Persistence::in_memory());
    for id in ["a", "b", "c"] {
      history.add(video(id));
    }
    let entries = history.add(video("a"));
    assert_eq!(ids(entries), ["a", "c", "b"]);
    assert_eq!(history.len(), 3);
  }

  #[test]
  fn fifty_five_adds_keep_fifty_most_recent() {
    let mut history = WatchHistory::load(Persistence::in_memory());
    for i in 0..55 {
      history.add(video(&format!("v{}", i)));
    }
    assert_eq!(history.len(), 50);
    assert_eq!(history.entries()[0].video.id, "v54");
    assert_eq!(history.entries()[49].video.id, "v5");
    for evicted in 0..5 {
      assert!(!history.contains(&format!("v{}", evicted)));
    }
  }

  #[test]
  fn length_is_min_of_cap_and_adds() {
    for n in [0usize, 1, 49, 50, 51, 80] {
      let mut history = WatchHistory::load_with(Persistence::in_memory(), "watchHistory", 50);
      for i in 0..n {
        history.add(video(&format!("v{}", i)));
      }
      assert_eq!(history.len(), n.min(50));
    }
  }

  #[test]
  fn remove_and_clear_persist() {
    let persistence = Persistence::in_memory();
    let mut history = WatchHistory::load(persistence.clone());
    history.add(video("a"));
    history.add(video("b"));
    history.remove("a");
    history.remove("missing");

    let reloaded = WatchHistory::load(persistence.clone());
    assert_eq!(ids(reloaded.entries()), ["b"]);

    history.clear();
    assert!(WatchHistory::load(persistence).is_empty());
  }

  #[test]
  fn corrupt_storage_hydrates_empty() {
    let persistence = Persistence::in_memory();
    persistence.backend().set("watchHistory", "[{\"id\":").unwrap();
    let history = WatchHistory::load(persistence);
    assert!(history.is_empty());
  }

  #[test]
  fn duplicate_ids_on_disk_collapse_to_first() {
    let persistence = Persistence::in_memory();
    persistence.save(
      "watchHistory",
      &serde_json::json!([
        {"id": "a", "title": "newer", "watchedAt": "2025-03-06T10:00:00Z"},
        {"id": "b", "title": "B", "watchedAt": "2025-03-05T12:00:00Z"},
        {"id": "a", "title": "older", "watchedAt": "2025-03-05T10:00:00Z"}
      ]),
    );
    let history = WatchHistory::load(persistence);
    assert_eq!(ids(history.entries()), ["a", "b"]);
    assert_eq!(history.entries()[0].video.title, "newer");
  }

  #[test]
  fn unknown_fields_survive_write_back() {
    let persistence = Persistence::in_memory();
    persistence.save(
      "watchHistory",
      &serde_json::json!([{"id": "a", "title": "A", "duration": "3:32", "watchedAt": "2025-03-05T10:00:00Z"}]),
    );
    let mut history = WatchHistory::load(persistence.clone());
    history.add(video("b"));

    let raw: serde_json::Value = persistence.read("watchHistory").unwrap().unwrap();
    assert_eq!(raw[0]["id"], "b");
    assert_eq!(raw[1]["id"], "a");
    assert_eq!(raw[1]["duration"], "3:32");
  }

  #[test]
  fn grouping_does_not_touch_timestamps() {
    let now = Local.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
    let today = (now - Duration::hours(2)).with_timezone(&Utc);
    let yesterday = (now - Duration::days(1)).with_timezone(&Utc);
    let older = Local.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap().with_timezone(&Utc);

    let mut history = WatchHistory::load(Persistence::in_memory());
    history.add_at(video("old"), older);
    history.add_at(video("y"), yesterday);
    history.add_at(video("t1"), today);
    history.add_at(video("t2"), today);

    let groups = history.grouped_by_day(now);
    let labels: Vec<&str> = groups.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, ["Today", "Yesterday", "Mar 5"]);
    assert_eq!(groups[0].1.len(), 2);
    assert_eq!(history.entries()[3].watched_at, older);
  }
}
