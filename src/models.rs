//! Data model shared by the stores, the provider and the recommender.
//!
//! Field names serialize in camelCase so the persisted JSON matches the
//! layout other clients of the same storage keys expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Metadata for a single video as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub channel: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel_id: Option<String>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default)]
  pub thumbnail: String,
  /// Display string, e.g. `1.2M views`.
  #[serde(default)]
  pub views: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub likes: Option<String>,
  /// Display string (`3 days ago`) or an ISO date.
  #[serde(default)]
  pub time: String,
}

/// One page of a listing. `next_page_token` is opaque to callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoPage {
  pub videos: Vec<Video>,
  pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
  #[serde(flatten)]
  pub video: Video,
  /// Video fields this crate doesn't model (e.g. `duration`), kept so a write-back loses nothing.
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
  pub watched_at: DateTime<Utc>,
}

impl WatchHistoryEntry {
  pub fn new(video: Video, watched_at: DateTime<Utc>) -> Self {
    Self { video, extra: serde_json::Map::new(), watched_at }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
  pub id: u64,
  pub query: String,
  pub timestamp: DateTime<Utc>,
  /// How many times this query has been searched while it stayed in history.
  #[serde(default = "one")]
  pub count: u32,
}

fn one() -> u32 {
  1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Upload,
  Subscription,
  Like,
  Comment,
  #[serde(other)]
  Other,
}

impl NotificationKind {
  pub fn label(self) -> &'static str {
    match self {
      NotificationKind::Upload => "upload",
      NotificationKind::Subscription => "subscription",
      NotificationKind::Like => "like",
      NotificationKind::Comment => "comment",
      NotificationKind::Other => "other",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
  pub id: u64,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub channel: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel_avatar: Option<String>,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,
  pub time: String,
  pub read: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_thumb: Option<String>,
}

/// Caller-supplied part of a notification; the store assigns id, time and read state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
  pub kind: NotificationKind,
  pub channel: String,
  pub channel_avatar: Option<String>,
  pub message: String,
  pub action: Option<String>,
  pub video_id: Option<String>,
  pub video_thumb: Option<String>,
}

impl NewNotification {
  /// The notification raised when a video from `video.channel` is opened.
  pub fn for_watched(video: &Video) -> Self {
    Self {
      kind: NotificationKind::Subscription,
      channel: video.channel.clone(),
      channel_avatar: video.channel.chars().next().map(|c| c.to_string()),
      message: "uploaded a new video".to_string(),
      action: Some(video.title.clone()),
      video_id: Some(video.id.clone()),
      video_thumb: Some(video.thumbnail.clone()).filter(|t| !t.is_empty()),
    }
  }
}

/// Millisecond-timestamp id, bumped past every id already in use so it stays unique
/// even when several entries are created within the same millisecond.
///
/// Stored ids come from disk, so `u64::MAX` may already be taken; the id then
/// becomes the first free value at or after the timestamp.
pub(crate) fn fresh_id(now: DateTime<Utc>, taken: impl IntoIterator<Item = u64>) -> u64 {
  let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
  let taken: HashSet<u64> = taken.into_iter().collect();
  match taken.iter().max() {
    Some(&max) if max >= stamp => match max.checked_add(1) {
      Some(next) => next,
      None => (stamp..=u64::MAX).chain(0..stamp).find(|id| !taken.contains(id)).unwrap_or(stamp),
    },
    _ => stamp,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_id_never_collides() {
    let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    assert_eq!(fresh_id(now, []), 1_700_000_000_000);
    assert_eq!(fresh_id(now, [1, 2, 3]), 1_700_000_000_000);
    assert_eq!(fresh_id(now, [1_700_000_000_000]), 1_700_000_000_001);
  }

  #[test]
  fn fresh_id_survives_max_id_on_disk() {
    let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    assert_eq!(fresh_id(now, [u64::MAX]), 1_700_000_000_000);
    assert_eq!(fresh_id(now, [u64::MAX, 1_700_000_000_000]), 1_700_000_000_001);
  }

  #[test]
  fn watch_entry_keeps_unknown_video_fields() {
    let json = r#"{"id":"a","title":"T","channel":"C","duration":"3:32","tags":["x"],
      "watchedAt":"2025-03-05T10:00:00Z"}"#;
    let entry: WatchHistoryEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.video.channel, "C");
    assert_eq!(entry.extra.get("duration"), Some(&serde_json::json!("3:32")));
    assert!(!entry.extra.contains_key("id"));
    assert!(!entry.extra.contains_key("watchedAt"));

    let out = serde_json::to_value(&entry).unwrap();
    assert_eq!(out["duration"], "3:32");
    assert_eq!(out["tags"], serde_json::json!(["x"]));
    assert_eq!(out["id"], "a");
  }

  #[test]
  fn watch_entry_flattens_video_fields() {
    let json = r#"{"id":"abc","title":"T","channel":"C","thumbnail":"","views":"","time":"",
      "watchedAt":"2025-03-05T10:00:00Z"}"#;
    let entry: WatchHistoryEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.video.id, "abc");
    let out = serde_json::to_value(&entry).unwrap();
    assert_eq!(out["id"], "abc");
    assert!(out.get("watchedAt").is_some());
  }

  #[test]
  fn search_entry_count_defaults_to_one() {
    let json = r#"{"id":1,"query":"rust","timestamp":"2025-03-05T10:00:00Z"}"#;
    let entry: SearchHistoryEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.count, 1);
  }

  #[test]
  fn unknown_notification_kind_is_other() {
    let json = r#"{"id":1,"type":"mention","channel":"C","message":"m","time":"now","read":false}"#;
    let n: NotificationEntry = serde_json::from_str(json).unwrap();
    assert_eq!(n.kind, NotificationKind::Other);
    assert_eq!(serde_json::to_value(&n).unwrap()["type"], "other");
  }

  #[test]
  fn watched_notification_uses_channel_initial() {
    let video = Video { id: "v1".into(), title: "Song".into(), channel: "Ed Sheeran".into(), ..Default::default() };
    let n = NewNotification::for_watched(&video);
    assert_eq!(n.kind, NotificationKind::Subscription);
    assert_eq!(n.channel_avatar.as_deref(), Some("E"));
    assert_eq!(n.action.as_deref(), Some("Song"));
    assert_eq!(n.video_thumb, None);
  }
}
