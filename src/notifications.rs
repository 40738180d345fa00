use chrono::Utc;
use tracing::{debug, info};

use crate::constants::constants;
use crate::models::{NewNotification, NotificationEntry, NotificationKind, fresh_id};
use crate::storage::Persistence;

/// Notifications, newest first. `unread_count` is recomputed from the list
/// after every mutation and never tracked on its own.
pub struct Notifications {
  entries: Vec<NotificationEntry>,
  unread_count: usize,
  persistence: Persistence,
  key: String,
  cap: usize,
}

impl Notifications {
  /// Hydrate from storage, falling back to the built-in seed notifications.
  pub fn load(persistence: Persistence) -> Self {
    Self::load_with(persistence, &constants().notifications_key, constants().notifications_cap, true)
  }

  /// Like [`Notifications::load`]; with `seed == false` a missing or corrupt key starts empty.
  pub fn load_with(persistence: Persistence, key: &str, cap: usize, seed: bool) -> Self {
    let mut entries: Vec<NotificationEntry> =
      persistence.load_or_else(key, || if seed { seed_notifications() } else { Vec::new() });
    entries.truncate(cap);
    debug!(key, entries = entries.len(), "notifications: hydrated");
    let mut store = Self { entries, unread_count: 0, persistence, key: key.to_string(), cap };
    store.recount();
    store
  }

  pub fn entries(&self) -> &[NotificationEntry] {
    &self.entries
  }

  pub fn unread_count(&self) -> usize {
    self.unread_count
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn add(&mut self, notification: NewNotification) -> &[NotificationEntry] {
    let id = fresh_id(Utc::now(), self.entries.iter().map(|n| n.id));
    info!(id, kind = notification.kind.label(), channel = %notification.channel, "notifications: added");
    let entry = NotificationEntry {
      id,
      kind: notification.kind,
      channel: notification.channel,
      channel_avatar: notification.channel_avatar,
      message: notification.message,
      action: notification.action,
      time: "Just now".to_string(),
      read: false,
      video_id: notification.video_id,
      video_thumb: notification.video_thumb,
    };
    self.entries.insert(0, entry);
    self.entries.truncate(self.cap);
    self.commit()
  }

  /// Mark one notification read. Unknown ids are ignored.
  pub fn mark_read(&mut self, id: u64) -> &[NotificationEntry] {
    if let Some(entry) = self.entries.iter_mut().find(|n| n.id == id) {
      entry.read = true;
    }
    self.commit()
  }

  pub fn mark_all_read(&mut self) -> &[NotificationEntry] {
    for entry in &mut self.entries {
      entry.read = true;
    }
    self.commit()
  }

  pub fn remove(&mut self, id: u64) -> &[NotificationEntry] {
    self.entries.retain(|n| n.id != id);
    self.commit()
  }

  pub fn clear(&mut self) -> &[NotificationEntry] {
    self.entries.clear();
    self.commit()
  }

  fn recount(&mut self) {
    self.unread_count = self.entries.iter().filter(|n| !n.read).count();
  }

  /// Persist, then recount as the final step of every mutation.
  fn commit(&mut self) -> &[NotificationEntry] {
    self.persistence.save(&self.key, &self.entries);
    self.recount();
    &self.entries
  }
}

fn seed(
  id: u64,
  kind: NotificationKind,
  channel: &str,
  message: &str,
  time: &str,
  read: bool,
  video_id: &str,
) -> NotificationEntry {
  let avatar: String = channel.split_whitespace().filter_map(|w| w.chars().next()).collect();
  NotificationEntry {
    id,
    kind,
    channel: channel.to_string(),
    channel_avatar: Some(avatar),
    message: message.to_string(),
    action: None,
    time: time.to_string(),
    read,
    video_id: Some(video_id.to_string()),
    video_thumb: Some(format!("https://img.youtube.com/vi/{}/mqdefault.jpg", video_id)),
  }
}

/// Notifications shown to a first-time user.
pub fn seed_notifications() -> Vec<NotificationEntry> {
  vec![
    seed(
      1,
      NotificationKind::Upload,
      "Rick Astley",
      "uploaded a new video: Never Gonna Give You Up - Remastered 4K",
      "2 hours ago",
      false,
      "dQw4w9WgXcQ",
    ),
    seed(
      2,
      NotificationKind::Subscription,
      "Ed Sheeran",
      "is live now: Acoustic Evening",
      "5 hours ago",
      false,
      "JGwWNGJdvx8",
    ),
    seed(
      3,
      NotificationKind::Upload,
      "Mark Ronson",
      "posted: Behind the scenes of Uptown Funk",
      "1 day ago",
      true,
      "OPf0YbXqDm0",
    ),
  ]
}
