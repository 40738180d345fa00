//! One application instance: the three persisted stores, the provider and
//! the recommendation state for the video currently open.
//!
//! Recommendations are built on a spawned task and handed back through a
//! `oneshot` channel. Opening another video or closing the current one
//! drops the receiver, so a late result is never applied to the wrong view.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::history::WatchHistory;
use crate::models::{NewNotification, Video, VideoPage};
use crate::notifications::Notifications;
use crate::provider::VideoProvider;
use crate::recommend::Recommender;
use crate::search_history::SearchHistory;
use crate::storage::Persistence;

/// An in-flight recommendation task for `video_id`.
struct PendingRecommendations {
  video_id: String,
  rx: oneshot::Receiver<Vec<Video>>,
}

pub struct Session {
  pub history: WatchHistory,
  pub searches: SearchHistory,
  pub notifications: Notifications,
  provider: Arc<dyn VideoProvider>,
  recommender: Arc<Recommender>,
  recommendation_limit: usize,
  current: Option<Video>,
  pending: Option<PendingRecommendations>,
  recommendations: Vec<Video>,
}

impl Session {
  pub fn new(persistence: Persistence, provider: Arc<dyn VideoProvider>, config: &Config) -> Self {
    let c = constants();
    let notifications = Notifications::load_with(
      persistence.clone(),
      &c.notifications_key,
      c.notifications_cap,
      config.seeds_notifications(),
    );
    Self {
      history: WatchHistory::load(persistence.clone()),
      searches: SearchHistory::load(persistence),
      notifications,
      recommender: Arc::new(Recommender::new(Arc::clone(&provider))),
      provider,
      recommendation_limit: config.recommendation_limit(),
      current: None,
      pending: None,
      recommendations: Vec::new(),
    }
  }

  pub fn provider(&self) -> &Arc<dyn VideoProvider> {
    &self.provider
  }

  pub fn current(&self) -> Option<&Video> {
    self.current.as_ref()
  }

  /// Recommendations for the current video, empty until they arrive.
  pub fn recommendations(&self) -> &[Video] {
    &self.recommendations
  }

  pub fn recommendations_pending(&self) -> bool {
    self.pending.is_some()
  }

  pub async fn trending(&self, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
    self.provider.fetch_trending(limit, page_token).await
  }

  /// Record `query` in search history, then run it against the provider.
  /// A blank query lists trending videos instead and is not recorded.
  pub async fn search(&mut self, query: &str, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
    let query = query.trim();
    if query.is_empty() {
      debug!("session: blank query, showing trending");
      return self.provider.fetch_trending(limit, page_token).await;
    }
    // only the first page counts as a new search
    if page_token.is_none() {
      self.searches.add(query);
    }
    self.provider.search_videos(query, limit, page_token).await
  }

  /// Load `id`, record it as watched, raise the channel notification and start recommendations.
  /// `Ok(None)` when the provider doesn't know the id; history is left untouched then.
  pub async fn watch(&mut self, id: &str) -> Result<Option<Video>> {
    let Some(video) = self.provider.get_video(id).await? else {
      info!(video_id = %id, "session: video not found");
      return Ok(None);
    };
    self.history.add(video.clone());
    self.notifications.add(NewNotification::for_watched(&video));
    self.open_video(video.clone());
    Ok(Some(video))
  }

  /// Make `video` the current one and start building its recommendations.
  /// Must be called from within a tokio runtime.
  pub fn open_video(&mut self, video: Video) {
    if self.pending.take().is_some() {
      debug!("session: dropping recommendations for previous video");
    }
    self.recommendations.clear();

    let recommender = Arc::clone(&self.recommender);
    let limit = self.recommendation_limit;
    let target = video.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(recommender.recommend(&target, limit).await);
    });

    self.pending = Some(PendingRecommendations { video_id: video.id.clone(), rx });
    self.current = Some(video);
  }

  /// Leave the current video; an unfinished recommendation result is discarded.
  pub fn close_video(&mut self) {
    self.pending = None;
    self.current = None;
    self.recommendations.clear();
  }

  /// Apply a finished recommendation result, if any. Returns true when one was applied.
  pub fn check_pending(&mut self) -> bool {
    let Some(mut pending) = self.pending.take() else { return false };
    match pending.rx.try_recv() {
      Ok(videos) => self.apply(&pending.video_id, videos),
      Err(oneshot::error::TryRecvError::Empty) => {
        self.pending = Some(pending);
        false
      }
      Err(oneshot::error::TryRecvError::Closed) => {
        warn!(video_id = %pending.video_id, "session: recommendation task failed");
        false
      }
    }
  }

  /// Wait for the pending recommendations (if any) and return the current list.
  pub async fn wait_recommendations(&mut self) -> &[Video] {
    if let Some(pending) = self.pending.take() {
      match pending.rx.await {
        Ok(videos) => {
          self.apply(&pending.video_id, videos);
        }
        Err(_) => warn!(video_id = %pending.video_id, "session: recommendation task failed"),
      }
    }
    &self.recommendations
  }

  fn apply(&mut self, video_id: &str, videos: Vec<Video>) -> bool {
    if self.current.as_ref().map(|v| v.id.as_str()) != Some(video_id) {
      debug!(video_id, "session: discarding stale recommendations");
      return false;
    }
    self.recommendations = videos;
    true
  }
}
