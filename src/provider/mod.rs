//! Video metadata providers.
//!
//! [`VideoProvider`] is the seam between the stores/recommender and the
//! outside world. [`YouTubeProvider`] talks to the YouTube Data API when an
//! API key is configured; otherwise [`OfflineCatalog`] serves a fixed,
//! embedded data set so every command still works without configuration.

mod offline;
mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::models::{Video, VideoPage};

pub use offline::OfflineCatalog;
pub use youtube::YouTubeProvider;

#[async_trait]
pub trait VideoProvider: Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &'static str;

  async fn fetch_trending(&self, limit: usize, page_token: Option<&str>) -> Result<VideoPage>;

  async fn search_videos(&self, query: &str, limit: usize, page_token: Option<&str>) -> Result<VideoPage>;

  /// `Ok(None)` when the id is unknown.
  async fn get_video(&self, id: &str) -> Result<Option<Video>>;

  /// Most recent uploads of a channel, newest first.
  async fn get_channel_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<Video>>;
}

/// Pick the provider for `config`: the YouTube API with a key, the offline catalog without.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn VideoProvider>> {
  match config.api_key() {
    Some(key) => {
      info!(region = %config.region(), "provider: using YouTube Data API");
      Ok(Arc::new(YouTubeProvider::new(key, config.region())?))
    }
    None => {
      info!("provider: no API key configured, using offline catalog");
      Ok(Arc::new(OfflineCatalog::embedded()))
    }
  }
}
