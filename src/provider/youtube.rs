use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::VideoProvider;
use crate::constants::constants;
use crate::format::{format_count, format_time_ago, format_views};
use crate::models::{Video, VideoPage};

/// The API rejects `maxResults` outside 1..=50.
const MAX_RESULTS_CAP: usize = 50;

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
  #[serde(default = "Vec::new")]
  items: Vec<T>,
  next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
  id: String,
  snippet: Snippet,
  #[serde(default)]
  statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
  id: SearchId,
  snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
  title: String,
  #[serde(default)]
  channel_title: String,
  channel_id: Option<String>,
  #[serde(default)]
  description: String,
  published_at: Option<DateTime<Utc>>,
  #[serde(default)]
  thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
  medium: Option<Thumbnail>,
  high: Option<Thumbnail>,
  maxres: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
  url: String,
}

/// Counts arrive as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
  view_count: Option<String>,
  like_count: Option<String>,
}

fn parse_count(raw: Option<&String>) -> Option<u64> {
  raw.and_then(|s| s.parse().ok())
}

impl Snippet {
  fn best_thumbnail(&self) -> String {
    let t = &self.thumbnails;
    t.maxres.as_ref().or(t.high.as_ref()).or(t.medium.as_ref()).map(|t| t.url.clone()).unwrap_or_default()
  }

  fn into_video(self, id: String, statistics: Option<&Statistics>, now: DateTime<Utc>) -> Video {
    let thumbnail = self.best_thumbnail();
    Video {
      id,
      title: self.title,
      channel: self.channel_title,
      channel_id: self.channel_id,
      description: self.description,
      thumbnail,
      views: statistics.map(|s| format_views(parse_count(s.view_count.as_ref()))).unwrap_or_default(),
      likes: statistics.and_then(|s| parse_count(s.like_count.as_ref())).map(format_count),
      time: self.published_at.map(|at| format_time_ago(at, now)).unwrap_or_default(),
    }
  }
}

fn video_from_item(item: VideoItem, now: DateTime<Utc>) -> Video {
  let VideoItem { id, snippet, statistics } = item;
  snippet.into_video(id, statistics.as_ref(), now)
}

fn video_from_search(item: SearchItem, now: DateTime<Utc>) -> Option<Video> {
  let id = item.id.video_id?;
  Some(item.snippet.into_video(id, None, now))
}

// --- Client ---

/// YouTube Data API v3 client.
pub struct YouTubeProvider {
  http: Client,
  api_key: String,
  region: String,
  base_url: String,
}

impl YouTubeProvider {
  pub fn new(api_key: &str, region: &str) -> Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self {
      http,
      api_key: api_key.to_string(),
      region: region.to_string(),
      base_url: constants().youtube_api_base.clone(),
    })
  }

  async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
    let url = format!("{}/{}", self.base_url, endpoint);
    debug!(endpoint, "youtube: request");
    let response = self
      .http
      .get(&url)
      .query(params)
      .query(&[("key", self.api_key.as_str())])
      .send()
      .await
      .with_context(|| format!("Failed to reach YouTube API ({})", endpoint))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(anyhow!("YouTube API {} failed: HTTP {} {}", endpoint, status.as_u16(), body.trim()));
    }
    response.json::<T>().await.with_context(|| format!("Malformed YouTube API response ({})", endpoint))
  }

  /// Full `videos` records (with statistics) for `ids`, in the order given.
  async fn videos_by_ids(&self, ids: &[String]) -> Result<Vec<Video>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let params = [("part", "snippet,statistics".to_string()), ("id", ids.join(","))];
    let data: ListResponse<VideoItem> = self.get_json("videos", &params).await?;
    let now = Utc::now();
    let mut videos: Vec<Video> = data.items.into_iter().map(|item| video_from_item(item, now)).collect();
    videos.sort_by_key(|v| ids.iter().position(|id| *id == v.id).unwrap_or(usize::MAX));
    Ok(videos)
  }
}

fn max_results(limit: usize) -> String {
  limit.clamp(1, MAX_RESULTS_CAP).to_string()
}

#[async_trait]
impl VideoProvider for YouTubeProvider {
  fn name(&self) -> &'static str {
    "youtube"
  }

  async fn fetch_trending(&self, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
    let mut params = vec![
      ("part", "snippet,statistics".to_string()),
      ("chart", "mostPopular".to_string()),
      ("regionCode", self.region.clone()),
      ("maxResults", max_results(limit)),
    ];
    if let Some(token) = page_token {
      params.push(("pageToken", token.to_string()));
    }
    let data: ListResponse<VideoItem> = self.get_json("videos", &params).await?;
    let now = Utc::now();
    Ok(VideoPage {
      videos: data.items.into_iter().map(|item| video_from_item(item, now)).collect(),
      next_page_token: data.next_page_token,
    })
  }

  async fn search_videos(&self, query: &str, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
    let mut params = vec![
      ("part", "snippet".to_string()),
      ("type", "video".to_string()),
      ("q", query.to_string()),
      ("maxResults", max_results(limit)),
    ];
    if let Some(token) = page_token {
      params.push(("pageToken", token.to_string()));
    }
    let data: ListResponse<SearchItem> = self.get_json("search", &params).await?;
    let ids: Vec<String> = data.items.into_iter().filter_map(|item| item.id.video_id).collect();
    // search snippets carry no statistics, so look the hits up again
    let videos = self.videos_by_ids(&ids).await?;
    Ok(VideoPage { videos, next_page_token: data.next_page_token })
  }

  async fn get_video(&self, id: &str) -> Result<Option<Video>> {
    let params = [("part", "snippet,statistics".to_string()), ("id", id.to_string())];
    let data: ListResponse<VideoItem> = self.get_json("videos", &params).await?;
    let now = Utc::now();
    Ok(data.items.into_iter().next().map(|item| video_from_item(item, now)))
  }

  async fn get_channel_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<Video>> {
    let params = [
      ("part", "snippet".to_string()),
      ("channelId", channel_id.to_string()),
      ("type", "video".to_string()),
      ("order", "date".to_string()),
      ("maxResults", max_results(limit)),
    ];
    let data: ListResponse<SearchItem> = self.get_json("search", &params).await?;
    let now = Utc::now();
    Ok(data.items.into_iter().filter_map(|item| video_from_search(item, now)).collect())
  }
}
