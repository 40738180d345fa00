use anyhow::{Context, Result};
use async_trait::async_trait;

use super::VideoProvider;
use crate::models::{Video, VideoPage};

/// Deterministic provider over a fixed list of videos.
///
/// Page tokens are plain offsets into the matching list.
#[derive(Debug, Clone)]
pub struct OfflineCatalog {
  videos: Vec<Video>,
}

impl OfflineCatalog {
  pub fn new(videos: Vec<Video>) -> Self {
    Self { videos }
  }

  /// The catalog embedded from `catalog.ron`.
  pub fn embedded() -> Self {
    // Safety: the RON file is embedded at compile time; a malformed file fails the catalog tests.
    let videos = ron::from_str(include_str!("../../catalog.ron")).expect("catalog.ron must be valid RON");
    Self::new(videos)
  }

  pub fn videos(&self) -> &[Video] {
    &self.videos
  }
}

fn page(matches: Vec<&Video>, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
  let offset = match page_token {
    Some(token) => token.parse::<usize>().with_context(|| format!("Invalid page token: {}", token))?,
    None => 0,
  };
  let end = offset.saturating_add(limit).min(matches.len());
  let videos: Vec<Video> = matches.get(offset..end).unwrap_or_default().iter().map(|v| (*v).clone()).collect();
  let next_page_token = (end < matches.len() && !videos.is_empty()).then(|| end.to_string());
  Ok(VideoPage { videos, next_page_token })
}

/// Number of query terms found in the video's title, channel or description.
fn match_score(video: &Video, terms: &[String]) -> usize {
  let haystack = format!("{} {} {}", video.title, video.channel, video.description).to_lowercase();
  terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

#[async_trait]
impl VideoProvider for OfflineCatalog {
  fn name(&self) -> &'static str {
    "offline"
  }

  async fn fetch_trending(&self, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
    page(self.videos.iter().collect(), limit, page_token)
  }

  async fn search_videos(&self, query: &str, limit: usize, page_token: Option<&str>) -> Result<VideoPage> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    let mut scored: Vec<(usize, &Video)> =
      self.videos.iter().map(|v| (match_score(v, &terms), v)).filter(|(score, _)| *score > 0).collect();
    // stable: equal scores keep catalog order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    page(scored.into_iter().map(|(_, v)| v).collect(), limit, page_token)
  }

  async fn get_video(&self, id: &str) -> Result<Option<Video>> {
    Ok(self.videos.iter().find(|v| v.id == id).cloned())
  }

  async fn get_channel_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<Video>> {
    Ok(self.videos.iter().filter(|v| v.channel_id.as_deref() == Some(channel_id)).take(limit).cloned().collect())
  }
}
