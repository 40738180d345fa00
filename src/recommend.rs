//! Related-video recommendations.
//!
//! Candidates come from an ordered list of sources (same channel, title
//! keywords, trending). Sources run one after another and stop as soon as
//! enough videos are collected. A source that fails contributes nothing and
//! the next one runs. The merged list keeps the first occurrence of each id,
//! never contains the current video, and is cut to the requested limit.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::models::Video;
use crate::provider::VideoProvider;

/// Where a batch of candidates comes from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
  /// Latest uploads of the current video's channel.
  SameChannel,
  /// Provider search for keywords taken from the current title.
  TitleKeywords,
  /// Currently trending videos.
  Trending,
}

impl CandidateSource {
  pub const ALL: [CandidateSource; 3] =
    [CandidateSource::SameChannel, CandidateSource::TitleKeywords, CandidateSource::Trending];

  pub fn label(self) -> &'static str {
    match self {
      CandidateSource::SameChannel => "same_channel",
      CandidateSource::TitleKeywords => "title_keywords",
      CandidateSource::Trending => "trending",
    }
  }
}

/// Keywords for a related-video search: lowercase words of the title longer
/// than three characters, punctuation stripped, generic terms dropped, first few kept.
pub fn extract_keywords(title: &str) -> Vec<String> {
  let c = constants();
  let cleaned: String = title
    .to_lowercase()
    .chars()
    .map(|ch| if ch.is_alphanumeric() || ch == '_' || ch.is_whitespace() { ch } else { ' ' })
    .collect();

  let mut seen = HashSet::new();
  cleaned
    .split_whitespace()
    .filter(|w| w.chars().count() >= c.keyword_min_len)
    .filter(|w| !c.keyword_stoplist.iter().any(|s| s == w))
    .filter(|w| seen.insert(w.to_string()))
    .take(c.keyword_count)
    .map(str::to_string)
    .collect()
}

/// Keep the first video for each id, preserving order.
pub fn dedup_by_id(videos: Vec<Video>) -> Vec<Video> {
  let mut seen = HashSet::new();
  videos.into_iter().filter(|v| seen.insert(v.id.clone())).collect()
}

pub struct Recommender {
  provider: Arc<dyn VideoProvider>,
  sources: Vec<CandidateSource>,
}

impl Recommender {
  pub fn new(provider: Arc<dyn VideoProvider>) -> Self {
    Self::with_sources(provider, CandidateSource::ALL.to_vec())
  }

  pub fn with_sources(provider: Arc<dyn VideoProvider>, sources: Vec<CandidateSource>) -> Self {
    Self { provider, sources }
  }

  /// Up to `limit` videos related to `current`, never including `current` itself.
  /// Provider failures shrink the result, they never fail it.
  pub async fn recommend(&self, current: &Video, limit: usize) -> Vec<Video> {
    let mut collected: Vec<Video> = Vec::new();

    for &source in &self.sources {
      if collected.len() >= limit {
        break;
      }
      match self.candidates(source, current).await {
        Ok(candidates) => {
          let before = collected.len();
          for video in candidates {
            if video.id != current.id && !collected.iter().any(|v| v.id == video.id) {
              collected.push(video);
            }
          }
          debug!(source = source.label(), added = collected.len() - before, "recommend: source done");
        }
        Err(e) => {
          warn!(source = source.label(), err = %format!("{:#}", e), "recommend: source failed, skipping");
        }
      }
    }

    let mut result = dedup_by_id(collected);
    result.truncate(limit);
    info!(video_id = %current.id, count = result.len(), "recommend: built recommendations");
    result
  }

  async fn candidates(&self, source: CandidateSource, current: &Video) -> Result<Vec<Video>> {
    let c = constants();
    match source {
      CandidateSource::SameChannel => {
        let Some(channel_id) = current.channel_id.as_deref().filter(|id| !id.is_empty()) else {
          return Ok(Vec::new());
        };
        self.provider.get_channel_videos(channel_id, c.channel_candidates).await
      }
      CandidateSource::TitleKeywords => {
        let keywords = extract_keywords(&current.title);
        if keywords.is_empty() {
          return Ok(Vec::new());
        }
        let phrase = keywords.join(" ");
        debug!(phrase = %phrase, "recommend: keyword search");
        Ok(self.provider.search_videos(&phrase, c.keyword_candidates, None).await?.videos)
      }
      CandidateSource::Trending => Ok(self.provider.fetch_trending(c.trending_candidates, None).await?.videos),
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::models::VideoPage;
  use anyhow::anyhow;
  use async_trait::async_trait;
  use std::sync::Mutex as StdMutex;

  pub(crate) fn video(id: &str) -> Video {
    Video { id: id.to_string(), title: format!("Video {}", id), channel: "Chan".to_string(), ..Default::default() }
  }

  pub(crate) fn videos(ids: &[&str]) -> Vec<Video> {
    ids.iter().map(|id| video(id)).collect()
  }

  /// Provider answering from fixed lists; `None` makes that call fail.
  #[derive(Default)]
  pub(crate) struct ScriptedProvider {
    pub(crate) channel: Option<Vec<Video>>,
    pub(crate) search: Option<Vec<Video>>,
    pub(crate) trending: Option<Vec<Video>>,
    pub(crate) calls: StdMutex<Vec<String>>,
  }

  impl ScriptedProvider {
    fn answer(&self, call: String, data: &Option<Vec<Video>>) -> Result<Vec<Video>> {
      self.calls.lock().unwrap().push(call);
      data.clone().ok_or_else(|| anyhow!("scripted failure"))
    }

    pub(crate) fn calls(&self) -> Vec<String> {
      self.calls.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl VideoProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
      "scripted"
    }

    async fn fetch_trending(&self, _limit: usize, _page_token: Option<&str>) -> Result<VideoPage> {
      let videos = self.answer("trending".to_string(), &self.trending)?;
      Ok(VideoPage { videos, next_page_token: None })
    }

    async fn search_videos(&self, query: &str, _limit: usize, _page_token: Option<&str>) -> Result<VideoPage> {
      let videos = self.answer(format!("search:{}", query), &self.search)?;
      Ok(VideoPage { videos, next_page_token: None })
    }

    async fn get_video(&self, id: &str) -> Result<Option<Video>> {
      let all = [&self.channel, &self.search, &self.trending];
      Ok(all.iter().filter_map(|list| list.as_ref()).flatten().find(|v| v.id == id).cloned())
    }

    async fn get_channel_videos(&self, channel_id: &str, _limit: usize) -> Result<Vec<Video>> {
      self.answer(format!("channel:{}", channel_id), &self.channel)
    }
  }

  fn current() -> Video {
    Video {
      id: "X".to_string(),
      title: "Official Video: Amazing Guitar Solo Compilation".to_string(),
      channel: "Chan".to_string(),
      channel_id: Some("UC1".to_string()),
      ..Default::default()
    }
  }

  fn ids(videos: &[Video]) -> Vec<&str> {
    videos.iter().map(|v| v.id.as_str()).collect()
  }

  #[test]
  fn keywords_skip_short_and_generic_words() {
    assert_eq!(extract_keywords("Official Video: Amazing Guitar Solo Compilation"), ["amazing", "guitar", "solo"]);
    assert_eq!(extract_keywords("The NEW trailer 2025 - Dune dune"), ["dune"]);
    assert!(extract_keywords("a an the").is_empty());
  }

  #[test]
  fn dedup_keeps_first_occurrence() {
    let merged = dedup_by_id(videos(&["a", "b", "a", "c", "b"]));
    assert_eq!(ids(&merged), ["a", "b", "c"]);
  }

  #[tokio::test]
  async fn cascade_preserves_precedence_order() {
    let provider = Arc::new(ScriptedProvider {
      channel: Some(videos(&["A", "B", "C"])),
      search: Some(videos(&["C", "D"])),
      trending: Some(videos(&["D", "E", "F"])),
      ..Default::default()
    });
    let recs = Recommender::new(provider.clone()).recommend(&current(), 10).await;
    assert_eq!(ids(&recs), ["A", "B", "C", "D", "E", "F"]);
    assert_eq!(provider.calls(), ["channel:UC1", "search:amazing guitar solo", "trending"]);
  }

  #[tokio::test]
  async fn current_video_is_never_recommended() {
    let provider = Arc::new(ScriptedProvider {
      channel: Some(videos(&["X", "A"])),
      search: Some(videos(&["X", "B"])),
      trending: Some(videos(&["B", "X", "C"])),
      ..Default::default()
    });
    let recs = Recommender::new(provider).recommend(&current(), 10).await;
    assert_eq!(ids(&recs), ["A", "B", "C"]);
  }

  #[tokio::test]
  async fn stops_once_limit_is_reached() {
    let provider = Arc::new(ScriptedProvider {
      channel: Some(videos(&["A", "B", "C"])),
      search: Some(videos(&["D"])),
      trending: Some(videos(&["E"])),
      ..Default::default()
    });
    let recs = Recommender::new(provider.clone()).recommend(&current(), 2).await;
    assert_eq!(ids(&recs), ["A", "B"]);
    assert_eq!(provider.calls(), ["channel:UC1"]);
  }

  #[tokio::test]
  async fn failed_sources_are_skipped() {
    let provider =
      Arc::new(ScriptedProvider { channel: None, search: None, trending: Some(videos(&["T"])), ..Default::default() });
    let recs = Recommender::new(provider.clone()).recommend(&current(), 10).await;
    assert_eq!(ids(&recs), ["T"]);
    assert_eq!(provider.calls().len(), 3);
  }

  #[tokio::test]
  async fn everything_failing_gives_empty_list() {
    let provider = Arc::new(ScriptedProvider::default());
    assert!(Recommender::new(provider).recommend(&current(), 15).await.is_empty());
  }

  #[tokio::test]
  async fn missing_channel_id_skips_channel_source() {
    let provider = Arc::new(ScriptedProvider {
      channel: Some(videos(&["A"])),
      search: Some(videos(&["S"])),
      trending: Some(Vec::new()),
      ..Default::default()
    });
    let mut without_channel = current();
    without_channel.channel_id = None;
    let recs = Recommender::new(provider.clone()).recommend(&without_channel, 10).await;
    assert_eq!(ids(&recs), ["S"]);
    assert!(!provider.calls().iter().any(|c| c.starts_with("channel:")));
  }

  #[tokio::test]
  async fn invariants_hold_for_every_failure_combination() {
    for mask in 0u8..8 {
      for limit in [0usize, 1, 3, 15] {
        let pick = |bit: u8, list: Vec<Video>| (mask & bit != 0).then_some(list);
        let provider = Arc::new(ScriptedProvider {
          channel: pick(1, videos(&["X", "A", "B", "A"])),
          search: pick(2, videos(&["B", "C", "X", "D"])),
          trending: pick(4, videos(&["D", "E", "X", "F", "G"])),
          ..Default::default()
        });
        let recs = Recommender::new(provider).recommend(&current(), limit).await;
        assert!(recs.len() <= limit);
        assert!(recs.iter().all(|v| v.id != "X"));
        let unique: HashSet<&str> = recs.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(unique.len(), recs.len());
      }
    }
  }

  #[tokio::test]
  async fn custom_source_order_is_respected() {
    let provider = Arc::new(ScriptedProvider {
      channel: Some(videos(&["A"])),
      search: Some(videos(&["S"])),
      trending: Some(videos(&["T"])),
      ..Default::default()
    });
    let recommender =
      Recommender::with_sources(provider, vec![CandidateSource::Trending, CandidateSource::SameChannel]);
    assert_eq!(ids(&recommender.recommend(&current(), 10).await), ["T", "A"]);
  }
}
