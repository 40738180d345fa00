//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Storage keys
  pub watch_history_key: String,
  pub search_history_key: String,
  pub notifications_key: String,

  // Store caps
  pub watch_history_cap: usize,
  pub search_history_cap: usize,
  pub notifications_cap: usize,

  // Recommendations
  pub recommendation_limit: usize,
  pub channel_candidates: usize,
  pub keyword_candidates: usize,
  pub trending_candidates: usize,
  pub keyword_count: usize,
  pub keyword_min_len: usize,
  pub keyword_stoplist: Vec<String>,

  // Provider
  pub youtube_api_base: String,
  pub default_region: String,
  pub default_page_size: usize,
  pub request_timeout_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed every test fails on first access.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
