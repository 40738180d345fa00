//! Local watch history, search history and notifications for a video
//! browser, plus related-video recommendations over a pluggable provider.

pub mod config;
pub mod constants;
pub mod format;
pub mod history;
pub mod models;
pub mod notifications;
pub mod provider;
pub mod recommend;
pub mod search_history;
pub mod session;
pub mod storage;

pub use config::Config;
pub use history::WatchHistory;
pub use models::{
  NewNotification, NotificationEntry, NotificationKind, SearchHistoryEntry, Video, VideoPage, WatchHistoryEntry,
};
pub use notifications::Notifications;
pub use provider::{OfflineCatalog, VideoProvider, YouTubeProvider, provider_from_config};
pub use recommend::{CandidateSource, Recommender};
pub use search_history::{SearchHistory, SearchStats};
pub use session::Session;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, Persistence, StorageError};
