use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tubeshelf::config::{Config, project_dirs};
use tubeshelf::constants::constants;
use tubeshelf::format::truncate_str;
use tubeshelf::{FileStorage, MemoryStorage, Persistence, Session, Video, VideoPage, provider_from_config};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Directory for history and notification files (default: platform data dir)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Keep all state in memory for this run only
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List trending videos
  Trending {
    #[arg(short, long, default_value_t = constants().default_page_size)]
    limit: usize,
    #[arg(long)]
    page: Option<String>,
  },
  /// Search videos and record the query in search history
  Search {
    query: String,
    #[arg(short, long, default_value_t = constants().default_page_size)]
    limit: usize,
    #[arg(long)]
    page: Option<String>,
  },
  /// Open a video: record it as watched and list related videos
  Watch { id: String },
  /// Watch history
  History {
    #[command(subcommand)]
    action: Option<HistoryAction>,
  },
  /// Search history
  Searches {
    #[command(subcommand)]
    action: Option<SearchesAction>,
  },
  /// Notifications
  Notifications {
    #[command(subcommand)]
    action: Option<NotificationsAction>,
  },
  /// Show the effective configuration
  Config,
  /// Print shell completions
  Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
  List,
  Remove { id: String },
  Clear,
}

#[derive(Subcommand, Debug)]
enum SearchesAction {
  List,
  Popular {
    #[arg(short, long, default_value_t = 5)]
    limit: usize,
  },
  Filter { needle: String },
  Remove { id: u64 },
  Clear,
  Stats,
}

#[derive(Subcommand, Debug)]
enum NotificationsAction {
  List,
  Read { id: u64 },
  ReadAll,
  Remove { id: u64 },
  Clear,
}

// --- Logging ---

/// Log to a daily file in the cache dir so stdout stays clean for command output.
fn init_logging() -> Option<WorkerGuard> {
  let log_dir = project_dirs()?.cache_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let appender = tracing_appender::rolling::daily(log_dir, "tubeshelf.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Output ---

const TITLE_WIDTH: usize = 60;

fn print_videos(videos: &[Video]) {
  if videos.is_empty() {
    println!("No videos.");
    return;
  }
  for (i, v) in videos.iter().enumerate() {
    println!("{:>3}. {:<11}  {}", i + 1, v.id, truncate_str(&v.title, TITLE_WIDTH));
    let meta: Vec<&str> =
      [v.channel.as_str(), v.views.as_str(), v.time.as_str()].into_iter().filter(|s| !s.is_empty()).collect();
    if !meta.is_empty() {
      println!("     {}", meta.join(" · "));
    }
  }
}

fn print_page(page: &VideoPage) {
  print_videos(&page.videos);
  if let Some(token) = &page.next_page_token {
    println!("\nMore results: --page {}", token);
  }
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging();

  let mut config = Config::load();
  if let Some(dir) = &args.data_dir {
    config.data_dir = Some(dir.clone());
  }

  run(args, config).await
}

fn open_persistence(config: &Config, ephemeral: bool) -> Result<Persistence> {
  if ephemeral {
    return Ok(Persistence::new(Arc::new(MemoryStorage::new())));
  }
  let dir = config.data_dir().context("No data directory available; pass --data-dir or --ephemeral")?;
  info!(dir = %dir.display(), "storage: using file storage");
  Ok(Persistence::new(Arc::new(FileStorage::new(dir))))
}

async fn run(args: Args, config: Config) -> Result<()> {
  match args.command {
    Command::Completions { shell } => {
      clap_complete::generate(shell, &mut Args::command(), "tubeshelf", &mut std::io::stdout());
      return Ok(());
    }
    Command::Config => {
      println!("config file:          {}", Config::config_file().map(|p| p.display().to_string()).unwrap_or_default());
      println!("data dir:             {}", config.data_dir().map(|p| p.display().to_string()).unwrap_or_default());
      let key_state = if config.api_key().is_some() { "set" } else { "not set (offline catalog)" };
      println!("api key:              {}", key_state);
      println!("region:               {}", config.region());
      println!("recommendation limit: {}", config.recommendation_limit());
      return Ok(());
    }
    _ => {}
  }

  let persistence = open_persistence(&config, args.ephemeral)?;
  let provider = provider_from_config(&config)?;
  let mut session = Session::new(persistence, provider, &config);

  match args.command {
    Command::Trending { limit, page } => {
      let page = session.trending(limit, page.as_deref()).await.context("Failed to load trending videos")?;
      print_page(&page);
    }
    Command::Search { query, limit, page } => {
      let page = session.search(&query, limit, page.as_deref()).await.context("Search failed")?;
      print_page(&page);
    }
    Command::Watch { id } => {
      let Some(video) = session.watch(&id).await.with_context(|| format!("Failed to load video {}", id))? else {
        bail!("Video not found: {}", id);
      };
      println!("▶ {}", video.title);
      println!("  {} · {} · {}", video.channel, video.views, video.time);
      println!("  https://www.youtube.com/watch?v={}\n", video.id);
      let recs = session.wait_recommendations().await;
      if recs.is_empty() {
        println!("No recommendations.");
      } else {
        println!("Up next:");
        print_videos(recs);
      }
    }
    Command::History { action } => match action.unwrap_or(HistoryAction::List) {
      HistoryAction::List => {
        if session.history.is_empty() {
          println!("Your watch history is empty.");
        }
        for (label, entries) in session.history.grouped_by_day(Local::now()) {
          println!("{}", label);
          for e in entries {
            println!("  {:<11}  {}", e.video.id, truncate_str(&e.video.title, TITLE_WIDTH));
          }
        }
      }
      HistoryAction::Remove { id } => {
        session.history.remove(&id);
      }
      HistoryAction::Clear => {
        session.history.clear();
      }
    },
    Command::Searches { action } => match action.unwrap_or(SearchesAction::List) {
      SearchesAction::List => {
        for (label, entries) in session.searches.grouped(Local::now()) {
          println!("{}", label);
          for e in entries {
            println!("  {:>13}  {}", e.id, e.query);
          }
        }
      }
      SearchesAction::Popular { limit } => {
        for query in session.searches.popular_searches(limit) {
          println!("{}", query);
        }
      }
      SearchesAction::Filter { needle } => {
        let hits = session.searches.filter(&needle);
        if hits.is_empty() {
          println!("No matches for \"{}\".", needle);
        }
        for e in hits {
          println!("  {:>13}  {}", e.id, e.query);
        }
      }
      SearchesAction::Remove { id } => {
        session.searches.remove(id);
      }
      SearchesAction::Clear => {
        session.searches.clear();
      }
      SearchesAction::Stats => {
        let stats = session.searches.stats(Utc::now());
        println!("Total searches:   {}", stats.total);
        println!("Unique queries:   {}", stats.unique);
        println!("Last 24h:         {}", stats.last_24h);
        println!("Avg query length: {}", stats.avg_query_len);
      }
    },
    Command::Notifications { action } => {
      let store = &mut session.notifications;
      match action.unwrap_or(NotificationsAction::List) {
        NotificationsAction::List => {}
        NotificationsAction::Read { id } => {
          store.mark_read(id);
        }
        NotificationsAction::ReadAll => {
          store.mark_all_read();
        }
        NotificationsAction::Remove { id } => {
          store.remove(id);
        }
        NotificationsAction::Clear => {
          store.clear();
        }
      }
      println!("{} unread", store.unread_count());
      for n in store.entries() {
        let marker = if n.read { " " } else { "●" };
        let action = n.action.as_deref().map(|a| format!(": {}", a)).unwrap_or_default();
        println!("{} {:>13}  {} {}{}  ({})", marker, n.id, n.channel, n.message, action, n.time);
      }
    }
    Command::Config | Command::Completions { .. } => {}
  }
  Ok(())
}
