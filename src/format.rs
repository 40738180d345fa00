use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

// --- Provider display strings ---

/// Compact count, e.g. `1.2M`, `3.4K`, `12`.
pub fn format_count(n: u64) -> String {
  if n >= 1_000_000 {
    format!("{:.1}M", n as f64 / 1_000_000.0)
  } else if n >= 1_000 {
    format!("{:.1}K", n as f64 / 1_000.0)
  } else {
    n.to_string()
  }
}

/// Render a raw view count the way listings show it.
pub fn format_views(count: Option<u64>) -> String {
  match count {
    None | Some(0) => "No views".to_string(),
    Some(n) => format!("{} views", format_count(n)),
  }
}

/// Relative age of `published` against `now`, e.g. `3 days ago`.
pub fn format_time_ago(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
  const INTERVALS: [(&str, i64); 7] = [
    ("year", 31_536_000),
    ("month", 2_592_000),
    ("week", 604_800),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
    ("second", 1),
  ];

  let elapsed = (now - published).num_seconds();
  for (label, secs) in INTERVALS {
    let count = elapsed / secs;
    if count >= 1 {
      let plural = if count > 1 { "s" } else { "" };
      return format!("{} {}{} ago", count, label, plural);
    }
  }
  "just now".to_string()
}

// --- History grouping labels ---

/// Day bucket for watch history: `Today`, `Yesterday`, else `Mar 5` (or `Mar 5, 2023` in another year).
pub fn day_label(at: DateTime<Utc>, now: DateTime<Local>) -> String {
  let day = at.with_timezone(&Local).date_naive();
  let today = now.date_naive();
  match (today - day).num_days() {
    // clock skew can put `at` after `now`
    i64::MIN..=0 => "Today".to_string(),
    1 => "Yesterday".to_string(),
    _ => short_date(day, today.year()),
  }
}

fn short_date(day: NaiveDate, current_year: i32) -> String {
  if day.year() == current_year { day.format("%b %-d").to_string() } else { day.format("%b %-d, %Y").to_string() }
}

/// Coarse bucket for search history: `Today`, `Yesterday`, `This Week` or `Older`.
pub fn search_group_label(at: DateTime<Utc>, now: DateTime<Local>) -> &'static str {
  let day = at.with_timezone(&Local).date_naive();
  match (now.date_naive() - day).num_days() {
    i64::MIN..=0 => "Today",
    1 => "Yesterday",
    2..=7 => "This Week",
    _ => "Older",
  }
}

/// Display order of the buckets produced by [`search_group_label`].
pub const SEARCH_GROUP_ORDER: [&str; 4] = ["Today", "Yesterday", "This Week", "Older"];

// --- Terminal helpers ---

/// Compute the display width of a string (accounting for double-width CJK).
pub fn display_width(s: &str) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` display columns, appending "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
  use unicode_width::UnicodeWidthChar;
  if display_width(s) <= max_width {
    return s.to_string();
  }
  let budget = max_width.saturating_sub(1);
  let mut used = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if used + w > budget {
      break;
    }
    used += w;
    out.push(c);
  }
  format!("{}…", out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  #[test]
  fn views_scale_suffixes() {
    assert_eq!(format_views(None), "No views");
    assert_eq!(format_views(Some(0)), "No views");
    assert_eq!(format_views(Some(12)), "12 views");
    assert_eq!(format_views(Some(3_400)), "3.4K views");
    assert_eq!(format_views(Some(1_240_000)), "1.2M views");
    assert_eq!(format_count(999), "999");
  }

  #[test]
  fn time_ago_picks_largest_unit() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    assert_eq!(format_time_ago(now, now), "just now");
    assert_eq!(format_time_ago(now - Duration::seconds(1), now), "1 second ago");
    assert_eq!(format_time_ago(now - Duration::hours(5), now), "5 hours ago");
    assert_eq!(format_time_ago(now - Duration::days(3), now), "3 days ago");
    assert_eq!(format_time_ago(now - Duration::days(400), now), "1 year ago");
    // future dates never go negative
    assert_eq!(format_time_ago(now + Duration::days(1), now), "just now");
  }

  #[test]
  fn day_labels() {
    let now = Local.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
    let utc = |d: DateTime<Local>| d.with_timezone(&Utc);
    assert_eq!(day_label(utc(now - Duration::hours(1)), now), "Today");
    assert_eq!(day_label(utc(now - Duration::days(1)), now), "Yesterday");
    assert_eq!(day_label(utc(Local.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap()), now), "Mar 5");
    assert_eq!(day_label(utc(Local.with_ymd_and_hms(2023, 3, 5, 9, 0, 0).unwrap()), now), "Mar 5, 2023");
  }

  #[test]
  fn future_timestamps_count_as_today() {
    let now = Local.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
    let ahead = (now + Duration::days(2)).with_timezone(&Utc);
    assert_eq!(day_label(ahead, now), "Today");
    assert_eq!(search_group_label(ahead, now), "Today");
  }

  #[test]
  fn search_group_labels() {
    let now = Local.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
    let ago = |d: i64| (now - Duration::days(d)).with_timezone(&Utc);
    assert_eq!(search_group_label(ago(0), now), "Today");
    assert_eq!(search_group_label(ago(1), now), "Yesterday");
    assert_eq!(search_group_label(ago(5), now), "This Week");
    assert_eq!(search_group_label(ago(30), now), "Older");
  }

  #[test]
  fn truncate_respects_wide_chars() {
    assert_eq!(truncate_str("hello", 10), "hello");
    assert_eq!(truncate_str("hello world", 6), "hello…");
    assert_eq!(truncate_str("日本語テキスト", 5), "日本…");
  }
}
