use crate::tasks::SyncStatus;
use chrono::NaiveDate;
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a sync status
pub fn status_color(status: &SyncStatus) -> Color {
  match status {
    SyncStatus::Found { .. } => Color::Green,
    SyncStatus::Loading | SyncStatus::Updating { .. } => Color::Yellow,
    SyncStatus::Error(_) => Color::Red,
  }
}

/// Color for a task's date badge relative to `today`
pub fn date_color(date: Option<&str>, today: NaiveDate) -> Color {
  match date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) {
    Some(d) if d < today => Color::DarkGray,
    Some(d) if d == today => Color::Green,
    Some(_) => Color::Cyan,
    None => Color::Magenta,
  }
}
