use crate::bugzilla::types::Severity;
use ratatui::prelude::{Color, Modifier, Style};

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn gate_label(open: bool) -> &'static str {
  if open {
    "OPEN"
  } else {
    "CLOSED"
  }
}

pub fn gate_style(open: bool) -> Style {
  let color = if open { Color::Green } else { Color::Red };
  Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Red when a count is over its limit
pub fn count_style(count: u32, limit: u32) -> Style {
  if count > limit {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(Color::White)
  }
}

pub fn severity_color(severity: Severity) -> Color {
  match severity {
    Severity::Urgent => Color::Magenta,
    Severity::High => Color::Red,
    Severity::Medium => Color::Yellow,
    Severity::Low => Color::DarkGray,
    Severity::Unspecified | Severity::Other => Color::White,
  }
}
