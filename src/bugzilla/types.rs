use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Bug severity as reported by Bugzilla
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Urgent,
  High,
  Medium,
  Low,
  Unspecified,
  /// Any value this instance does not know about
  #[serde(other)]
  Other,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::Urgent => "urgent",
      Severity::High => "high",
      Severity::Medium => "medium",
      Severity::Low => "low",
      Severity::Unspecified => "unspecified",
      Severity::Other => "other",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

/// An open bug, immutable once fetched
#[derive(Debug, Clone, PartialEq)]
pub struct Bug {
  pub id: u64,
  pub summary: String,
  pub creation_time: DateTime<Utc>,
  pub severity: Severity,
  pub status: String,
  /// Ordered; only the first entry is used for release matching
  pub target_release: Vec<String>,
}
