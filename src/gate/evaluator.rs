use chrono::{DateTime, Duration, Utc};

use crate::bugzilla::types::{Bug, Severity};

/// Bugs created within this many days before `now` are recent blockers
pub const RECENT_DAYS: i64 = 7;

const MEDIUM_PLUS_PER_HEAD: u32 = 5;
const RECENT_BLOCKERS_PER_HEAD: u32 = 1;
const AGED_BLOCKERS_LIMIT: u32 = 0;

/// Per-release bug counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
  /// Every non-low bug, whatever its target release
  pub medium_plus: u32,
  pub recent_blockers: u32,
  pub aged_blockers: u32,
}

impl Counts {
  pub fn blockers(&self) -> u32 {
    self.recent_blockers + self.aged_blockers
  }
}

/// Gate limits for one team, each compared independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
  pub medium_plus_limit: u32,
  pub recent_blockers_limit: u32,
  pub aged_blockers_limit: u32,
}

impl Threshold {
  pub fn for_headcount(headcount: u32) -> Self {
    Self {
      medium_plus_limit: MEDIUM_PLUS_PER_HEAD.saturating_mul(headcount),
      recent_blockers_limit: RECENT_BLOCKERS_PER_HEAD.saturating_mul(headcount),
      aged_blockers_limit: AGED_BLOCKERS_LIMIT,
    }
  }

  /// True when no bucket is over its limit. Being far below on one bucket does
  /// not compensate for another being over.
  pub fn admits(&self, counts: &Counts) -> bool {
    counts.medium_plus <= self.medium_plus_limit
      && counts.recent_blockers <= self.recent_blockers_limit
      && counts.aged_blockers <= self.aged_blockers_limit
  }
}

/// Gate result for one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
  pub version: String,
  pub counts: Counts,
  pub total_blockers: u32,
  pub gate_open: bool,
}

/// Everything the dashboard needs to show a team's gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
  pub threshold: Threshold,
  pub releases: Vec<ReleaseInfo>,
}

/// Whether a bug blocks `release`.
///
/// Only the first target release counts. A bug with no target release is not
/// triaged yet and blocks every release.
pub fn is_blocker_for(bug: &Bug, release: &str) -> bool {
  match bug.target_release.first() {
    None => true,
    Some(first) => first == release,
  }
}

/// Created strictly after `now - RECENT_DAYS`.
pub fn is_recent(creation_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
  creation_time > now - Duration::days(RECENT_DAYS)
}

fn count_for_release(bugs: &[Bug], release: &str, now: DateTime<Utc>) -> Counts {
  let mut counts = Counts::default();

  for bug in bugs.iter().filter(|b| b.severity != Severity::Low) {
    counts.medium_plus += 1;

    if is_blocker_for(bug, release) {
      if is_recent(bug.creation_time, now) {
        counts.recent_blockers += 1;
      } else {
        counts.aged_blockers += 1;
      }
    }
  }

  counts
}

/// Evaluate the gate of every release, in the given order.
pub fn evaluate<S: AsRef<str>>(
  bugs: &[Bug],
  releases: &[S],
  headcount: u32,
  now: DateTime<Utc>,
) -> Vec<ReleaseInfo> {
  let threshold = Threshold::for_headcount(headcount);

  releases
    .iter()
    .map(|release| {
      let counts = count_for_release(bugs, release.as_ref(), now);
      ReleaseInfo {
        version: release.as_ref().to_string(),
        counts,
        total_blockers: counts.blockers(),
        gate_open: threshold.admits(&counts),
      }
    })
    .collect()
}

/// [`evaluate`] plus the threshold it was evaluated against.
pub fn report<S: AsRef<str>>(
  bugs: &[Bug],
  releases: &[S],
  headcount: u32,
  now: DateTime<Utc>,
) -> GateReport {
  GateReport {
    threshold: Threshold::for_headcount(headcount),
    releases: evaluate(bugs, releases, headcount, now),
  }
}
