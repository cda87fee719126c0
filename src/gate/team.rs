use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};

use crate::bugzilla::cache::BugQuery;
use crate::bugzilla::cached_client::CachedBugzillaClient;
use crate::bugzilla::types::{Bug, Severity};
use crate::cache::CacheSource;
use crate::config::Config;

use super::evaluator::{report, GateReport};

/// A team's gates together with the bugs behind them
#[derive(Debug, Clone)]
pub struct TeamGate {
  pub headcount: u32,
  pub report: GateReport,
  /// Non-low bugs, newest first
  pub bugs: Vec<Bug>,
  pub source: CacheSource,
  pub valid_until: DateTime<Utc>,
  pub evaluated_at: DateTime<Utc>,
  pub buglist_url: String,
}

impl TeamGate {
  /// True when every release gate is open
  pub fn all_open(&self) -> bool {
    self.report.releases.iter().all(|r| r.gate_open)
  }
}

/// Fetch a team's open bugs and evaluate its gates.
///
/// With `force` the cache entry is bypassed and replaced.
pub async fn load_team_gate(
  client: &CachedBugzillaClient,
  config: &Config,
  team_name: &str,
  force: bool,
) -> Result<TeamGate> {
  let team = config
    .team(team_name)
    .ok_or_else(|| eyre!("Unknown team: {}", team_name))?;
  let query = BugQuery::for_team(&config.bugzilla, team)?;

  let result = if force {
    client.refresh_bugs(&query).await?
  } else {
    client.search_bugs(&query).await?
  };

  let now = Utc::now();
  let report = report(&result.data, &config.releases, team.peeps, now);

  let mut bugs: Vec<Bug> = result
    .data
    .into_iter()
    .filter(|b| b.severity != Severity::Low)
    .collect();
  bugs.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

  Ok(TeamGate {
    headcount: team.peeps,
    report,
    bugs,
    source: result.source,
    valid_until: result.valid_until,
    evaluated_at: now,
    buglist_url: client.buglist_url(&query)?.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn setup() -> (CachedBugzillaClient, Config) {
    let config = Config::from_yaml(
      r#"
teams:
  - name: registry
    peeps: 2
    components: [Image Registry]
  - name: ghosts
    peeps: 1
"#,
    )
    .unwrap();
    let client = CachedBugzillaClient::new(&config.bugzilla).unwrap();
    (client, config)
  }

  #[tokio::test]
  async fn test_unknown_team() {
    let (client, config) = setup();
    let err = load_team_gate(&client, &config, "nobody", false)
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Unknown team: nobody");
  }

  #[tokio::test]
  async fn test_team_without_components_fails_before_searching() {
    let (client, config) = setup();
    let err = load_team_gate(&client, &config, "ghosts", true)
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Team ghosts has no components");
  }
}
