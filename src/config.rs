use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub bugzilla: BugzillaConfig,
  /// Upcoming releases, in the order they are evaluated and displayed
  #[serde(default = "default_releases")]
  pub releases: Vec<String>,
  #[serde(default)]
  pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BugzillaConfig {
  /// Base URL of the Bugzilla instance (REST endpoint is `<url>rest/`)
  #[serde(default = "default_url")]
  pub url: String,
  #[serde(default = "default_product")]
  pub product: String,
  /// Bug statuses that count as open
  #[serde(default = "default_statuses")]
  pub statuses: Vec<String>,
  /// Upper bound for a single search request
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for BugzillaConfig {
  fn default() -> Self {
    Self {
      url: default_url(),
      product: default_product(),
      statuses: default_statuses(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Team {
  pub name: String,
  /// Headcount, used to derive the gate thresholds
  #[serde(default)]
  pub peeps: u32,
  #[serde(default)]
  pub components: Vec<String>,
}

fn default_url() -> String {
  "https://bugzilla.redhat.com/".to_string()
}

fn default_product() -> String {
  "OpenShift Container Platform".to_string()
}

fn default_statuses() -> Vec<String> {
  ["NEW", "ASSIGNED", "POST", "MODIFIED"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_releases() -> Vec<String> {
  vec!["4.6.0".to_string(), "4.7.0".to_string()]
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./team-gates.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/team-gates/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/team-gates/config.yaml\n\
                 It needs at least a `teams` list with name, peeps and components."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("team-gates.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("team-gates").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Find a team by its exact name. The first match wins.
  pub fn team(&self, name: &str) -> Option<&Team> {
    self.teams.iter().find(|t| t.name == name)
  }

  /// Get the optional Bugzilla API key from environment variables.
  ///
  /// Checks TEAM_GATES_BUGZILLA_API_KEY first, then BUGZILLA_API_KEY as fallback.
  /// Public instances answer anonymous searches, so a missing key is not an error.
  pub fn get_api_key() -> Option<String> {
    std::env::var("TEAM_GATES_BUGZILLA_API_KEY")
      .or_else(|_| std::env::var("BUGZILLA_API_KEY"))
      .ok()
      .filter(|k| !k.is_empty())
  }
}
