use crate::bugzilla::api_types::ApiSearchResponse;
use crate::bugzilla::types::Bug;
use crate::config::{BugzillaConfig, Config};
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Bugzilla REST API client
#[derive(Clone)]
pub struct BugzillaClient {
  http: reqwest::Client,
  base_url: Url,
  api_key: Option<String>,
}

impl BugzillaClient {
  pub fn new(config: &BugzillaConfig) -> Result<Self> {
    let base_url = parse_base_url(&config.url)?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("team-gates/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      api_key: Config::get_api_key(),
    })
  }

  /// Search bugs with an already encoded query string
  pub async fn search_bugs(&self, query: &str) -> Result<Vec<Bug>> {
    let url = self.search_url(query)?;

    let mut request = self.http.get(url);
    if let Some(key) = &self.api_key {
      request = request.header("X-BUGZILLA-API-KEY", key);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to search bugs: {}", e))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read search response: {}", e))?;

    // Bugzilla puts a JSON error envelope in most failure responses, prefer it
    // over the bare HTTP status when it parses.
    let parsed: serde_json::Result<ApiSearchResponse> = serde_json::from_str(&body);
    match parsed {
      Ok(search) if search.error || !status.is_success() => {
        let message = search
          .into_bugs()
          .err()
          .unwrap_or_else(|| format!("HTTP {}", status));
        Err(eyre!("Bugzilla search failed: {}", message))
      }
      Ok(search) => {
        let bugs = search
          .into_bugs()
          .map_err(|e| eyre!("Bugzilla search failed: {}", e))?;
        debug!(count = bugs.len(), "bugzilla search returned");
        Ok(bugs)
      }
      Err(_) if !status.is_success() => Err(eyre!("Bugzilla search failed: HTTP {}", status)),
      Err(e) => Err(eyre!("Failed to parse bugs: {}", e)),
    }
  }

  /// Browser link to the same search
  pub fn buglist_url(&self, query: &str) -> Result<Url> {
    let mut url = self
      .base_url
      .join("buglist.cgi")
      .map_err(|e| eyre!("Invalid Bugzilla URL: {}", e))?;
    url.set_query(Some(query));
    Ok(url)
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn search_url(&self, query: &str) -> Result<Url> {
    let mut url = self
      .base_url
      .join("rest/bug")
      .map_err(|e| eyre!("Invalid Bugzilla URL: {}", e))?;
    url.set_query(Some(query));
    Ok(url)
  }
}

/// Parse the configured base URL, making sure it ends with a slash so relative
/// joins stay below it.
fn parse_base_url(raw: &str) -> Result<Url> {
  let normalized = if raw.ends_with('/') {
    raw.to_string()
  } else {
    format!("{}/", raw)
  };
  Url::parse(&normalized).map_err(|e| eyre!("Invalid Bugzilla URL {}: {}", raw, e))
}
