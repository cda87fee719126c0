//! Serde-deserializable types matching Bugzilla REST responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::types::{Bug, Severity};

/// Response of `GET /rest/bug`.
///
/// Bugzilla reports failures in the body as `{"error": true, "message": ..., "code": ...}`,
/// sometimes with a 200 status, so both shapes share one struct.
#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse {
  #[serde(default)]
  pub bugs: Vec<ApiBug>,
  #[serde(default)]
  pub error: bool,
  pub message: Option<String>,
  pub code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiBug {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub summary: String,
  /// RFC 3339; anything else fails decoding of the whole response
  pub creation_time: DateTime<Utc>,
  pub severity: Severity,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub target_release: Vec<String>,
}

impl From<ApiBug> for Bug {
  fn from(bug: ApiBug) -> Self {
    Bug {
      id: bug.id,
      summary: bug.summary,
      creation_time: bug.creation_time,
      severity: bug.severity,
      status: bug.status,
      target_release: bug.target_release,
    }
  }
}

impl ApiSearchResponse {
  /// Convert into domain bugs, or the error Bugzilla reported.
  pub fn into_bugs(self) -> Result<Vec<Bug>, String> {
    if self.error {
      let message = self.message.unwrap_or_else(|| "unknown error".to_string());
      return Err(match self.code {
        Some(code) => format!("{} (code {})", message, code),
        None => message,
      });
    }
    Ok(self.bugs.into_iter().map(Bug::from).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_decode_search_response() {
    let json = r#"{
      "bugs": [
        {
          "id": 1880001,
          "summary": "image pruner fails",
          "creation_time": "2020-09-17T08:12:45Z",
          "severity": "high",
          "status": "NEW",
          "target_release": ["4.6.0"],
          "component": ["Image Registry"]
        },
        {
          "id": 1880002,
          "summary": "typo in docs",
          "creation_time": "2020-09-01T00:00:00Z",
          "severity": "low",
          "status": "ASSIGNED",
          "target_release": []
        }
      ]
    }"#;

    let response: ApiSearchResponse = serde_json::from_str(json).unwrap();
    let bugs = response.into_bugs().unwrap();

    assert_eq!(bugs.len(), 2);
    assert_eq!(bugs[0].id, 1880001);
    assert_eq!(bugs[0].severity, Severity::High);
    assert_eq!(
      bugs[0].creation_time,
      Utc.with_ymd_and_hms(2020, 9, 17, 8, 12, 45).unwrap()
    );
    assert_eq!(bugs[0].target_release, vec!["4.6.0"]);
    assert_eq!(bugs[1].severity, Severity::Low);
    assert!(bugs[1].target_release.is_empty());
  }

  #[test]
  fn test_unknown_severity_is_other() {
    let bug: ApiBug = serde_json::from_str(
      r#"{"creation_time": "2020-09-17T08:12:45+02:00", "severity": "critical"}"#,
    )
    .unwrap();
    assert_eq!(bug.severity, Severity::Other);
    assert_eq!(
      bug.creation_time,
      Utc.with_ymd_and_hms(2020, 9, 17, 6, 12, 45).unwrap()
    );
  }

  #[test]
  fn test_malformed_creation_time_fails() {
    let result: serde_json::Result<ApiSearchResponse> = serde_json::from_str(
      r#"{"bugs": [{"creation_time": "yesterday", "severity": "high"}]}"#,
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_non_string_severity_fails() {
    let result: serde_json::Result<ApiBug> =
      serde_json::from_str(r#"{"creation_time": "2020-09-17T08:12:45Z", "severity": 3}"#);
    assert!(result.is_err());
  }

  #[test]
  fn test_error_envelope() {
    let response: ApiSearchResponse = serde_json::from_str(
      r#"{"error": true, "message": "The API key you specified is invalid.", "code": 306}"#,
    )
    .unwrap();
    assert_eq!(
      response.into_bugs().unwrap_err(),
      "The API key you specified is invalid. (code 306)"
    );
  }
}
