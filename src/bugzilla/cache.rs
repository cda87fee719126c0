//! Query keys for Bugzilla searches.

use color_eyre::{eyre::eyre, Result};

use crate::cache::QueryKey;
use crate::config::{BugzillaConfig, Team};

/// A bug search: any of `statuses`, in `product`, in any of `components`.
///
/// Filter values behave as sets, so the canonical form does not depend on the
/// order (or repetition) in which they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugQuery {
  pub statuses: Vec<String>,
  pub product: String,
  pub components: Vec<String>,
}

impl BugQuery {
  /// Open bugs for a team's components.
  pub fn for_team(bugzilla: &BugzillaConfig, team: &Team) -> Result<Self> {
    if team.components.is_empty() {
      return Err(eyre!("Team {} has no components", team.name));
    }

    Ok(Self {
      statuses: bugzilla.statuses.clone(),
      product: bugzilla.product.clone(),
      components: team.components.clone(),
    })
  }

  fn params(&self) -> Vec<(&'static str, &str)> {
    let mut params: Vec<(&'static str, &str)> = self
      .statuses
      .iter()
      .map(|s| ("bug_status", s.as_str()))
      .chain(std::iter::once(("product", self.product.as_str())))
      .chain(self.components.iter().map(|c| ("component", c.as_str())))
      .collect();
    params.sort_unstable();
    params.dedup();
    params
  }
}

impl QueryKey for BugQuery {
  /// Form-encoded parameters sorted by name, then value.
  fn canonical(&self) -> String {
    url::form_urlencoded::Serializer::new(String::new())
      .extend_pairs(self.params())
      .finish()
  }

  fn description(&self) -> String {
    format!(
      "{} bugs in {} ({})",
      self.statuses.join("/"),
      self.product,
      self.components.join(", ")
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn query(components: &[&str]) -> BugQuery {
    BugQuery {
      statuses: vec!["NEW".to_string(), "ASSIGNED".to_string()],
      product: "OpenShift Container Platform".to_string(),
      components: components.iter().map(|c| c.to_string()).collect(),
    }
  }

  #[test]
  fn test_canonical_encoding() {
    assert_eq!(
      query(&["Image Registry"]).canonical(),
      "bug_status=ASSIGNED&bug_status=NEW&component=Image+Registry\
       &product=OpenShift+Container+Platform"
    );
  }

  #[test]
  fn test_component_order_does_not_matter() {
    let a = query(&["Storage", "Image Registry", "Networking"]);
    let b = query(&["Networking", "Storage", "Image Registry"]);

    assert_eq!(a.canonical(), b.canonical());
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_duplicates_collapse() {
    assert_eq!(
      query(&["Storage", "Storage"]).canonical(),
      query(&["Storage"]).canonical()
    );
  }

  #[test]
  fn test_different_components_differ() {
    assert_ne!(
      query(&["Storage"]).cache_hash(),
      query(&["Networking"]).cache_hash()
    );
  }

  #[test]
  fn test_special_characters_are_escaped() {
    let q = query(&["Storage/Local & CSI"]);
    assert!(q.canonical().contains("component=Storage%2FLocal+%26+CSI"));
  }

  #[test]
  fn test_for_team() {
    let bugzilla = BugzillaConfig::default();
    let team = Team {
      name: "registry".to_string(),
      peeps: 2,
      components: vec!["Image Registry".to_string()],
    };

    let q = BugQuery::for_team(&bugzilla, &team).unwrap();
    assert_eq!(q.statuses, vec!["NEW", "ASSIGNED", "POST", "MODIFIED"]);
    assert_eq!(q.product, "OpenShift Container Platform");
    assert_eq!(q.components, vec!["Image Registry"]);
  }

  #[test]
  fn test_for_team_without_components() {
    let team = Team {
      name: "ghosts".to_string(),
      peeps: 1,
      components: Vec::new(),
    };
    let err = BugQuery::for_team(&BugzillaConfig::default(), &team).unwrap_err();
    assert_eq!(err.to_string(), "Team ghosts has no components");
  }
}
