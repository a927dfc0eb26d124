//! Profile definitions and rule selections

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A reference to a rule, optionally carrying an inline variable
/// refinement.
///
/// The compact source form is either a bare rule id (`sshd_set_idle_timeout`)
/// or `rule_id=value` (`var_sshd_idle_timeout=300`), which both selects the
/// rule and pins the associated variable to `value`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selection {
    /// Rule id being selected
    pub rule: String,
    /// Inline variable refinement, if the entry was `rule_id=value`
    pub refinement: Option<String>,
}

impl Selection {
    /// Select a rule with no refinement.
    pub fn plain(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            refinement: None,
        }
    }

    /// Select a rule and pin its variable to `value`.
    pub fn refined(rule: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            refinement: Some(value.into()),
        }
    }
}

/// Error parsing a selection entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionParseError {
    #[error("empty selection entry")]
    Empty,

    #[error("selection {entry:?} has an empty rule id")]
    EmptyRule { entry: String },

    #[error("selection {entry:?} has an empty refinement value")]
    EmptyValue { entry: String },
}

impl FromStr for Selection {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SelectionParseError::Empty);
        }
        match s.split_once('=') {
            None => Ok(Selection::plain(s)),
            Some((rule, value)) => {
                let rule = rule.trim();
                let value = value.trim();
                if rule.is_empty() {
                    return Err(SelectionParseError::EmptyRule { entry: s.into() });
                }
                if value.is_empty() {
                    return Err(SelectionParseError::EmptyValue { entry: s.into() });
                }
                Ok(Selection::refined(rule, value))
            }
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.refinement {
            Some(value) => write!(f, "{}={}", self.rule, value),
            None => write!(f, "{}", self.rule),
        }
    }
}

// Selections serialize as their compact string form so profile documents
// round-trip unchanged.
impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// A named, possibly inheriting definition of which rules to select or
/// exclude and which variables to set.
///
/// Immutable after construction: loaders build a `Profile` once and
/// resolution only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile id within one registry
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Longer description
    #[serde(default)]
    pub description: String,

    /// Parent profile id, if this profile inherits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Ordered rule selections, later entries overriding earlier
    /// refinements for the same rule
    #[serde(default)]
    pub selections: Vec<Selection>,

    /// Rule ids removed from the final set, absolutely
    #[serde(default)]
    pub exclusions: BTreeSet<String>,

    /// Variable name to value
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Ordered control ids to pull in before explicit selections apply
    #[serde(default)]
    pub controls: Vec<String>,
}

impl Profile {
    /// Minimal profile with just an id; used as a building block in tests
    /// and programmatic construction.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            extends: None,
            selections: Vec::new(),
            exclusions: BTreeSet::new(),
            variables: BTreeMap::new(),
            controls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parses_bare_rule() {
        let sel: Selection = "sshd_set_idle_timeout".parse().unwrap();
        assert_eq!(sel, Selection::plain("sshd_set_idle_timeout"));
    }

    #[test]
    fn selection_parses_refinement() {
        let sel: Selection = "var_sshd_idle_timeout=300".parse().unwrap();
        assert_eq!(sel, Selection::refined("var_sshd_idle_timeout", "300"));
    }

    #[test]
    fn selection_trims_whitespace() {
        let sel: Selection = "  rule_a = strict ".parse().unwrap();
        assert_eq!(sel, Selection::refined("rule_a", "strict"));
    }

    #[test]
    fn selection_rejects_empty_parts() {
        assert_eq!(
            "".parse::<Selection>().unwrap_err(),
            SelectionParseError::Empty
        );
        assert!(matches!(
            "=value".parse::<Selection>().unwrap_err(),
            SelectionParseError::EmptyRule { .. }
        ));
        assert!(matches!(
            "rule_a=".parse::<Selection>().unwrap_err(),
            SelectionParseError::EmptyValue { .. }
        ));
    }

    #[test]
    fn selection_display_round_trips() {
        for entry in ["rule_a", "rule_a=strict"] {
            let sel: Selection = entry.parse().unwrap();
            assert_eq!(sel.to_string(), entry);
        }
    }

    #[test]
    fn profile_deserializes_from_yaml() {
        let doc = r#"
id: hardening
title: Server Hardening
extends: baseline
selections:
  - rule_a
  - var_timeout=300
exclusions:
  - rule_b
variables:
  level: medium
controls:
  - nist:moderate
"#;
        let profile: Profile = serde_yaml::from_str(doc).unwrap();
        assert_eq!(profile.id, "hardening");
        assert_eq!(profile.extends.as_deref(), Some("baseline"));
        assert_eq!(profile.selections.len(), 2);
        assert_eq!(
            profile.selections[1],
            Selection::refined("var_timeout", "300")
        );
        assert!(profile.exclusions.contains("rule_b"));
        assert_eq!(profile.variables["level"], "medium");
        assert_eq!(profile.controls, vec!["nist:moderate".to_string()]);
    }

    #[test]
    fn profile_defaults_optional_fields() {
        let profile: Profile = serde_yaml::from_str("id: empty").unwrap();
        assert_eq!(profile.id, "empty");
        assert!(profile.title.is_empty());
        assert!(profile.extends.is_none());
        assert!(profile.selections.is_empty());
        assert!(profile.exclusions.is_empty());
        assert!(profile.controls.is_empty());
    }
}
