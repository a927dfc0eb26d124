//! Flattened resolution output

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The flattened result of resolving one profile: every applicable rule id
/// and the effective value of every variable, with all inheritance and
/// control layers already applied.
///
/// Produced once per successfully resolved profile and immutable
/// thereafter; ordered containers keep serialized output stable across
/// builds without a separate sort pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProfile {
    /// Profile id
    pub id: String,

    /// Title carried over from the source profile
    #[serde(default)]
    pub title: String,

    /// Applicable rule ids, deduplicated, exclusions already removed
    pub rules: BTreeSet<String>,

    /// Effective variable values after all override layers
    pub variables: BTreeMap<String, String>,

    /// Id of the profile this document was resolved from
    pub source_profile_id: String,
}

impl ResolvedProfile {
    /// True when the profile resolved to no rules at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_rules_sorted() {
        let resolved = ResolvedProfile {
            id: "p".into(),
            title: "P".into(),
            rules: ["rule_c", "rule_a", "rule_b"]
                .into_iter()
                .map(String::from)
                .collect(),
            variables: BTreeMap::new(),
            source_profile_id: "p".into(),
        };
        let doc = serde_yaml::to_string(&resolved).unwrap();
        let a = doc.find("rule_a").unwrap();
        let b = doc.find("rule_b").unwrap();
        let c = doc.find("rule_c").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn round_trips_through_yaml() {
        let resolved = ResolvedProfile {
            id: "p".into(),
            title: String::new(),
            rules: BTreeSet::from(["rule_a".to_string()]),
            variables: BTreeMap::from([("level".to_string(), "medium".to_string())]),
            source_profile_id: "p".into(),
        };
        let doc = serde_yaml::to_string(&resolved).unwrap();
        let back: ResolvedProfile = serde_yaml::from_str(&doc).unwrap();
        assert_eq!(back, resolved);
    }
}
