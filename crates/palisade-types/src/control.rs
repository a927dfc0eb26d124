//! Control baselines and their coverage status

use crate::profile::Selection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualified control identifier, `policy:control` (e.g. `nist:moderate`).
///
/// A bare name appearing inside a policy document is qualified against
/// the enclosing policy id at load time; ids crossing the policy boundary
/// are written fully qualified by the author.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(String);

impl ControlId {
    /// Qualify `name` against `policy` unless it already carries a
    /// policy prefix.
    pub fn qualify(policy: &str, name: &str) -> Self {
        if name.contains(':') {
            Self(name.to_string())
        } else {
            Self(format!("{policy}:{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ControlId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ControlId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coverage status tag on a control.
///
/// Consumed by coverage reporting only; expansion never consults it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlStatus {
    /// Fully covered by automatable rules
    Automated,
    /// Requires a manual check
    Manual,
    /// Partially covered, remainder manual
    Partial,
    /// Coverage planned but not yet authored
    Planned,
    /// Not yet triaged
    #[default]
    Pending,
    /// Does not apply to this product
    NotApplicable,
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlStatus::Automated => "automated",
            ControlStatus::Manual => "manual",
            ControlStatus::Partial => "partial",
            ControlStatus::Planned => "planned",
            ControlStatus::Pending => "pending",
            ControlStatus::NotApplicable => "not-applicable",
        };
        write!(f, "{s}")
    }
}

/// A reusable baseline of rule selections and variables, possibly nesting
/// other controls via `includes`.
///
/// Loaded once at store construction and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Qualified id, unique within the store
    pub id: ControlId,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Rule selections contributed by this control
    #[serde(default)]
    pub selections: Vec<Selection>,

    /// Variable name to value
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Nested control ids merged before this control's own layers
    #[serde(default)]
    pub includes: Vec<ControlId>,

    /// Coverage tag, reporting-only
    #[serde(default)]
    pub status: ControlStatus,
}

impl Control {
    pub fn new(id: impl Into<ControlId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            selections: Vec::new(),
            variables: BTreeMap::new(),
            includes: Vec::new(),
            status: ControlStatus::default(),
        }
    }
}
