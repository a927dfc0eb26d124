//! Indexed, cycle-checked control registry

use crate::error::ControlError;
use palisade_types::{
    expand_optional, Control, ControlId, ControlStatus, Selection, SubstitutionContext,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Flattened contribution of one control: every rule it selects and every
/// variable it sets, with all `includes` already merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlExpansion {
    /// Rule ids selected by the control or anything it includes
    pub rules: BTreeSet<String>,
    /// Effective variables after include-then-local layering
    pub variables: BTreeMap<String, String>,
}

/// One policy document: a policy id and its flat list of controls.
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    controls: Vec<RawControl>,
}

#[derive(Debug, Deserialize)]
struct RawControl {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selections: Vec<String>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    status: ControlStatus,
}

/// Registry of control baselines, expanded once at construction.
///
/// Immutable after [`ControlStore::load`]; every lookup afterwards is
/// read-only, so the store can be shared freely across a resolution batch.
#[derive(Debug, Default)]
pub struct ControlStore {
    controls: BTreeMap<ControlId, Control>,
    expansions: BTreeMap<ControlId, ControlExpansion>,
}

impl ControlStore {
    /// Load every control-policy file (`.yml`/`.yaml`) under `dir`, then
    /// expand every control, failing on duplicate ids, dangling includes
    /// and include cycles.
    pub fn load(
        dir: impl AsRef<Path>,
        ctx: Option<&SubstitutionContext>,
    ) -> Result<Self, ControlError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|source| ControlError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ControlError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if path.is_file() && is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        let mut controls = Vec::new();
        for path in &paths {
            let display = path.display().to_string();
            for control in parse_policy_file(path, ctx)? {
                controls.push((display.clone(), control));
            }
        }
        let store = Self::from_sourced(controls)?;
        info!(
            dir = %dir.display(),
            files = paths.len(),
            controls = store.len(),
            "loaded control store"
        );
        Ok(store)
    }

    /// Build a store from already-constructed controls. This is the
    /// fixture entrypoint for tests and programmatic callers; it runs the
    /// same duplicate check and one-time expansion pass as [`load`].
    ///
    /// [`load`]: ControlStore::load
    pub fn from_controls(controls: Vec<Control>) -> Result<Self, ControlError> {
        Self::from_sourced(
            controls
                .into_iter()
                .map(|control| ("<memory>".to_string(), control))
                .collect(),
        )
    }

    /// Shared construction path: each control carries the source it was
    /// parsed from, so a duplicate id names the offending file.
    fn from_sourced(controls: Vec<(String, Control)>) -> Result<Self, ControlError> {
        let mut indexed = BTreeMap::new();
        for (path, control) in controls {
            let id = control.id.clone();
            if indexed.insert(id.clone(), control).is_some() {
                return Err(ControlError::Duplicate { id, path });
            }
        }

        let mut store = Self {
            controls: indexed,
            expansions: BTreeMap::new(),
        };
        store.expand_all()?;
        Ok(store)
    }

    /// One-time expansion pass over every control, with an explicit
    /// visiting stack for cycle detection.
    fn expand_all(&mut self) -> Result<(), ControlError> {
        let ids: Vec<ControlId> = self.controls.keys().cloned().collect();
        let mut memo = BTreeMap::new();
        for id in ids {
            let mut stack = Vec::new();
            self.expand_recursive(&id, None, &mut stack, &mut memo)?;
        }
        self.expansions = memo;
        Ok(())
    }

    fn expand_recursive(
        &self,
        id: &ControlId,
        referenced_by: Option<&ControlId>,
        stack: &mut Vec<ControlId>,
        memo: &mut BTreeMap<ControlId, ControlExpansion>,
    ) -> Result<(), ControlError> {
        if memo.contains_key(id) {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|on_stack| on_stack == id) {
            let mut cycle: Vec<ControlId> = stack[pos..].to_vec();
            cycle.push(id.clone());
            return Err(ControlError::CyclicIncludes { cycle });
        }
        let control = self.controls.get(id).ok_or_else(|| ControlError::Unknown {
            id: id.clone(),
            referenced_by: referenced_by.cloned(),
        })?;

        stack.push(id.clone());
        let mut expansion = ControlExpansion::default();
        // Includes merge first, in declared order; a later include wins
        // over an earlier one for overlapping variables.
        for include in &control.includes {
            self.expand_recursive(include, Some(id), stack, memo)?;
            let included = &memo[include];
            expansion.rules.extend(included.rules.iter().cloned());
            expansion
                .variables
                .extend(included.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        // Local selections and variables apply on top.
        for selection in &control.selections {
            expansion.rules.insert(selection.rule.clone());
            if let Some(value) = &selection.refinement {
                expansion
                    .variables
                    .insert(selection.rule.clone(), value.clone());
            }
        }
        expansion
            .variables
            .extend(control.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        stack.pop();

        debug!(
            control = id.as_str(),
            rules = expansion.rules.len(),
            variables = expansion.variables.len(),
            "expanded control"
        );
        memo.insert(id.clone(), expansion);
        Ok(())
    }

    /// Flattened rules and variables of `control_id`. O(1): expansions are
    /// memoized at load.
    pub fn expand(&self, control_id: &ControlId) -> Result<&ControlExpansion, ControlError> {
        self.expansions
            .get(control_id)
            .ok_or_else(|| ControlError::Unknown {
                id: control_id.clone(),
                referenced_by: None,
            })
    }

    /// Unexpanded control definition, with its status tag.
    pub fn get(&self, control_id: &ControlId) -> Option<&Control> {
        self.controls.get(control_id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Count of controls per coverage status. Reporting-only: expansion
    /// never consults status.
    pub fn coverage(&self) -> BTreeMap<ControlStatus, usize> {
        let mut counts = BTreeMap::new();
        for control in self.controls.values() {
            *counts.entry(control.status).or_insert(0) += 1;
        }
        counts
    }
}

fn parse_policy_file(
    path: &Path,
    ctx: Option<&SubstitutionContext>,
) -> Result<Vec<Control>, ControlError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ControlError::Io {
        path: display.clone(),
        source,
    })?;
    let expanded = expand_optional(ctx, &text).map_err(|source| ControlError::Substitution {
        path: display.clone(),
        source,
    })?;
    let policy: PolicyFile =
        serde_yaml::from_str(&expanded).map_err(|source| ControlError::Yaml {
            path: display.clone(),
            source,
        })?;

    let policy_id = match policy.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => {
            return Err(ControlError::MissingField {
                path: display,
                field: "id",
            })
        }
    };

    let mut controls = Vec::with_capacity(policy.controls.len());
    for raw in policy.controls {
        if raw.id.trim().is_empty() {
            return Err(ControlError::MissingField {
                path: display,
                field: "controls[].id",
            });
        }
        let mut selections = Vec::with_capacity(raw.selections.len());
        for entry in &raw.selections {
            let selection: Selection =
                entry
                    .parse()
                    .map_err(|source| ControlError::Selection {
                        path: display.clone(),
                        source,
                    })?;
            selections.push(selection);
        }
        controls.push(Control {
            id: ControlId::qualify(&policy_id, &raw.id),
            title: raw.title,
            selections,
            variables: raw.variables,
            includes: raw
                .includes
                .iter()
                .map(|name| ControlId::qualify(&policy_id, name))
                .collect(),
            status: raw.status,
        });
    }
    Ok(controls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(id: &str) -> Control {
        Control::new(id)
    }

    fn with_selections(mut control: Control, entries: &[&str]) -> Control {
        control.selections = entries.iter().map(|e| e.parse().unwrap()).collect();
        control
    }

    fn with_includes(mut control: Control, includes: &[&str]) -> Control {
        control.includes = includes.iter().map(|i| ControlId::from(*i)).collect();
        control
    }

    #[test]
    fn expands_flat_control() {
        let store = ControlStore::from_controls(vec![with_selections(
            control("nist:low"),
            &["rule_a", "var_x=1"],
        )])
        .unwrap();
        let expansion = store.expand(&"nist:low".into()).unwrap();
        assert_eq!(
            expansion.rules,
            BTreeSet::from(["rule_a".to_string(), "var_x".to_string()])
        );
        assert_eq!(expansion.variables["var_x"], "1");
    }

    #[test]
    fn includes_merge_before_local_layers() {
        let base = with_selections(control("nist:base"), &["rule_a", "level=low"]);
        let moderate = with_selections(
            with_includes(control("nist:moderate"), &["nist:base"]),
            &["rule_b", "level=medium"],
        );
        let store = ControlStore::from_controls(vec![base, moderate]).unwrap();
        let expansion = store.expand(&"nist:moderate".into()).unwrap();
        assert!(expansion.rules.contains("rule_a"));
        assert!(expansion.rules.contains("rule_b"));
        // Local wins over included.
        assert_eq!(expansion.variables["level"], "medium");
    }

    #[test]
    fn later_include_wins_for_variables() {
        let first = {
            let mut c = control("p:first");
            c.variables.insert("level".into(), "low".into());
            c
        };
        let second = {
            let mut c = control("p:second");
            c.variables.insert("level".into(), "high".into());
            c
        };
        let outer = with_includes(control("p:outer"), &["p:first", "p:second"]);
        let store = ControlStore::from_controls(vec![first, second, outer]).unwrap();
        assert_eq!(
            store.expand(&"p:outer".into()).unwrap().variables["level"],
            "high"
        );
    }

    #[test]
    fn diamond_includes_dedup_rules() {
        // x includes y and z; z also includes y.
        let y = with_selections(control("p:y"), &["rule_y"]);
        let z = with_includes(control("p:z"), &["p:y"]);
        let x = with_includes(control("p:x"), &["p:y", "p:z"]);
        let store = ControlStore::from_controls(vec![x, y, z]).unwrap();
        let expansion = store.expand(&"p:x".into()).unwrap();
        assert_eq!(expansion.rules, BTreeSet::from(["rule_y".to_string()]));
    }

    #[test]
    fn include_cycle_is_fatal_with_full_path() {
        let a = with_includes(control("p:a"), &["p:b"]);
        let b = with_includes(control("p:b"), &["p:a"]);
        let err = ControlStore::from_controls(vec![a, b]).unwrap_err();
        match err {
            ControlError::CyclicIncludes { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.len() >= 3);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn self_include_is_a_cycle() {
        let a = with_includes(control("p:a"), &["p:a"]);
        assert!(matches!(
            ControlStore::from_controls(vec![a]).unwrap_err(),
            ControlError::CyclicIncludes { .. }
        ));
    }

    #[test]
    fn dangling_include_names_both_sides() {
        let a = with_includes(control("p:a"), &["p:missing"]);
        match ControlStore::from_controls(vec![a]).unwrap_err() {
            ControlError::Unknown { id, referenced_by } => {
                assert_eq!(id.as_str(), "p:missing");
                assert_eq!(referenced_by.unwrap().as_str(), "p:a");
            }
            other => panic!("expected unknown control, got {other}"),
        }
    }

    #[test]
    fn duplicate_id_fails_load() {
        let err =
            ControlStore::from_controls(vec![control("p:dup"), control("p:dup")]).unwrap_err();
        assert!(matches!(err, ControlError::Duplicate { .. }));
    }

    #[test]
    fn unknown_control_on_expand() {
        let store = ControlStore::from_controls(vec![]).unwrap();
        assert!(matches!(
            store.expand(&"p:missing".into()).unwrap_err(),
            ControlError::Unknown { .. }
        ));
    }

    #[test]
    fn coverage_counts_by_status() {
        let mut automated = control("p:a");
        automated.status = ControlStatus::Automated;
        let mut manual = control("p:b");
        manual.status = ControlStatus::Manual;
        let mut manual2 = control("p:c");
        manual2.status = ControlStatus::Manual;
        let store = ControlStore::from_controls(vec![automated, manual, manual2]).unwrap();
        let coverage = store.coverage();
        assert_eq!(coverage[&ControlStatus::Automated], 1);
        assert_eq!(coverage[&ControlStatus::Manual], 2);
    }

    #[test]
    fn loads_policy_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("nist.yml"),
            r#"
id: nist
controls:
  - id: base
    selections: [rule_a]
  - id: moderate
    includes: [base]
    selections: [rule_b, level=medium]
    status: automated
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("cis.yaml"),
            r#"
id: cis
controls:
  - id: level1
    includes: ["nist:base"]
    selections: [rule_c]
"#,
        )
        .unwrap();

        let store = ControlStore::load(dir.path(), None).unwrap();
        assert_eq!(store.len(), 3);

        let moderate = store.expand(&"nist:moderate".into()).unwrap();
        assert!(moderate.rules.contains("rule_a"));
        assert!(moderate.rules.contains("rule_b"));
        assert_eq!(moderate.variables["level"], "medium");

        // Cross-policy include stays qualified as written.
        let level1 = store.expand(&"cis:level1".into()).unwrap();
        assert!(level1.rules.contains("rule_a"));
        assert!(level1.rules.contains("rule_c"));

        assert_eq!(
            store.get(&"nist:moderate".into()).unwrap().status,
            ControlStatus::Automated
        );
    }

    #[test]
    fn policy_file_substitution_applies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("p.yml"),
            "id: p\ncontrols:\n  - id: c\n    selections: [\"harden_{{product}}\"]\n",
        )
        .unwrap();
        let ctx = SubstitutionContext::new(
            [("product".to_string(), "server".to_string())]
                .into_iter()
                .collect(),
        );
        let store = ControlStore::load(dir.path(), Some(&ctx)).unwrap();
        assert!(store
            .expand(&"p:c".into())
            .unwrap()
            .rules
            .contains("harden_server"));
    }

    #[test]
    fn duplicate_id_across_files_names_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "id: p\ncontrols:\n  - id: c\n    selections: [rule_a]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yml"),
            "id: p\ncontrols:\n  - id: c\n    selections: [rule_b]\n",
        )
        .unwrap();

        match ControlStore::load(dir.path(), None).unwrap_err() {
            ControlError::Duplicate { id, path } => {
                assert_eq!(id.as_str(), "p:c");
                // Files are parsed in sorted order, so b.yml redefines.
                assert!(path.ends_with("b.yml"), "unexpected path {path}");
            }
            other => panic!("expected duplicate error, got {other}"),
        }
    }

    #[test]
    fn policy_file_missing_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.yml"), "controls: []\n").unwrap();
        assert!(matches!(
            ControlStore::load(dir.path(), None).unwrap_err(),
            ControlError::MissingField { .. }
        ));
    }
}
