//! Single-profile resolution with tagged-state memoization

use crate::error::ResolutionError;
use palisade_controls::ControlStore;
use palisade_types::{Profile, ResolvedProfile};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Name-to-profile registry a batch resolves against.
pub type Registry = BTreeMap<String, Profile>;

/// Memoization state per profile id. Absent means unresolved.
enum ResolutionState {
    /// On the current resolving stack; seeing this again is a cycle.
    Resolving,
    Resolved(Arc<ResolvedProfile>),
    Failed(ResolutionError),
}

/// Resolves profiles against a registry and a control store, memoizing per
/// profile id so a parent shared by several children is computed at most
/// once and a failed parent replays its error instead of recomputing.
#[derive(Default)]
pub struct Resolver {
    states: HashMap<String, ResolutionState>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `profile_id`, walking the extends-chain depth-first.
    ///
    /// Deterministic: identical inputs produce an identical
    /// `ResolvedProfile` regardless of registry iteration order.
    pub fn resolve(
        &mut self,
        profile_id: &str,
        registry: &Registry,
        store: &ControlStore,
    ) -> Result<Arc<ResolvedProfile>, ResolutionError> {
        let mut stack = Vec::new();
        self.resolve_inner(profile_id, registry, store, &mut stack)
    }

    fn resolve_inner(
        &mut self,
        profile_id: &str,
        registry: &Registry,
        store: &ControlStore,
        stack: &mut Vec<String>,
    ) -> Result<Arc<ResolvedProfile>, ResolutionError> {
        match self.states.get(profile_id) {
            Some(ResolutionState::Resolved(resolved)) => return Ok(Arc::clone(resolved)),
            Some(ResolutionState::Failed(err)) => return Err(err.clone()),
            Some(ResolutionState::Resolving) => {
                let pos = stack
                    .iter()
                    .position(|on_stack| on_stack == profile_id)
                    .unwrap_or(0);
                let mut cycle: Vec<String> = stack[pos..].to_vec();
                cycle.push(profile_id.to_string());
                let err = ResolutionError::CyclicExtends { cycle };
                // Every profile on the cycle fails with the same error.
                self.states
                    .insert(profile_id.into(), ResolutionState::Failed(err.clone()));
                return Err(err);
            }
            None => {}
        }

        self.states
            .insert(profile_id.into(), ResolutionState::Resolving);
        stack.push(profile_id.to_string());
        let outcome = self.compute(profile_id, registry, store, stack);
        stack.pop();

        match outcome {
            Ok(resolved) => {
                let resolved = Arc::new(resolved);
                self.states.insert(
                    profile_id.into(),
                    ResolutionState::Resolved(Arc::clone(&resolved)),
                );
                Ok(resolved)
            }
            Err(err) => {
                self.states
                    .insert(profile_id.into(), ResolutionState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn compute(
        &mut self,
        profile_id: &str,
        registry: &Registry,
        store: &ControlStore,
        stack: &mut Vec<String>,
    ) -> Result<ResolvedProfile, ResolutionError> {
        let profile = registry
            .get(profile_id)
            .ok_or_else(|| ResolutionError::UnknownProfile {
                id: profile_id.into(),
            })?;

        // Parent layer: start from the recursively resolved parent, or
        // from nothing.
        let (mut rules, mut variables) = match &profile.extends {
            Some(parent) => {
                if !registry.contains_key(parent) {
                    return Err(ResolutionError::UnknownParent {
                        profile: profile_id.into(),
                        parent: parent.clone(),
                    });
                }
                let resolved = self.resolve_inner(parent, registry, store, stack)?;
                (resolved.rules.clone(), resolved.variables.clone())
            }
            None => (Default::default(), BTreeMap::new()),
        };

        // Control layer: union rules, later controls override earlier
        // variables, all of them override the parent's.
        for control_id in &profile.controls {
            let control_id: palisade_types::ControlId = control_id.as_str().into();
            // After a successful load the store only reports Unknown.
            let expansion =
                store
                    .expand(&control_id)
                    .map_err(|_| ResolutionError::UnknownControl {
                        profile: profile_id.into(),
                        control: control_id.clone(),
                    })?;
            rules.extend(expansion.rules.iter().cloned());
            variables.extend(
                expansion
                    .variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        // Explicit selection layer. The profile's own variable map merges
        // first; inline refinements win unconditionally over everything.
        variables.extend(
            profile
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        for selection in &profile.selections {
            rules.insert(selection.rule.clone());
            if let Some(value) = &selection.refinement {
                variables.insert(selection.rule.clone(), value.clone());
            }
        }

        // Exclusion layer: last and absolute, whichever layer introduced
        // the rule.
        for excluded in &profile.exclusions {
            rules.remove(excluded);
        }

        debug!(
            profile = profile_id,
            rules = rules.len(),
            variables = variables.len(),
            "resolved profile"
        );

        Ok(ResolvedProfile {
            id: profile.id.clone(),
            title: profile.title.clone(),
            rules,
            variables,
            source_profile_id: profile_id.into(),
        })
    }
}
