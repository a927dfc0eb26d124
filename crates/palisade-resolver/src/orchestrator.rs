//! Batch resolution with partial-failure tolerance

use crate::error::ResolutionError;
use crate::resolver::{Registry, Resolver};
use palisade_controls::ControlStore;
use palisade_loader::ParseError;
use palisade_types::{ResolvedProfile, SubstitutionContext};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Why one source or profile dropped out of a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("duplicate profile id {id}, first definition from {kept_source} wins")]
    DuplicateProfile { id: String, kept_source: String },
}

/// One recorded batch failure: the subject is the source path while
/// loading and the profile id while resolving.
#[derive(Debug)]
pub struct Failure {
    pub subject: String,
    pub error: BatchError,
}

/// Everything a batch produced: resolved profiles keyed by id, plus every
/// failure met along the way. Failures never abort the batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub resolved: BTreeMap<String, Arc<ResolvedProfile>>,
    pub failures: Vec<Failure>,
}

impl BatchOutcome {
    /// One-line report for the CLI and logs.
    pub fn summary(&self) -> String {
        format!(
            "resolved {} profile(s), {} failure(s)",
            self.resolved.len(),
            self.failures.len()
        )
    }
}

/// Load every source into a name-to-profile registry.
///
/// A source that fails to parse is recorded and skipped; the rest of the
/// batch continues. When two sources declare the same profile id the
/// first (in the given order) wins and the later source is recorded as a
/// failure, keeping the registry deterministic.
pub fn load_registry(
    sources: &[PathBuf],
    ctx: Option<&SubstitutionContext>,
) -> (Registry, Vec<Failure>) {
    let mut registry = Registry::new();
    let mut by_source: BTreeMap<String, String> = BTreeMap::new();
    let mut failures = Vec::new();

    for path in sources {
        let subject = path.display().to_string();
        match palisade_loader::load_file(path, ctx) {
            Ok(profile) => {
                if let Some(kept_source) = by_source.get(&profile.id) {
                    warn!(
                        profile = profile.id.as_str(),
                        source = subject.as_str(),
                        kept = kept_source.as_str(),
                        "duplicate profile id, keeping first definition"
                    );
                    failures.push(Failure {
                        error: BatchError::DuplicateProfile {
                            id: profile.id,
                            kept_source: kept_source.clone(),
                        },
                        subject,
                    });
                    continue;
                }
                by_source.insert(profile.id.clone(), subject);
                registry.insert(profile.id.clone(), profile);
            }
            Err(err) => {
                warn!(source = subject.as_str(), error = %err, "skipping profile source");
                failures.push(Failure {
                    subject,
                    error: BatchError::Parse(err),
                });
            }
        }
    }
    (registry, failures)
}

/// Resolve every profile in the registry.
///
/// Order-independent thanks to memoization: a parent shared by several
/// children is computed once no matter which child comes first. A
/// resolution failure is recorded for that profile id only and the rest
/// continue.
pub fn resolve_registry(registry: &Registry, store: &ControlStore) -> BatchOutcome {
    let mut resolver = Resolver::new();
    let mut outcome = BatchOutcome::default();

    for profile_id in registry.keys() {
        match resolver.resolve(profile_id, registry, store) {
            Ok(resolved) => {
                outcome.resolved.insert(profile_id.clone(), resolved);
            }
            Err(err) => {
                warn!(profile = profile_id.as_str(), error = %err, "profile failed to resolve");
                outcome.failures.push(Failure {
                    subject: profile_id.clone(),
                    error: BatchError::Resolution(err),
                });
            }
        }
    }
    outcome
}

/// Load `sources` and resolve everything that parsed, against `store`.
///
/// This is the whole pipeline minus I/O of the results: parse failures and
/// resolution failures are both collected into the returned
/// [`BatchOutcome`] for the caller to report.
pub fn resolve_batch(
    sources: &[PathBuf],
    ctx: Option<&SubstitutionContext>,
    store: &ControlStore,
) -> BatchOutcome {
    let (registry, load_failures) = load_registry(sources, ctx);
    let mut outcome = resolve_registry(&registry, store);
    // Parse-stage failures come first in the report, in source order.
    let mut failures = load_failures;
    failures.append(&mut outcome.failures);
    outcome.failures = failures;

    info!("{}", outcome.summary());
    outcome
}
