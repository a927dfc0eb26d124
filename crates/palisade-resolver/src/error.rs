//! Resolution error types

use palisade_types::ControlId;
use thiserror::Error;

/// Failure to resolve one profile.
///
/// Clonable so a memoized failure can be replayed to every child of a
/// broken parent without recomputing it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("unknown profile {id}")]
    UnknownProfile { id: String },

    #[error("profile {profile} extends unknown profile {parent}")]
    UnknownParent { profile: String, parent: String },

    #[error("profile extends cycle: {}", .cycle.join(" -> "))]
    CyclicExtends { cycle: Vec<String> },

    #[error("profile {profile} references unknown control {control}")]
    UnknownControl { profile: String, control: ControlId },
}
