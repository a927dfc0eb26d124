//! Control store error types

use palisade_types::{ControlId, SelectionParseError, SubstitutionError};
use thiserror::Error;

/// Errors from loading or expanding the control store.
///
/// Everything here is fatal for the store: controls are load-once shared
/// infrastructure, so a broken definition stops the run before any profile
/// resolution is attempted.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("cannot read controls from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed control file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("control file {path}: {source}")]
    Substitution {
        path: String,
        #[source]
        source: SubstitutionError,
    },

    #[error("control file {path}: {source}")]
    Selection {
        path: String,
        #[source]
        source: SelectionParseError,
    },

    #[error("control file {path}: required field `{field}` is missing or empty")]
    MissingField { path: String, field: &'static str },

    #[error("duplicate control id {id} (redefined in {path})")]
    Duplicate { id: ControlId, path: String },

    #[error("unknown control {id}{}", display_referrer(.referenced_by))]
    Unknown {
        id: ControlId,
        referenced_by: Option<ControlId>,
    },

    #[error("control include cycle: {}", display_cycle(.cycle))]
    CyclicIncludes { cycle: Vec<ControlId> },
}

fn display_referrer(referenced_by: &Option<ControlId>) -> String {
    match referenced_by {
        Some(referrer) => format!(" (included by {referrer})"),
        None => String::new(),
    }
}

fn display_cycle(cycle: &[ControlId]) -> String {
    cycle
        .iter()
        .map(ControlId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_the_full_path() {
        let err = ControlError::CyclicIncludes {
            cycle: vec!["p:a".into(), "p:b".into(), "p:a".into()],
        };
        assert_eq!(err.to_string(), "control include cycle: p:a -> p:b -> p:a");
    }

    #[test]
    fn unknown_message_names_the_referrer() {
        let err = ControlError::Unknown {
            id: "p:missing".into(),
            referenced_by: Some("p:outer".into()),
        };
        assert_eq!(
            err.to_string(),
            "unknown control p:missing (included by p:outer)"
        );
    }
}
