//! Loader error types

use palisade_types::{SelectionParseError, SubstitutionError};
use thiserror::Error;

/// Failure to turn one profile source into a `Profile`.
///
/// Always carries the source identifier (path or caller-supplied name) so
/// batch reports can name the offending file without extra bookkeeping.
#[derive(Debug, Error)]
#[error("cannot load profile from {source_id}: {kind}")]
pub struct ParseError {
    /// Path or name of the source document
    pub source_id: String,
    /// What went wrong
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(source_id: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
        }
    }
}

/// Cause of a profile parse failure.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("cannot read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("required field `{field}` is missing or empty")]
    MissingField { field: &'static str },

    #[error("unknown profile kind `{kind}`")]
    UnknownKind { kind: String },

    #[error("profile documentation is not complete")]
    Incomplete,

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    #[error(transparent)]
    Selection(#[from] SelectionParseError),
}
