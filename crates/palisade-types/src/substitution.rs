//! Product-specific placeholder expansion
//!
//! Profile and control sources may embed `{{key}}` placeholders that vary
//! per product (e.g. a symbolic rule reference that expands differently on
//! each platform). The build supplies a [`SubstitutionContext`] assembled
//! from its configuration documents; with no context, sources must not
//! contain placeholders at all.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Error expanding placeholders in a source string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("unresolved placeholder {{{{{key}}}}}: no value in substitution context")]
    UnknownKey { key: String },

    #[error("placeholder opened at byte {at} is never closed")]
    Unterminated { at: usize },
}

/// Opaque key-value lookup consulted during parsing to expand
/// product-specific placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionContext {
    values: BTreeMap<String, String>,
}

impl SubstitutionContext {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Merge `other` on top of `self`; keys in `other` win.
    pub fn overlaid_with(mut self, other: SubstitutionContext) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Expand every `{{key}}` placeholder in `input`.
    ///
    /// Text without placeholders is returned unchanged, so callers may run
    /// this unconditionally over whole source documents.
    pub fn expand(&self, input: &str) -> Result<String, SubstitutionError> {
        if !input.contains("{{") {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        let mut offset = 0;
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let body = &rest[open + 2..];
            let close = body
                .find("}}")
                .ok_or(SubstitutionError::Unterminated { at: offset + open })?;
            let key = body[..close].trim();
            let value = self
                .get(key)
                .ok_or_else(|| SubstitutionError::UnknownKey { key: key.into() })?;
            out.push_str(value);
            offset += open + 2 + close + 2;
            rest = &body[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Expand `input` against an optional context.
///
/// `None` means no substitution source was supplied: placeholder-free text
/// passes through, but any placeholder is an error since nothing could
/// resolve it.
pub fn expand_optional(
    ctx: Option<&SubstitutionContext>,
    input: &str,
) -> Result<String, SubstitutionError> {
    match ctx {
        Some(ctx) => ctx.expand(input),
        None => {
            if let Some(open) = input.find("{{") {
                let body = &input[open + 2..];
                match body.find("}}") {
                    Some(close) => Err(SubstitutionError::UnknownKey {
                        key: body[..close].trim().into(),
                    }),
                    None => Err(SubstitutionError::Unterminated { at: open }),
                }
            } else {
                Ok(input.to_string())
            }
        }
    }
}
