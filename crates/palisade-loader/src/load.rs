//! Single-document profile parsing

use crate::error::{ParseError, ParseErrorKind};
use palisade_types::{expand_optional, Profile, Selection, SubstitutionContext};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Minimal header parsed before the full document, so malformed or
/// not-yet-publishable profiles are rejected with a precise cause instead
/// of a generic deserialization error.
#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default = "default_true")]
    documentation_complete: bool,
}

fn default_true() -> bool {
    true
}

/// Profile source kinds, dispatched on the explicit `kind` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileKind {
    /// Every selection entry is a rule reference.
    Profile,
    /// Selection entries naming a qualified control (`policy:name`) pull
    /// that control in, in encounter order, instead of selecting a rule.
    InlineControls,
}

impl ProfileKind {
    fn parse(raw: Option<&str>) -> Result<Self, ParseErrorKind> {
        match raw {
            None | Some("profile") => Ok(ProfileKind::Profile),
            Some("inline-controls") => Ok(ProfileKind::InlineControls),
            Some(other) => Err(ParseErrorKind::UnknownKind { kind: other.into() }),
        }
    }
}

/// Full document body. Unknown fields are ignored so product-specific
/// annotations in the corpus do not break the build.
#[derive(Debug, Deserialize)]
struct RawProfile {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    selections: Vec<String>,
    #[serde(default)]
    exclusions: BTreeSet<String>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    #[serde(default)]
    controls: Vec<String>,
}

/// Parse one profile document from a string.
///
/// `source_id` names the document in errors; `ctx` supplies
/// product-specific placeholder values and is applied to the whole text
/// before any field is interpreted.
pub fn load_str(
    source_id: &str,
    text: &str,
    ctx: Option<&SubstitutionContext>,
) -> Result<Profile, ParseError> {
    build(source_id, text, ctx).map_err(|kind| ParseError::new(source_id, kind))
}

/// Parse one profile document from a file.
pub fn load_file(
    path: impl AsRef<Path>,
    ctx: Option<&SubstitutionContext>,
) -> Result<Profile, ParseError> {
    let path = path.as_ref();
    let source_id = path.display().to_string();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ParseError::new(&source_id, ParseErrorKind::Io(e)))?;
    load_str(&source_id, &text, ctx)
}

fn build(
    source_id: &str,
    text: &str,
    ctx: Option<&SubstitutionContext>,
) -> Result<Profile, ParseErrorKind> {
    let expanded = expand_optional(ctx, text)?;

    let header: Header = serde_yaml::from_str(&expanded)?;
    let id = match header.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(ParseErrorKind::MissingField { field: "id" }),
    };
    let kind = ProfileKind::parse(header.kind.as_deref())?;
    if !header.documentation_complete {
        return Err(ParseErrorKind::Incomplete);
    }

    let raw: RawProfile = serde_yaml::from_str(&expanded)?;

    let mut selections = Vec::with_capacity(raw.selections.len());
    let mut controls = raw.controls;
    for entry in &raw.selections {
        if kind == ProfileKind::InlineControls && is_control_reference(entry) {
            controls.push(entry.trim().to_string());
            continue;
        }
        selections.push(entry.parse::<Selection>()?);
    }

    debug!(
        profile = id.as_str(),
        source = source_id,
        selections = selections.len(),
        controls = controls.len(),
        "loaded profile"
    );

    Ok(Profile {
        id,
        title: raw.title,
        description: raw.description,
        extends: raw.extends,
        selections,
        exclusions: raw.exclusions,
        variables: raw.variables,
        controls,
    })
}

/// A selection entry whose rule part is qualified with a policy prefix
/// names a control, not a rule. Refined entries (`rule=value`) are always
/// rule selections; rule ids never contain `:`.
fn is_control_reference(entry: &str) -> bool {
    let rule_part = entry.split_once('=').map_or(entry, |(rule, _)| rule);
    rule_part.contains(':')
}
