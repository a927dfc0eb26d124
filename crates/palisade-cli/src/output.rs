//! Resolved-profile output documents

use crate::error::CliResult;
use palisade_resolver::BatchOutcome;
use palisade_types::ResolvedProfile;
use std::path::PathBuf;
use tracing::{info, warn};

/// Serialization format for output documents.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// YAML document per profile
    #[default]
    Yaml,
    /// JSON document per profile
    Json,
}

/// Substitute `{name}` in the output template with the profile id.
pub fn output_path(template: &str, profile_id: &str) -> PathBuf {
    PathBuf::from(template.replace("{name}", profile_id))
}

/// Render a resolved profile; rules and variables come out sorted because
/// the model uses ordered containers, so identical inputs diff clean
/// across builds.
pub fn render(resolved: &ResolvedProfile, format: OutputFormat) -> CliResult<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(resolved)?,
        OutputFormat::Json => {
            let mut doc = serde_json::to_string_pretty(resolved)?;
            doc.push('\n');
            doc
        }
    };
    Ok(rendered)
}

/// Write every resolved profile to its templated path and report the
/// batch outcome, failures to stderr.
pub fn write_outcome(
    outcome: &BatchOutcome,
    template: &str,
    format: OutputFormat,
) -> CliResult<()> {
    for (profile_id, resolved) in &outcome.resolved {
        // An empty rule set is a valid resolution but a useless document;
        // report it instead of writing an empty file.
        if resolved.is_empty() {
            warn!(
                profile = profile_id.as_str(),
                "profile resolved to no rules, skipping output"
            );
            continue;
        }
        let path = output_path(template, profile_id);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, render(resolved, format)?)?;
        info!(profile = profile_id.as_str(), path = %path.display(), "wrote resolved profile");
    }

    println!("{}", outcome.summary());
    for failure in &outcome.failures {
        eprintln!("  {}: {}", failure.subject, failure.error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn resolved(id: &str) -> ResolvedProfile {
        ResolvedProfile {
            id: id.into(),
            title: "T".into(),
            rules: BTreeSet::from(["rule_b".to_string(), "rule_a".to_string()]),
            variables: BTreeMap::from([("level".to_string(), "medium".to_string())]),
            source_profile_id: id.into(),
        }
    }

    #[test]
    fn template_substitutes_profile_name() {
        assert_eq!(
            output_path("build/{name}.profile", "server"),
            PathBuf::from("build/server.profile")
        );
    }

    #[test]
    fn yaml_render_is_sorted_and_parseable() {
        let doc = render(&resolved("p"), OutputFormat::Yaml).unwrap();
        assert!(doc.find("rule_a").unwrap() < doc.find("rule_b").unwrap());
        let back: ResolvedProfile = serde_yaml::from_str(&doc).unwrap();
        assert_eq!(back, resolved("p"));
    }

    #[test]
    fn json_render_round_trips() {
        let doc = render(&resolved("p"), OutputFormat::Json).unwrap();
        let back: ResolvedProfile = serde_json::from_str(&doc).unwrap();
        assert_eq!(back, resolved("p"));
    }

    #[test]
    fn empty_resolution_writes_no_document() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir
            .path()
            .join("{name}.profile")
            .display()
            .to_string();

        let mut empty = resolved("hollow");
        empty.rules.clear();
        let mut outcome = BatchOutcome::default();
        outcome
            .resolved
            .insert("hollow".into(), std::sync::Arc::new(empty));
        outcome
            .resolved
            .insert("full".into(), std::sync::Arc::new(resolved("full")));

        write_outcome(&outcome, &template, OutputFormat::Yaml).unwrap();
        assert!(dir.path().join("full.profile").exists());
        assert!(!dir.path().join("hollow.profile").exists());
    }
}
