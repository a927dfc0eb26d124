//! Palisade CLI - compile layered compliance profiles
//!
//! Loads profile sources (explicit paths plus build-environment
//! discovery), resolves each one against the shared control store, and
//! writes one flattened document per resolved profile. Malformed or
//! unresolvable profiles are reported and skipped; only shared
//! infrastructure — a broken control store or build environment — aborts
//! the run.

use clap::Parser;
use palisade_controls::ControlStore;
use palisade_loader::discover_profiles;
use palisade_resolver::resolve_batch;
use palisade_types::SubstitutionContext;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod environment;
mod error;
mod output;

use environment::BuildEnvironment;
use error::{CliError, CliResult};
use output::OutputFormat;

/// Palisade profile compiler
#[derive(Parser)]
#[command(name = "palisade")]
#[command(about = "Compile layered compliance profiles into concrete rule sets", long_about = None)]
#[command(version)]
struct Cli {
    /// Explicit profile source paths, resolved in addition to any
    /// discovered under the build environment's profile root
    profile_file: Vec<PathBuf>,

    /// Build configuration YAML (with --product-yaml, enables profile
    /// discovery and placeholder substitution)
    #[arg(long, env = "PALISADE_BUILD_CONFIG")]
    build_config_yaml: Option<PathBuf>,

    /// Product description YAML
    #[arg(long, env = "PALISADE_PRODUCT")]
    product_yaml: Option<PathBuf>,

    /// Directory of control baseline files
    #[arg(long)]
    controls_dir: Option<PathBuf>,

    /// Output path template; `{name}` is replaced by the profile id
    #[arg(short, long, default_value = "{name}.profile")]
    output: String,

    /// Output document format
    #[arg(long, value_enum, default_value = "yaml")]
    output_format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    run(cli)
}

fn run(cli: Cli) -> CliResult<()> {
    // Build environment is optional as a pair: either document alone
    // cannot drive discovery or substitution.
    let environment = match (&cli.build_config_yaml, &cli.product_yaml) {
        (Some(build), Some(product)) => Some(BuildEnvironment::load(build, product)?),
        (None, None) => None,
        _ => {
            return Err(CliError::Environment(
                "--build-config-yaml and --product-yaml must be given together".into(),
            ))
        }
    };
    let ctx: Option<&SubstitutionContext> = environment.as_ref().map(|env| &env.context);

    // A control-graph defect is a build-breaking authoring error: fail
    // here, before any profile is even parsed.
    let store = match &cli.controls_dir {
        Some(dir) => {
            let store = ControlStore::load(dir, ctx)?;
            for (status, count) in store.coverage() {
                debug!(status = %status, count, "control coverage");
            }
            store
        }
        None => ControlStore::default(),
    };

    let mut sources = match &environment {
        Some(env) => discover_profiles(env.profiles_root()?)?,
        None => Vec::new(),
    };
    sources.extend(cli.profile_file.iter().cloned());

    let outcome = resolve_batch(&sources, ctx, &store);
    output::write_outcome(&outcome, &cli.output, cli.output_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_discovery_arguments() {
        let cli = Cli::parse_from([
            "palisade",
            "--build-config-yaml",
            "build/build_config.yml",
            "--product-yaml",
            "products/server/product.yml",
            "--controls-dir",
            "controls",
            "-o",
            "build/profiles/{name}.profile",
            "extra.profile",
        ]);
        assert_eq!(cli.profile_file, vec![PathBuf::from("extra.profile")]);
        assert_eq!(cli.output, "build/profiles/{name}.profile");
        assert!(cli.controls_dir.is_some());
    }

    #[test]
    fn half_an_environment_is_rejected() {
        let cli = Cli::parse_from(["palisade", "--product-yaml", "product.yml"]);
        assert!(matches!(run(cli), Err(CliError::Environment(_))));
    }

    #[test]
    fn explicit_sources_compile_without_environment() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("p.profile");
        std::fs::write(&source, "id: p\nselections: [rule_a]\n").unwrap();
        let template = dir
            .path()
            .join("out")
            .join("{name}.profile")
            .display()
            .to_string();

        let cli = Cli::parse_from([
            "palisade",
            "-o",
            template.as_str(),
            source.to_str().unwrap(),
        ]);
        run(cli).unwrap();

        let written = std::fs::read_to_string(dir.path().join("out").join("p.profile")).unwrap();
        assert!(written.contains("rule_a"));
    }
}
