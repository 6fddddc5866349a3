//! CLI command definitions and dispatch.

pub mod destroy;
pub mod outputs;
pub mod plan;
pub mod realize;
pub mod synth;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tierstack_common::config::TopologyConfig;
use tierstack_common::types::Region;
use tierstack_runtime::engine::Engine;
use tierstack_runtime::provider::LocalProvider;
use tierstack_runtime::store::OutputStore;

/// tierstack — two-tier topology compiler.
#[derive(Parser, Debug)]
#[command(name = "tstk", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a YAML topology configuration.
    #[arg(long, global = true, env = "TSTK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target region (overrides the configuration).
    #[arg(long, global = true, env = "TSTK_REGION")]
    pub region: Option<String>,

    /// Path to the state file (overrides the configuration).
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the topology and show the realization plan.
    Plan(plan::PlanArgs),
    /// Print unit declarations with every available input resolved.
    Synth(synth::SynthArgs),
    /// Realize all units, or one unit, against the state file.
    Realize(realize::RealizeArgs),
    /// Show realized outputs.
    Outputs(outputs::OutputsArgs),
    /// Destroy realized units, dependents first.
    Destroy(destroy::DestroyArgs),
}

impl Cli {
    /// Builds the effective configuration: file first, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn topology_config(&self) -> anyhow::Result<TopologyConfig> {
        let mut config = match &self.config {
            Some(path) => TopologyConfig::load(path)?,
            None => TopologyConfig::default(),
        };
        if let Some(region) = &self.region {
            config.region = Region::new(region.as_str());
        }
        if let Some(path) = &self.state_file {
            config.state_file.clone_from(path);
        }
        tracing::debug!(
            region = %config.region,
            state_file = %config.state_file.display(),
            "configuration resolved"
        );
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.topology_config()?;
    match cli.command {
        Command::Plan(args) => plan::execute(&args, &config),
        Command::Synth(args) => synth::execute(&args, &config),
        Command::Realize(args) => realize::execute(&args, &config),
        Command::Outputs(args) => outputs::execute(&args, &config),
        Command::Destroy(args) => destroy::execute(&args, &config),
    }
}

/// Opens an engine over the outputs recorded in the state file.
fn open_engine(config: &TopologyConfig) -> anyhow::Result<Engine<LocalProvider>> {
    let store = OutputStore::load(&config.state_file)?;
    Ok(Engine::with_store(LocalProvider::new(), store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configuration_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tierstack.yaml");
        std::fs::write(&path, "region: us-east-1\nstate_file: /tmp/from-file.json\n")
            .expect("write config");

        let cli = Cli::parse_from([
            "tstk",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--region",
            "eu-west-1",
            "plan",
        ]);
        let config = cli.topology_config().expect("config");
        assert_eq!(config.region.as_str(), "eu-west-1");
        assert_eq!(config.state_file, PathBuf::from("/tmp/from-file.json"));
    }

    #[test]
    fn defaults_apply_without_configuration_file() {
        let cli = Cli::parse_from(["tstk", "outputs", "--state-file", "state.json"]);
        let config = cli.topology_config().expect("config");
        assert_eq!(config.region, Region::default());
        assert_eq!(config.state_file, PathBuf::from("state.json"));
    }

    #[test]
    fn unit_flag_parses_for_realize() {
        let cli = Cli::parse_from(["tstk", "realize", "--unit", "backend"]);
        match cli.command {
            Command::Realize(args) => assert_eq!(args.unit.as_deref(), Some("backend")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
