//! `tstk synth` — Print unit declarations with available inputs resolved.

use clap::Args;
use tierstack_common::config::TopologyConfig;
use tierstack_common::types::UnitId;
use tierstack_compose::units::two_tier;
use tierstack_compose::validator::validate;

use super::open_engine;

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Only synthesize this unit.
    #[arg(short, long)]
    pub unit: Option<String>,
}

/// Executes the `synth` command.
///
/// Inputs whose producing unit is realized in the state file are replaced
/// by their values; the rest stay as references.
///
/// # Errors
///
/// Returns an error if validation fails, the unit is unknown, or the state
/// file is unreadable.
pub fn execute(args: &SynthArgs, config: &TopologyConfig) -> anyhow::Result<()> {
    let topology = two_tier(&config.contract);
    validate(&topology)?;
    let engine = open_engine(config)?;

    let json = if let Some(unit) = &args.unit {
        let resolved = engine.preview(&topology, &UnitId::new(unit.as_str()))?;
        serde_json::to_string_pretty(&resolved)?
    } else {
        let resolved = topology
            .realization_order()?
            .iter()
            .map(|id| engine.preview(&topology, id))
            .collect::<Result<Vec<_>, _>>()?;
        serde_json::to_string_pretty(&resolved)?
    };
    println!("{json}");
    Ok(())
}
