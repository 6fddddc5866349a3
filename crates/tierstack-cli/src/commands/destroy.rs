//! `tstk destroy` — Destroy realized units, dependents first.

use clap::Args;
use tierstack_common::config::TopologyConfig;
use tierstack_common::types::UnitId;
use tierstack_compose::units::two_tier;

use super::open_engine;

/// Arguments for the `destroy` command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Only destroy this unit; no unit depending on it may be realized.
    #[arg(short, long)]
    pub unit: Option<String>,
}

/// Executes the `destroy` command.
///
/// # Errors
///
/// Returns an error if a dependent is still realized, the provider fails,
/// or the state file cannot be read or written.
pub fn execute(args: &DestroyArgs, config: &TopologyConfig) -> anyhow::Result<()> {
    let topology = two_tier(&config.contract);
    let mut engine = open_engine(config)?;

    let result = match &args.unit {
        Some(unit) => {
            let id = UnitId::new(unit.as_str());
            engine
                .destroy_unit(&topology, &id, &config.region)
                .map(|()| vec![id])
        }
        None => engine.destroy_topology(&topology, &config.region),
    };
    engine.store().save(&config.state_file)?;
    let destroyed = result?;

    if destroyed.is_empty() {
        println!("Nothing to destroy.");
        return Ok(());
    }
    for id in &destroyed {
        println!("Destroyed {id}");
    }
    Ok(())
}
