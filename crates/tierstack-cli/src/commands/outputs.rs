//! `tstk outputs` — Show realized outputs.

use clap::Args;
use tierstack_common::config::TopologyConfig;
use tierstack_common::types::{OutputPath, UnitId};
use tierstack_runtime::store::{OutputStore, RealizedUnit};

use crate::output::format_table;

/// Arguments for the `outputs` command.
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// A unit (`backend`) or a single output (`backend.service-name`).
    pub target: Option<String>,

    /// Print the state as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `outputs` command.
///
/// A single output prints its bare value, for use in scripts.
///
/// # Errors
///
/// Returns an error if the target is malformed or not realized.
pub fn execute(args: &OutputsArgs, config: &TopologyConfig) -> anyhow::Result<()> {
    let store = OutputStore::load(&config.state_file)?;

    match args.target.as_deref() {
        Some(target) if target.contains('.') => {
            let path = OutputPath::parse(target)?;
            let value = store
                .output(&path.unit, &path.output)
                .ok_or_else(|| anyhow::anyhow!("output {path} is not realized"))?;
            println!("{}", value.value());
        }
        Some(unit) => {
            let id = UnitId::new(unit);
            let realized = store
                .unit(&id)
                .ok_or_else(|| anyhow::anyhow!("unit {id} is not realized"))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(realized)?);
            } else {
                print!("{}", format_table(&["UNIT", "OUTPUT", "VALUE"], &rows(realized)));
            }
        }
        None if args.json => println!("{}", serde_json::to_string_pretty(&store)?),
        None if store.is_empty() => println!("No units realized."),
        None => {
            let rows: Vec<Vec<String>> = store.units().flat_map(rows).collect();
            print!("{}", format_table(&["UNIT", "OUTPUT", "VALUE"], &rows));
        }
    }
    Ok(())
}

fn rows(unit: &RealizedUnit) -> Vec<Vec<String>> {
    unit.outputs()
        .iter()
        .map(|(name, value)| vec![unit.id().to_string(), name.clone(), value.value().to_string()])
        .collect()
}
