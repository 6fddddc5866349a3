//! `tstk plan` — Validate the topology and show the realization plan.

use clap::Args;
use tierstack_common::config::TopologyConfig;
use tierstack_compose::topology::Topology;
use tierstack_compose::units::two_tier;
use tierstack_compose::validator::validate;
use tierstack_runtime::store::OutputStore;

use crate::output::{RULE, format_table, realized_marker};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Also list each unit's resources.
    #[arg(short, long)]
    pub resources: bool,
}

/// Executes the `plan` command.
///
/// Builds the two-tier topology, validates it, resolves the realization
/// order, and displays units, bindings, and ordering edges.
///
/// # Errors
///
/// Returns an error if validation fails or the state file is unreadable.
pub fn execute(args: &PlanArgs, config: &TopologyConfig) -> anyhow::Result<()> {
    let topology = two_tier(&config.contract);
    validate(&topology)?;
    let order = topology.realization_order()?;
    let store = OutputStore::load(&config.state_file)?;

    println!("Realization plan for region {}", config.region);
    println!("{RULE}");
    println!();

    for id in &order {
        let Some(unit) = topology.unit(id.as_str()) else {
            continue;
        };
        println!(
            "  {} {id}  ({} resource(s), {} output(s))",
            realized_marker(store.is_realized(id)),
            unit.resources().len(),
            unit.outputs().len()
        );
        if args.resources {
            let rows: Vec<Vec<String>> = unit
                .resources()
                .iter()
                .map(|r| vec![r.name.to_string(), r.kind().to_string()])
                .collect();
            for line in format_table(&["RESOURCE", "KIND"], &rows).lines() {
                println!("      {line}");
            }
        }
    }

    println!();
    println!("  {} unit(s) will be realized in this order.", order.len());
    print_wiring(&topology);
    Ok(())
}

fn print_wiring(topology: &Topology) {
    if !topology.bindings().is_empty() {
        println!();
        println!("  Bindings:");
        for b in topology.bindings() {
            println!("    {}.{} <- {}.{}", b.consumer, b.input, b.producer, b.output);
        }
    }
    if !topology.edges().is_empty() {
        println!();
        println!("  Ordering:");
        for e in topology.edges() {
            println!("    {} after {}", e.dependent, e.dependency);
        }
    }
}
