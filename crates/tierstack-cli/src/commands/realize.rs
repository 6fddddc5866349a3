//! `tstk realize` — Realize the topology against the state file.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Args;
use tierstack_common::config::TopologyConfig;
use tierstack_common::types::UnitId;
use tierstack_compose::units::two_tier;

use super::open_engine;

/// Arguments for the `realize` command.
#[derive(Args, Debug)]
pub struct RealizeArgs {
    /// Only realize this unit; its dependencies must already be realized.
    #[arg(short, long)]
    pub unit: Option<String>,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Executes the `realize` command.
///
/// Ctrl+C stops realization before the next unit. The state file is
/// written even when realization fails, so units realized before the
/// failure stay recorded.
///
/// # Errors
///
/// Returns the first failing unit's error, or an error if the state file
/// cannot be read or written.
pub fn execute(args: &RealizeArgs, config: &TopologyConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    let topology = two_tier(&config.contract);

    let abort = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&abort);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut engine = open_engine(config)?.with_abort_flag(abort);
    let result = match &args.unit {
        Some(unit) => {
            let id = UnitId::new(unit.as_str());
            engine
                .realize_unit(&topology, &id, &config.region)
                .map(|()| vec![id])
        }
        None => engine.realize_topology(&topology, &config.region),
    };
    engine.store().save(&config.state_file)?;
    let realized = result?;

    eprintln!();
    eprintln!(
        "  {GREEN}{BOLD}Realized {}{RESET} unit(s) in {:.1}s:",
        realized.len(),
        start.elapsed().as_secs_f64()
    );
    for id in &realized {
        let count = engine.store().unit(id).map_or(0, |u| u.outputs().len());
        eprintln!("    {GREEN}●{RESET} {BOLD}{id}{RESET} {DIM}[{count} output(s)]{RESET}");
    }
    eprintln!();
    eprintln!("  {DIM}State: {}{RESET}", config.state_file.display());
    Ok(())
}
