//! TSCH network-formation scenario runner.
//!
//! Loads a TOML scenario, builds the node group and simulator it describes,
//! runs `execute()` (and, if requested, a single `rejoining_attempt()`), and
//! prints the result. Does not persist samples, export CSV, or run a batch
//! sweep across scenarios: those are out of scope, left to the original
//! implementation's `sim_for_*.py` drivers, not reproduced here.

mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use common::NodeId;
use tsch_sim::{JoiningPhaseSimulator, RejoinOutcome, SimTime};

use config::ScenarioConfig;

/// Runs the TSCH network-formation simulator against a scenario file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML scenario file
    #[arg(short, long, default_value = "scenario.toml")]
    scenario: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// After network formation, simulate this node rejoining
    #[arg(long)]
    rejoin_node: Option<u64>,

    /// Delay, in microseconds, between formation and the rejoin attempt
    #[arg(long, default_value = "0")]
    rejoin_offset_us: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(env_filter).with_target(true).init();

    info!("Loading scenario from {}", args.scenario.display());
    let scenario = ScenarioConfig::load(&args.scenario)?;

    let node_group = scenario.build_node_group()?;
    let scheduling_method = scenario.scheduling_method()?;
    let timeslot_template = scenario.timeslot_template()?;

    info!(
        nodes = node_group.size(),
        ?scheduling_method,
        "Starting network formation"
    );

    let mut simulator = JoiningPhaseSimulator::new(
        node_group,
        scheduling_method,
        timeslot_template,
        scenario.slotframe_length,
        scenario.eb_length,
        scenario.num_channels,
        scenario.scan_duration(),
        scenario.ebi,
        scenario.atp_enabled,
        scenario.rng_seeds(),
    )?;

    let (formation_time, energy_joules) = simulator.execute();
    println!("Network formation time: {formation_time}");
    println!("Total energy consumption: {energy_joules:.6} J");

    if let Some(rejoin_node) = args.rejoin_node {
        let outcome = simulator.rejoining_attempt(
            NodeId::new(rejoin_node),
            SimTime::from_micros(args.rejoin_offset_us as i64),
        )?;

        match outcome {
            RejoinOutcome::JoiningTime(t) => {
                println!("Node {rejoin_node} rejoined in {t}");
            }
            RejoinOutcome::WithSensing {
                joining_time,
                eb_scheduling_delay,
                num_adv_slots_sensed,
            } => {
                println!(
                    "Node {rejoin_node} rejoined in {joining_time} \
(eb scheduling delay {eb_scheduling_delay}, {num_adv_slots_sensed} advertisement cells sensed)"
                );
            }
        }
    }

    Ok(())
}
