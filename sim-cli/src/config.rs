//! TOML scenario file format for `sim-cli`.
//!
//! Mirrors `gnb/src/config.rs`'s structured, defaulted style, adapted to the
//! parameters `JoiningPhaseSimulator::new` needs instead of a radio cell's.

use anyhow::{Context, Result};
use serde::Deserialize;

use common::NodeId;
use tsch_sim::schedule::EBSchedulingMethod;
use tsch_sim::{NodeGroup, NodeGroupProperties, NodeType, SimRngSeeds, SimTime, TimeslotTemplate};

/// A complete scenario: a node group plus the parameters
/// `JoiningPhaseSimulator::new` needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub node_group: NodeGroupConfig,
    pub pan_coordinator: NodeConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    #[serde(default = "default_scheduling_method")]
    pub scheduling_method: String,
    #[serde(default = "default_timeslot_template")]
    pub timeslot_template: String,
    #[serde(default = "default_slotframe_length")]
    pub slotframe_length: usize,
    #[serde(default = "default_eb_length")]
    pub eb_length: u32,
    #[serde(default = "default_num_channels")]
    pub num_channels: usize,
    #[serde(default = "default_scan_duration_us")]
    pub scan_duration_us: u64,
    #[serde(default = "default_ebi")]
    pub ebi: usize,
    #[serde(default)]
    pub atp_enabled: bool,

    #[serde(default)]
    pub seed: Option<u64>,
}

/// Node-group-wide properties: the shared channel rate and deployment area.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeGroupConfig {
    #[serde(default = "default_data_rate_bps")]
    pub data_rate_bps: u32,
    pub area_width_m: f64,
    pub area_height_m: f64,
}

/// A single node's static attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub id: u64,
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub mobile: bool,
    #[serde(default = "default_node_type")]
    pub node_type: String,
    #[serde(default)]
    pub tx_power_dbm: i32,
    #[serde(default = "default_radio_sensitivity_dbm")]
    pub radio_sensitivity_dbm: i32,
    #[serde(default)]
    pub boot_time_us: u64,
    #[serde(default = "default_channel_switching_time_us")]
    pub channel_switching_time_us: u64,
}

fn default_scheduling_method() -> String {
    "cfasv".into()
}
fn default_timeslot_template() -> String {
    "2450MHz".into()
}
fn default_slotframe_length() -> usize {
    101
}
fn default_eb_length() -> u32 {
    40
}
fn default_num_channels() -> usize {
    16
}
fn default_scan_duration_us() -> u64 {
    1_000_000
}
fn default_ebi() -> usize {
    1
}
fn default_data_rate_bps() -> u32 {
    250_000
}
fn default_node_type() -> String {
    "rfd".into()
}
fn default_radio_sensitivity_dbm() -> i32 {
    -100
}
fn default_channel_switching_time_us() -> u64 {
    200
}

fn parse_node_type(s: &str) -> Result<NodeType> {
    match s.to_ascii_lowercase().as_str() {
        "ffd" => Ok(NodeType::Ffd),
        "rfd" => Ok(NodeType::Rfd),
        other => anyhow::bail!("unknown node type '{other}', expected 'ffd' or 'rfd'"),
    }
}

fn parse_scheduling_method(s: &str) -> Result<EBSchedulingMethod> {
    use EBSchedulingMethod::*;
    Ok(match s.to_ascii_lowercase().as_str() {
        "cfasv" => Cfasv,
        "mac_based_as" | "macbasedas" => MacBasedAs,
        "cfash" => Cfash,
        "ecfasv" => Ecfasv,
        "emac_based_as" | "emacbasedas" => EmacBasedAs,
        "ecfash" => Ecfash,
        "ecv" => Ecv,
        "ech" => Ech,
        "minimal6tisch" | "minimal_6tisch" => Minimal6TiSch,
        other => anyhow::bail!("unknown scheduling method '{other}'"),
    })
}

fn parse_timeslot_template(s: &str) -> Result<TimeslotTemplate> {
    match s {
        "2450MHz" => Ok(TimeslotTemplate::default_2450mhz()),
        other => anyhow::bail!("unknown timeslot template '{other}'; only \"2450MHz\" is built in"),
    }
}

impl ScenarioConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario file {}", path.display()))?;
        let cfg: ScenarioConfig = toml::from_str(&text).with_context(|| format!("parsing scenario file {}", path.display()))?;
        Ok(cfg)
    }

    /// Builds the `NodeGroup` and resolved parameters this scenario
    /// describes, ready to hand to `JoiningPhaseSimulator::new`.
    pub fn build_node_group(&self) -> Result<NodeGroup> {
        let properties = NodeGroupProperties::new(
            self.node_group.data_rate_bps,
            (self.node_group.area_width_m, self.node_group.area_height_m),
        )?;

        let mut group = NodeGroup::with_mac_seed(properties, self.seed);

        group.add_pan_coordinator(
            NodeId::new(self.pan_coordinator.id),
            (self.pan_coordinator.x_m, self.pan_coordinator.y_m),
            self.pan_coordinator.tx_power_dbm,
            self.pan_coordinator.radio_sensitivity_dbm,
            SimTime::from_micros(self.pan_coordinator.boot_time_us as i64),
            SimTime::from_micros(self.pan_coordinator.channel_switching_time_us as i64),
        )?;

        for node in &self.nodes {
            let node_type = parse_node_type(&node.node_type)?;
            group.add_node(
                NodeId::new(node.id),
                (node.x_m, node.y_m),
                node.mobile,
                node_type,
                node.tx_power_dbm,
                node.radio_sensitivity_dbm,
                SimTime::from_micros(node.boot_time_us as i64),
                SimTime::from_micros(node.channel_switching_time_us as i64),
                self.seed,
            )?;
        }

        Ok(group)
    }

    pub fn scheduling_method(&self) -> Result<EBSchedulingMethod> {
        parse_scheduling_method(&self.scheduling_method)
    }

    pub fn timeslot_template(&self) -> Result<TimeslotTemplate> {
        parse_timeslot_template(&self.timeslot_template)
    }

    pub fn scan_duration(&self) -> SimTime {
        SimTime::from_micros(self.scan_duration_us as i64)
    }

    pub fn rng_seeds(&self) -> SimRngSeeds {
        SimRngSeeds {
            mobility: self.seed,
            mac_assignment: self.seed,
            simulator: self.seed,
        }
    }
}
