//! TSCH Network-Formation Simulator
//!
//! Discrete-event simulation of the network-formation (joining) phase of a
//! Time-Slotted Channel Hopping network, per IEEE 802.15.4-2015. Models node
//! mobility, signal propagation and frame capture, and nine enhanced
//! beacon (EB) scheduling strategies, and reports the time and energy spent
//! forming the network.

pub mod energy;
pub mod error;
pub mod hopping;
pub mod node;
pub mod node_group;
pub mod propagation;
pub mod rng;
pub mod schedule;
pub mod simulator;
pub mod time;
pub mod timeslot;

pub use error::{Result, SimError};
pub use node::NodeType;
pub use node_group::{NodeGroup, NodeGroupProperties};
pub use rng::SimRngSeeds;
pub use schedule::EBSchedulingMethod;
pub use simulator::{JoiningPhaseSimulator, RejoinOutcome};
pub use time::SimTime;
pub use timeslot::{TimeslotTemplate, TimeslotTemplateConfig};
