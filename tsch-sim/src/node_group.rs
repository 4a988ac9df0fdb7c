//! Groups of nodes sharing an area, a data rate, and a simulation clock.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use common::{MacAddress, NodeId, SIMULATOR_OUI};

use crate::error::{Result, SimError};
use crate::node::{euclidean, Node, NodeType};
use crate::rng::make_rng;
use crate::time::SimTime;

/// Properties shared by every node in a [`NodeGroup`]: the channel data
/// rate and the (rectangular) deployment area.
#[derive(Debug, Clone, Copy)]
pub struct NodeGroupProperties {
    data_rate_bps: u32,
    area_dimensions: (f64, f64),
}

impl NodeGroupProperties {
    pub fn new(data_rate_bps: u32, area_dimensions: (f64, f64)) -> Result<Self> {
        if data_rate_bps == 0 {
            return Err(SimError::InvalidConfiguration(
                "data_rate_bps must be a positive integer".into(),
            ));
        }
        if area_dimensions.0 < 0.0 || area_dimensions.1 < 0.0 {
            return Err(SimError::InvalidConfiguration(
                "area_dimensions must be non-negative".into(),
            ));
        }
        Ok(Self {
            data_rate_bps,
            area_dimensions,
        })
    }

    pub fn data_rate_bps(&self) -> u32 {
        self.data_rate_bps
    }

    pub fn area_dimensions(&self) -> (f64, f64) {
        self.area_dimensions
    }
}

/// A capability handle allowing the simulator driver (and only the driver)
/// to advance a node group's reference clock.
///
/// Mirrors the "friend class" relationship the original model grants the
/// simulator over the node group's time, without exposing a public mutable
/// `time` field to every caller that holds a `&mut NodeGroup`.
pub struct TimeController<'a> {
    group: &'a mut NodeGroup,
}

impl<'a> TimeController<'a> {
    pub fn set(&mut self, t: SimTime) {
        self.group.time = t;
    }
}

/// A group of nodes forming (or attempting to form) a single PAN.
///
/// An instance is meant to be driven by exactly one
/// [`crate::simulator::JoiningPhaseSimulator`].
pub struct NodeGroup {
    properties: NodeGroupProperties,
    nodes: BTreeMap<NodeId, Node>,
    pan_coordinator: Option<NodeId>,
    time: SimTime,
    num_ffds: usize,
    macs_in_use: HashSet<MacAddress>,
    mac_rng: ChaCha8Rng,
}

impl NodeGroup {
    pub fn new(properties: NodeGroupProperties) -> Self {
        Self::with_mac_seed(properties, None)
    }

    /// Builds a node group whose MAC-address assignment stream is seeded,
    /// for reproducible runs.
    pub fn with_mac_seed(properties: NodeGroupProperties, mac_seed: Option<u64>) -> Self {
        let mac_rng = make_rng(mac_seed);
        Self {
            properties,
            nodes: BTreeMap::new(),
            pan_coordinator: None,
            time: SimTime::ZERO,
            num_ffds: 0,
            macs_in_use: HashSet::new(),
            mac_rng,
        }
    }

    pub fn properties(&self) -> &NodeGroupProperties {
        &self.properties
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_ffds(&self) -> usize {
        self.num_ffds
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn pan_coordinator(&self) -> Option<NodeId> {
        self.pan_coordinator
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub(crate) fn time_controller(&mut self) -> TimeController<'_> {
        TimeController { group: self }
    }

    /// Adds a regular (non-coordinator) node to the group.
    ///
    /// `mobility_seed` seeds the node's own Random Waypoint stream when the
    /// node is mobile; pass `None` to default to OS entropy.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node(
        &mut self,
        id: NodeId,
        position: (f64, f64),
        is_mobile: bool,
        node_type: NodeType,
        tx_power: i32,
        radio_sensitivity: i32,
        boot_time: SimTime,
        channel_switching_time: SimTime,
        mobility_seed: Option<u64>,
    ) -> Result<NodeId> {
        self.validate_new_node(id, position, boot_time, channel_switching_time)?;

        let mac = self.assign_mac_address();
        let node = if is_mobile {
            Node::new(
                id,
                mac,
                position,
                node_type,
                tx_power,
                radio_sensitivity,
                boot_time,
                channel_switching_time,
                mobility_seed,
                self.properties.area_dimensions,
                self.time,
            )
        } else {
            Node::new_fixed(
                id,
                mac,
                position,
                node_type,
                tx_power,
                radio_sensitivity,
                boot_time,
                channel_switching_time,
            )
        };

        self.insert(node)
    }

    /// Adds the PAN coordinator: a stationary FFD with no energy or mobility
    /// constraints of its own. Fails if the group already has one.
    pub fn add_pan_coordinator(
        &mut self,
        id: NodeId,
        position: (f64, f64),
        tx_power: i32,
        radio_sensitivity: i32,
        boot_time: SimTime,
        channel_switching_time: SimTime,
    ) -> Result<NodeId> {
        if self.pan_coordinator.is_some() {
            return Err(SimError::InvalidConfiguration(
                "the node group already has a PAN coordinator".into(),
            ));
        }

        self.validate_new_node(id, position, boot_time, channel_switching_time)?;
        let mac = self.assign_mac_address();
        let node = Node::new_fixed(
            id,
            mac,
            position,
            NodeType::Ffd,
            tx_power,
            radio_sensitivity,
            boot_time,
            channel_switching_time,
        );
        let id = self.insert(node)?;
        self.pan_coordinator = Some(id);
        Ok(id)
    }

    fn validate_new_node(
        &self,
        id: NodeId,
        position: (f64, f64),
        boot_time: SimTime,
        channel_switching_time: SimTime,
    ) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(SimError::InvalidConfiguration(format!(
                "there is already a node with id {id} in the group"
            )));
        }
        let (w, h) = self.properties.area_dimensions;
        if position.0 < 0.0 || position.1 < 0.0 || position.0 > w || position.1 > h {
            return Err(SimError::InvalidConfiguration(
                "the position is not within the group's area".into(),
            ));
        }
        if boot_time < SimTime::ZERO {
            return Err(SimError::InvalidConfiguration(
                "boot_time must be non-negative".into(),
            ));
        }
        if channel_switching_time < SimTime::ZERO {
            return Err(SimError::InvalidConfiguration(
                "channel_switching_time must be non-negative".into(),
            ));
        }
        Ok(())
    }

    fn insert(&mut self, node: Node) -> Result<NodeId> {
        let id = node.id();
        if node.node_type() == NodeType::Ffd {
            self.num_ffds += 1;
        }
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn assign_mac_address(&mut self) -> MacAddress {
        loop {
            let candidate = MacAddress::new([
                SIMULATOR_OUI[0],
                SIMULATOR_OUI[1],
                SIMULATOR_OUI[2],
                self.mac_rng.gen(),
                self.mac_rng.gen(),
                self.mac_rng.gen(),
            ]);
            if self.macs_in_use.insert(candidate) {
                return candidate;
            }
        }
    }

    /// The current position of the given node, advancing its mobility model
    /// to the group's reference time if necessary.
    pub fn position_of(&mut self, id: NodeId) -> (f64, f64) {
        let time = self.time;
        let area = self.properties.area_dimensions;
        self.nodes
            .get_mut(&id)
            .map(|n| n.position_at(time, area))
            .expect("node id must belong to this group")
    }

    pub fn distance(&mut self, a: NodeId, b: NodeId) -> f64 {
        let pa = self.position_of(a);
        let pb = self.position_of(b);
        euclidean(pa, pb)
    }

    pub fn distance_from_point(&mut self, a: NodeId, point: (f64, f64)) -> f64 {
        let pa = self.position_of(a);
        euclidean(pa, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> NodeGroupProperties {
        NodeGroupProperties::new(250_000, (100.0, 100.0)).unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut ng = NodeGroup::new(props());
        ng.add_pan_coordinator(0.into(), (0.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
            .unwrap();
        let err = ng.add_node(
            0.into(),
            (1.0, 1.0),
            false,
            NodeType::Ffd,
            0,
            -100,
            SimTime::ZERO,
            SimTime::from_micros(200),
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_second_pan_coordinator() {
        let mut ng = NodeGroup::new(props());
        ng.add_pan_coordinator(0.into(), (0.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
            .unwrap();
        let err = ng.add_pan_coordinator(1.into(), (1.0, 1.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_position_outside_area() {
        let mut ng = NodeGroup::new(props());
        let err = ng.add_pan_coordinator(0.into(), (200.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200));
        assert!(err.is_err());
    }

    #[test]
    fn assigns_unique_mac_addresses_under_fixed_oui() {
        let mut ng = NodeGroup::with_mac_seed(props(), Some(1));
        ng.add_pan_coordinator(0.into(), (0.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
            .unwrap();
        ng.add_node(
            1.into(),
            (1.0, 1.0),
            false,
            NodeType::Ffd,
            0,
            -100,
            SimTime::ZERO,
            SimTime::from_micros(200),
            None,
        )
        .unwrap();

        let macs: Vec<_> = ng.iter().map(|n| n.mac_address()).collect();
        assert_eq!(macs.len(), 2);
        assert_ne!(macs[0], macs[1]);
        for m in macs {
            assert_eq!(&m.as_bytes()[..3], &SIMULATOR_OUI);
        }
    }
}
