//! Nodes and the Random Waypoint mobility model.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use common::{MacAddress, NodeId};

use crate::rng::make_rng;
use crate::time::SimTime;

/// The two IEEE 802.15.4 device classes relevant to network formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Full Function Device — can become an advertiser.
    Ffd,
    /// Reduced Function Device — only ever joins, never advertises.
    Rfd,
}

/// Minimum and maximum node speed under the Random Waypoint mobility model,
/// in meters per second. Pause time at waypoints is zero.
const MIN_SPEED_MPS: f64 = 0.1;
const MAX_SPEED_MPS: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
struct Move {
    start_pos: (f64, f64),
    start_t: SimTime,
    end_pos: (f64, f64),
    speed: f64,
}

/// Per-node mobility state: an independent RNG stream plus the node's
/// current leg of the Random Waypoint walk.
#[derive(Debug)]
struct MobilityState {
    rng: ChaCha8Rng,
    current_move: Move,
}

impl MobilityState {
    fn new(mut rng: ChaCha8Rng, initial_position: (f64, f64), area: (f64, f64), start_t: SimTime) -> Self {
        let current_move = Self::pick_move(&mut rng, initial_position, area, start_t);
        Self { rng, current_move }
    }

    fn pick_move(rng: &mut ChaCha8Rng, start_pos: (f64, f64), area: (f64, f64), start_t: SimTime) -> Move {
        let end_pos = loop {
            let candidate = (rng.gen::<f64>() * area.0, rng.gen::<f64>() * area.1);
            if candidate != start_pos {
                break candidate;
            }
        };

        let speed = (rng.gen::<f64>() * MAX_SPEED_MPS).max(MIN_SPEED_MPS);

        Move {
            start_pos,
            start_t,
            end_pos,
            speed,
        }
    }
}

/// A node in the simulated network.
///
/// Holds only its own identity and static attributes; the quantities that
/// depend on the shared simulation clock (position) are resolved through
/// [`crate::node_group::NodeGroup`], which owns the reference time. This
/// keeps `Node` free of a back-reference to its containing group.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    mac_address: MacAddress,
    initial_position: (f64, f64),
    node_type: NodeType,
    tx_power: i32,
    radio_sensitivity: i32,
    boot_time: SimTime,
    channel_switching_time: SimTime,
    mobility: Option<MobilityState>,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: NodeId,
        mac_address: MacAddress,
        initial_position: (f64, f64),
        node_type: NodeType,
        tx_power: i32,
        radio_sensitivity: i32,
        boot_time: SimTime,
        channel_switching_time: SimTime,
        mobility_seed: Option<u64>,
        area: (f64, f64),
        group_time: SimTime,
    ) -> Self {
        let rng = make_rng(mobility_seed.map(|seed| seed ^ id.get()));
        let mobility = Some(MobilityState::new(rng, initial_position, area, group_time));

        Self {
            id,
            mac_address,
            initial_position,
            node_type,
            tx_power,
            radio_sensitivity,
            boot_time,
            channel_switching_time,
            mobility,
        }
    }

    /// Builds a stationary node (no mobility state at all).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_fixed(
        id: NodeId,
        mac_address: MacAddress,
        initial_position: (f64, f64),
        node_type: NodeType,
        tx_power: i32,
        radio_sensitivity: i32,
        boot_time: SimTime,
        channel_switching_time: SimTime,
    ) -> Self {
        Self {
            id,
            mac_address,
            initial_position,
            node_type,
            tx_power,
            radio_sensitivity,
            boot_time,
            channel_switching_time,
            mobility: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn mac_address(&self) -> MacAddress {
        self.mac_address
    }

    pub fn is_mobile(&self) -> bool {
        self.mobility.is_some()
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn tx_power(&self) -> i32 {
        self.tx_power
    }

    pub fn radio_sensitivity(&self) -> i32 {
        self.radio_sensitivity
    }

    pub fn boot_time(&self) -> SimTime {
        self.boot_time
    }

    pub fn channel_switching_time(&self) -> SimTime {
        self.channel_switching_time
    }

    /// Resolves the node's position at the node group's current reference
    /// time, advancing the Random Waypoint walk as needed.
    ///
    /// Before `boot_time`, and for stationary nodes, the node sits at its
    /// initial position.
    pub(crate) fn position_at(&mut self, group_time: SimTime, area: (f64, f64)) -> (f64, f64) {
        let Some(mobility) = self.mobility.as_mut() else {
            return self.initial_position;
        };

        if self.boot_time > group_time {
            return self.initial_position;
        }

        loop {
            let m = mobility.current_move;
            let total_distance = euclidean(m.start_pos, m.end_pos);
            let elapsed = (group_time - m.start_t).as_secs_f64();
            let d = m.speed * elapsed;

            if d > total_distance {
                let completion = m.start_t + SimTime::from_secs_f64(total_distance / m.speed);
                mobility.current_move = MobilityState::pick_move(&mut mobility.rng, m.end_pos, area, completion);
                continue;
            }

            let (x0, y0) = m.start_pos;
            let (x1, y1) = m.end_pos;

            return if x0 == x1 {
                (x0, if y0 < y1 { y0 + d } else { y0 - d })
            } else {
                let slope = (y1 - y0) / (x1 - x0);
                let x = if x0 < x1 {
                    x0 + d / (1.0 + slope * slope).sqrt()
                } else {
                    x0 - d / (1.0 + slope * slope).sqrt()
                };
                (x, slope * (x - x0) + y0)
            };
        }
    }
}

pub(crate) fn euclidean(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_node_never_moves() {
        let mut n = Node::new_fixed(
            NodeId::new(1),
            MacAddress::new([0, 0, 0, 0, 0, 1]),
            (5.0, 5.0),
            NodeType::Ffd,
            0,
            -100,
            SimTime::ZERO,
            SimTime::from_micros(200),
        );
        assert_eq!(n.position_at(SimTime::from_secs_f64(100.0), (100.0, 100.0)), (5.0, 5.0));
    }

    #[test]
    fn mobile_node_before_boot_time_stays_put() {
        let mut n = Node::new(
            NodeId::new(2),
            MacAddress::new([0, 0, 0, 0, 0, 2]),
            (1.0, 1.0),
            NodeType::Rfd,
            0,
            -100,
            SimTime::from_secs_f64(10.0),
            SimTime::from_micros(200),
            Some(42),
            (100.0, 100.0),
            SimTime::ZERO,
        );
        assert_eq!(n.position_at(SimTime::ZERO, (100.0, 100.0)), (1.0, 1.0));
    }

    #[test]
    fn mobile_node_moves_toward_first_waypoint() {
        let mut n = Node::new(
            NodeId::new(3),
            MacAddress::new([0, 0, 0, 0, 0, 3]),
            (0.0, 0.0),
            NodeType::Rfd,
            0,
            -100,
            SimTime::ZERO,
            SimTime::from_micros(200),
            Some(7),
            (100.0, 100.0),
            SimTime::ZERO,
        );
        let p0 = n.position_at(SimTime::ZERO, (100.0, 100.0));
        let p1 = n.position_at(SimTime::from_secs_f64(1.0), (100.0, 100.0));
        assert_ne!(p0, p1, "node should have moved after one second");
    }
}
