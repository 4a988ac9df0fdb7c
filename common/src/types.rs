//! Common Types for the TSCH Network-Formation Simulator
//!
//! Defines fundamental newtypes shared across the simulator workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node within a node group.
///
/// Wraps a plain integer so node identifiers can't be accidentally mixed up
/// with slot numbers, channel offsets, or other `u64`-shaped quantities.
/// Ordered so node collections can be kept in a deterministic iteration
/// order — a plain hash set's order is not reproducible run to run, and the
/// simulator's random draws are consumed in node-iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// OUI prefix the simulator assigns to every node's (randomly generated)
/// MAC address, matching the vendor block used by the reference network
/// group's address assignment.
pub const SIMULATOR_OUI: [u8; 3] = [0x00, 0x8c, 0xfa];

/// A 48-bit IEEE 802.15.4 extended MAC address.
///
/// Consumed by the MAC-hash scheduling variants (`MAC_BASED_AS`,
/// `EMAC_BASED_AS`, `CFASH`, `ECFASH`), which derive a channel/subslot
/// assignment from the address bytes via the SAX hash rather than from the
/// node id directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::new(42).to_string(), "42");
    }

    #[test]
    fn node_id_ordering_is_numeric() {
        let mut ids = vec![NodeId::new(3), NodeId::new(1), NodeId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }

    #[test]
    fn mac_address_display_format() {
        let mac = MacAddress::new([0x00, 0x8c, 0xfa, 0x01, 0x02, 0x03]);
        assert_eq!(mac.to_string(), "00-8c-fa-01-02-03");
    }

    #[test]
    fn mac_address_round_trips_bytes() {
        let bytes = [SIMULATOR_OUI[0], SIMULATOR_OUI[1], SIMULATOR_OUI[2], 1, 2, 3];
        let mac = MacAddress::new(bytes);
        assert_eq!(mac.as_bytes(), &bytes);
    }
}
