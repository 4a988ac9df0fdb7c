//! EB scheduling methods and the advertisement-cell grid they share.

mod sax;

pub use sax::sax16;

use std::collections::HashSet;

use common::{MacAddress, NodeId};

use crate::error::{Result, SimError};

/// The EB scheduling method driving how advertisement cells are assigned to
/// advertisers.
///
/// `MacBasedAs` and `EmacBasedAs` exist for comparison purposes only: unlike
/// the other static variants, the SAX hash they use does not guarantee a
/// collision-free mapping between advertisers and cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EBSchedulingMethod {
    Cfasv,
    MacBasedAs,
    Cfash,
    Ecfasv,
    EmacBasedAs,
    Ecfash,
    Ecv,
    Ech,
    Minimal6TiSch,
}

impl EBSchedulingMethod {
    /// Whether this variant reserves channel offset 0 to the PAN coordinator
    /// and shifts every other advertiser's allocation by one channel offset.
    pub fn excludes_channel_zero(self) -> bool {
        matches!(self, Self::Ecfasv | Self::Ecfash | Self::EmacBasedAs)
    }

    /// Whether advertisement cells are derived from a MAC-address hash
    /// rather than the node id (so injectivity can't be checked up front).
    pub fn is_mac_hash_based(self) -> bool {
        matches!(self, Self::MacBasedAs | Self::EmacBasedAs)
    }

    /// Whether the advertisement grid is the one-slot-per-slotframe layout
    /// shared by the sensing-based methods and Minimal 6TiSCH, rather than
    /// the (E)CFAS layout sized to fit every FFD.
    pub fn uses_periodic_grid(self) -> bool {
        matches!(self, Self::Ecv | Self::Ech | Self::Minimal6TiSch)
    }

    /// Whether this method's sensing-based cell discovery runs continuously
    /// until every new advertiser finds a free cell (ECV/ECH).
    pub fn is_sensing_based(self) -> bool {
        matches!(self, Self::Ecv | Self::Ech)
    }

    /// Whether the PAN coordinator is assumed to have no energy budget
    /// limitations under this method (it transmits in every cell).
    pub fn pan_coordinator_is_unconstrained(self) -> bool {
        matches!(
            self,
            Self::Ecv | Self::Ech | Self::Ecfasv | Self::Ecfash | Self::EmacBasedAs
        )
    }
}

/// The advertisement (sub)slot grid laid out over one multi-slotframe, and
/// the serial subslot numbers (ssn) used for hopping when ATP is enabled.
#[derive(Debug, Clone)]
pub struct AdvertisementGrid {
    pub adv_slots_pos_in_ms: Vec<usize>,
    pub num_adv_slots_in_ms: usize,
    pub total_adv_subslots_in_ms: usize,
    /// `Some` only when more than one subslot exists per advertisement slot.
    pub ssn: Option<Vec<u64>>,
}

impl AdvertisementGrid {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        method: EBSchedulingMethod,
        num_channels: usize,
        ebi: usize,
        slotframe_length: usize,
        subslots_per_adv_slot: usize,
        num_ffds: usize,
        ffd_ids: &[NodeId],
        pan_coordinator_id: NodeId,
    ) -> Result<Self> {
        let num_slots_in_ms = slotframe_length * ebi;

        let adv_slots_pos_in_ms = if method.uses_periodic_grid() {
            (0..num_slots_in_ms).step_by(slotframe_length).collect()
        } else {
            let num_required_adv_slots = if method.excludes_channel_zero() {
                ceil_div(num_ffds.saturating_sub(1), (num_channels - 1) * ebi * subslots_per_adv_slot)?
            } else {
                ceil_div(num_ffds, num_channels * ebi * subslots_per_adv_slot)?
            };

            if num_required_adv_slots > slotframe_length {
                return Err(SimError::InvalidConfiguration(
                    "the number of slots is less than required to provide collision-free EB transmissions".into(),
                ));
            }

            if !method.is_mac_hash_based() {
                let num_avail_ch_offsets = if method.excludes_channel_zero() {
                    num_channels - 1
                } else {
                    num_channels
                };
                let total_adv_cells = num_required_adv_slots * subslots_per_adv_slot * ebi * num_avail_ch_offsets;
                check_injective_mapping(ffd_ids, pan_coordinator_id, method.excludes_channel_zero(), total_adv_cells)?;
            }

            (0..num_slots_in_ms)
                .step_by(slotframe_length)
                .flat_map(|i| i..i + num_required_adv_slots)
                .collect()
        };

        let num_adv_slots_in_ms = adv_slots_pos_in_ms.len();
        let total_adv_subslots_in_ms = num_adv_slots_in_ms * subslots_per_adv_slot;
        let ssn = (subslots_per_adv_slot > 1)
            .then(|| build_ssn(&adv_slots_pos_in_ms, slotframe_length, subslots_per_adv_slot));

        Ok(Self {
            adv_slots_pos_in_ms,
            num_adv_slots_in_ms,
            total_adv_subslots_in_ms,
            ssn,
        })
    }
}

fn ceil_div(numerator: usize, denominator: usize) -> Result<usize> {
    if denominator == 0 {
        return if numerator == 0 {
            Ok(0)
        } else {
            Err(SimError::InvalidConfiguration(
                "not enough channel offsets are available for the selected scheduling method".into(),
            ))
        };
    }
    Ok((numerator + denominator - 1) / denominator)
}

fn check_injective_mapping(
    ffd_ids: &[NodeId],
    pan_coordinator_id: NodeId,
    exclude_pan_coordinator: bool,
    total_adv_cells: usize,
) -> Result<()> {
    let mut seen = HashSet::new();
    for &id in ffd_ids {
        if exclude_pan_coordinator && id == pan_coordinator_id {
            continue;
        }
        let idx = (id.get() as usize) % total_adv_cells;
        if !seen.insert(idx) {
            return Err(SimError::InvalidConfiguration(
                "the specified node ids do not allow a one-to-one mapping onto the available advertisement cells; \
the EB schedule cannot be collision-free"
                    .into(),
            ));
        }
    }
    Ok(())
}

fn build_ssn(adv_slots_pos_in_ms: &[usize], slotframe_length: usize, subslots_per_adv_slot: usize) -> Vec<u64> {
    let mut ssn: Vec<u64> = (0..subslots_per_adv_slot as u64).collect();

    for i in 1..adv_slots_pos_in_ms.len() {
        let mut next_ssn = if adv_slots_pos_in_ms[i - 1] / slotframe_length == adv_slots_pos_in_ms[i] / slotframe_length
        {
            ssn.last().copied().unwrap_or(0) + 1
        } else {
            0
        };

        for _ in 0..subslots_per_adv_slot {
            ssn.push(next_ssn);
            next_ssn += 1;
        }
    }

    ssn
}

/// Allocates an advertisement cell to `id` under (E)CFASV: advertisement
/// cells fill channel offsets first within a subslot, then move to the next
/// subslot ("vertical" filling).
pub fn cfasv_allocate(id: NodeId, num_channels: usize, total_adv_subslots_in_ms: usize, enhanced: bool) -> (usize, usize) {
    let num_avail = if enhanced { num_channels - 1 } else { num_channels };
    let adv_cell_idx = (id.get() as usize) % (total_adv_subslots_in_ms * num_avail);
    let adv_subslot_idx = adv_cell_idx / num_avail;
    let ch_offset = adv_cell_idx % num_avail + if enhanced { 1 } else { 0 };
    (adv_subslot_idx, ch_offset)
}

/// Allocates an advertisement cell to `id` under (E)CFASH: advertisement
/// cells fill subslots first within a channel offset, then move to the next
/// channel offset ("horizontal" filling).
pub fn cfash_allocate(id: NodeId, num_channels: usize, total_adv_subslots_in_ms: usize, enhanced: bool) -> (usize, usize) {
    let num_avail = if enhanced { num_channels - 1 } else { num_channels };
    let adv_cell_idx = (id.get() as usize) % (total_adv_subslots_in_ms * num_avail);
    let adv_subslot_idx = adv_cell_idx % total_adv_subslots_in_ms;
    let ch_offset = adv_cell_idx / total_adv_subslots_in_ms + if enhanced { 1 } else { 0 };
    (adv_subslot_idx, ch_offset)
}

/// Allocates an advertisement cell to a node based on the SAX hash of its
/// MAC address rather than its id ((E)MAC_BASED_AS).
pub fn mbas_allocate(
    mac: &MacAddress,
    num_channels: usize,
    total_adv_subslots_in_ms: usize,
    enhanced: bool,
) -> (usize, usize) {
    let num_avail = if enhanced { num_channels - 1 } else { num_channels };
    let adv_cell_idx = sax16(mac) as usize % (num_avail * total_adv_subslots_in_ms);
    let adv_subslot_idx = adv_cell_idx / num_avail;
    let ch_offset = adv_cell_idx % num_avail + if enhanced { 1 } else { 0 };
    (adv_subslot_idx, ch_offset)
}
