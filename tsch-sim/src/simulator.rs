//! The network-formation driver: `JoiningPhaseSimulator`.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use common::{gcd, MacAddress, NodeId};

use crate::energy::{total_energy_consumption, EnergyInputs};
use crate::error::{Result, SimError};
use crate::node::NodeType;
use crate::node_group::NodeGroup;
use crate::propagation::{self, CandidateEb, CaptureContext};
use crate::rng::{make_rng, SimRngSeeds};
use crate::schedule::{cfash_allocate, cfasv_allocate, mbas_allocate, AdvertisementGrid, EBSchedulingMethod};
use crate::time::SimTime;
use crate::timeslot::TimeslotTemplate;

/// The outcome of a rejoining attempt.
///
/// ECV and ECH report additional sensing-phase statistics because, for
/// those methods, an advertiser keeps sensing for a free cell after it has
/// already joined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejoinOutcome {
    JoiningTime(SimTime),
    WithSensing {
        joining_time: SimTime,
        eb_scheduling_delay: SimTime,
        num_adv_slots_sensed: u64,
    },
}

impl RejoinOutcome {
    pub fn joining_time(self) -> SimTime {
        match self {
            RejoinOutcome::JoiningTime(t) => t,
            RejoinOutcome::WithSensing { joining_time, .. } => joining_time,
        }
    }
}

/// Simulates the network-formation (joining) phase of a TSCH network.
///
/// Owns the [`NodeGroup`] it was built with; the group's configuration must
/// not change for the lifetime of the simulator.
pub struct JoiningPhaseSimulator {
    node_group: NodeGroup,
    scheduling_method: EBSchedulingMethod,
    timeslot_template: TimeslotTemplate,
    slotframe_length: usize,
    num_channels: usize,
    scan_duration: SimTime,
    ebi: usize,
    atp_enabled: bool,

    t_eb: SimTime,
    subslot_length: SimTime,
    subslots_per_adv_slot: usize,
    num_slots_in_ms: usize,
    grid: AdvertisementGrid,
    slot_0_start_time: SimTime,
    pan_coordinator_id: NodeId,

    rng: ChaCha8Rng,
    multislotframe_idx: u64,
    has_executed: bool,

    allocated_ch_offset: BTreeMap<NodeId, BTreeMap<usize, usize>>,
    joined_nodes: BTreeSet<NodeId>,
    advertisers: BTreeSet<NodeId>,
    unjoined_nodes: BTreeSet<NodeId>,
    sync_asn: BTreeMap<NodeId, u64>,
    eb_tx_counter: BTreeMap<NodeId, u64>,
    formation_asn: Option<u64>,
    scan_start_time: BTreeMap<NodeId, SimTime>,
    sensing_nodes: BTreeMap<(usize, usize), BTreeSet<NodeId>>,
    num_slots_sensed: BTreeMap<NodeId, u64>,
}

impl JoiningPhaseSimulator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mut node_group: NodeGroup,
        scheduling_method: EBSchedulingMethod,
        timeslot_template: TimeslotTemplate,
        slotframe_length: usize,
        eb_length: u32,
        num_channels: usize,
        scan_duration: SimTime,
        ebi: usize,
        atp_enabled: bool,
        rng_seeds: SimRngSeeds,
    ) -> Result<Self> {
        check_arguments(
            &node_group,
            scheduling_method,
            slotframe_length,
            eb_length,
            num_channels,
            scan_duration,
            ebi,
            atp_enabled,
        )?;

        let pan_coordinator_id = node_group
            .pan_coordinator()
            .ok_or_else(|| SimError::InvalidConfiguration("the node group does not have a pan coordinator".into()))?;

        let data_rate_bps = node_group.properties().data_rate_bps();
        let t_eb = SimTime::from_secs_f64((eb_length as f64 * 8.0 + 48.0) / data_rate_bps as f64);
        let subslot_length = timeslot_template.mac_ts_tx_offset + t_eb;
        let subslots_per_adv_slot = if atp_enabled {
            (timeslot_template.mac_ts_timeslot_length / subslot_length) as usize
        } else {
            1
        };
        let num_slots_in_ms = slotframe_length * ebi;

        let ffd_ids: Vec<NodeId> = node_group
            .iter()
            .filter(|n| n.node_type() == NodeType::Ffd)
            .map(|n| n.id())
            .collect();

        let grid = AdvertisementGrid::build(
            scheduling_method,
            num_channels,
            ebi,
            slotframe_length,
            subslots_per_adv_slot,
            node_group.num_ffds(),
            &ffd_ids,
            pan_coordinator_id,
        )?;

        let slot_0_start_time = node_group
            .node(pan_coordinator_id)
            .expect("pan coordinator id was just resolved from this group")
            .boot_time();
        node_group.time_controller().set(slot_0_start_time);

        if gcd(num_slots_in_ms as u64, num_channels as u64) != 1 {
            warn!(
                num_slots_in_ms,
                num_channels, "multi-slotframe length and channel count are not relatively prime; links will not rotate through every channel"
            );
        }

        Ok(Self {
            node_group,
            scheduling_method,
            timeslot_template,
            slotframe_length,
            num_channels,
            scan_duration,
            ebi,
            atp_enabled,
            t_eb,
            subslot_length,
            subslots_per_adv_slot,
            num_slots_in_ms,
            grid,
            slot_0_start_time,
            pan_coordinator_id,
            rng: make_rng(rng_seeds.simulator),
            multislotframe_idx: 0,
            has_executed: false,
            allocated_ch_offset: BTreeMap::new(),
            joined_nodes: BTreeSet::new(),
            advertisers: BTreeSet::new(),
            unjoined_nodes: BTreeSet::new(),
            sync_asn: BTreeMap::new(),
            eb_tx_counter: BTreeMap::new(),
            formation_asn: None,
            scan_start_time: BTreeMap::new(),
            sensing_nodes: BTreeMap::new(),
            num_slots_sensed: BTreeMap::new(),
        })
    }

    pub fn node_group(&self) -> &NodeGroup {
        &self.node_group
    }

    pub fn into_node_group(self) -> NodeGroup {
        self.node_group
    }

    /// The ASN at which every node in the group first became joined, once
    /// `execute`/`rejoining_attempt` has converged.
    pub fn formation_asn(&self) -> Option<u64> {
        self.formation_asn
    }

    pub fn sync_asn(&self, node_id: NodeId) -> Option<u64> {
        self.sync_asn.get(&node_id).copied()
    }

    pub fn eb_tx_counter(&self, node_id: NodeId) -> u64 {
        self.eb_tx_counter.get(&node_id).copied().unwrap_or(0)
    }

    pub fn joined_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.joined_nodes.iter().copied()
    }

    pub fn unjoined_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.unjoined_nodes.iter().copied()
    }

    /// The advertisement cells allocated to `node_id`, as `(adv_subslot_idx,
    /// channel_offset)` pairs.
    pub fn allocated_cells(&self, node_id: NodeId) -> Vec<(usize, usize)> {
        self.allocated_ch_offset
            .get(&node_id)
            .map(|m| m.iter().map(|(&s, &c)| (s, c)).collect())
            .unwrap_or_default()
    }

    /// Runs (or re-runs) the network-formation simulation from scratch.
    ///
    /// Returns the time at which every node has synchronized to the network
    /// and the total energy consumed getting there.
    pub fn execute(&mut self) -> (SimTime, f64) {
        self.allocated_ch_offset = self
            .node_group
            .iter()
            .filter(|n| n.node_type() == NodeType::Ffd)
            .map(|n| (n.id(), BTreeMap::new()))
            .collect();

        self.make_scheduling_for_the_pan_coordinator();

        self.joined_nodes = BTreeSet::from([self.pan_coordinator_id]);
        self.advertisers = BTreeSet::from([self.pan_coordinator_id]);
        self.unjoined_nodes = self
            .node_group
            .iter_ids()
            .filter(|&id| id != self.pan_coordinator_id)
            .collect();

        self.sync_asn = BTreeMap::from([(self.pan_coordinator_id, 0)]);
        self.eb_tx_counter = BTreeMap::from([(self.pan_coordinator_id, 0)]);
        self.formation_asn = None;

        self.scan_start_time = self
            .unjoined_nodes
            .iter()
            .map(|&id| (id, self.node_group.node(id).unwrap().boot_time()))
            .collect();

        if self.scheduling_method.is_sensing_based() {
            self.sensing_nodes = (0..self.grid.total_adv_subslots_in_ms)
                .flat_map(|s| (1..self.num_channels).map(move |c| (s, c)))
                .map(|key| (key, BTreeSet::new()))
                .collect();
            self.num_slots_sensed = self
                .node_group
                .iter()
                .filter(|n| n.node_type() == NodeType::Ffd)
                .map(|n| (n.id(), 0))
                .collect();
        }

        self.multislotframe_idx = 0;
        self.has_executed = true;

        let formation_time = self.run_simulation(0);
        info!(?formation_time, "network formation complete");
        let energy = self.total_energy_consumption();
        (formation_time, energy)
    }

    /// Disconnects `node_id` from the formed network and simulates its
    /// attempt to rejoin starting `start_time_offset` after the current
    /// time. If `execute` has not yet been called, it is run first.
    pub fn rejoining_attempt(&mut self, node_id: NodeId, start_time_offset: SimTime) -> Result<RejoinOutcome> {
        if !self.has_executed {
            self.execute();
        }

        if self.node_group.node(node_id).is_none() {
            return Err(SimError::InvalidOperation(
                "the specified node does not belong to the node group".into(),
            ));
        }

        self.joined_nodes.remove(&node_id);
        self.advertisers.remove(&node_id);
        let node_type = self.node_group.node(node_id).unwrap().node_type();
        if node_type == NodeType::Ffd {
            if let Some(cells) = self.allocated_ch_offset.get_mut(&node_id) {
                cells.clear();
            }
        }
        self.unjoined_nodes.insert(node_id);

        let timeslot_length = self.timeslot_template.mac_ts_timeslot_length;
        let multislotframe_length = timeslot_length * self.num_slots_in_ms as u64;

        let start_time = self.node_group.time() + start_time_offset;
        self.multislotframe_idx = (start_time / multislotframe_length) as u64;
        let time_offset_in_ms = start_time % multislotframe_length;
        let rsn = time_offset_in_ms / timeslot_length;

        let temp = self.grid.adv_slots_pos_in_ms.partition_point(|&x| (x as i64) < rsn);
        let mut adv_slot_idx = if temp == self.grid.num_adv_slots_in_ms { 0 } else { temp };

        let adv_subslot_idx = if self.grid.adv_slots_pos_in_ms[adv_slot_idx] as i64 == rsn {
            let within_slot = time_offset_in_ms % timeslot_length;
            let subslot_pos = (within_slot / self.subslot_length) as usize;
            let time_elapsed = within_slot % self.subslot_length;
            let macd = self.timeslot_template.mac_ts_rx_wait * 0.5;

            if time_elapsed <= self.timeslot_template.mac_ts_tx_offset + macd {
                adv_slot_idx * self.subslots_per_adv_slot + subslot_pos
            } else if subslot_pos < self.subslots_per_adv_slot - 1 {
                adv_slot_idx * self.subslots_per_adv_slot + subslot_pos + 1
            } else {
                adv_slot_idx = (adv_slot_idx + 1) % self.grid.num_adv_slots_in_ms;
                if adv_slot_idx == 0 {
                    self.multislotframe_idx += 1;
                }
                adv_slot_idx * self.subslots_per_adv_slot
            }
        } else {
            if adv_slot_idx == 0 {
                self.multislotframe_idx += 1;
            }
            adv_slot_idx * self.subslots_per_adv_slot
        };

        self.scan_start_time.insert(node_id, start_time);
        let finish_time = self.run_simulation(adv_subslot_idx);
        debug!(?node_id, ?finish_time, "rejoin attempt completed");

        let joining_time = finish_time - start_time;

        if !self.scheduling_method.is_sensing_based() || node_type == NodeType::Rfd {
            return Ok(RejoinOutcome::JoiningTime(joining_time));
        }

        let eb_scheduling_delay = self.node_group.time() - finish_time;
        let sensing_period_duration = eb_scheduling_delay - multislotframe_length + finish_time % multislotframe_length;

        let divisor = if self.scheduling_method == EBSchedulingMethod::Ecv {
            multislotframe_length
        } else {
            timeslot_length * self.slotframe_length as u64
        };

        let num_adv_slots_sensed =
            (sensing_period_duration.as_secs_f64() / divisor.as_secs_f64()).ceil().max(0.0) as u64;

        Ok(RejoinOutcome::WithSensing {
            joining_time,
            eb_scheduling_delay,
            num_adv_slots_sensed,
        })
    }

    fn run_simulation(&mut self, starting_adv_subslot: usize) -> SimTime {
        let mut starting_i = starting_adv_subslot / self.subslots_per_adv_slot;
        let mut starting_j = starting_adv_subslot % self.subslots_per_adv_slot;
        let mut network_formation_time: Option<SimTime> = None;

        loop {
            for i in starting_i..self.grid.num_adv_slots_in_ms {
                let asn = self.multislotframe_idx * self.num_slots_in_ms as u64 + self.grid.adv_slots_pos_in_ms[i] as u64;

                for j in starting_j..self.subslots_per_adv_slot {
                    let adv_subslot_idx = i * self.subslots_per_adv_slot + j;
                    let ssn = self.grid.ssn.as_ref().map(|ssn| ssn[adv_subslot_idx]);

                    for advertiser in self.advertisers.clone() {
                        if self
                            .allocated_ch_offset
                            .get(&advertiser)
                            .is_some_and(|m| m.contains_key(&adv_subslot_idx))
                        {
                            *self.eb_tx_counter.entry(advertiser).or_insert(0) += 1;
                        }
                    }

                    if self.scheduling_method.is_sensing_based() {
                        self.run_sensing_round(adv_subslot_idx);
                    }

                    self.run_subslot_reception(asn, j, adv_subslot_idx, ssn);

                    if self.unjoined_nodes.is_empty() {
                        let slot_end_time = self.slot_0_start_time
                            + self.timeslot_template.mac_ts_timeslot_length * asn
                            + self.subslot_length * (j as u64 + 1);

                        if network_formation_time.is_none() {
                            network_formation_time = Some(slot_end_time);
                        }

                        let sensing_done = !self.scheduling_method.is_sensing_based()
                            || self.sensing_nodes.values().all(|nodes| nodes.is_empty());

                        if sensing_done {
                            self.node_group.time_controller().set(slot_end_time);
                            if self.formation_asn.is_none() {
                                self.formation_asn = Some(asn);
                            }
                            return network_formation_time.expect("set just above on the branch that enters here");
                        }
                    }
                }
                starting_j = 0;
            }
            starting_i = 0;
            self.multislotframe_idx += 1;
        }
    }

    fn run_subslot_reception(&mut self, asn: u64, j: usize, adv_subslot_idx: usize, ssn: Option<u64>) {
        let mut new_joined_nodes = BTreeSet::new();
        let mut new_advertisers = BTreeSet::new();
        let mut tx_start_time: BTreeMap<NodeId, SimTime> = BTreeMap::new();

        for node_id in self.unjoined_nodes.clone() {
            let current_adv_subslot_start_time =
                self.slot_0_start_time + self.timeslot_template.mac_ts_timeslot_length * asn + self.subslot_length * j as u64;
            let node_time = current_adv_subslot_start_time + self.timeslot_template.mac_ts_tx_offset;
            self.node_group.time_controller().set(node_time);

            let mut candidate_ebs: Vec<CandidateEb> = Vec::new();

            for advertiser in self.advertisers.clone() {
                let adv_ch_offset = match self.allocated_ch_offset.get(&advertiser).and_then(|m| m.get(&adv_subslot_idx)) {
                    Some(&c) => c,
                    None => continue,
                };

                let distance = self.node_group.distance(advertiser, node_id);
                let tx_power = self.node_group.node(advertiser).unwrap().tx_power();
                let rx_signal_power = propagation::rx_power(tx_power, distance, &mut self.rng);

                let sensitivity = self.node_group.node(node_id).unwrap().radio_sensitivity();
                if rx_signal_power < sensitivity as f64 {
                    continue;
                }

                if !tx_start_time.contains_key(&advertiser) {
                    let macd = self.timeslot_template.mac_ts_rx_wait * 0.5;
                    let magnitude = self.rng.gen::<f64>();
                    let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    tx_start_time.insert(advertiser, node_time + macd * (magnitude * sign));
                }

                let prop_delay = SimTime::from_nanos((distance * 10.0 / 3.0) as i64);
                let rx_start_time = tx_start_time[&advertiser] + prop_delay;

                candidate_ebs.push(CandidateEb {
                    rx_start_time,
                    rx_power_dbm: rx_signal_power,
                    tx_channel_offset: adv_ch_offset,
                });
            }

            if candidate_ebs.is_empty() {
                continue;
            }

            let boot_time = self.node_group.node(node_id).unwrap().boot_time();
            let channel_switching_time = self.node_group.node(node_id).unwrap().channel_switching_time();
            let scan_start_time = self.scan_start_time[&node_id];

            let ctx = CaptureContext {
                num_channels: self.num_channels,
                t_eb: self.t_eb,
                data_rate_bps: self.node_group.properties().data_rate_bps(),
                scan_duration: self.scan_duration,
                channel_switching_time,
                joining_node_boot_time: boot_time,
                scan_start_time,
                asn,
                ssn,
            };

            if propagation::captured_eb(&candidate_ebs, &ctx, &mut self.rng).is_none() {
                continue;
            }

            trace!(?node_id, adv_subslot_idx, "node captured an EB and joined");
            new_joined_nodes.insert(node_id);
            self.sync_asn.entry(node_id).or_insert(asn);

            let node_type = self.node_group.node(node_id).unwrap().node_type();
            if node_type == NodeType::Ffd {
                new_advertisers.insert(node_id);
                self.eb_tx_counter.insert(node_id, 0);
                self.allocate_new_advertiser(node_id);
            }
        }

        for &id in &new_joined_nodes {
            self.joined_nodes.insert(id);
            self.unjoined_nodes.remove(&id);
        }
        for id in new_advertisers {
            self.advertisers.insert(id);
        }
    }

    fn run_sensing_round(&mut self, adv_subslot_idx: usize) {
        let mut sensing_nodes_new: BTreeMap<(usize, usize), BTreeSet<NodeId>> = BTreeMap::new();

        for ch_offset in 1..self.num_channels {
            let key = (adv_subslot_idx, ch_offset);
            let nodes_sense_ch: Vec<NodeId> = self.sensing_nodes.get(&key).cloned().unwrap_or_default().into_iter().collect();
            let mut nodes_sense_ch_busy: BTreeSet<NodeId> = BTreeSet::new();

            for &node_id in &nodes_sense_ch {
                *self.num_slots_sensed.entry(node_id).or_insert(0) += 1;
                if self.is_a_neighbor_transmitting(node_id, adv_subslot_idx, ch_offset) {
                    nodes_sense_ch_busy.insert(node_id);
                }
            }

            for &node_id in &nodes_sense_ch {
                if !nodes_sense_ch_busy.contains(&node_id) {
                    self.set_cell(node_id, adv_subslot_idx, ch_offset);
                }
            }

            self.sensing_nodes.insert(key, BTreeSet::new());

            let is_last_cell = adv_subslot_idx == self.grid.total_adv_subslots_in_ms - 1 && ch_offset == self.num_channels - 1;

            if !is_last_cell {
                let next_key = match self.scheduling_method {
                    EBSchedulingMethod::Ecv => {
                        if ch_offset == self.num_channels - 1 {
                            (adv_subslot_idx + 1, 1)
                        } else {
                            (adv_subslot_idx, ch_offset + 1)
                        }
                    }
                    EBSchedulingMethod::Ech => {
                        if adv_subslot_idx == self.grid.total_adv_subslots_in_ms - 1 {
                            (0, ch_offset + 1)
                        } else {
                            (adv_subslot_idx + 1, ch_offset)
                        }
                    }
                    _ => unreachable!("run_sensing_round only runs for ECV/ECH"),
                };
                sensing_nodes_new.insert(next_key, nodes_sense_ch_busy);
            } else {
                // Neither ECV nor ECH describe what happens if a seemingly
                // free cell is never found; assign a random one instead.
                for node_id in nodes_sense_ch_busy {
                    let random_subslot = self.rng.gen_range(0..self.grid.total_adv_subslots_in_ms);
                    let random_ch = self.rng.gen_range(1..self.num_channels);
                    self.set_cell(node_id, random_subslot, random_ch);
                }
            }
        }

        for (key, value) in sensing_nodes_new {
            self.sensing_nodes.insert(key, value);
        }
    }

    fn is_a_neighbor_transmitting(&mut self, observer: NodeId, adv_subslot_idx: usize, target_ch_offset: usize) -> bool {
        for advertiser in self.advertisers.clone() {
            if advertiser == observer {
                continue;
            }
            let allocated = self.allocated_ch_offset.get(&advertiser).and_then(|m| m.get(&adv_subslot_idx)).copied();
            if allocated != Some(target_ch_offset) {
                continue;
            }
            let distance = self.node_group.distance(advertiser, observer);
            let tx_power = self.node_group.node(advertiser).unwrap().tx_power();
            let power = propagation::rx_power(tx_power, distance, &mut self.rng);
            let sensitivity = self.node_group.node(observer).unwrap().radio_sensitivity();
            if power >= sensitivity as f64 {
                return true;
            }
        }
        false
    }

    fn allocate_new_advertiser(&mut self, node_id: NodeId) {
        use EBSchedulingMethod::*;
        let total = self.grid.total_adv_subslots_in_ms;
        match self.scheduling_method {
            Cfasv => {
                let (s, c) = cfasv_allocate(node_id, self.num_channels, total, false);
                self.set_cell(node_id, s, c);
            }
            Ecfasv => {
                let (s, c) = cfasv_allocate(node_id, self.num_channels, total, true);
                self.set_cell(node_id, s, c);
            }
            Cfash => {
                let (s, c) = cfash_allocate(node_id, self.num_channels, total, false);
                self.set_cell(node_id, s, c);
            }
            Ecfash => {
                let (s, c) = cfash_allocate(node_id, self.num_channels, total, true);
                self.set_cell(node_id, s, c);
            }
            MacBasedAs => {
                let mac = self.mac_address_of(node_id);
                let (s, c) = mbas_allocate(&mac, self.num_channels, total, false);
                self.set_cell(node_id, s, c);
            }
            EmacBasedAs => {
                let mac = self.mac_address_of(node_id);
                let (s, c) = mbas_allocate(&mac, self.num_channels, total, true);
                self.set_cell(node_id, s, c);
            }
            Minimal6TiSch => {
                // Advertisers typically start transmitting EBs only after
                // their own association completes, which may land in any
                // slotframe after the EB reception; the starting slotframe
                // is chosen at random.
                let slot = self.rng.gen_range(0..self.grid.num_adv_slots_in_ms);
                self.set_cell(node_id, slot, 0);
            }
            Ecv | Ech => {
                self.sensing_nodes.entry((0, 1)).or_default().insert(node_id);
            }
        }
    }

    fn make_scheduling_for_the_pan_coordinator(&mut self) {
        let pan_id = self.pan_coordinator_id;
        let total = self.grid.total_adv_subslots_in_ms;
        match self.scheduling_method {
            EBSchedulingMethod::Minimal6TiSch => self.set_cell(pan_id, 0, 0),
            EBSchedulingMethod::Cfasv => {
                let (s, c) = cfasv_allocate(pan_id, self.num_channels, total, false);
                self.set_cell(pan_id, s, c);
            }
            EBSchedulingMethod::MacBasedAs => {
                let mac = self.mac_address_of(pan_id);
                let (s, c) = mbas_allocate(&mac, self.num_channels, total, false);
                self.set_cell(pan_id, s, c);
            }
            EBSchedulingMethod::Cfash => {
                let (s, c) = cfash_allocate(pan_id, self.num_channels, total, false);
                self.set_cell(pan_id, s, c);
            }
            _ => {
                // (E)CFAS's enhanced variants, ECV, ECH, and (E)MAC-based AS:
                // the coordinator is assumed to have no energy budget limits
                // and advertises in every cell, on channel offset 0.
                for idx in 0..total {
                    self.set_cell(pan_id, idx, 0);
                }
            }
        }
    }

    fn mac_address_of(&self, node_id: NodeId) -> MacAddress {
        self.node_group.node(node_id).expect("node id belongs to this group").mac_address()
    }

    fn set_cell(&mut self, node_id: NodeId, adv_subslot_idx: usize, ch_offset: usize) {
        self.allocated_ch_offset.entry(node_id).or_default().insert(adv_subslot_idx, ch_offset);
    }

    fn total_energy_consumption(&self) -> f64 {
        let inputs = EnergyInputs {
            method: self.scheduling_method,
            pan_coordinator_id: self.pan_coordinator_id,
            timeslot_length: self.timeslot_template.mac_ts_timeslot_length,
            t_eb: self.t_eb,
            formation_asn: self.formation_asn.unwrap_or(0),
            sync_asn: &self.sync_asn,
            eb_tx_counter: &self.eb_tx_counter,
            num_slots_sensed: self.scheduling_method.is_sensing_based().then_some(&self.num_slots_sensed),
            rx_wait: self.timeslot_template.mac_ts_rx_wait,
        };
        total_energy_consumption(&inputs, self.node_group.iter_ids())
    }
}

#[allow(clippy::too_many_arguments)]
fn check_arguments(
    node_group: &NodeGroup,
    scheduling_method: EBSchedulingMethod,
    slotframe_length: usize,
    eb_length: u32,
    num_channels: usize,
    scan_duration: SimTime,
    ebi: usize,
    atp_enabled: bool,
) -> Result<()> {
    if node_group.size() == 0 {
        return Err(SimError::InvalidConfiguration("the node group is empty".into()));
    }
    let pan_id = node_group
        .pan_coordinator()
        .ok_or_else(|| SimError::InvalidConfiguration("the node group does not have a pan coordinator".into()))?;

    if slotframe_length == 0 {
        return Err(SimError::InvalidConfiguration("slotframe_length must be a positive integer".into()));
    }
    if eb_length == 0 || eb_length > 127 {
        return Err(SimError::InvalidConfiguration(
            "eb_length must be an integer greater than 0 and less than 128".into(),
        ));
    }
    if num_channels == 0 {
        return Err(SimError::InvalidConfiguration("num_channels must be a positive integer".into()));
    }

    let requires_multiple_channels = matches!(
        scheduling_method,
        EBSchedulingMethod::Ecv
            | EBSchedulingMethod::Ech
            | EBSchedulingMethod::Ecfasv
            | EBSchedulingMethod::Ecfash
            | EBSchedulingMethod::EmacBasedAs
    );
    if requires_multiple_channels && num_channels == 1 {
        let has_other_ffds = node_group
            .iter()
            .any(|n| n.id() != pan_id && n.node_type() == NodeType::Ffd);
        if has_other_ffds {
            return Err(SimError::InvalidConfiguration(format!(
                "{scheduling_method:?} requires more than one channel"
            )));
        }
    }

    if scan_duration <= SimTime::ZERO {
        return Err(SimError::InvalidConfiguration("scan_duration must be a positive duration".into()));
    }
    if ebi == 0 {
        return Err(SimError::InvalidConfiguration("ebi must be a positive integer".into()));
    }
    if scheduling_method == EBSchedulingMethod::Minimal6TiSch && atp_enabled {
        return Err(SimError::InvalidConfiguration(
            "ATP is not supported by the Minimal 6TiSCH configuration".into(),
        ));
    }

    Ok(())
}
