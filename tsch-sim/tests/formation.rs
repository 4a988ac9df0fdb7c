//! Full-simulation scenarios exercising `JoiningPhaseSimulator` end to end.

use common::NodeId;
use tsch_sim::{
    EBSchedulingMethod, JoiningPhaseSimulator, NodeGroup, NodeGroupProperties, NodeType, RejoinOutcome, SimRngSeeds,
    SimTime, TimeslotTemplate,
};

fn seeds() -> SimRngSeeds {
    SimRngSeeds {
        mobility: Some(1),
        mac_assignment: Some(2),
        simulator: Some(3),
    }
}

#[test]
fn two_node_line_converges_with_minimal_6tisch() {
    let props = NodeGroupProperties::new(250_000, (100.0, 100.0)).unwrap();
    let mut group = NodeGroup::with_mac_seed(props, Some(2));
    group
        .add_pan_coordinator(NodeId::new(0), (50.0, 50.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
        .unwrap();
    group
        .add_node(
            NodeId::new(1),
            (55.0, 50.0),
            false,
            NodeType::Rfd,
            0,
            -100,
            SimTime::ZERO,
            SimTime::from_micros(200),
            None,
        )
        .unwrap();

    let mut sim = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Minimal6TiSch,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        16,
        SimTime::from_micros(2 * 101 * 10_000),
        1,
        false,
        seeds(),
    )
    .unwrap();

    let (_formation_time, energy) = sim.execute();
    assert!(energy >= 0.0);
    assert!(sim.unjoined_nodes().next().is_none());
    let rfd_sync = sim.sync_asn(NodeId::new(1)).expect("the RFD must have joined");
    assert!(rfd_sync <= 16, "expected convergence within one channel scan cycle, got asn {rfd_sync}");
}

/// Builds a node group with a PAN coordinator at id 0 and one stationary FFD
/// per remaining id, spread far enough apart that id collisions (not
/// distance) are the only thing construction can reject on.
fn ffd_group(ids: &[u64]) -> NodeGroup {
    let props = NodeGroupProperties::new(250_000, (1000.0, 1000.0)).unwrap();
    let mut group = NodeGroup::with_mac_seed(props, Some(9));
    group
        .add_pan_coordinator(NodeId::new(ids[0]), (0.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
        .unwrap();
    for (i, &id) in ids[1..].iter().enumerate() {
        group
            .add_node(
                NodeId::new(id),
                (i as f64 + 1.0, 0.0),
                false,
                NodeType::Ffd,
                0,
                -100,
                SimTime::ZERO,
                SimTime::from_micros(200),
                None,
            )
            .unwrap();
    }
    group
}

#[test]
fn cfasv_accepts_an_injective_33_node_mapping() {
    let ids: Vec<u64> = (0..33).collect();
    let group = ffd_group(&ids);

    let result = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Cfasv,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        16,
        SimTime::from_secs_f64(1.0),
        1,
        false,
        seeds(),
    );

    assert!(result.is_ok(), "33 ids over 48 available cells must not collide");
}

#[test]
fn cfasv_rejects_a_colliding_mapping() {
    let group = ffd_group(&[0, 48]);

    let result = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Cfasv,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        16,
        SimTime::from_secs_f64(1.0),
        1,
        false,
        seeds(),
    );

    assert!(result.is_err(), "ids 0 and 48 both hash to cell 0 mod 16 and must collide");
}

#[test]
fn ecv_falls_back_when_sensing_exhausts_the_grid() {
    let props = NodeGroupProperties::new(250_000, (20.0, 20.0)).unwrap();
    let mut group = NodeGroup::with_mac_seed(props, Some(5));
    group
        .add_pan_coordinator(NodeId::new(0), (10.0, 10.0), 20, -100, SimTime::ZERO, SimTime::from_micros(200))
        .unwrap();
    for id in 1..16u64 {
        group
            .add_node(
                NodeId::new(id),
                (10.0 + id as f64 * 0.1, 10.0),
                false,
                NodeType::Ffd,
                20,
                -100,
                SimTime::ZERO,
                SimTime::from_micros(200),
                None,
            )
            .unwrap();
    }

    let mut sim = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Ecv,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        16,
        SimTime::from_secs_f64(1.0),
        1,
        false,
        seeds(),
    )
    .unwrap();

    sim.execute();
    assert!(sim.unjoined_nodes().next().is_none());
    for id in 1..16u64 {
        let cells = sim.allocated_cells(NodeId::new(id));
        assert!(!cells.is_empty(), "FFD {id} never found an advertisement cell");
    }
}

#[test]
fn rejoining_under_ech_reports_sensing_statistics() {
    let props = NodeGroupProperties::new(250_000, (20.0, 20.0)).unwrap();
    let mut group = NodeGroup::with_mac_seed(props, Some(6));
    group
        .add_pan_coordinator(NodeId::new(0), (10.0, 10.0), 20, -100, SimTime::ZERO, SimTime::from_micros(200))
        .unwrap();
    group
        .add_node(
            NodeId::new(1),
            (10.0, 10.0),
            false,
            NodeType::Ffd,
            20,
            -100,
            SimTime::ZERO,
            SimTime::from_micros(200),
            None,
        )
        .unwrap();

    let mut sim = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Ech,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        16,
        SimTime::from_secs_f64(1.0),
        1,
        false,
        seeds(),
    )
    .unwrap();

    sim.execute();
    let outcome = sim.rejoining_attempt(NodeId::new(1), SimTime::from_micros(50_000)).unwrap();

    match outcome {
        RejoinOutcome::WithSensing {
            joining_time,
            eb_scheduling_delay,
            num_adv_slots_sensed,
        } => {
            assert!(joining_time >= SimTime::ZERO);
            assert!(eb_scheduling_delay >= SimTime::ZERO);
            assert!(num_adv_slots_sensed >= 1);
        }
        RejoinOutcome::JoiningTime(_) => panic!("ECH FFDs must report sensing statistics on rejoin"),
    }
}

#[test]
fn single_node_group_converges_immediately() {
    let props = NodeGroupProperties::new(250_000, (10.0, 10.0)).unwrap();
    let mut group = NodeGroup::with_mac_seed(props, Some(7));
    group
        .add_pan_coordinator(NodeId::new(0), (0.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
        .unwrap();

    let mut sim = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Minimal6TiSch,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        16,
        SimTime::from_secs_f64(1.0),
        1,
        false,
        seeds(),
    )
    .unwrap();

    let (formation_time, _energy) = sim.execute();

    // With only the PAN coordinator, formation completes in the very first
    // advertisement subslot: boot_time + macTsTxOffset + t_eb.
    let t_eb = SimTime::from_secs_f64((50.0 * 8.0 + 48.0) / 250_000.0);
    let expected = sim.node_group().node(NodeId::new(0)).unwrap().boot_time()
        + TimeslotTemplate::default_2450mhz().mac_ts_tx_offset
        + t_eb;
    assert_eq!(formation_time, expected);
    assert_eq!(sim.formation_asn(), Some(0));
}

#[test]
fn single_channel_minimal_6tisch_with_only_pan_coordinator_converges() {
    let props = NodeGroupProperties::new(250_000, (10.0, 10.0)).unwrap();
    let mut group = NodeGroup::with_mac_seed(props, Some(8));
    group
        .add_pan_coordinator(NodeId::new(0), (0.0, 0.0), 0, -100, SimTime::ZERO, SimTime::from_micros(200))
        .unwrap();

    let result = JoiningPhaseSimulator::new(
        group,
        EBSchedulingMethod::Minimal6TiSch,
        TimeslotTemplate::default_2450mhz(),
        101,
        50,
        1,
        SimTime::from_secs_f64(1.0),
        1,
        false,
        seeds(),
    );

    assert!(result.is_ok());
}
