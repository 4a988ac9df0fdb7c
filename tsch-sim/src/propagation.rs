//! Signal propagation, frame capture, and the channel-hopping lookup used
//! to decide whether a candidate EB reaches a listening node.

use std::collections::VecDeque;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::hopping::channel_calculation;
use crate::time::SimTime;

/// An EB transmission as seen by a single listening node: when it would be
/// received, at what power, and on which channel offset it was sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateEb {
    pub rx_start_time: SimTime,
    pub rx_power_dbm: f64,
    pub tx_channel_offset: usize,
}

/// Reception power for a transmission over the given distance, per the
/// site-general path-loss model of ITU-R P.1238-9, with log-normal shadowing
/// truncated to ±11 dB.
pub fn rx_power(tx_power_dbm: i32, distance_m: f64, rng: &mut impl Rng) -> f64 {
    const FREQ_MHZ: f64 = 2400.0;
    const DISTANCE_POWER_LOSS_COEFFICIENT: f64 = 40.0;
    const FLOOR_PENETRATION_LOSS: f64 = 0.0; // nodes assumed to be on the same floor

    let ld0 = 20.0 * FREQ_MHZ.log10() - 28.0; // path loss at 1 m (LOS)
    let path_loss = ld0 + DISTANCE_POWER_LOSS_COEFFICIENT * distance_m.log10() + FLOOR_PENETRATION_LOSS;

    let shadowing = Normal::new(0.0, 4.0).expect("fixed shadowing parameters are always valid");
    let variance = loop {
        let v = shadowing.sample(rng);
        if (-11.0..=11.0).contains(&v) {
            break v;
        }
    };

    tx_power_dbm as f64 - path_loss + variance
}

fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

fn coin_flip_sign(rng: &mut impl Rng) -> f64 {
    if rng.gen::<bool>() {
        1.0
    } else {
        -1.0
    }
}

/// Context needed to resolve whether a joining node captures one of its
/// candidate EBs in the current advertisement subslot.
pub struct CaptureContext {
    pub num_channels: usize,
    pub t_eb: SimTime,
    pub data_rate_bps: u32,
    pub scan_duration: SimTime,
    pub channel_switching_time: SimTime,
    pub joining_node_boot_time: SimTime,
    pub scan_start_time: SimTime,
    pub asn: u64,
    pub ssn: Option<u64>,
}

fn add_interfering(interfering: &mut [VecDeque<CandidateEb>], interference_mw: &mut [f64], eb: CandidateEb) {
    interference_mw[eb.tx_channel_offset] += dbm_to_mw(eb.rx_power_dbm);
    interfering[eb.tx_channel_offset].push_back(eb);
}

fn settle_interfering(
    interfering: &mut [VecDeque<CandidateEb>],
    interference_mw: &mut [f64],
    ch_offset: usize,
    update_time: SimTime,
    t_eb: SimTime,
) {
    let mut still_active: Vec<CandidateEb> = interfering[ch_offset].drain(..).collect();
    still_active.sort_by_key(|eb| eb.rx_start_time);
    let mut queue: VecDeque<CandidateEb> = still_active.into();

    while let Some(front) = queue.front().copied() {
        if front.rx_start_time + t_eb >= update_time {
            break;
        }
        queue.pop_front();
        interference_mw[ch_offset] -= dbm_to_mw(front.rx_power_dbm);
    }

    if queue.is_empty() {
        interference_mw[ch_offset] = 0.0;
    }
    interfering[ch_offset] = queue;
}

/// Determines which (if any) of a joining node's candidate EBs it actually
/// captures, accounting for clock drift, the scan duty cycle, and the
/// frame-capture effect among colliding EBs on the same channel.
pub fn captured_eb(candidate_ebs: &[CandidateEb], ctx: &CaptureContext, rng: &mut impl Rng) -> Option<CandidateEb> {
    const CAPTURE_EFFECT_THRESHOLD_DB: f64 = 3.0;
    let shr_duration = SimTime::from_secs_f64(5.0 * 8.0 / ctx.data_rate_bps as f64);

    let mut ordered: Vec<CandidateEb> = candidate_ebs.to_vec();
    ordered.sort_by_key(|eb| eb.rx_start_time);

    let mut interfering_ebs: Vec<VecDeque<CandidateEb>> = (0..ctx.num_channels).map(|_| VecDeque::new()).collect();
    let mut interference_mw: Vec<f64> = vec![0.0; ctx.num_channels];
    let mut captured: Option<CandidateEb> = None;
    let mut frame_sync_end_time: Option<SimTime> = None;

    // Maximum deviation of a node's local clock from the network reference,
    // ±30 ppm (initial accuracy, temperature stability, aging).
    let node_clock_drift = rng.gen::<f64>() * coin_flip_sign(rng) * (30.0 / 1_000_000.0);

    let cycle = ctx.scan_duration + ctx.channel_switching_time;

    for candidate in ordered {
        if let Some(c) = captured {
            if c.rx_start_time + ctx.t_eb < candidate.rx_start_time {
                return Some(c);
            }
        }

        if ctx.joining_node_boot_time > candidate.rx_start_time {
            add_interfering(&mut interfering_ebs, &mut interference_mw, candidate);
            continue;
        }

        let eb_local_arrival_time = candidate.rx_start_time + candidate.rx_start_time * node_clock_drift;
        let phase = (eb_local_arrival_time - ctx.scan_start_time) % cycle;

        if ctx.scan_duration <= phase + ctx.t_eb {
            add_interfering(&mut interfering_ebs, &mut interference_mw, candidate);
            continue;
        }

        let acn = (eb_local_arrival_time - ctx.scan_start_time) / cycle;
        let listening_channel = acn.rem_euclid(ctx.num_channels as i64) as usize;
        let target_channel = channel_calculation(candidate.tx_channel_offset, ctx.asn, ctx.ssn, ctx.num_channels);

        if listening_channel != target_channel {
            add_interfering(&mut interfering_ebs, &mut interference_mw, candidate);
            continue;
        }

        settle_interfering(
            &mut interfering_ebs,
            &mut interference_mw,
            candidate.tx_channel_offset,
            candidate.rx_start_time,
            ctx.t_eb,
        );

        match captured {
            None => {
                if interference_mw[candidate.tx_channel_offset] == 0.0 {
                    captured = Some(candidate);
                    frame_sync_end_time = Some(candidate.rx_start_time + shr_duration);
                } else if frame_sync_end_time.is_some_and(|t| t < candidate.rx_start_time)
                    || candidate.rx_power_dbm - mw_to_dbm(interference_mw[candidate.tx_channel_offset])
                        < CAPTURE_EFFECT_THRESHOLD_DB
                {
                    add_interfering(&mut interfering_ebs, &mut interference_mw, candidate);
                } else {
                    captured = Some(candidate);
                    if frame_sync_end_time.is_none() {
                        frame_sync_end_time = Some(candidate.rx_start_time + shr_duration);
                    }
                }
            }
            Some(current) => {
                let combined_interference_mw =
                    interference_mw[current.tx_channel_offset] + dbm_to_mw(candidate.rx_power_dbm);
                if current.rx_power_dbm - mw_to_dbm(combined_interference_mw) < CAPTURE_EFFECT_THRESHOLD_DB {
                    add_interfering(&mut interfering_ebs, &mut interference_mw, current);
                    captured = None;

                    let fse = frame_sync_end_time.expect("set when a capture was first made");
                    if fse < candidate.rx_start_time
                        || candidate.rx_power_dbm - mw_to_dbm(interference_mw[candidate.tx_channel_offset])
                            < CAPTURE_EFFECT_THRESHOLD_DB
                    {
                        add_interfering(&mut interfering_ebs, &mut interference_mw, candidate);
                    } else {
                        captured = Some(candidate);
                    }
                }
                // Otherwise the existing capture survives and the candidate is dropped.
            }
        }
    }

    captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rx_power_decreases_with_distance() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let near = rx_power(0, 1.0, &mut rng);
        let far = rx_power(0, 60.0, &mut rng);
        assert!(near > far);
    }

    #[test]
    fn no_candidates_means_nothing_captured() {
        let ctx = CaptureContext {
            num_channels: 16,
            t_eb: SimTime::from_micros(500),
            data_rate_bps: 250_000,
            scan_duration: SimTime::from_secs_f64(1.0),
            channel_switching_time: SimTime::from_micros(200),
            joining_node_boot_time: SimTime::ZERO,
            scan_start_time: SimTime::ZERO,
            asn: 0,
            ssn: None,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(captured_eb(&[], &ctx, &mut rng).is_none());
    }

    #[test]
    fn lone_reachable_candidate_is_captured() {
        let ctx = CaptureContext {
            num_channels: 1,
            t_eb: SimTime::from_micros(500),
            data_rate_bps: 250_000,
            scan_duration: SimTime::from_secs_f64(10.0),
            channel_switching_time: SimTime::from_micros(200),
            joining_node_boot_time: SimTime::ZERO,
            scan_start_time: SimTime::ZERO,
            asn: 0,
            ssn: None,
        };
        let candidates = [CandidateEb {
            rx_start_time: SimTime::from_secs_f64(0.01),
            rx_power_dbm: -50.0,
            tx_channel_offset: 0,
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(captured_eb(&candidates, &ctx, &mut rng), Some(candidates[0]));
    }
}
