//! TSCH timeslot template, per IEEE Std 802.15.4-2015.

use crate::error::{Result, SimError};
use crate::time::SimTime;

/// Raw attribute values (in microseconds) used to build a [`TimeslotTemplate`].
///
/// Mirrors the twelve `macTs*` MAC PIB attributes defined by the standard;
/// every field must fit in `0..=65535`, the range the standard specifies for
/// these attributes.
#[derive(Debug, Clone, Copy)]
pub struct TimeslotTemplateConfig {
    pub mac_ts_cca_offset: u16,
    pub mac_ts_cca: u16,
    pub mac_ts_tx_offset: u16,
    pub mac_ts_rx_offset: u16,
    pub mac_ts_rx_ack_delay: u16,
    pub mac_ts_tx_ack_delay: u16,
    pub mac_ts_rx_wait: u16,
    pub mac_ts_rx_tx: u16,
    pub mac_ts_max_ack: u16,
    pub mac_ts_max_tx: u16,
    pub mac_ts_timeslot_length: u16,
    pub mac_ts_ack_wait: u16,
}

/// A validated TSCH timeslot template.
///
/// All durations are in nanoseconds internally ([`SimTime`]), built from the
/// microsecond attributes of a [`TimeslotTemplateConfig`].
#[derive(Debug, Clone, Copy)]
pub struct TimeslotTemplate {
    pub mac_ts_cca_offset: SimTime,
    pub mac_ts_cca: SimTime,
    pub mac_ts_tx_offset: SimTime,
    pub mac_ts_rx_offset: SimTime,
    pub mac_ts_rx_ack_delay: SimTime,
    pub mac_ts_tx_ack_delay: SimTime,
    pub mac_ts_rx_wait: SimTime,
    pub mac_ts_rx_tx: SimTime,
    pub mac_ts_max_ack: SimTime,
    pub mac_ts_max_tx: SimTime,
    pub mac_ts_timeslot_length: SimTime,
    pub mac_ts_ack_wait: SimTime,
}

impl TimeslotTemplate {
    /// Validates a configuration and builds a [`TimeslotTemplate`] from it.
    ///
    /// Checks the cross-attribute invariants the standard implies (tx offset
    /// derived from CCA offset/CCA/turnaround, symmetric rx window around tx
    /// offset, ack timing ordering, and that transmission plus
    /// acknowledgment always fits inside the timeslot).
    pub fn new(cfg: TimeslotTemplateConfig) -> Result<Self> {
        let us = |v: u16| SimTime::from_micros(v as i64);

        let t = TimeslotTemplate {
            mac_ts_cca_offset: us(cfg.mac_ts_cca_offset),
            mac_ts_cca: us(cfg.mac_ts_cca),
            mac_ts_tx_offset: us(cfg.mac_ts_tx_offset),
            mac_ts_rx_offset: us(cfg.mac_ts_rx_offset),
            mac_ts_rx_ack_delay: us(cfg.mac_ts_rx_ack_delay),
            mac_ts_tx_ack_delay: us(cfg.mac_ts_tx_ack_delay),
            mac_ts_rx_wait: us(cfg.mac_ts_rx_wait),
            mac_ts_rx_tx: us(cfg.mac_ts_rx_tx),
            mac_ts_max_ack: us(cfg.mac_ts_max_ack),
            mac_ts_max_tx: us(cfg.mac_ts_max_tx),
            mac_ts_timeslot_length: us(cfg.mac_ts_timeslot_length),
            mac_ts_ack_wait: us(cfg.mac_ts_ack_wait),
        };

        let half = |d: SimTime| d * 0.5;

        let invalid = t.mac_ts_tx_offset != t.mac_ts_cca_offset + t.mac_ts_cca + t.mac_ts_rx_tx
            || t.mac_ts_tx_offset != t.mac_ts_rx_offset + half(t.mac_ts_rx_wait)
            || t.mac_ts_rx_ack_delay > t.mac_ts_tx_ack_delay
            || t.mac_ts_rx_ack_delay + t.mac_ts_ack_wait <= t.mac_ts_tx_ack_delay
            || t.mac_ts_tx_offset + t.mac_ts_max_tx + t.mac_ts_rx_ack_delay + t.mac_ts_ack_wait
                > t.mac_ts_timeslot_length
            || t.mac_ts_tx_offset + t.mac_ts_max_tx + t.mac_ts_tx_ack_delay + t.mac_ts_max_ack
                > t.mac_ts_timeslot_length
            || t.mac_ts_rx_offset + t.mac_ts_rx_wait + t.mac_ts_max_tx + t.mac_ts_tx_ack_delay + t.mac_ts_max_ack
                > t.mac_ts_timeslot_length + t.mac_ts_cca_offset
            || half(t.mac_ts_rx_wait)
                > t.mac_ts_rx_offset + t.mac_ts_timeslot_length
                    - t.mac_ts_tx_offset
                    - t.mac_ts_max_tx
                    - t.mac_ts_tx_ack_delay
                    - t.mac_ts_max_ack;

        if invalid {
            return Err(SimError::InvalidConfiguration(
                "the timeslot template is not valid".into(),
            ));
        }

        Ok(t)
    }

    /// The default timeslot template for the 2450 MHz band, as given in
    /// IEEE Std 802.15.4-2015.
    pub fn default_2450mhz() -> Self {
        Self::new(TimeslotTemplateConfig {
            mac_ts_cca_offset: 1800,
            mac_ts_cca: 128,
            mac_ts_tx_offset: 2120,
            mac_ts_rx_offset: 1020,
            mac_ts_rx_ack_delay: 800,
            mac_ts_tx_ack_delay: 1000,
            mac_ts_rx_wait: 2200,
            mac_ts_rx_tx: 192,
            mac_ts_max_ack: 2400,
            mac_ts_max_tx: 4256,
            mac_ts_timeslot_length: 10000,
            mac_ts_ack_wait: 400,
        })
        .expect("the built-in 2450 MHz template is internally consistent")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_2450mhz_template_is_valid() {
        let t = TimeslotTemplate::default_2450mhz();
        assert_eq!(t.mac_ts_timeslot_length, SimTime::from_micros(10000));
    }

    #[test]
    fn inconsistent_tx_offset_is_rejected() {
        let mut cfg = default_cfg();
        cfg.mac_ts_tx_offset = 0;
        assert!(TimeslotTemplate::new(cfg).is_err());
    }

    #[test]
    fn ack_window_ordering_is_checked() {
        let mut cfg = default_cfg();
        cfg.mac_ts_rx_ack_delay = cfg.mac_ts_tx_ack_delay + 1;
        assert!(TimeslotTemplate::new(cfg).is_err());
    }

    fn default_cfg() -> TimeslotTemplateConfig {
        TimeslotTemplateConfig {
            mac_ts_cca_offset: 1800,
            mac_ts_cca: 128,
            mac_ts_tx_offset: 2120,
            mac_ts_rx_offset: 1020,
            mac_ts_rx_ack_delay: 800,
            mac_ts_tx_ack_delay: 1000,
            mac_ts_rx_wait: 2200,
            mac_ts_rx_tx: 192,
            mac_ts_max_ack: 2400,
            mac_ts_max_tx: 4256,
            mac_ts_timeslot_length: 10000,
            mac_ts_ack_wait: 400,
        }
    }
}
