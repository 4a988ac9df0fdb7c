//! Simulation time represented as signed integer nanoseconds.
//!
//! A plain `i64` count of nanoseconds is used instead of `std::time::Duration`
//! because clock-drift jitter and advertiser transmission jitter can legally
//! push a computed instant slightly negative relative to a reference point.
//! Keeping the representation integer (rather than `f64` seconds) avoids the
//! accumulated drift a long-running multi-slotframe simulation would
//! otherwise pick up.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Rem, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(i64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub const fn from_micros(us: i64) -> Self {
        Self(us * 1_000)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1_000_000_000.0).round() as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }
}

impl Add for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;
    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 - rhs.0)
    }
}

/// Scales a duration by a dimensionless factor (e.g. clock drift expressed
/// as a fraction), rounding to the nearest nanosecond.
impl Mul<f64> for SimTime {
    type Output = SimTime;
    fn mul(self, rhs: f64) -> SimTime {
        SimTime((self.0 as f64 * rhs).round() as i64)
    }
}

/// Integer division of two durations, as used for slot/subslot indexing
/// (e.g. `time_offset // mac_ts_timeslot_length`).
impl Div<SimTime> for SimTime {
    type Output = i64;
    fn div(self, rhs: SimTime) -> i64 {
        self.0.div_euclid(rhs.0)
    }
}

impl Rem<SimTime> for SimTime {
    type Output = SimTime;
    fn rem(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.rem_euclid(rhs.0))
    }
}

impl Mul<i64> for SimTime {
    type Output = SimTime;
    fn mul(self, rhs: i64) -> SimTime {
        SimTime(self.0 * rhs)
    }
}

impl Mul<u64> for SimTime {
    type Output = SimTime;
    fn mul(self, rhs: u64) -> SimTime {
        SimTime(self.0 * rhs as i64)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_convert_to_nanos() {
        assert_eq!(SimTime::from_micros(5).as_nanos(), 5_000);
    }

    #[test]
    fn division_truncates_toward_negative_infinity() {
        let a = SimTime::from_nanos(-1);
        let b = SimTime::from_nanos(10);
        assert_eq!(a / b, -1);
        assert_eq!(a % b, SimTime::from_nanos(9));
    }

    #[test]
    fn scaling_by_fraction_rounds_to_nearest_nanosecond() {
        let t = SimTime::from_nanos(1_000_000);
        assert_eq!((t * 0.5).as_nanos(), 500_000);
    }
}
