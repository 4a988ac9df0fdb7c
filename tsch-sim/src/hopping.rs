//! The TSCH channel-hopping function.

/// Maps an advertisement cell to the physical channel it uses at a given
/// Absolute Slot Number, per the standard's channel-hopping function.
///
/// When subslots are in use (`ssn` is `Some`), the serial subslot number is
/// folded in as well so that distinct subslots within the same slot still
/// hop independently.
pub fn channel_calculation(ch_offset: usize, asn: u64, ssn: Option<u64>, num_channels: usize) -> usize {
    let base = asn.wrapping_add(ssn.unwrap_or(0)).wrapping_add(ch_offset as u64);
    (base % num_channels as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_around_channel_count() {
        assert_eq!(channel_calculation(0, 16, None, 16), 0);
        assert_eq!(channel_calculation(1, 16, None, 16), 1);
        assert_eq!(channel_calculation(15, 16, None, 16), 15);
        assert_eq!(channel_calculation(0, 17, None, 16), 1);
    }

    #[test]
    fn folds_in_subslot_serial_number() {
        assert_eq!(channel_calculation(0, 1, Some(2), 16), 3);
    }
}
