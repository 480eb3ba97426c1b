//! Packet bit interleaving.
//!
//! The transmitter spreads each packet's bits across its byte lanes: bit
//! `i` of the packet is sent as bit `i / lanes` of lane `i % lanes`. The
//! receiver undoes this by cycling through the lanes, pulling one bit from
//! each in turn and rotating it into the output.

/// Restores packet bit order in place.
///
/// `bits` is the packet length; one extra bit past it is consumed so the
/// final output byte is rotated all the way into place.
pub fn deinterleave(packet: &mut [u8], bits: usize) {
    let lanes = packet.len();
    if lanes == 0 {
        return;
    }
    let mut source = packet.to_vec();
    let mut lane = 0;

    for i in 0..=bits.min(lanes * 8 - 1) {
        let c = i >> 3;
        packet[c] = (packet[c] >> 1) | (source[lane] << 7);
        source[lane] >>= 1;

        lane += 1;
        if lane == lanes {
            lane = 0;
        }
    }
}

/// Transmitter-side interleave, the inverse of [`deinterleave`] when
/// `packet.len() * 8 == bits + 1`.
pub fn interleave(packet: &[u8], bits: usize) -> Vec<u8> {
    let lanes = packet.len();
    let mut out = vec![0u8; lanes];
    if lanes == 0 {
        return out;
    }

    for i in 0..=bits.min(lanes * 8 - 1) {
        let bit = (packet[i >> 3] >> (i & 7)) & 1;
        let j = (i % lanes) * 8 + i / lanes;
        out[j >> 3] |= bit << (j & 7);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LANES: usize = 94;
    const BITS: usize = 751;

    fn single_bit(index: usize) -> Vec<u8> {
        let mut packet = vec![0u8; LANES];
        packet[index >> 3] |= 1 << (index & 7);
        packet
    }

    fn set_bits(packet: &[u8]) -> Vec<usize> {
        (0..packet.len() * 8)
            .filter(|&i| packet[i >> 3] >> (i & 7) & 1 == 1)
            .collect()
    }

    #[test]
    fn test_first_bit_stays_first() {
        let mut packet = single_bit(0);
        deinterleave(&mut packet, BITS);
        assert_eq!(set_bits(&packet), vec![0]);
    }

    #[test]
    fn test_lane_zero_bits_spread_by_lane_count() {
        // Bit 1 of lane 0 is the second bit pulled from that lane.
        let mut packet = single_bit(1);
        deinterleave(&mut packet, BITS);
        assert_eq!(set_bits(&packet), vec![94]);
    }

    #[test]
    fn test_next_lane_is_next_bit() {
        // Bit 0 of lane 1 is pulled second.
        let mut packet = single_bit(8);
        deinterleave(&mut packet, BITS);
        assert_eq!(set_bits(&packet), vec![1]);
    }

    #[test]
    fn test_last_lane_top_bit_is_last() {
        let mut packet = single_bit(93 * 8 + 7);
        deinterleave(&mut packet, BITS);
        assert_eq!(set_bits(&packet), vec![751]);
    }

    #[test]
    fn test_interleave_places_bit_in_lane() {
        let packet = interleave(&single_bit(95), BITS);
        // 95 = lane 1, second pass
        assert_eq!(set_bits(&packet), vec![8 + 1]);
    }

    #[test]
    fn test_all_ones_unchanged() {
        let mut packet = vec![0xFFu8; LANES];
        deinterleave(&mut packet, BITS);
        assert!(packet.iter().all(|&b| b == 0xFF));
    }

    proptest! {
        #[test]
        fn test_deinterleave_undoes_interleave(packet in proptest::collection::vec(any::<u8>(), LANES)) {
            let mut sent = interleave(&packet, BITS);
            deinterleave(&mut sent, BITS);
            prop_assert_eq!(sent, packet);
        }

        #[test]
        fn test_deinterleave_preserves_popcount(packet in proptest::collection::vec(any::<u8>(), LANES)) {
            let ones: u32 = packet.iter().map(|b| b.count_ones()).sum();
            let mut out = packet.clone();
            deinterleave(&mut out, BITS);
            prop_assert_eq!(out.iter().map(|b| b.count_ones()).sum::<u32>(), ones);
        }
    }
}
