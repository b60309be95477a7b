//! Bit counting primitives for the packed chromosome words.
//!
//! [`popcount`] and [`trailing_zeros`] lower to the hardware instructions where
//! the target has them. The `_portable` variants are the classic bit tricks and
//! exist so the two can be checked against each other.

/// Word type holding one bit per candidate variable.
pub type Part = u64;

/// Number of variables stored in one [`Part`].
pub const BITS_PER_PART: usize = Part::BITS as usize;

const M1: Part = 0x5555_5555_5555_5555; // 0101...
const M2: Part = 0x3333_3333_3333_3333; // 00110011...
const M4: Part = 0x0f0f_0f0f_0f0f_0f0f; // 00001111...
const H01: Part = 0x0101_0101_0101_0101; // sum of 256^0, 256^1, ...

/// Number of set bits in `x`.
#[inline]
pub fn popcount(x: Part) -> u32 {
    x.count_ones()
}

/// Number of set bits in `x`, without relying on a popcount instruction.
pub fn popcount_portable(mut x: Part) -> u32 {
    if x == 0 {
        return 0;
    }
    x -= (x >> 1) & M1;
    x = (x & M2) + ((x >> 2) & M2);
    x = (x + (x >> 4)) & M4;
    (x.wrapping_mul(H01) >> 56) as u32
}

/// Number of trailing zero bits in `x` (`64` for `x == 0`).
#[inline]
pub fn trailing_zeros(x: Part) -> u32 {
    x.trailing_zeros()
}

/// Number of trailing zero bits in `x` (`64` for `x == 0`), by binary search.
pub fn trailing_zeros_portable(mut x: Part) -> u32 {
    if x == 0 {
        return Part::BITS;
    }
    let mut n = 0;
    if x & 0xffff_ffff == 0 {
        n += 32;
        x >>= 32;
    }
    if x & 0xffff == 0 {
        n += 16;
        x >>= 16;
    }
    if x & 0xff == 0 {
        n += 8;
        x >>= 8;
    }
    if x & 0xf == 0 {
        n += 4;
        x >>= 4;
    }
    if x & 0x3 == 0 {
        n += 2;
        x >>= 2;
    }
    if x & 0x1 == 0 {
        n += 1;
    }
    n
}

/// Iterates over the positions of the set bits of `x`, lowest first.
pub fn set_bits(mut x: Part) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if x == 0 {
            return None;
        }
        let pos = trailing_zeros(x) as usize;
        x &= x - 1;
        Some(pos)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_edge_words() {
        for x in [0, 1, Part::MAX, 1 << 63, 0x8000_0000, M1, M2, M4, H01] {
            assert_eq!(popcount_portable(x), popcount(x), "popcount of {:#x}", x);
            assert_eq!(trailing_zeros_portable(x), trailing_zeros(x), "ctz of {:#x}", x);
        }
    }

    #[test]
    fn test_set_bits() {
        let positions: Vec<usize> = set_bits(0b1010_0001).collect();
        assert_eq!(positions, vec![0, 5, 7]);
        assert_eq!(set_bits(0).count(), 0);
        assert_eq!(set_bits(Part::MAX).count(), BITS_PER_PART);
    }

    proptest! {
        #[test]
        fn popcount_fallback_matches_intrinsic(x in any::<u64>()) {
            prop_assert_eq!(popcount_portable(x), popcount(x));
        }

        #[test]
        fn trailing_zeros_fallback_matches_intrinsic(x in any::<u64>()) {
            prop_assert_eq!(trailing_zeros_portable(x), trailing_zeros(x));
        }

        #[test]
        fn set_bits_agrees_with_popcount(x in any::<u64>()) {
            prop_assert_eq!(set_bits(x).count() as u32, popcount(x));
        }
    }
}
