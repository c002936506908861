//! SIMD lane-group blocks built on the `wide` crate.
//!
//! A [`SimdBlock`] packs `LANES` scalar words into one vector register so a
//! single AND updates the accumulators of `LANES` documents at once. Lane `d`
//! always belongs to document `d` of the batch; within a lane the bit layout
//! is the same little-endian leaf numbering as the scalar [`Block`]s.
//!
//! `wide` compiles every width on every target (with a scalar fallback on
//! hosts without the matching vector extension), so all of the groups below
//! are available unconditionally. The 512-bit groups are modeled as two
//! 256-bit halves.

use wide::{i8x32, u16x16, u16x8, u32x8, u64x4, u8x16};

use super::Block;

/// A group of `LANES` scalar lanes updated in lockstep, one document per lane.
pub trait SimdBlock: Copy + Send + Sync + std::fmt::Debug + 'static {
    /// Scalar word type of one lane.
    type Lane: Block;

    /// Documents per group.
    const LANES: usize;

    /// Broadcast one scalar word to every lane.
    fn splat(lane: Self::Lane) -> Self;

    /// Build a group lane by lane.
    fn from_fn(f: impl FnMut(usize) -> Self::Lane) -> Self;

    fn and(self, other: Self) -> Self;

    /// Extract lane `i`.
    fn lane(&self, i: usize) -> Self::Lane;

    /// Index of the lowest set bit across the whole group, treating lane 0
    /// as bits `0..W'`, lane 1 as `W'..2W'` and so on. `None` when every
    /// lane is zero.
    fn lowest_set_bit(&self) -> Option<u32> {
        for i in 0..Self::LANES {
            let lane = self.lane(i);
            if !lane.is_zero() {
                return Some(i as u32 * <Self::Lane as Block>::BITS + lane.trailing_zeros());
            }
        }
        None
    }
}

macro_rules! simd_block_single {
    ($(#[$doc:meta])* $name:ident, $vec:ty, $elem:ty, $lane:ty, $lanes:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name($vec);

        impl SimdBlock for $name {
            type Lane = $lane;
            const LANES: usize = $lanes;

            #[inline]
            fn splat(lane: $lane) -> Self {
                Self(<$vec>::splat(lane as $elem))
            }

            #[inline]
            fn from_fn(mut f: impl FnMut(usize) -> $lane) -> Self {
                let mut lanes = [0 as $elem; $lanes];
                for (i, slot) in lanes.iter_mut().enumerate() {
                    *slot = f(i) as $elem;
                }
                Self(<$vec>::from(lanes))
            }

            #[inline]
            fn and(self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            #[inline]
            fn lane(&self, i: usize) -> $lane {
                self.0.to_array()[i] as $lane
            }
        }
    };
}

macro_rules! simd_block_pair {
    ($(#[$doc:meta])* $name:ident, $vec:ty, $elem:ty, $lane:ty, $half:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name($vec, $vec);

        impl SimdBlock for $name {
            type Lane = $lane;
            const LANES: usize = 2 * $half;

            #[inline]
            fn splat(lane: $lane) -> Self {
                let v = <$vec>::splat(lane as $elem);
                Self(v, v)
            }

            #[inline]
            fn from_fn(mut f: impl FnMut(usize) -> $lane) -> Self {
                let mut lo = [0 as $elem; $half];
                let mut hi = [0 as $elem; $half];
                for (i, slot) in lo.iter_mut().enumerate() {
                    *slot = f(i) as $elem;
                }
                for (i, slot) in hi.iter_mut().enumerate() {
                    *slot = f($half + i) as $elem;
                }
                Self(<$vec>::from(lo), <$vec>::from(hi))
            }

            #[inline]
            fn and(self, other: Self) -> Self {
                Self(self.0 & other.0, self.1 & other.1)
            }

            #[inline]
            fn lane(&self, i: usize) -> $lane {
                if i < $half {
                    self.0.to_array()[i] as $lane
                } else {
                    self.1.to_array()[i - $half] as $lane
                }
            }
        }
    };
}

simd_block_single!(
    /// 128-bit group of 16 × u8 lanes.
    Simd128x8, u8x16, u8, u8, 16
);
simd_block_single!(
    /// 128-bit group of 8 × u16 lanes.
    Simd128x16, u16x8, u16, u16, 8
);
simd_block_single!(
    /// 256-bit group of 32 × u8 lanes.
    Simd256x8, i8x32, i8, u8, 32
);
simd_block_single!(
    /// 256-bit group of 16 × u16 lanes.
    Simd256x16, u16x16, u16, u16, 16
);
simd_block_single!(
    /// 256-bit group of 8 × u32 lanes.
    Simd256x32, u32x8, u32, u32, 8
);
simd_block_pair!(
    /// 512-bit group of 64 × u8 lanes.
    Simd512x8, i8x32, i8, u8, 32
);
simd_block_pair!(
    /// 512-bit group of 32 × u16 lanes.
    Simd512x16, u16x16, u16, u16, 16
);
simd_block_pair!(
    /// 512-bit group of 16 × u32 lanes.
    Simd512x32, u32x8, u32, u32, 8
);
simd_block_pair!(
    /// 512-bit group of 8 × u64 lanes.
    Simd512x64, u64x4, u64, u64, 4
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splat_fills_every_lane() {
        let g = Simd256x32::splat(0xDEAD_BEEF);
        for i in 0..Simd256x32::LANES {
            assert_eq!(g.lane(i), 0xDEAD_BEEF);
        }
    }

    #[test]
    fn and_is_elementwise() {
        let a = Simd128x16::from_fn(|i| (i as u16 + 1) * 0x0101);
        let b = Simd128x16::splat(0x00FF);
        let c = a.and(b);
        for i in 0..Simd128x16::LANES {
            assert_eq!(c.lane(i), ((i as u16 + 1) * 0x0101) & 0x00FF);
        }
    }

    #[test]
    fn pair_lanes_are_ordered() {
        let g = Simd512x64::from_fn(|i| i as u64);
        for i in 0..Simd512x64::LANES {
            assert_eq!(g.lane(i), i as u64);
        }
    }

    #[test]
    fn lowest_set_bit_combines_lane_and_offset() {
        // Lane 2 of 8 × u32 holds bit 5: group index 2*32 + 5.
        let g = Simd256x32::from_fn(|i| if i == 2 { 1 << 5 } else { 0 });
        assert_eq!(g.lowest_set_bit(), Some(69));

        // The lowest nonzero lane wins.
        let g = Simd256x8::from_fn(|i| if i >= 3 { 0x80 } else { 0 });
        assert_eq!(g.lowest_set_bit(), Some(3 * 8 + 7));

        let zero = Simd128x8::splat(0);
        assert_eq!(zero.lowest_set_bit(), None);
    }

    #[test]
    fn signed_backed_group_keeps_high_bits() {
        // i8x32 storage must round-trip u8 lanes with the top bit set.
        let g = Simd256x8::splat(0xAB);
        for i in 0..Simd256x8::LANES {
            assert_eq!(g.lane(i), 0xAB);
        }
        assert_eq!(g.lowest_set_bit(), Some(0));
    }
}
