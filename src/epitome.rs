//! Run-length encoded exit masks over a tree's leaves.

use crate::block::{low_ones, ones_below, ones_outside, Block};

/// The exit mask of one split node, over the leaves of its tree.
///
/// Semantically this is a bitset of the tree's (block-rounded) leaf count
/// with a single contiguous run of zeros: ones on
/// `[0, leaves_before) ∪ [leaves_before + zero_run, total)`, zeros in
/// between. The zero run covers the leaves of the node's left subtree, the
/// ones that become unreachable once the node's split fails.
///
/// Only the two edge blocks of the run are stored. Every block strictly
/// between them is all-zero and every block outside the run is all-ones, so
/// the pair `(first_block, last_block)` plus two masks reproduces the whole
/// bitset exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epitome<B: Block> {
    first_block: u32,
    last_block: u32,
    first_mask: B,
    last_mask: B,
}

impl<B: Block> Epitome<B> {
    /// Mask with zeros on leaf positions `[leaves_before, leaves_before +
    /// zero_run)`. `zero_run` must be at least 1 (a split node always hides
    /// at least one leaf).
    pub fn new(leaves_before: u32, zero_run: u32) -> Self {
        debug_assert!(zero_run >= 1, "a split node masks at least one leaf");
        let start = leaves_before;
        let end = leaves_before + zero_run;

        let first_block = start / B::BITS;
        let last_block = (end - 1) / B::BITS;
        let lo = start % B::BITS;
        let hi = end - last_block * B::BITS;

        if first_block == last_block {
            let mask = ones_outside::<B>(lo, hi);
            Self {
                first_block,
                last_block,
                first_mask: mask,
                last_mask: mask,
            }
        } else {
            Self {
                first_block,
                last_block,
                // Zeros reach the top of the first block and restart at the
                // bottom of the last one.
                first_mask: low_ones::<B>(lo),
                last_mask: B::from_u64(ones_below(B::BITS) & !ones_below(hi)),
            }
        }
    }

    /// Block index holding the first zero bit.
    #[inline]
    pub fn first_block(&self) -> u32 {
        self.first_block
    }

    /// Block index holding the last zero bit.
    #[inline]
    pub fn last_block(&self) -> u32 {
        self.last_block
    }

    #[inline]
    pub fn first_mask(&self) -> B {
        self.first_mask
    }

    #[inline]
    pub fn last_mask(&self) -> B {
        self.last_mask
    }

    /// The full block value at `index`, reconstructing the implicit parts:
    /// all-ones outside `[first_block, last_block]`, all-zero strictly
    /// inside.
    pub fn block(&self, index: u32) -> B {
        if index < self.first_block || index > self.last_block {
            B::ONES
        } else if index == self.first_block {
            self.first_mask
        } else if index == self.last_block {
            self.last_mask
        } else {
            B::ZERO
        }
    }
}
