//! Per-tree accumulators for the AND-reduction of applied epitomes.

use crate::block::{low_ones, Block, SimdBlock};
use crate::config::Config;
use crate::epitome::Epitome;
use crate::repr::Forest;
use crate::utils::Parallelism;

/// Trees per partition of the final weight reduction.
///
/// Partial sums are always taken over these fixed ranges and added in
/// ascending tree order, so the reduction result is bit-identical across
/// thread counts and parallelism flags.
const FOREST_PARTITION: usize = 256;

/// Block offsets and the initial accumulator image for one forest at one
/// block width. Built once per scorer, shared by every `score` call.
#[derive(Debug, Clone)]
pub struct MaskLayout<B: Block> {
    /// Per-tree block offsets (length `n_trees + 1`).
    offsets: Box<[usize]>,
    /// All-ones template. Trailing bits of each tree's last block that lie
    /// past the leaf count are cleared here, so the lowest set bit can
    /// never land on a dead position.
    template: Box<[B]>,
}

impl<B: Block> MaskLayout<B> {
    pub fn new(forest: &Forest) -> Self {
        let mut offsets = Vec::with_capacity(forest.n_trees() + 1);
        let mut template: Vec<B> = Vec::new();
        offsets.push(0);
        for tree in forest.trees() {
            let leaves = tree.n_leaves();
            let n_blocks = leaves.div_ceil(B::BITS) as usize;
            template.extend(std::iter::repeat(B::ONES).take(n_blocks));
            let rem = leaves % B::BITS;
            if rem != 0 {
                if let Some(last) = template.last_mut() {
                    *last = low_ones::<B>(rem);
                }
            }
            offsets.push(template.len());
        }
        Self {
            offsets: offsets.into_boxed_slice(),
            template: template.into_boxed_slice(),
        }
    }

    #[inline]
    fn span(&self, tree: usize) -> (usize, usize) {
        (self.offsets[tree], self.offsets[tree + 1])
    }
}

/// Running AND of every epitome applied for one document.
///
/// Starts from the layout template (all leaves alive) and narrows with each
/// [`apply`](ResultMask::apply); once every violated split has been folded
/// in, the lowest set bit of a tree's span is the leaf that document
/// reaches.
#[derive(Debug)]
pub struct ResultMask<'a, B: Block> {
    layout: &'a MaskLayout<B>,
    blocks: Vec<B>,
}

impl<'a, B: Block> ResultMask<'a, B> {
    pub fn new(layout: &'a MaskLayout<B>) -> Self {
        Self {
            layout,
            blocks: layout.template.to_vec(),
        }
    }

    /// AND an epitome into the accumulator of `tree`.
    ///
    /// Only the two edge blocks carry information; interior blocks of the
    /// run force the accumulator to zero whatever its current state.
    pub fn apply(&mut self, epitome: &Epitome<B>, tree: usize) {
        let base = self.layout.offsets[tree];
        let first = base + epitome.first_block() as usize;
        let last = base + epitome.last_block() as usize;
        self.blocks[first] = self.blocks[first].and(epitome.first_mask());
        if last > first {
            for block in &mut self.blocks[first + 1..last] {
                *block = B::ZERO;
            }
            self.blocks[last] = self.blocks[last].and(epitome.last_mask());
        }
    }

    /// AND-combine a partial mask produced by another worker over a
    /// disjoint feature range.
    pub fn combine(&mut self, other: &ResultMask<'_, B>) {
        debug_assert_eq!(self.blocks.len(), other.blocks.len());
        for (mine, &theirs) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            *mine = mine.and(theirs);
        }
    }

    /// DFS index of the surviving leaf of `tree`.
    pub fn leaf_index(&self, tree: usize) -> u32 {
        let (start, end) = self.layout.span(tree);
        for (i, block) in self.blocks[start..end].iter().enumerate() {
            if !block.is_zero() {
                return i as u32 * B::BITS + block.trailing_zeros();
            }
        }
        unreachable!("every document reaches a leaf in every tree")
    }

    /// Sum the surviving leaf weights over all trees.
    pub fn compute_score(&self, forest: &Forest, config: &Config) -> f64 {
        sum_leaf_weights(forest, config, |tree| self.leaf_index(tree))
    }
}

/// Lane-grouped accumulator: lane `d` of every block carries document `d`'s
/// bits, so one AND advances the whole batch.
#[derive(Debug)]
pub struct SimdResultMask<'a, V: SimdBlock> {
    layout: &'a MaskLayout<V::Lane>,
    blocks: Vec<V>,
}

impl<'a, V: SimdBlock> SimdResultMask<'a, V> {
    pub fn new(layout: &'a MaskLayout<V::Lane>) -> Self {
        Self {
            layout,
            blocks: layout.template.iter().map(|&b| V::splat(b)).collect(),
        }
    }

    /// AND an epitome into the accumulator of `tree`, in exactly the lanes
    /// the predicate selects; other lanes are untouched.
    pub fn apply_lanes(
        &mut self,
        epitome: &Epitome<V::Lane>,
        tree: usize,
        applies: impl Fn(usize) -> bool,
    ) {
        let base = self.layout.offsets[tree];
        let first = base + epitome.first_block() as usize;
        let last = base + epitome.last_block() as usize;

        let first_mask = V::from_fn(|d| {
            if applies(d) {
                epitome.first_mask()
            } else {
                <V::Lane as Block>::ONES
            }
        });
        self.blocks[first] = self.blocks[first].and(first_mask);

        if last > first {
            let interior = V::from_fn(|d| {
                if applies(d) {
                    <V::Lane as Block>::ZERO
                } else {
                    <V::Lane as Block>::ONES
                }
            });
            for block in &mut self.blocks[first + 1..last] {
                *block = block.and(interior);
            }
            let last_mask = V::from_fn(|d| {
                if applies(d) {
                    epitome.last_mask()
                } else {
                    <V::Lane as Block>::ONES
                }
            });
            self.blocks[last] = self.blocks[last].and(last_mask);
        }
    }

    /// DFS index of the surviving leaf of `tree` for the document in `lane`.
    pub fn leaf_index(&self, tree: usize, lane: usize) -> u32 {
        let (start, end) = self.layout.span(tree);
        for (i, block) in self.blocks[start..end].iter().enumerate() {
            let word = block.lane(lane);
            if !word.is_zero() {
                return i as u32 * <V::Lane as Block>::BITS + word.trailing_zeros();
            }
        }
        unreachable!("every document reaches a leaf in every tree")
    }

    /// Sum the surviving leaf weights over all trees for one lane.
    pub fn compute_score(&self, forest: &Forest, config: &Config, lane: usize) -> f64 {
        sum_leaf_weights(forest, config, |tree| self.leaf_index(tree, lane))
    }
}

/// Weight reduction over fixed tree partitions, optionally parallel.
pub(crate) fn sum_leaf_weights(
    forest: &Forest,
    config: &Config,
    leaf_for_tree: impl Fn(usize) -> u32 + Sync,
) -> f64 {
    let n_trees = forest.n_trees();
    let n_chunks = n_trees.div_ceil(FOREST_PARTITION);
    let parallelism = if config.parallel_forest && config.n_threads > 1 {
        Parallelism::Parallel
    } else {
        Parallelism::Sequential
    };
    let partials = parallelism.maybe_par_map(0..n_chunks, |chunk| {
        let start = chunk * FOREST_PARTITION;
        let end = (start + FOREST_PARTITION).min(n_trees);
        let mut sum = 0.0;
        for tree in start..end {
            sum += forest.tree(tree).leaf_weight(leaf_for_tree(tree));
        }
        sum
    });
    partials.into_iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::simd::Simd128x8;
    use crate::repr::TreeBuilder;

    /// Depth-2 tree over features 0 and 1 with leaves [1.0, 2.0, 3.0, 4.0].
    fn depth2_forest() -> Forest {
        let mut b = TreeBuilder::new();
        b.add_split(0, 0.5, 1, 4);
        b.add_split(1, 0.5, 2, 3);
        b.add_leaf(1.0);
        b.add_leaf(2.0);
        b.add_split(1, 0.5, 5, 6);
        b.add_leaf(3.0);
        b.add_leaf(4.0);
        let mut forest = Forest::new();
        forest.push_tree(b.build().unwrap());
        forest
    }

    fn expand_bits<B: Block>(mask: &ResultMask<'_, B>, tree: usize, n_bits: u32) -> Vec<bool> {
        (0..n_bits)
            .map(|p| {
                let (start, _) = mask.layout.span(tree);
                let block = mask.blocks[start + (p / B::BITS) as usize];
                !block.and(B::from_u64(1u64 << (p % B::BITS))).is_zero()
            })
            .collect()
    }

    #[test]
    fn apply_zeroes_exactly_the_left_subtree() {
        let forest = depth2_forest();
        let tree = forest.tree(0);
        let layout = MaskLayout::<u8>::new(&forest);
        let mut mask = ResultMask::new(&layout);

        // Root's epitome hides the left subtree's two leaves.
        let epitome = Epitome::<u8>::new(tree.leaves_before(0), tree.subtree_leaves(1));
        mask.apply(&epitome, 0);

        assert_eq!(expand_bits(&mask, 0, 4), vec![false, false, true, true]);
    }

    #[test]
    fn leaf_index_recovers_traversal() {
        let forest = depth2_forest();
        let tree = forest.tree(0);
        let layout = MaskLayout::<u8>::new(&forest);

        for doc in [[0.2, 0.2], [0.2, 0.8], [0.8, 0.2], [0.8, 0.8]] {
            let mut mask = ResultMask::new(&layout);
            for node in 0..tree.n_nodes() as u32 {
                if tree.is_leaf(node) {
                    continue;
                }
                let value = doc[tree.split_index(node) as usize];
                if !(value <= tree.split_threshold(node)) {
                    let epitome = Epitome::<u8>::new(
                        tree.leaves_before(node),
                        tree.subtree_leaves(tree.left_child(node)),
                    );
                    mask.apply(&epitome, 0);
                }
            }
            assert_eq!(mask.leaf_index(0), tree.traverse(&doc));
        }
    }

    #[test]
    fn template_clears_dead_trailing_bits() {
        // 4 leaves in u8 blocks leaves bits 4..8 dead.
        let forest = depth2_forest();
        let layout = MaskLayout::<u8>::new(&forest);
        assert_eq!(layout.template.len(), 1);
        assert_eq!(layout.template[0], 0b0000_1111);
    }

    #[test]
    fn combine_is_blockwise_and() {
        let forest = depth2_forest();
        let tree = forest.tree(0);
        let layout = MaskLayout::<u8>::new(&forest);

        let mut a = ResultMask::new(&layout);
        let mut b = ResultMask::new(&layout);
        a.apply(&Epitome::<u8>::new(tree.leaves_before(0), 2), 0);
        b.apply(&Epitome::<u8>::new(tree.leaves_before(4), 1), 0);
        a.combine(&b);
        assert_eq!(a.leaf_index(0), 3);
    }

    #[test]
    fn simd_lanes_are_independent() {
        let forest = depth2_forest();
        let tree = forest.tree(0);
        let layout = MaskLayout::<u8>::new(&forest);
        let mut mask = SimdResultMask::<Simd128x8>::new(&layout);

        // Hide the left subtree in even lanes only.
        let epitome = Epitome::<u8>::new(tree.leaves_before(0), tree.subtree_leaves(1));
        mask.apply_lanes(&epitome, 0, |lane| lane % 2 == 0);

        assert_eq!(mask.leaf_index(0, 0), 2);
        assert_eq!(mask.leaf_index(0, 1), 0);
        assert_eq!(mask.leaf_index(0, 2), 2);
    }

    #[test]
    fn forest_reduction_is_order_fixed() {
        // 600 single-split trees span three partitions; the parallel and
        // sequential reductions must agree exactly.
        let mut forest = Forest::new();
        for i in 0..600u32 {
            let mut b = TreeBuilder::new();
            b.add_split(0, 0.5, 1, 2);
            b.add_leaf(0.1 + i as f64 * 1e-3);
            b.add_leaf(0.2);
            forest.push_tree(b.build().unwrap());
        }
        let serial = sum_leaf_weights(&forest, &Config::serial(), |_| 0);
        let parallel = sum_leaf_weights(&forest, &Config::parallel_forest(8), |_| 0);
        assert_eq!(serial, parallel);
    }
}
