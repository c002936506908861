//! The four scoring strategies and their shared contract.
//!
//! Every variant walks the same road: collect all split nodes of the
//! forest with their exit masks, order them by `(feature, threshold)`, and
//! at scoring time apply the masks of every violated split before reading
//! each tree's surviving leaf. The variants differ only in memory layout
//! (grouped, flat SoA, deduplicated, lane-grouped) and in which parallelism
//! axes they support.

mod eqnodes;
mod linearized;
mod merged;
mod simd;

pub use eqnodes::EqNodesScorer;
pub use linearized::LinearizedScorer;
pub use merged::MergedScorer;
pub use simd::SimdScorer;

use crate::block::Block;
use crate::config::Config;
use crate::epitome::Epitome;
use crate::repr::Forest;

/// Per-call input error. Scoring never fails for well-formed documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("document has {len} features but the forest references {required}")]
    DocumentTooShort { len: usize, required: usize },
    #[error("scorer consumes groups of at most {group_size} documents, got {got}")]
    GroupTooLarge { group_size: usize, got: usize },
    #[error("empty document group")]
    EmptyGroup,
}

/// A configured scorer over an immutable forest.
///
/// Scorers are immutable after construction and freely shared across
/// threads; only the per-call accumulator is worker-local.
pub trait Scorer: Send + Sync {
    fn config(&self) -> &Config;

    /// Minimum document length the forest requires.
    fn required_features(&self) -> usize;

    /// Documents consumed per [`score_group`](Scorer::score_group) call.
    /// 1 for the scalar variants, the lane count for SIMD.
    fn group_size(&self) -> usize {
        1
    }

    /// Score `docs` (between 1 and `group_size` documents) into `out`,
    /// one weight per document in order.
    fn score_group(&self, docs: &[&[f64]], out: &mut [f64]) -> Result<(), ScoreError>;

    /// Score a single document.
    fn score(&self, document: &[f64]) -> Result<f64, ScoreError> {
        let mut out = [0.0];
        self.score_group(&[document], &mut out)?;
        Ok(out[0])
    }
}

/// One split node flattened out of its tree, ready for sorting.
pub(crate) struct SplitNode<B: Block> {
    pub feature: u32,
    pub threshold: f64,
    pub tree: u32,
    pub epitome: Epitome<B>,
}

/// Every split node of the forest, sorted by `(feature, threshold)`.
///
/// Threshold order is `f64::total_cmp`, which keeps the slice partitioned
/// for the probe in [`first_holding`].
pub(crate) fn collect_split_nodes<B: Block>(forest: &Forest) -> Vec<SplitNode<B>> {
    let mut nodes = Vec::new();
    for (tree_idx, tree) in forest.trees().enumerate() {
        for node in 0..tree.n_nodes() as u32 {
            if tree.is_leaf(node) {
                continue;
            }
            nodes.push(SplitNode {
                feature: tree.split_index(node),
                threshold: tree.split_threshold(node),
                tree: tree_idx as u32,
                epitome: Epitome::new(
                    tree.leaves_before(node),
                    tree.subtree_leaves(tree.left_child(node)),
                ),
            });
        }
    }
    nodes.sort_by(|a, b| {
        a.feature
            .cmp(&b.feature)
            .then(a.threshold.total_cmp(&b.threshold))
    });
    nodes
}

/// Sentinel-style offsets: `offsets[f]..offsets[f + 1]` is the (possibly
/// empty) node range of feature `f` in a `(feature, threshold)`-sorted
/// slice. Length is `n_features + 1`.
pub(crate) fn feature_offsets<B: Block>(
    nodes: &[SplitNode<B>],
    n_features: usize,
) -> Box<[usize]> {
    let mut offsets = Vec::with_capacity(n_features + 1);
    let mut i = 0;
    for feature in 0..n_features as u32 {
        while i < nodes.len() && nodes[i].feature < feature {
            i += 1;
        }
        offsets.push(i);
    }
    offsets.push(nodes.len());
    offsets.into_boxed_slice()
}

/// Index of the first threshold the document value does not violate.
///
/// Entries below the returned index are exactly the splits whose condition
/// `value <= threshold` fails. A NaN value compares false against every
/// threshold, so the whole slice is violated and the document follows every
/// right branch.
#[inline]
pub(crate) fn first_holding(thresholds: &[f64], value: f64) -> usize {
    thresholds.partition_point(|&t| !(value <= t))
}

/// Reject documents shorter than the forest's feature span.
#[inline]
pub(crate) fn check_document(doc: &[f64], required: usize) -> Result<(), ScoreError> {
    if doc.len() < required {
        return Err(ScoreError::DocumentTooShort {
            len: doc.len(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::TreeBuilder;

    fn two_tree_forest() -> Forest {
        let mut forest = Forest::new();
        for (t0, t1) in [(0.5, 0.25), (0.5, 0.75)] {
            let mut b = TreeBuilder::new();
            b.add_split(1, t0, 1, 2);
            b.add_leaf(1.0);
            b.add_split(0, t1, 3, 4);
            b.add_leaf(2.0);
            b.add_leaf(3.0);
            forest.push_tree(b.build().unwrap());
        }
        forest
    }

    #[test]
    fn split_nodes_are_sorted_by_feature_then_threshold() {
        let nodes = collect_split_nodes::<u32>(&two_tree_forest());
        assert_eq!(nodes.len(), 4);
        let keys: Vec<(u32, f64)> = nodes.iter().map(|n| (n.feature, n.threshold)).collect();
        assert_eq!(keys, vec![(0, 0.25), (0, 0.75), (1, 0.5), (1, 0.5)]);
    }

    #[test]
    fn offsets_cover_sparse_features() {
        let nodes = collect_split_nodes::<u32>(&two_tree_forest());
        let offsets = feature_offsets(&nodes, 4);
        assert_eq!(&offsets[..], &[0, 2, 4, 4, 4]);
    }

    #[test]
    fn first_holding_is_strict() {
        let thresholds = [0.1, 0.5, 0.5, 0.9];
        assert_eq!(first_holding(&thresholds, 0.0), 0);
        // Equality holds the condition, so the node is not violated.
        assert_eq!(first_holding(&thresholds, 0.5), 1);
        assert_eq!(first_holding(&thresholds, 0.6), 3);
        assert_eq!(first_holding(&thresholds, 2.0), 4);
    }

    #[test]
    fn first_holding_nan_violates_everything() {
        let thresholds = [0.1, 0.5, 0.9];
        assert_eq!(first_holding(&thresholds, f64::NAN), 3);
    }

    #[test]
    fn short_document_rejected() {
        assert_eq!(
            check_document(&[0.1], 2),
            Err(ScoreError::DocumentTooShort {
                len: 1,
                required: 2
            })
        );
        assert_eq!(check_document(&[0.1, 0.2], 2), Ok(()));
    }
}
