//! Deterministic generators and a naive reference scorer for tests and
//! benches.

use rand::prelude::*;

use crate::repr::{Forest, NodeId, TreeBuilder};

/// Score a document by plain root-to-leaf traversal of every tree.
///
/// This is the reference the bitset scorers are checked against.
pub fn reference_score(forest: &Forest, document: &[f64]) -> f64 {
    forest
        .trees()
        .map(|tree| tree.leaf_weight(tree.traverse(document)))
        .sum()
}

/// Generate a random forest with `n_trees` trees of depth at most
/// `max_depth` over `n_features` features.
///
/// Thresholds and leaf weights are uniform in `[0, 1)`; below the root,
/// each node has a 1-in-4 chance of stopping early as a leaf.
pub fn random_forest(n_trees: usize, max_depth: u32, n_features: u32, seed: u64) -> Forest {
    assert!(max_depth >= 1, "a scorable tree needs a root split");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut forest = Forest::new();
    for _ in 0..n_trees {
        let mut builder = TreeBuilder::new();
        random_subtree(&mut builder, &mut rng, max_depth, n_features);
        forest.push_tree(builder.build().expect("generated tree is valid"));
    }
    forest
}

fn random_subtree(
    builder: &mut TreeBuilder,
    rng: &mut StdRng,
    depth_left: u32,
    n_features: u32,
) -> NodeId {
    let make_leaf = depth_left == 0 || (builder.n_nodes() > 0 && rng.gen::<f64>() < 0.25);
    if make_leaf {
        builder.add_leaf(rng.gen::<f64>())
    } else {
        let feature = rng.gen_range(0..n_features);
        let threshold = rng.gen::<f64>();
        let id = builder.add_split(feature, threshold, 0, 0);
        let left = random_subtree(builder, rng, depth_left - 1, n_features);
        let right = random_subtree(builder, rng, depth_left - 1, n_features);
        builder.set_children(id, left, right);
        id
    }
}

/// Generate `n_docs` documents of `n_features` uniform values in `[0, 1)`.
pub fn random_documents(n_docs: usize, n_features: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_docs)
        .map(|_| (0..n_features).map(|_| rng.gen::<f64>()).collect())
        .collect()
}

/// Flatten documents into a row-major `(n_docs, n_features)` matrix.
pub fn documents_matrix(documents: &[Vec<f64>]) -> ndarray::Array2<f64> {
    let n_docs = documents.len();
    let n_features = documents.first().map_or(0, |d| d.len());
    let flat: Vec<f64> = documents.iter().flatten().copied().collect();
    ndarray::Array2::from_shape_vec((n_docs, n_features), flat)
        .expect("documents must have uniform length")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_deterministic() {
        let a = random_forest(5, 4, 3, 42);
        let b = random_forest(5, 4, 3, 42);
        assert_eq!(a.n_trees(), b.n_trees());
        assert_eq!(a.total_leaves(), b.total_leaves());

        let d1 = random_documents(3, 4, 7);
        let d2 = random_documents(3, 4, 7);
        assert_eq!(d1, d2);
    }

    #[test]
    fn random_trees_are_valid_and_bounded() {
        let forest = random_forest(20, 5, 4, 1);
        for tree in forest.trees() {
            assert!(tree.n_leaves() >= 2);
            assert!(tree.n_leaves() <= 32);
        }
        assert!(forest.n_features() <= 4);
    }

    #[test]
    fn reference_score_sums_leaf_weights() {
        let forest = random_forest(10, 4, 3, 9);
        let doc = vec![0.5, 0.5, 0.5];
        let by_hand: f64 = forest
            .trees()
            .map(|t| t.leaf_weight(t.traverse(&doc)))
            .sum();
        assert_eq!(reference_score(&forest, &doc), by_hand);
    }
}
