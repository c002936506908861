//! Batch scoring driver.

use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::scorer::{ScoreError, Scorer};
use crate::utils::run_with_threads;

/// Score every row of `documents`, in input order.
///
/// Documents are fed to the scorer in groups of its
/// [`group_size`](Scorer::group_size) (1 for the scalar variants, the lane
/// count for SIMD). With `parallel_documents` set, groups are dispatched
/// across the configured thread pool; each worker writes a disjoint output
/// range, so no locking is needed and the result order is the input order.
pub fn score_all<S: Scorer + ?Sized>(
    scorer: &S,
    documents: ArrayView2<'_, f64>,
) -> Result<Vec<f64>, ScoreError> {
    let config = scorer.config();
    let n_docs = documents.nrows();
    let n_cols = documents.ncols();
    let required = scorer.required_features();

    let mut scores = vec![0.0; n_docs];
    if n_docs == 0 {
        return Ok(scores);
    }
    if n_cols < required {
        return Err(ScoreError::DocumentTooShort {
            len: n_cols,
            required,
        });
    }

    let data = documents
        .as_slice()
        .expect("documents must be contiguous row-major");
    let group = scorer.group_size().max(1);

    let score_chunk = |chunk_idx: usize, out_chunk: &mut [f64]| -> Result<(), ScoreError> {
        let base = chunk_idx * group;
        let docs: Vec<&[f64]> = (0..out_chunk.len())
            .map(|i| {
                let row = (base + i) * n_cols;
                &data[row..row + n_cols]
            })
            .collect();
        scorer.score_group(&docs, out_chunk)
    };

    // Any enabled axis needs the sized pool; the document loop itself only
    // fans out when its own flag is set.
    let wants_pool = config.n_threads > 1
        && (config.parallel_documents || config.parallel_features || config.parallel_forest);
    run_with_threads(if wants_pool { config.n_threads } else { 1 }, |_| {
        if config.parallel_documents && config.n_threads > 1 {
            scores
                .par_chunks_mut(group)
                .enumerate()
                .try_for_each(|(i, chunk)| score_chunk(i, chunk))
        } else {
            scores
                .chunks_mut(group)
                .enumerate()
                .try_for_each(|(i, chunk)| score_chunk(i, chunk))
        }
    })?;

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::simd::Simd128x16;
    use crate::config::Config;
    use crate::repr::{Forest, TreeBuilder};
    use crate::scorer::{MergedScorer, SimdScorer};
    use ndarray::Array2;

    fn small_forest() -> Forest {
        let mut forest = Forest::new();
        for threshold in [0.3, 0.5, 0.7] {
            let mut b = TreeBuilder::new();
            b.add_split(0, threshold, 1, 2);
            b.add_leaf(threshold);
            b.add_leaf(-threshold);
            forest.push_tree(b.build().unwrap());
        }
        forest
    }

    fn documents(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / n as f64)
    }

    #[test]
    fn batch_matches_single_scores() {
        let forest = small_forest();
        let scorer = MergedScorer::<u32>::new(Config::serial(), &forest).unwrap();
        let docs = documents(17);

        let batch = score_all(&scorer, docs.view()).unwrap();
        for (i, &score) in batch.iter().enumerate() {
            assert_eq!(score, scorer.score(&[docs[[i, 0]]]).unwrap());
        }
    }

    #[test]
    fn parallel_documents_matches_serial() {
        let forest = small_forest();
        let serial = MergedScorer::<u32>::new(Config::serial(), &forest).unwrap();
        let parallel =
            MergedScorer::<u32>::new(Config::parallel_documents(4), &forest).unwrap();
        let docs = documents(101);

        let a = score_all(&serial, docs.view()).unwrap();
        let b = score_all(&parallel, docs.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn simd_groups_cover_ragged_batches() {
        let forest = small_forest();
        let scalar = MergedScorer::<u16>::new(Config::serial(), &forest).unwrap();
        let simd = SimdScorer::<Simd128x16>::new(Config::serial(), &forest).unwrap();

        // 11 documents: one full group of 8 plus a partial group of 3.
        let docs = documents(11);
        let expected = score_all(&scalar, docs.view()).unwrap();
        let got = score_all(&simd, docs.view()).unwrap();
        assert_eq!(expected, got);
    }

    #[test]
    fn short_documents_rejected_upfront() {
        let forest = small_forest();
        let scorer = MergedScorer::<u32>::new(Config::serial(), &forest).unwrap();
        let docs = Array2::<f64>::zeros((3, 0));
        assert_eq!(
            score_all(&scorer, docs.view()),
            Err(ScoreError::DocumentTooShort {
                len: 0,
                required: 1
            })
        );
    }

    #[test]
    fn empty_batch_is_empty() {
        let forest = small_forest();
        let scorer = MergedScorer::<u32>::new(Config::serial(), &forest).unwrap();
        let docs = Array2::<f64>::zeros((0, 1));
        assert_eq!(score_all(&scorer, docs.view()).unwrap(), Vec::<f64>::new());
    }
}
