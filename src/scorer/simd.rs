//! Lane-grouped scorer: one document per SIMD lane.

use crate::block::SimdBlock;
use crate::config::{Capabilities, Config, ConfigError};
use crate::epitome::Epitome;
use crate::mask::{MaskLayout, SimdResultMask};
use crate::repr::Forest;

use super::{
    check_document, collect_split_nodes, feature_offsets, first_holding, ScoreError, Scorer,
};

const CAPABILITIES: Capabilities = Capabilities {
    scorer: "SimdScorer",
    features: false,
    documents: true,
    forest: true,
};

/// Scorer that batches documents into SIMD lane groups.
///
/// The node layout is the flat linearized one; epitome blocks are scalar
/// lane words broadcast into the vector accumulator, so a single AND
/// advances every document of the batch. Threshold probes stay scalar, one
/// per document per feature, into the shared sorted array.
pub struct SimdScorer<'f, V: SimdBlock> {
    config: Config,
    forest: &'f Forest,
    thresholds: Box<[f64]>,
    tree_indexes: Box<[u32]>,
    epitomes: Box<[Epitome<V::Lane>]>,
    offsets: Box<[usize]>,
    layout: MaskLayout<V::Lane>,
}

impl<'f, V: SimdBlock> SimdScorer<'f, V> {
    pub fn new(config: Config, forest: &'f Forest) -> Result<Self, ConfigError> {
        config.validate(&CAPABILITIES)?;

        let nodes = collect_split_nodes::<V::Lane>(forest);
        let offsets = feature_offsets(&nodes, forest.n_features());

        let mut thresholds = Vec::with_capacity(nodes.len());
        let mut tree_indexes = Vec::with_capacity(nodes.len());
        let mut epitomes = Vec::with_capacity(nodes.len());
        for node in nodes {
            thresholds.push(node.threshold);
            tree_indexes.push(node.tree);
            epitomes.push(node.epitome);
        }

        Ok(Self {
            config,
            forest,
            thresholds: thresholds.into_boxed_slice(),
            tree_indexes: tree_indexes.into_boxed_slice(),
            epitomes: epitomes.into_boxed_slice(),
            offsets,
            layout: MaskLayout::new(forest),
        })
    }
}

impl<V: SimdBlock> Scorer for SimdScorer<'_, V> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn required_features(&self) -> usize {
        self.forest.n_features()
    }

    fn group_size(&self) -> usize {
        V::LANES
    }

    fn score_group(&self, docs: &[&[f64]], out: &mut [f64]) -> Result<(), ScoreError> {
        if docs.is_empty() {
            return Err(ScoreError::EmptyGroup);
        }
        if docs.len() > V::LANES {
            return Err(ScoreError::GroupTooLarge {
                group_size: V::LANES,
                got: docs.len(),
            });
        }
        let required = self.required_features();
        for doc in docs {
            check_document(doc, required)?;
        }

        let k = docs.len();
        let mut mask = SimdResultMask::<V>::new(&self.layout);
        // Per-lane cut of the violated prefix; unused lanes keep 0 and
        // never receive a mask.
        let mut cuts = vec![0usize; V::LANES];

        for f in 0..self.offsets.len() - 1 {
            let start = self.offsets[f];
            let end = self.offsets[f + 1];
            if start == end {
                continue;
            }
            let thresholds = &self.thresholds[start..end];

            let mut max_cut = 0;
            for (lane, doc) in docs.iter().enumerate() {
                let cut = first_holding(thresholds, doc[f]);
                cuts[lane] = cut;
                max_cut = max_cut.max(cut);
            }

            for j in 0..max_cut {
                mask.apply_lanes(
                    &self.epitomes[start + j],
                    self.tree_indexes[start + j] as usize,
                    |lane| j < cuts[lane],
                );
            }
        }

        for (lane, slot) in out.iter_mut().enumerate().take(k) {
            *slot = mask.compute_score(self.forest, &self.config, lane);
        }
        Ok(())
    }
}
