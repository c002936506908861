//! Scorer with per-feature entries grouped by shared split.

use crate::block::Block;
use crate::config::{Capabilities, Config, ConfigError};
use crate::epitome::Epitome;
use crate::mask::{MaskLayout, ResultMask};
use crate::repr::Forest;
use crate::utils::Parallelism;

use super::{check_document, collect_split_nodes, first_holding, ScoreError, Scorer};

const CAPABILITIES: Capabilities = Capabilities {
    scorer: "MergedScorer",
    features: true,
    documents: true,
    forest: true,
};

/// Split nodes of one feature, grouped by threshold.
///
/// `thresholds` is sorted; `groups[i]` holds every `(tree, epitome)` pair
/// whose split is exactly `(feature, thresholds[i])`, so trees sharing a
/// split cost one probe instead of one each. Threshold equality is exact
/// bit-equality.
#[derive(Debug)]
struct MergedFeature<B: Block> {
    thresholds: Vec<f64>,
    groups: Vec<Vec<(u32, Epitome<B>)>>,
}

impl<B: Block> Default for MergedFeature<B> {
    fn default() -> Self {
        Self {
            thresholds: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// The grouped scorer. Supports all three parallelism axes; it is the only
/// variant with a feature-parallel score loop.
pub struct MergedScorer<'f, B: Block> {
    config: Config,
    forest: &'f Forest,
    features: Box<[MergedFeature<B>]>,
    layout: MaskLayout<B>,
}

impl<'f, B: Block> MergedScorer<'f, B> {
    pub fn new(config: Config, forest: &'f Forest) -> Result<Self, ConfigError> {
        config.validate(&CAPABILITIES)?;

        let n_features = forest.n_features();
        let mut features: Vec<MergedFeature<B>> = Vec::new();
        features.resize_with(n_features, MergedFeature::default);

        for node in collect_split_nodes::<B>(forest) {
            let entry = &mut features[node.feature as usize];
            let same_split = entry
                .thresholds
                .last()
                .is_some_and(|t| t.to_bits() == node.threshold.to_bits());
            if same_split {
                let group = entry.groups.last_mut().expect("group per threshold");
                group.push((node.tree, node.epitome));
            } else {
                entry.thresholds.push(node.threshold);
                entry.groups.push(vec![(node.tree, node.epitome)]);
            }
        }

        Ok(Self {
            config,
            forest,
            features: features.into_boxed_slice(),
            layout: MaskLayout::new(forest),
        })
    }

    /// Apply every violated split of feature `f` to the mask.
    fn apply_feature(&self, f: usize, value: f64, mask: &mut ResultMask<'_, B>) {
        let entry = &self.features[f];
        let cut = first_holding(&entry.thresholds, value);
        for group in &entry.groups[..cut] {
            for (tree, epitome) in group {
                mask.apply(epitome, *tree as usize);
            }
        }
    }

    fn build_mask(&self, doc: &[f64]) -> ResultMask<'_, B> {
        let n_features = self.features.len();

        if self.config.parallel_features && self.config.n_threads > 1 && n_features > 1 {
            // Contiguous feature ranges, one partial mask per worker,
            // AND-combined after the join. AND is exact, so the split
            // cannot change the result.
            let chunk = n_features.div_ceil(self.config.n_threads);
            let ranges: Vec<std::ops::Range<usize>> = (0..n_features)
                .step_by(chunk)
                .map(|start| start..(start + chunk).min(n_features))
                .collect();
            let mut partials = Parallelism::Parallel.maybe_par_map(ranges, |range| {
                let mut mask = ResultMask::new(&self.layout);
                for f in range {
                    self.apply_feature(f, doc[f], &mut mask);
                }
                mask
            });
            let mut mask = partials.swap_remove(0);
            for partial in &partials {
                mask.combine(partial);
            }
            mask
        } else {
            let mut mask = ResultMask::new(&self.layout);
            for f in 0..n_features {
                self.apply_feature(f, doc[f], &mut mask);
            }
            mask
        }
    }
}

impl<B: Block> Scorer for MergedScorer<'_, B> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn required_features(&self) -> usize {
        self.forest.n_features()
    }

    fn score_group(&self, docs: &[&[f64]], out: &mut [f64]) -> Result<(), ScoreError> {
        let [doc] = docs else {
            return Err(match docs.len() {
                0 => ScoreError::EmptyGroup,
                got => ScoreError::GroupTooLarge { group_size: 1, got },
            });
        };
        check_document(doc, self.required_features())?;
        let mask = self.build_mask(doc);
        out[0] = mask.compute_score(self.forest, &self.config);
        Ok(())
    }
}
