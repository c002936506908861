//! Scorer with one entry per unique split across the whole forest.

use crate::block::Block;
use crate::config::{Capabilities, Config, ConfigError};
use crate::epitome::Epitome;
use crate::mask::{MaskLayout, ResultMask};
use crate::repr::Forest;

use super::{check_document, collect_split_nodes, ScoreError, Scorer};

const CAPABILITIES: Capabilities = Capabilities {
    scorer: "EqNodesScorer",
    features: false,
    documents: true,
    forest: true,
};

/// A unique `(feature, threshold)` split with every tree that uses it.
///
/// Threshold identity is exact bit-equality, matching the strict
/// less-than probe at scoring time.
#[derive(Debug)]
struct EqNode<B: Block> {
    feature: u32,
    threshold: f64,
    entries: Box<[(u32, Epitome<B>)]>,
}

/// Scorer that deduplicates splits across trees.
///
/// All unique splits live in one flat vector sorted by `(feature,
/// threshold)`, binary-searched per feature at scoring time. Pays off when
/// many trees reuse the same split.
pub struct EqNodesScorer<'f, B: Block> {
    config: Config,
    forest: &'f Forest,
    nodes: Box<[EqNode<B>]>,
    layout: MaskLayout<B>,
}

impl<'f, B: Block> EqNodesScorer<'f, B> {
    pub fn new(config: Config, forest: &'f Forest) -> Result<Self, ConfigError> {
        config.validate(&CAPABILITIES)?;

        let mut nodes: Vec<EqNode<B>> = Vec::new();
        let mut entries: Vec<(u32, Epitome<B>)> = Vec::new();
        let mut current: Option<(u32, f64)> = None;

        for node in collect_split_nodes::<B>(forest) {
            let key = (node.feature, node.threshold);
            let same = current
                .is_some_and(|(f, t)| f == key.0 && t.to_bits() == key.1.to_bits());
            if !same {
                if let Some((feature, threshold)) = current {
                    nodes.push(EqNode {
                        feature,
                        threshold,
                        entries: std::mem::take(&mut entries).into_boxed_slice(),
                    });
                }
                current = Some(key);
            }
            entries.push((node.tree, node.epitome));
        }
        if let Some((feature, threshold)) = current {
            nodes.push(EqNode {
                feature,
                threshold,
                entries: entries.into_boxed_slice(),
            });
        }

        Ok(Self {
            config,
            forest,
            nodes: nodes.into_boxed_slice(),
            layout: MaskLayout::new(forest),
        })
    }
}

impl<B: Block> Scorer for EqNodesScorer<'_, B> {
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

        let mut mask = ResultMask::new(&self.layout);
        for (f, &value) in doc.iter().enumerate().take(self.required_features()) {
            let feature = f as u32;
            let start = self.nodes.partition_point(|n| n.feature < feature);
            // Violated splits of this feature form a prefix of its run.
            let end = self.nodes.partition_point(|n| {
                n.feature < feature || (n.feature == feature && !(value <= n.threshold))
            });
            for node in &self.nodes[start..end] {
                for (tree, epitome) in node.entries.iter() {
                    mask.apply(epitome, *tree as usize);
                }
            }
        }

        out[0] = mask.compute_score(self.forest, &self.config);
        Ok(())
    }
}
