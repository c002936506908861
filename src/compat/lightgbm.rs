//! Loader for the LightGBM JSON model dump.
//!
//! Parses the `tree_info` / `tree_structure` shape produced by LightGBM's
//! `dump_model` and converts it to a native [`Forest`]. Only numeric `"<="`
//! splits with left-default routing are scorable; anything else is rejected
//! at conversion time.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::repr::{Forest, NodeId, Tree, TreeBuilder, TreeValidationError};

/// Error type for LightGBM model loading and conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {tree}: unsupported decision type {decision_type:?} (only \"<=\" splits are scorable)")]
    UnsupportedDecisionType { tree: usize, decision_type: String },
    #[error("tree {tree}: unsupported default direction (missing values must route left)")]
    DefaultRight { tree: usize },
    #[error("tree {tree} is a single leaf")]
    LeafRoot { tree: usize },
    #[error("tree {tree}: invalid structure: {error:?}")]
    InvalidTree {
        tree: usize,
        error: TreeValidationError,
    },
    #[error("model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level model dump: an ordered list of trees.
#[derive(Debug, Deserialize)]
pub struct LgbModel {
    pub tree_info: Vec<LgbTreeInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LgbTreeInfo {
    pub tree_structure: LgbNode,
}

/// A node of the dump: split nodes carry `split_feature`, leaves carry
/// `leaf_value`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LgbNode {
    Split {
        split_feature: u32,
        threshold: f64,
        decision_type: String,
        default_left: bool,
        left_child: Box<LgbNode>,
        right_child: Box<LgbNode>,
    },
    Leaf {
        leaf_value: f64,
    },
}

impl LgbModel {
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConversionError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConversionError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Convert to a native [`Forest`].
    pub fn to_forest(&self) -> Result<Forest, ConversionError> {
        let mut forest = Forest::new();
        for (tree_idx, info) in self.tree_info.iter().enumerate() {
            forest.push_tree(convert_tree(&info.tree_structure, tree_idx)?);
        }
        Ok(forest)
    }
}

fn convert_tree(root: &LgbNode, tree_idx: usize) -> Result<Tree, ConversionError> {
    if matches!(root, LgbNode::Leaf { .. }) {
        return Err(ConversionError::LeafRoot { tree: tree_idx });
    }

    let mut builder = TreeBuilder::new();
    add_node(&mut builder, root, tree_idx)?;
    builder
        .build()
        .map_err(|error| ConversionError::InvalidTree {
            tree: tree_idx,
            error,
        })
}

/// Recursively append `node` and its children, parent slot first so node 0
/// stays the root.
fn add_node(
    builder: &mut TreeBuilder,
    node: &LgbNode,
    tree_idx: usize,
) -> Result<NodeId, ConversionError> {
    match node {
        LgbNode::Leaf { leaf_value } => Ok(builder.add_leaf(*leaf_value)),
        LgbNode::Split {
            split_feature,
            threshold,
            decision_type,
            default_left,
            left_child,
            right_child,
        } => {
            if decision_type != "<=" {
                return Err(ConversionError::UnsupportedDecisionType {
                    tree: tree_idx,
                    decision_type: decision_type.clone(),
                });
            }
            if !default_left {
                return Err(ConversionError::DefaultRight { tree: tree_idx });
            }
            let id = builder.add_split(*split_feature, *threshold, 0, 0);
            let left = add_node(builder, left_child, tree_idx)?;
            let right = add_node(builder, right_child, tree_idx)?;
            builder.set_children(id, left, right);
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_MODEL: &str = r#"{
        "tree_info": [
            {
                "tree_structure": {
                    "split_feature": 0,
                    "threshold": 0.5,
                    "decision_type": "<=",
                    "default_left": true,
                    "left_child": { "leaf_value": 1.0 },
                    "right_child": {
                        "split_feature": 1,
                        "threshold": 0.25,
                        "decision_type": "<=",
                        "default_left": true,
                        "left_child": { "leaf_value": 2.0 },
                        "right_child": { "leaf_value": 3.0 }
                    }
                }
            }
        ]
    }"#;

    #[test]
    fn parses_and_converts() {
        let model = LgbModel::from_json(SIMPLE_MODEL).unwrap();
        let forest = model.to_forest().unwrap();
        assert_eq!(forest.n_trees(), 1);
        assert_eq!(forest.n_features(), 2);

        let tree = forest.tree(0);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.leaf_weight(tree.traverse(&[0.4, 0.0])), 1.0);
        assert_eq!(tree.leaf_weight(tree.traverse(&[0.6, 0.2])), 2.0);
        assert_eq!(tree.leaf_weight(tree.traverse(&[0.6, 0.3])), 3.0);
    }

    #[test]
    fn rejects_other_decision_types() {
        let json = SIMPLE_MODEL.replace("\"<=\"", "\"<\"");
        let model = LgbModel::from_json(&json).unwrap();
        assert!(matches!(
            model.to_forest(),
            Err(ConversionError::UnsupportedDecisionType { tree: 0, .. })
        ));
    }

    #[test]
    fn rejects_right_default() {
        let json = SIMPLE_MODEL.replace("\"default_left\": true", "\"default_left\": false");
        let model = LgbModel::from_json(&json).unwrap();
        assert!(matches!(
            model.to_forest(),
            Err(ConversionError::DefaultRight { tree: 0 })
        ));
    }

    #[test]
    fn rejects_leaf_root() {
        let json = r#"{ "tree_info": [ { "tree_structure": { "leaf_value": 0.5 } } ] }"#;
        let model = LgbModel::from_json(json).unwrap();
        assert!(matches!(
            model.to_forest(),
            Err(ConversionError::LeafRoot { tree: 0 })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(LgbModel::from_json("{ \"tree_info\": 7 }").is_err());
    }
}
