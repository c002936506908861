//! rapidscorer: bitset-based scoring of gradient-boosted tree ensembles.
//!
//! Instead of walking each tree node by node per document, every split node
//! carries a compact exit mask ("epitome") over its tree's leaves. Scoring a
//! document means AND-ing in the masks of every violated split, feature by
//! feature; the lowest surviving bit of each tree's accumulator is the leaf
//! that document reaches, and leaf weights sum to the score.
//!
//! # Key Types
//!
//! - [`Forest`] / [`Tree`] / [`TreeBuilder`] - the ensemble representation
//! - [`MergedScorer`] / [`LinearizedScorer`] / [`EqNodesScorer`] /
//!   [`SimdScorer`] - the four scoring strategies, sharing the [`Scorer`]
//!   contract
//! - [`Config`] - thread count plus the three parallelism axes (features,
//!   documents, forest reduction)
//! - [`score_all`] - batch driver over a document matrix
//!
//! # Loading Models
//!
//! Use [`compat::lightgbm::LgbModel`] to load a LightGBM JSON dump and
//! convert it with `to_forest()`. See the [`compat`] module for details.
//!
//! # Choosing a Scorer
//!
//! - [`MergedScorer`]: grouped by shared split; the only variant with a
//!   feature-parallel score loop.
//! - [`LinearizedScorer`]: flat SoA arrays, densest layout.
//! - [`EqNodesScorer`]: one entry per unique split across the forest.
//! - [`SimdScorer`]: scores a lane group of documents per call.

pub mod block;
pub mod compat;
pub mod config;
pub mod data;
pub mod epitome;
pub mod executor;
pub mod mask;
pub mod repr;
pub mod scorer;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use block::simd::{
    Simd128x16, Simd128x8, Simd256x16, Simd256x32, Simd256x8, Simd512x16, Simd512x32, Simd512x64,
    Simd512x8,
};
pub use block::{Block, SimdBlock};
pub use config::{Config, ConfigError};
pub use epitome::Epitome;
pub use executor::score_all;
pub use mask::{MaskLayout, ResultMask, SimdResultMask};
pub use repr::{Forest, NodeId, Tree, TreeBuilder, TreeValidationError};
pub use scorer::{EqNodesScorer, LinearizedScorer, MergedScorer, ScoreError, Scorer, SimdScorer};
pub use utils::{run_with_threads, Parallelism};
