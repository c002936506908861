//! Forest representation: SoA tree storage with DFS leaf metadata.

mod forest;
mod tree;

pub use forest::Forest;
pub use tree::{Tree, TreeBuilder, TreeValidationError};

/// Node index local to one tree (0 = root).
pub type NodeId = u32;
