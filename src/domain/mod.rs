//! Domain layer: catalog entities and the node tree mirroring them
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;

pub use arena::{NodeId, NodeTree, TreeIterator, TreeNode};
pub use entities::*;
pub use error::{DomainError, DomainResult};
