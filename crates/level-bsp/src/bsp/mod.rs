//! Binary Space Partitioning tree for 2.5D level geometry.
//!
//! This module partitions a floor plan's polygons into a binary tree of
//! partition nodes and convex leaves. The tree enables:
//!
//! - Point-to-leaf location and front/back leaf queries
//! - Strict front-to-back / back-to-front traversal for rendering consumers
//! - Portal placement and collision descent over the same structure
//!
//! # Architecture
//!
//! - [`Tree`]: the container holding the root node and the leaf/portal arenas
//! - [`Node`] / [`InternalNode`] / [`Leaf`]: the tree structure itself
//! - [`Builder`]: recursive construction with pluggable [`PartitionSelector`]
//! - [`LevelVisitor`]: visitor trait for custom traversal behavior

pub mod builder;
pub mod node;
pub mod selector;
pub mod traverse;
pub mod tree;

pub use builder::Builder;
pub use node::{InternalNode, Leaf, LeafId, Node};
pub use selector::{FewestSplits, FirstWall, PartitionSelector, PartitionStats, partition_stats};
pub use traverse::{CollectingVisitor, FnVisitor, LevelVisitor};
pub use tree::Tree;
