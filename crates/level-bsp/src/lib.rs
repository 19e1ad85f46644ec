//! BSP (Binary Space Partitioning) core for 2.5D game levels.
//!
//! A level's floor plan lives in the horizontal (x, z) plane with y as
//! height. The [`bsp::Builder`] partitions the level's polygons into a
//! [`bsp::Tree`] of convex leaves; [`portal::build_portals`] derives the
//! navigation graph between adjacent leaves; [`astar::PathFinder`] searches
//! it; and the detectors in [`collide`] resolve movers against the
//! partitioned geometry every simulation tick.

pub mod astar;
pub mod bsp;
pub mod collide;
pub mod cut;
pub mod error;
pub mod line;
pub mod polygon;
pub mod portal;
pub mod rect;

pub use astar::{PathFinder, SearchGraph, astar};
pub use bsp::{Builder, InternalNode, Leaf, LeafId, LevelVisitor, Node, Tree};
pub use collide::{
    CollisionDetector, CollisionListener, MoverBounds, MoverState, NullListener, ObjectResponse,
    SlidingCollisionDetector,
};
pub use cut::Cut;
pub use error::BuildError;
pub use line::{LINE_EPSILON, LineClassification, LineSide, PartitionLine};
pub use polygon::{Polygon, PolygonKind};
pub use portal::{Portal, PortalId, build_portals};
pub use rect::Bounds;
