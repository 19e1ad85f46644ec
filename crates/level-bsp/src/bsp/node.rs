//! BSP tree node and leaf types.

use crate::line::PartitionLine;
use crate::polygon::Polygon;
use crate::portal::PortalId;
use crate::rect::Bounds;

/// Handle to a leaf in the tree's leaf arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(pub(crate) usize);

impl LeafId {
    /// Returns the arena index of this leaf.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the BSP tree: either an internal partition or a terminal convex
/// region.
///
/// Leaves live in the tree's arena and are referenced by [`LeafId`]; this
/// keeps the leaf/portal cross-references index-based instead of cyclic.
#[derive(Debug, Clone)]
pub enum Node {
    /// An internal node splitting space along a partition line.
    Internal(InternalNode),
    /// A terminal convex region.
    Leaf(LeafId),
}

/// An internal node: a partition line, the polygons collinear with it, and
/// exclusive ownership of the two subtrees.
///
/// Invariant (established by the builder): every polygon reachable from the
/// front subtree classifies `Front` against the partition, and likewise for
/// the back subtree. No polygon below this node spans its partition.
#[derive(Debug, Clone)]
pub struct InternalNode {
    partition: PartitionLine,
    polygons: Vec<Polygon>,
    front: Box<Node>,
    back: Box<Node>,
}

impl InternalNode {
    /// Creates an internal node from its partition, collinear polygons, and
    /// subtrees.
    pub fn new(partition: PartitionLine, polygons: Vec<Polygon>, front: Node, back: Node) -> Self {
        Self {
            partition,
            polygons,
            front: Box::new(front),
            back: Box::new(back),
        }
    }

    /// Returns the partition line of this node.
    #[inline]
    pub fn partition(&self) -> &PartitionLine {
        &self.partition
    }

    /// Returns the polygons collinear with the partition.
    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Returns the front subtree.
    #[inline]
    pub fn front(&self) -> &Node {
        &self.front
    }

    /// Returns the back subtree.
    #[inline]
    pub fn back(&self) -> &Node {
        &self.back
    }

    pub(crate) fn polygons_mut(&mut self) -> &mut Vec<Polygon> {
        &mut self.polygons
    }

    pub(crate) fn children_mut(&mut self) -> (&mut Node, &mut Node) {
        (&mut self.front, &mut self.back)
    }
}

/// A terminal convex region of the partitioned floor plan.
///
/// Holds the polygons contained in (or collinear with the hull of) the
/// region, the floor and ceiling heights, the 2D bounds of its geometry, and
/// the portals connecting it to adjacent leaves. An empty leaf is open space:
/// floor −∞, ceiling +∞, no bounds.
#[derive(Debug, Clone)]
pub struct Leaf {
    polygons: Vec<Polygon>,
    floor: f32,
    ceiling: f32,
    bounds: Option<Bounds>,
    is_back: bool,
    portals: Vec<PortalId>,
}

impl Leaf {
    pub(crate) fn new(
        polygons: Vec<Polygon>,
        floor: f32,
        ceiling: f32,
        bounds: Option<Bounds>,
        is_back: bool,
    ) -> Self {
        Self {
            polygons,
            floor,
            ceiling,
            bounds,
            is_back,
            portals: Vec::new(),
        }
    }

    /// Returns the polygons owned by this leaf.
    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Returns the floor height (−∞ for open space).
    #[inline]
    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Returns the ceiling height (+∞ when undetermined).
    #[inline]
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Returns the 2D bounds of the leaf's geometry, or `None` for an empty
    /// (open void) leaf.
    #[inline]
    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// Returns `true` if this leaf is the back child of its parent node.
    /// Renderers use this for traversal-order disambiguation; collision does
    /// not care.
    #[inline]
    pub fn is_back(&self) -> bool {
        self.is_back
    }

    /// Returns the portals connecting this leaf to its neighbors.
    #[inline]
    pub fn portals(&self) -> &[PortalId] {
        &self.portals
    }

    /// Returns `true` if the leaf owns no geometry.
    #[inline]
    pub fn is_open_space(&self) -> bool {
        self.polygons.is_empty()
    }

    pub(crate) fn polygons_mut(&mut self) -> &mut Vec<Polygon> {
        &mut self.polygons
    }

    pub(crate) fn add_portal(&mut self, portal: PortalId) {
        self.portals.push(portal);
    }
}
