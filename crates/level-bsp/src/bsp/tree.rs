//! BSP tree container and query surface.

use nalgebra::Point2;

use crate::line::{LineClassification, LineSide, PartitionLine};
use crate::polygon::Polygon;
use crate::portal::{Portal, PortalId};
use crate::rect::Bounds;

use super::node::{InternalNode, Leaf, LeafId, Node};
use super::traverse::{FnVisitor, LevelVisitor, traverse_in_order, traverse_ordered};

/// A Binary Space Partitioning tree over a level's floor plan.
///
/// Built once at level-load time by [`Builder`](super::builder::Builder),
/// optionally augmented with portals by
/// [`build_portals`](crate::portal::build_portals), and read-only afterwards.
/// Leaves and portals live in index-addressed arenas so the leaf/portal
/// cross-references stay acyclic.
///
/// The tree contains no interior mutability; shared references to it may be
/// used freely from multiple threads.
#[derive(Debug, Clone)]
pub struct Tree {
    root: Node,
    leaves: Vec<Leaf>,
    portals: Vec<Portal>,
}

impl Tree {
    pub(crate) fn new(root: Node, leaves: Vec<Leaf>) -> Self {
        Self {
            root,
            leaves,
            portals: Vec::new(),
        }
    }

    /// Builds a tree using the default partition heuristic. Shorthand for
    /// [`Builder::new().build(..)`](super::builder::Builder::build).
    pub fn from_polygons(polygons: Vec<Polygon>) -> Result<Self, crate::error::BuildError> {
        super::builder::Builder::new().build(polygons)
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Returns the leaf arena.
    #[inline]
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Returns the leaf behind a handle.
    #[inline]
    pub fn leaf(&self, id: LeafId) -> &Leaf {
        &self.leaves[id.0]
    }

    pub(crate) fn leaf_mut(&mut self, id: LeafId) -> &mut Leaf {
        &mut self.leaves[id.0]
    }

    /// Returns the number of leaves.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Returns the portal arena.
    #[inline]
    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    /// Returns the portal behind a handle.
    #[inline]
    pub fn portal(&self, id: PortalId) -> &Portal {
        &self.portals[id.index()]
    }

    pub(crate) fn push_portal(&mut self, portal: Portal) -> PortalId {
        let id = PortalId(self.portals.len());
        self.portals.push(portal);
        id
    }

    /// Finds the leaf containing the point (x, z).
    ///
    /// Total for any input: points outside all built geometry land in an
    /// open-space sentinel leaf (floor −∞, ceiling +∞) rather than failing.
    /// O(depth).
    pub fn leaf_at(&self, x: f32, z: f32) -> LeafId {
        let point = Point2::new(x, z);
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(id) => return *id,
                Node::Internal(internal) => {
                    node = match internal.partition().side_thin(point) {
                        LineSide::Back => internal.back(),
                        _ => internal.front(),
                    };
                }
            }
        }
    }

    /// Finds a node whose partition is collinear with the given line.
    ///
    /// The front subtree is searched before the back. Used during portal
    /// construction to detect solid walls along a candidate boundary.
    pub fn collinear_node(&self, line: &PartitionLine) -> Option<&InternalNode> {
        fn find<'a>(node: &'a Node, line: &PartitionLine) -> Option<&'a InternalNode> {
            let Node::Internal(internal) = node else {
                return None;
            };
            match internal.partition().classify_line(line) {
                LineClassification::Collinear => Some(internal),
                LineClassification::Front => find(internal.front(), line),
                LineClassification::Back => find(internal.back(), line),
                LineClassification::Spanning => {
                    find(internal.front(), line).or_else(|| find(internal.back(), line))
                }
            }
        }
        find(&self.root, line)
    }

    /// Finds the leaf immediately in front of the given line.
    pub fn front_leaf(&self, line: &PartitionLine) -> LeafId {
        self.leaf_on_side(line, LineSide::Front)
    }

    /// Finds the leaf immediately behind the given line.
    pub fn back_leaf(&self, line: &PartitionLine) -> LeafId {
        self.leaf_on_side(line, LineSide::Back)
    }

    /// Descends choosing the branch matching the line's classification at
    /// each node, falling back to the requested side when the line is
    /// collinear with a partition. The result is not meaningful for a line
    /// spanning a partition, which cannot happen for a line already embedded
    /// in the tree.
    fn leaf_on_side(&self, line: &PartitionLine, side: LineSide) -> LeafId {
        debug_assert!(side != LineSide::Collinear, "requested side must be Front or Back");
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(id) => return *id,
                Node::Internal(internal) => {
                    node = match internal.partition().classify_line(line) {
                        LineClassification::Front => internal.front(),
                        LineClassification::Back => internal.back(),
                        _ => {
                            if side == LineSide::Front {
                                internal.front()
                            } else {
                                internal.back()
                            }
                        }
                    };
                }
            }
        }
    }

    /// Computes the 2D bounding rectangle over every vertex in the tree, or
    /// `None` for a tree without geometry.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        let mut visitor = FnVisitor::new(|polygon: &Polygon, _| {
            if let Some(b) = Bounds::from_vertices(polygon.vertices().iter()) {
                bounds = Some(match bounds {
                    Some(acc) => acc.union(&b),
                    None => b,
                });
            }
            true
        });
        traverse_in_order(&self.root, &self.leaves, &mut visitor);
        drop(visitor);
        bounds
    }

    /// Returns the total number of polygons in the tree.
    pub fn polygon_count(&self) -> usize {
        let mut count = 0usize;
        let mut visitor = FnVisitor::new(|_: &Polygon, _| {
            count += 1;
            true
        });
        traverse_in_order(&self.root, &self.leaves, &mut visitor);
        drop(visitor);
        count
    }

    /// Returns the maximum depth of the tree (1 for a single leaf).
    pub fn depth(&self) -> usize {
        fn node_depth(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 1,
                Node::Internal(internal) => {
                    1 + node_depth(internal.front()).max(node_depth(internal.back()))
                }
            }
        }
        node_depth(&self.root)
    }

    /// Traverses the whole tree in data order: front subtree, node polygons,
    /// back subtree. Order does not depend on any viewpoint.
    pub fn traverse_in_order<V: LevelVisitor>(&self, visitor: &mut V) {
        traverse_in_order(&self.root, &self.leaves, visitor);
    }

    /// Traverses the tree strictly front-to-back relative to `eye`.
    ///
    /// Consumers rely on this ordering for occlusion without a depth sort;
    /// the visitor may stop early once its view is covered.
    pub fn traverse_front_to_back<V: LevelVisitor>(&self, eye: Point2<f32>, visitor: &mut V) {
        traverse_ordered(&self.root, &self.leaves, eye, true, visitor);
    }

    /// Traverses the tree strictly back-to-front relative to `eye`.
    pub fn traverse_back_to_front<V: LevelVisitor>(&self, eye: Point2<f32>, visitor: &mut V) {
        traverse_ordered(&self.root, &self.leaves, eye, false, visitor);
    }
}
