//! Portal graph construction over a built BSP tree.
//!
//! A portal is a passable shared boundary between two adjacent leaves, and
//! doubles as an edge in the pathfinding graph. Portals are discovered by
//! scanning every leaf polygon edge: an edge with no solid wall along it,
//! with distinct built leaves on its two sides, is an opening movers can
//! cross.

use log::debug;
use nalgebra::Point3;

use crate::bsp::node::LeafId;
use crate::bsp::tree::Tree;
use crate::line::PartitionLine;
use crate::polygon::flatten;

/// Handle to a portal in the tree's portal arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortalId(pub(crate) usize);

impl PortalId {
    /// Returns the arena index of this portal.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A passable boundary between two adjacent leaves.
///
/// Portals are symmetric: both leaves reference the same portal object, and
/// traversal cost is identical in either direction. The midpoint sits at the
/// center of the shared segment, at the higher of the two floor heights, and
/// serves as the pathfinding waypoint.
#[derive(Debug, Clone)]
pub struct Portal {
    line: PartitionLine,
    front_leaf: LeafId,
    back_leaf: LeafId,
    midpoint: Point3<f32>,
}

impl Portal {
    /// Returns the shared boundary segment.
    #[inline]
    pub fn line(&self) -> &PartitionLine {
        &self.line
    }

    /// Returns the leaf on the front side of the boundary.
    #[inline]
    pub fn front_leaf(&self) -> LeafId {
        self.front_leaf
    }

    /// Returns the leaf on the back side of the boundary.
    #[inline]
    pub fn back_leaf(&self) -> LeafId {
        self.back_leaf
    }

    /// Returns the waypoint at the center of the boundary.
    #[inline]
    pub fn midpoint(&self) -> Point3<f32> {
        self.midpoint
    }

    /// Returns `true` if the portal touches the given leaf.
    #[inline]
    pub fn connects(&self, leaf: LeafId) -> bool {
        self.front_leaf == leaf || self.back_leaf == leaf
    }

    /// Returns the leaf on the other side of the portal from `leaf`.
    ///
    /// Returns `leaf` itself if the portal does not touch it.
    pub fn other_leaf(&self, leaf: LeafId) -> LeafId {
        if self.front_leaf == leaf {
            self.back_leaf
        } else if self.back_leaf == leaf {
            self.front_leaf
        } else {
            leaf
        }
    }
}

/// Discovers portals between adjacent leaves and attaches them to the tree.
///
/// For every edge of every leaf polygon (projected to the horizontal plane):
/// - edges already seen by this leaf are skipped (segment-set dedup);
/// - edges with a solid wall collinear in the tree are real walls, not
///   portals;
/// - otherwise the leaves immediately in front of and behind the edge are
///   looked up; a portal is created when they are distinct and both have
///   built geometry (open-void leaves cannot be traveled through).
///
/// A shared boundary yields exactly one portal, referenced from both leaves'
/// portal lists. Call this once, after [`Builder::build`](crate::bsp::Builder::build).
pub fn build_portals(tree: &mut Tree) {
    let mut created: Vec<Portal> = Vec::new();

    for leaf_index in 0..tree.leaf_count() {
        let leaf_id = LeafId(leaf_index);
        let mut seen: Vec<PartitionLine> = Vec::new();

        for polygon_index in 0..tree.leaf(leaf_id).polygons().len() {
            let vertex_count = tree.leaf(leaf_id).polygons()[polygon_index].len();
            for i in 0..vertex_count {
                let polygon = &tree.leaf(leaf_id).polygons()[polygon_index];
                let a = flatten(polygon.vertices()[i]);
                let b = flatten(polygon.vertices()[(i + 1) % vertex_count]);
                if (b - a).norm() <= f32::EPSILON {
                    // Vertical wall edges project to a point.
                    continue;
                }
                let edge = PartitionLine::new(a, b);

                if seen.iter().any(|line| line.equals_ignoring_order(&edge)) {
                    continue;
                }
                seen.push(edge.clone());

                if created
                    .iter()
                    .any(|p| p.connects(leaf_id) && p.line.equals_ignoring_order(&edge))
                {
                    // The adjacent leaf already created this portal.
                    continue;
                }

                if let Some(portal) = try_create_portal(tree, &edge) {
                    created.push(portal);
                }
            }
        }
    }

    debug!("portal graph: {} portals over {} leaves", created.len(), tree.leaf_count());

    for portal in created {
        let front = portal.front_leaf;
        let back = portal.back_leaf;
        let id = tree.push_portal(portal);
        tree.leaf_mut(front).add_portal(id);
        tree.leaf_mut(back).add_portal(id);
    }
}

fn try_create_portal(tree: &Tree, edge: &PartitionLine) -> Option<Portal> {
    // A solid wall along the edge means it is a real boundary.
    if let Some(node) = tree.collinear_node(edge) {
        if node
            .polygons()
            .iter()
            .any(|p| p.kind() == crate::polygon::PolygonKind::Wall)
        {
            return None;
        }
    }

    let front = tree.front_leaf(edge);
    let back = tree.back_leaf(edge);
    if front == back {
        return None;
    }
    if tree.leaf(front).bounds().is_none() || tree.leaf(back).bounds().is_none() {
        return None;
    }

    let mid2 = edge.midpoint();
    let floor = tree.leaf(front).floor().max(tree.leaf(back).floor());
    Some(Portal {
        line: edge.clone(),
        front_leaf: front,
        back_leaf: back,
        midpoint: Point3::new(mid2.x, floor, mid2.y),
    })
}
