//! Visitor pattern for BSP tree traversal.
//!
//! Visitors allow custom processing of polygons during tree traversal
//! without coupling traversal logic to specific use cases: painter's
//! algorithm rendering, bounds accumulation, surface precomputation.

use nalgebra::Point2;

use crate::polygon::Polygon;

use super::node::{Leaf, Node};

/// Visitor for processing polygons during BSP tree traversal.
pub trait LevelVisitor {
    /// Called for each polygon during traversal.
    ///
    /// `is_back_leaf` is set for polygons owned by a leaf flagged as the back
    /// child of its parent (a rendering concern; other consumers may ignore
    /// it). Returning `false` stops the traversal immediately — a renderer
    /// does this once the view is fully covered.
    fn visit(&mut self, polygon: &Polygon, is_back_leaf: bool) -> bool;

    /// Called when traversal enters a leaf, before its polygons.
    ///
    /// The default implementation does nothing; a visibility collaborator can
    /// override this to record the leaf's 2D bounds.
    fn visit_leaf(&mut self, leaf: &Leaf) {
        let _ = leaf;
    }
}

/// A simple visitor that collects all visited polygons in visitation order.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<Polygon>,
}

impl CollectingVisitor {
    /// Creates a new empty collecting visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected polygons.
    pub fn into_polygons(self) -> Vec<Polygon> {
        self.collected
    }

    /// Returns a reference to the collected polygons.
    pub fn polygons(&self) -> &[Polygon] {
        &self.collected
    }
}

impl LevelVisitor for CollectingVisitor {
    fn visit(&mut self, polygon: &Polygon, _is_back_leaf: bool) -> bool {
        self.collected.push(polygon.clone());
        true
    }
}

/// A visitor that calls a closure for each polygon.
pub struct FnVisitor<F>
where
    F: FnMut(&Polygon, bool) -> bool,
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(&Polygon, bool) -> bool,
{
    /// Creates a new visitor from a closure; the closure's return value
    /// controls early termination like [`LevelVisitor::visit`].
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> LevelVisitor for FnVisitor<F>
where
    F: FnMut(&Polygon, bool) -> bool,
{
    fn visit(&mut self, polygon: &Polygon, is_back_leaf: bool) -> bool {
        (self.func)(polygon, is_back_leaf)
    }
}

/// In-order traversal: front subtree, node polygons, back subtree.
///
/// Returns `false` if the visitor stopped the traversal.
pub(crate) fn traverse_in_order<V: LevelVisitor>(
    node: &Node,
    leaves: &[Leaf],
    visitor: &mut V,
) -> bool {
    match node {
        Node::Leaf(id) => visit_leaf(&leaves[id.index()], visitor),
        Node::Internal(internal) => {
            traverse_in_order(internal.front(), leaves, visitor)
                && visit_polygons(internal.polygons(), false, visitor)
                && traverse_in_order(internal.back(), leaves, visitor)
        }
    }
}

/// View-dependent traversal: the subtree on the eye's side of each partition
/// is visited first (front-to-back) or last (back-to-front), which yields a
/// strict depth ordering of all polygons for that eye position.
///
/// Returns `false` if the visitor stopped the traversal.
pub(crate) fn traverse_ordered<V: LevelVisitor>(
    node: &Node,
    leaves: &[Leaf],
    eye: Point2<f32>,
    front_to_back: bool,
    visitor: &mut V,
) -> bool {
    match node {
        Node::Leaf(id) => visit_leaf(&leaves[id.index()], visitor),
        Node::Internal(internal) => {
            use crate::line::LineSide;
            let eye_in_front = internal.partition().side_thick(eye) != LineSide::Back;
            let (near, far) = if eye_in_front == front_to_back {
                (internal.front(), internal.back())
            } else {
                (internal.back(), internal.front())
            };

            traverse_ordered(near, leaves, eye, front_to_back, visitor)
                && visit_polygons(internal.polygons(), false, visitor)
                && traverse_ordered(far, leaves, eye, front_to_back, visitor)
        }
    }
}

fn visit_leaf<V: LevelVisitor>(leaf: &Leaf, visitor: &mut V) -> bool {
    visitor.visit_leaf(leaf);
    visit_polygons(leaf.polygons(), leaf.is_back(), visitor)
}

fn visit_polygons<V: LevelVisitor>(
    polygons: &[Polygon],
    is_back_leaf: bool,
    visitor: &mut V,
) -> bool {
    polygons
        .iter()
        .all(|polygon| visitor.visit(polygon, is_back_leaf))
}
