//! BSP tree construction.

use log::{debug, trace};
use nalgebra::Point3;

use crate::cut::Cut;
use crate::error::BuildError;
use crate::line::{LINE_EPSILON, LineClassification};
use crate::polygon::Polygon;
use crate::rect::Bounds;

use super::node::{InternalNode, Leaf, LeafId, Node};
use super::selector::{FewestSplits, PartitionSelector};
use super::tree::Tree;

/// Builds a BSP tree from a flat polygon list.
///
/// The builder consumes the list, splitting spanning polygons as it descends,
/// and produces a [`Tree`] of internal partitions and convex leaves. Recursion
/// stops for a working set when no wall in it separates the remaining
/// geometry; the leaf then owns every polygon of the set.
///
/// Construction runs once at level-load time, single-threaded; the resulting
/// tree is read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Builder<S = FewestSplits> {
    selector: S,
}

impl Builder<FewestSplits> {
    /// Creates a builder using the default partition heuristic
    /// ([`FewestSplits`]).
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: PartitionSelector> Builder<S> {
    /// Creates a builder using a custom partition heuristic.
    pub fn with_selector(selector: S) -> Self {
        Self { selector }
    }

    /// Builds the tree.
    ///
    /// Validates the input (non-empty, every wall has a derivable partition
    /// line), recursively partitions the polygons, then runs the T-junction
    /// repair pass over the finished tree.
    pub fn build(&self, polygons: Vec<Polygon>) -> Result<Tree, BuildError> {
        if polygons.is_empty() {
            return Err(BuildError::NoPolygons);
        }
        for (index, polygon) in polygons.iter().enumerate() {
            if polygon.kind().is_wall() && polygon.wall_line().is_none() {
                return Err(BuildError::DegenerateWall { index });
            }
        }

        let input_count = polygons.len();
        let mut leaves = Vec::new();
        let mut splits = 0usize;
        let mut root = self.build_node(polygons, false, &mut leaves, &mut splits);

        repair_t_junctions(&mut root, &mut leaves);

        let tree = Tree::new(root, leaves);
        debug!(
            "built BSP tree: {} input polygons, {} splits, {} leaves, depth {}",
            input_count,
            splits,
            tree.leaf_count(),
            tree.depth()
        );
        Ok(tree)
    }

    fn build_node(
        &self,
        polygons: Vec<Polygon>,
        is_back: bool,
        leaves: &mut Vec<Leaf>,
        splits: &mut usize,
    ) -> Node {
        let Some(partition_idx) = self.selector.select(&polygons) else {
            return build_leaf(polygons, is_back, leaves);
        };
        let partition = polygons[partition_idx]
            .wall_line()
            .expect("selector must return a wall with a derivable line");

        let mut collinear = Vec::new();
        let mut front_list = Vec::new();
        let mut back_list = Vec::new();

        for polygon in polygons {
            match polygon.classify(&partition) {
                LineClassification::Front => front_list.push(polygon),
                LineClassification::Back => back_list.push(polygon),
                LineClassification::Collinear => collinear.push(polygon),
                LineClassification::Spanning => {
                    *splits += 1;
                    let (front_part, back_part) = polygon.cut(&partition);
                    if let Some(f) = front_part {
                        front_list.push(f);
                    }
                    if let Some(b) = back_part {
                        back_list.push(b);
                    }
                }
            }
        }

        trace!(
            "partition at ({:.2}, {:.2})..({:.2}, {:.2}): {} front, {} back, {} collinear",
            partition.start().x,
            partition.start().y,
            partition.end().x,
            partition.end().y,
            front_list.len(),
            back_list.len(),
            collinear.len()
        );

        let front = self.build_node(front_list, false, leaves, splits);
        let back = self.build_node(back_list, true, leaves, splits);
        Node::Internal(InternalNode::new(partition, collinear, front, back))
    }
}

/// Constructs a leaf from a working set no wall can partition.
///
/// Floor height is the lowest horizontal surface, raised to the highest
/// internal platform (a horizontal polygon strictly between the extremes);
/// ceiling height is the highest horizontal surface. With fewer than two
/// distinct elevations the missing heights fall back to the ±∞ open-space
/// sentinels.
fn build_leaf(polygons: Vec<Polygon>, is_back: bool, leaves: &mut Vec<Leaf>) -> Node {
    let elevations: Vec<f32> = polygons
        .iter()
        .filter(|p| p.is_horizontal())
        .map(|p| p.centroid().y)
        .collect();

    let (floor, ceiling) = match elevations.len() {
        0 => (f32::NEG_INFINITY, f32::INFINITY),
        1 => (elevations[0], f32::INFINITY),
        _ => {
            let min = elevations.iter().copied().fold(f32::INFINITY, f32::min);
            let max = elevations.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut floor = min;
            for y in &elevations {
                // An internal platform raises the walkable floor.
                if *y > min + LINE_EPSILON && *y < max - LINE_EPSILON {
                    floor = floor.max(*y);
                }
            }
            (floor, max)
        }
    };

    let bounds = Bounds::from_vertices(polygons.iter().flat_map(|p| p.vertices()));

    let id = LeafId(leaves.len());
    leaves.push(Leaf::new(polygons, floor, ceiling, bounds, is_back));
    Node::Leaf(id)
}

/// Whole-tree T-junction repair.
///
/// Splitting inserts vertices that neighboring polygons do not know about;
/// any such vertex lying on another polygon's edge is inserted there too, so
/// adjacent surfaces keep consistent shared boundaries for the intersection
/// tests downstream. Omitting this produces cracks that collision descent can
/// slip through.
fn repair_t_junctions(root: &mut Node, leaves: &mut [Leaf]) {
    let mut vertices: Vec<Point3<f32>> = Vec::new();
    for_each_polygon(root, leaves, &mut |polygon| {
        vertices.extend_from_slice(polygon.vertices());
    });

    let mut inserted = 0usize;
    for_each_polygon_mut(root, leaves, &mut |polygon| {
        for vertex in &vertices {
            if polygon.insert_vertex_on_edge(*vertex, LINE_EPSILON) {
                inserted += 1;
            }
        }
    });
    if inserted > 0 {
        debug!("T-junction repair inserted {inserted} vertices");
    }
}

fn for_each_polygon(node: &Node, leaves: &[Leaf], f: &mut impl FnMut(&Polygon)) {
    match node {
        Node::Leaf(id) => {
            for polygon in leaves[id.index()].polygons() {
                f(polygon);
            }
        }
        Node::Internal(internal) => {
            for polygon in internal.polygons() {
                f(polygon);
            }
            for_each_polygon(internal.front(), leaves, f);
            for_each_polygon(internal.back(), leaves, f);
        }
    }
}

fn for_each_polygon_mut(node: &mut Node, leaves: &mut [Leaf], f: &mut impl FnMut(&mut Polygon)) {
    match node {
        Node::Leaf(id) => {
            for polygon in leaves[id.index()].polygons_mut() {
                f(polygon);
            }
        }
        Node::Internal(internal) => {
            for polygon in internal.polygons_mut() {
                f(polygon);
            }
            let (front, back) = internal.children_mut();
            for_each_polygon_mut(front, leaves, f);
            for_each_polygon_mut(back, leaves, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::PolygonKind;
    use approx::assert_relative_eq;

    /// A closed rectangular room: floor, ceiling, four solid walls.
    fn make_room(x0: f32, z0: f32, x1: f32, z1: f32, y0: f32, y1: f32) -> Vec<Polygon> {
        let quad = |a: Point3<f32>, b: Point3<f32>, c: Point3<f32>, d: Point3<f32>, kind| {
            Polygon::new(vec![a, b, c, d], kind)
        };
        vec![
            quad(
                Point3::new(x0, y0, z0),
                Point3::new(x1, y0, z0),
                Point3::new(x1, y0, z1),
                Point3::new(x0, y0, z1),
                PolygonKind::Floor,
            ),
            quad(
                Point3::new(x0, y1, z0),
                Point3::new(x1, y1, z0),
                Point3::new(x1, y1, z1),
                Point3::new(x0, y1, z1),
                PolygonKind::Floor,
            ),
            quad(
                Point3::new(x0, y0, z0),
                Point3::new(x1, y0, z0),
                Point3::new(x1, y1, z0),
                Point3::new(x0, y1, z0),
                PolygonKind::Wall,
            ),
            quad(
                Point3::new(x0, y0, z1),
                Point3::new(x1, y0, z1),
                Point3::new(x1, y1, z1),
                Point3::new(x0, y1, z1),
                PolygonKind::Wall,
            ),
            quad(
                Point3::new(x0, y0, z0),
                Point3::new(x0, y0, z1),
                Point3::new(x0, y1, z1),
                Point3::new(x0, y1, z0),
                PolygonKind::Wall,
            ),
            quad(
                Point3::new(x1, y0, z0),
                Point3::new(x1, y0, z1),
                Point3::new(x1, y1, z1),
                Point3::new(x1, y1, z0),
                PolygonKind::Wall,
            ),
        ]
    }

    /// Two rooms side by side sharing a passable boundary at `x = x_split`.
    fn make_two_rooms() -> Vec<Polygon> {
        let mut polygons = Vec::new();
        // Shared shell: one floor and one ceiling spanning both rooms, outer walls.
        let shell = make_room(0.0, 0.0, 10.0, 5.0, 0.0, 3.0);
        polygons.extend(shell);
        // Passable divider at x = 5.
        polygons.push(Polygon::new(
            vec![
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(5.0, 0.0, 5.0),
                Point3::new(5.0, 0.5, 5.0),
                Point3::new(5.0, 0.5, 0.0),
            ],
            PolygonKind::PassableWall,
        ));
        polygons
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            Builder::new().build(vec![]).unwrap_err(),
            BuildError::NoPolygons
        );
    }

    #[test]
    fn degenerate_wall_is_an_error() {
        let bad = Polygon::new(
            vec![
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(1.0, 2.0, 1.0),
            ],
            PolygonKind::Wall,
        );
        assert_eq!(
            Builder::new().build(vec![bad]).unwrap_err(),
            BuildError::DegenerateWall { index: 0 }
        );
    }

    #[test]
    fn single_room_builds_one_leaf() {
        let tree = Builder::new().build(make_room(0.0, 0.0, 8.0, 6.0, 0.0, 3.0)).unwrap();

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.polygon_count(), 6);

        let leaf = tree.leaf(tree.leaf_at(4.0, 3.0));
        assert_eq!(leaf.polygons().len(), 6);
        assert_relative_eq!(leaf.floor(), 0.0);
        assert_relative_eq!(leaf.ceiling(), 3.0);
        assert!(!leaf.is_back());
        assert!(leaf.bounds().unwrap().contains(4.0, 3.0));
    }

    #[test]
    fn two_rooms_build_at_least_two_leaves() {
        let tree = Builder::new().build(make_two_rooms()).unwrap();
        assert!(tree.leaf_count() >= 2);

        let left = tree.leaf_at(2.0, 2.5);
        let right = tree.leaf_at(8.0, 2.5);
        assert_ne!(left, right);
        assert_relative_eq!(tree.leaf(left).floor(), 0.0);
        assert_relative_eq!(tree.leaf(right).ceiling(), 3.0);
    }

    #[test]
    fn partition_invariant_holds_after_build() {
        fn check(node: &Node, tree: &Tree) {
            let Node::Internal(internal) = node else {
                return;
            };
            let line = internal.partition();
            let assert_side = |n: &Node, expected: LineClassification| {
                for_each_polygon(n, tree.leaves(), &mut |polygon| {
                    let class = polygon.classify(line);
                    assert!(
                        class == expected || class == LineClassification::Collinear,
                        "polygon {:?} classifies {:?}, expected {:?}",
                        polygon.vertices(),
                        class,
                        expected
                    );
                });
            };
            assert_side(internal.front(), LineClassification::Front);
            assert_side(internal.back(), LineClassification::Back);
            check(internal.front(), tree);
            check(internal.back(), tree);
        }

        let tree = Builder::new().build(make_two_rooms()).unwrap();
        check(tree.root(), &tree);
    }

    #[test]
    fn point_location_is_total_over_bounds() {
        let tree = Builder::new().build(make_two_rooms()).unwrap();
        let bounds = tree.bounds().unwrap();

        let steps = 20;
        for i in 0..=steps {
            for j in 0..=steps {
                let x = bounds.min().x
                    + (bounds.max().x - bounds.min().x) * (i as f32 / steps as f32);
                let z = bounds.min().y
                    + (bounds.max().y - bounds.min().y) * (j as f32 / steps as f32);
                let leaf = tree.leaf(tree.leaf_at(x, z));
                if let Some(leaf_bounds) = leaf.bounds() {
                    assert!(
                        leaf_bounds.contains(x, z),
                        "leaf bounds do not contain ({x}, {z})"
                    );
                }
                // Leaves without bounds are the open-space sentinel, which is
                // a valid answer anywhere.
            }
        }
    }

    #[test]
    fn platform_raises_leaf_floor() {
        let mut polygons = make_room(0.0, 0.0, 8.0, 6.0, 0.0, 3.0);
        // A raised platform covering the room interior at y = 1.
        polygons.push(Polygon::new(
            vec![
                Point3::new(2.0, 1.0, 2.0),
                Point3::new(6.0, 1.0, 2.0),
                Point3::new(6.0, 1.0, 4.0),
                Point3::new(2.0, 1.0, 4.0),
            ],
            PolygonKind::Floor,
        ));
        let tree = Builder::new().build(polygons).unwrap();
        let leaf = tree.leaf(tree.leaf_at(4.0, 3.0));
        assert_relative_eq!(leaf.floor(), 1.0);
        assert_relative_eq!(leaf.ceiling(), 3.0);
    }

    #[test]
    fn first_wall_selector_also_builds_valid_trees() {
        use super::super::selector::FirstWall;
        let tree = Builder::with_selector(FirstWall).build(make_two_rooms()).unwrap();
        assert!(tree.leaf_count() >= 2);
        assert_eq!(
            tree.polygon_count(),
            for_each_count(tree.root(), tree.leaves())
        );
    }

    fn for_each_count(node: &Node, leaves: &[Leaf]) -> usize {
        let mut count = 0;
        for_each_polygon(node, leaves, &mut |_| count += 1);
        count
    }

    #[test]
    fn split_floor_edges_are_repaired() {
        // The two-room divider splits the shared floor; both halves must end
        // up with matching vertices along x = 5.
        let tree = Builder::new().build(make_two_rooms()).unwrap();

        let mut boundary_vertices = 0usize;
        for_each_polygon(tree.root(), tree.leaves(), &mut |polygon| {
            if polygon.is_horizontal() {
                boundary_vertices += polygon
                    .vertices()
                    .iter()
                    .filter(|v| (v.x - 5.0).abs() < 1e-3)
                    .count();
            }
        });
        // Two floor halves and two ceiling halves, two boundary vertices each.
        assert!(boundary_vertices >= 8);
    }
}
