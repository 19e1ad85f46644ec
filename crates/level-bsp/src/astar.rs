//! A* search, generic over graphs, specialized to the portal graph.
//!
//! The generic search works on any [`SearchGraph`]; the portal-graph
//! specialization ([`PathFinder`]) searches leaf-to-leaf through portal
//! midpoints, presenting the synthetic start and goal nodes through an
//! augmented read-only view of the graph instead of splicing them into the
//! portal adjacency lists.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

use nalgebra::{Point2, Point3};

use crate::bsp::node::LeafId;
use crate::bsp::tree::Tree;
use crate::portal::PortalId;

/// A graph searchable by [`astar`].
///
/// `estimated_cost` must be admissible (never overestimate the true
/// remaining cost) for the search to return optimal paths; Euclidean
/// distance in the 2D plane satisfies this for portal midpoints.
pub trait SearchGraph {
    /// Node handle; cheap to copy and hashable.
    type Node: Copy + Eq + Hash;

    /// The neighbors reachable from a node.
    fn neighbors(&self, node: Self::Node) -> Vec<Self::Node>;

    /// The true cost of traversing the edge `from -> to`.
    fn cost(&self, from: Self::Node, to: Self::Node) -> f32;

    /// An admissible estimate of the remaining cost from `from` to `goal`.
    fn estimated_cost(&self, from: Self::Node, goal: Self::Node) -> f32;
}

/// An open-list entry ordered by total estimated cost, with insertion order
/// as the tie breaker (earlier insertions pop first).
struct OpenEntry<N> {
    f: f32,
    seq: u64,
    node: N,
}

impl<N> PartialEq for OpenEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl<N> Eq for OpenEntry<N> {}

impl<N> Ord for OpenEntry<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both orderings for a min-heap.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<N> PartialOrd for OpenEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Classic A* over a [`SearchGraph`].
///
/// Relaxation re-opens closed nodes whenever a strictly shorter path to them
/// is found, so the search stays optimal even with marginally inconsistent
/// heuristics. Returns the path with the start excluded and the goal
/// included, or `None` when the goal is unreachable.
pub fn astar<G: SearchGraph>(graph: &G, start: G::Node, goal: G::Node) -> Option<Vec<G::Node>> {
    let mut open = BinaryHeap::new();
    let mut g_cost: HashMap<G::Node, f32> = HashMap::new();
    let mut parent: HashMap<G::Node, G::Node> = HashMap::new();
    let mut closed: HashSet<G::Node> = HashSet::new();
    let mut seq = 0u64;

    g_cost.insert(start, 0.0);
    open.push(OpenEntry {
        f: graph.estimated_cost(start, goal),
        seq,
        node: start,
    });

    while let Some(entry) = open.pop() {
        let node = entry.node;
        if closed.contains(&node) {
            // Stale entry superseded by a shorter path.
            continue;
        }
        if node == goal {
            return Some(reconstruct(&parent, start, goal));
        }
        closed.insert(node);

        let node_cost = g_cost[&node];
        for neighbor in graph.neighbors(node) {
            let tentative = node_cost + graph.cost(node, neighbor);
            let known = g_cost.get(&neighbor).copied().unwrap_or(f32::INFINITY);
            if tentative < known {
                g_cost.insert(neighbor, tentative);
                parent.insert(neighbor, node);
                closed.remove(&neighbor);
                seq += 1;
                open.push(OpenEntry {
                    f: tentative + graph.estimated_cost(neighbor, goal),
                    seq,
                    node: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct<N: Copy + Eq + Hash>(parent: &HashMap<N, N>, start: N, goal: N) -> Vec<N> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = parent[&current];
        if current != start {
            path.push(current);
        }
    }
    path.reverse();
    path
}

/// A node in the portal-graph search: the synthetic endpoints plus the real
/// portals between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PathNode {
    Start,
    Portal(PortalId),
    Goal,
}

/// The portal graph of a tree, augmented with a synthetic start and goal.
///
/// The goal is exposed as an extra neighbor of every portal touching the
/// goal leaf; the underlying tree is never mutated, so the portal adjacency
/// observed by other callers is unaffected by a running or finished search.
struct AugmentedPortalGraph<'a> {
    tree: &'a Tree,
    start: Point3<f32>,
    goal: Point3<f32>,
    start_leaf: LeafId,
    goal_leaf: LeafId,
}

impl AugmentedPortalGraph<'_> {
    fn position(&self, node: PathNode) -> Point3<f32> {
        match node {
            PathNode::Start => self.start,
            PathNode::Portal(id) => self.tree.portal(id).midpoint(),
            PathNode::Goal => self.goal,
        }
    }

    /// Distance in the horizontal plane; heights do not contribute to
    /// traversal cost.
    fn distance(&self, from: PathNode, to: PathNode) -> f32 {
        let a = self.position(from);
        let b = self.position(to);
        (Point2::new(a.x, a.z) - Point2::new(b.x, b.z)).norm()
    }
}

impl SearchGraph for AugmentedPortalGraph<'_> {
    type Node = PathNode;

    fn neighbors(&self, node: PathNode) -> Vec<PathNode> {
        match node {
            PathNode::Start => self
                .tree
                .leaf(self.start_leaf)
                .portals()
                .iter()
                .map(|id| PathNode::Portal(*id))
                .collect(),
            PathNode::Portal(id) => {
                let portal = self.tree.portal(id);
                let mut neighbors: Vec<PathNode> = Vec::new();
                for leaf in [portal.front_leaf(), portal.back_leaf()] {
                    for other in self.tree.leaf(leaf).portals() {
                        if *other != id && !neighbors.contains(&PathNode::Portal(*other)) {
                            neighbors.push(PathNode::Portal(*other));
                        }
                    }
                }
                if portal.connects(self.goal_leaf) {
                    neighbors.push(PathNode::Goal);
                }
                neighbors
            }
            PathNode::Goal => Vec::new(),
        }
    }

    fn cost(&self, from: PathNode, to: PathNode) -> f32 {
        self.distance(from, to)
    }

    fn estimated_cost(&self, from: PathNode, _goal: PathNode) -> f32 {
        self.distance(from, PathNode::Goal)
    }
}

/// Leaf-to-leaf pathfinding over a tree's portal graph.
///
/// Requires [`build_portals`](crate::portal::build_portals) to have run on
/// the tree.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    tree: &'a Tree,
}

impl<'a> PathFinder<'a> {
    /// Creates a pathfinder borrowing the tree.
    pub fn new(tree: &'a Tree) -> Self {
        Self { tree }
    }

    /// Finds a waypoint path from `start` to `goal`.
    ///
    /// Both positions are resolved to leaves first; within a single leaf the
    /// path is trivially the goal itself and no search runs. Otherwise the
    /// result is the portal midpoints to cross, followed by the goal; the
    /// start is excluded. Returns `None` when no portal path connects the
    /// two leaves.
    pub fn find_path(&self, start: Point3<f32>, goal: Point3<f32>) -> Option<Vec<Point3<f32>>> {
        let start_leaf = self.tree.leaf_at(start.x, start.z);
        let goal_leaf = self.tree.leaf_at(goal.x, goal.z);
        if start_leaf == goal_leaf {
            return Some(vec![goal]);
        }

        let graph = AugmentedPortalGraph {
            tree: self.tree,
            start,
            goal,
            start_leaf,
            goal_leaf,
        };
        let nodes = astar(&graph, PathNode::Start, PathNode::Goal)?;
        Some(nodes.into_iter().map(|node| graph.position(node)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A small explicit graph for exercising the generic search.
    struct TestGraph {
        edges: Vec<Vec<(usize, f32)>>,
        positions: Vec<(f32, f32)>,
    }

    impl SearchGraph for &TestGraph {
        type Node = usize;

        fn neighbors(&self, node: usize) -> Vec<usize> {
            self.edges[node].iter().map(|(n, _)| *n).collect()
        }

        fn cost(&self, from: usize, to: usize) -> f32 {
            self.edges[from]
                .iter()
                .find(|(n, _)| *n == to)
                .map(|(_, c)| *c)
                .expect("cost queried for a non-edge")
        }

        fn estimated_cost(&self, from: usize, goal: usize) -> f32 {
            let (ax, ay) = self.positions[from];
            let (bx, by) = self.positions[goal];
            ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
        }
    }

    fn undirected(edges: &[(usize, usize, f32)], positions: Vec<(f32, f32)>) -> TestGraph {
        let mut graph = TestGraph {
            edges: vec![Vec::new(); positions.len()],
            positions,
        };
        for (a, b, cost) in edges {
            graph.edges[*a].push((*b, *cost));
            graph.edges[*b].push((*a, *cost));
        }
        graph
    }

    /// Brute-force all-pairs shortest path for cross-checking.
    fn floyd_warshall(graph: &TestGraph) -> Vec<Vec<f32>> {
        let n = graph.positions.len();
        let mut dist = vec![vec![f32::INFINITY; n]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        for (a, targets) in graph.edges.iter().enumerate() {
            for (b, cost) in targets {
                dist[a][*b] = dist[a][*b].min(*cost);
            }
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    if dist[i][k] + dist[k][j] < dist[i][j] {
                        dist[i][j] = dist[i][k] + dist[k][j];
                    }
                }
            }
        }
        dist
    }

    fn path_cost(graph: &TestGraph, start: usize, path: &[usize]) -> f32 {
        let mut cost = 0.0;
        let mut current = start;
        for node in path {
            cost += (&graph).cost(current, *node);
            current = *node;
        }
        cost
    }

    #[test]
    fn finds_shortest_path_on_grid_with_detour() {
        // 0 - 1 - 2 with a cheap long way around through 3, 4.
        let graph = undirected(
            &[
                (0, 1, 10.0),
                (1, 2, 10.0),
                (0, 3, 1.0),
                (3, 4, 1.0),
                (4, 2, 1.0),
            ],
            vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.5, 0.5), (1.5, 0.5)],
        );
        let path = astar(&&graph, 0, 2).unwrap();
        assert_eq!(path, vec![3, 4, 2]);
        assert_relative_eq!(path_cost(&graph, 0, &path), 3.0);
    }

    #[test]
    fn matches_brute_force_on_synthetic_graphs() {
        // A ring with chords, well under the 20-node property bound.
        let positions: Vec<(f32, f32)> = (0..12)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 12.0;
                (angle.cos() * 10.0, angle.sin() * 10.0)
            })
            .collect();
        let mut edges: Vec<(usize, usize, f32)> = (0..12)
            .map(|i| {
                let j = (i + 1) % 12;
                let (ax, ay) = positions[i];
                let (bx, by) = positions[j];
                (i, j, ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
            })
            .collect();
        // Chord weights stay at or above straight-line distance so the
        // Euclidean heuristic stays admissible.
        edges.push((0, 6, 20.5));
        edges.push((2, 9, 19.5));
        let graph = undirected(&edges, positions);

        let dist = floyd_warshall(&graph);
        for start in 0..12 {
            for goal in 0..12 {
                if start == goal {
                    continue;
                }
                let path = astar(&&graph, start, goal).expect("ring is connected");
                assert_eq!(*path.last().unwrap(), goal);
                assert_relative_eq!(
                    path_cost(&graph, start, &path),
                    dist[start][goal],
                    epsilon = 1e-3
                );
            }
        }
    }

    #[test]
    fn unreachable_goal_returns_none() {
        let graph = undirected(&[(0, 1, 1.0)], vec![(0.0, 0.0), (1.0, 0.0), (5.0, 0.0)]);
        assert!(astar(&&graph, 0, 2).is_none());
    }

    #[test]
    fn path_excludes_start_and_includes_goal() {
        let graph = undirected(
            &[(0, 1, 1.0), (1, 2, 1.0)],
            vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)],
        );
        let path = astar(&&graph, 0, 2).unwrap();
        assert_eq!(path, vec![1, 2]);
    }

    mod portal_paths {
        use super::*;
        use crate::bsp::builder::Builder;
        use crate::polygon::{Polygon, PolygonKind};
        use crate::portal::build_portals;

        fn quad(
            a: Point3<f32>,
            b: Point3<f32>,
            c: Point3<f32>,
            d: Point3<f32>,
            kind: PolygonKind,
        ) -> Polygon {
            Polygon::new(vec![a, b, c, d], kind)
        }

        /// Three rooms in a row with passable boundaries at x = 5 and x = 10.
        fn three_rooms() -> Tree {
            let mut polygons = vec![
                quad(
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(15.0, 0.0, 0.0),
                    Point3::new(15.0, 0.0, 5.0),
                    Point3::new(0.0, 0.0, 5.0),
                    PolygonKind::Floor,
                ),
                quad(
                    Point3::new(0.0, 3.0, 0.0),
                    Point3::new(15.0, 3.0, 0.0),
                    Point3::new(15.0, 3.0, 5.0),
                    Point3::new(0.0, 3.0, 5.0),
                    PolygonKind::Floor,
                ),
            ];
            for x in [5.0, 10.0] {
                polygons.push(quad(
                    Point3::new(x, 0.0, 0.0),
                    Point3::new(x, 0.0, 5.0),
                    Point3::new(x, 0.5, 5.0),
                    Point3::new(x, 0.5, 0.0),
                    PolygonKind::PassableWall,
                ));
            }
            let mut tree = Builder::new().build(polygons).unwrap();
            build_portals(&mut tree);
            tree
        }

        #[test]
        fn same_leaf_path_is_trivial() {
            let tree = three_rooms();
            let finder = PathFinder::new(&tree);
            let goal = Point3::new(3.0, 0.0, 3.0);
            let path = finder.find_path(Point3::new(1.0, 0.0, 1.0), goal).unwrap();
            assert_eq!(path, vec![goal]);
        }

        #[test]
        fn path_crosses_portals_in_order() {
            let tree = three_rooms();
            let finder = PathFinder::new(&tree);
            let goal = Point3::new(14.0, 0.0, 2.5);
            let path = finder
                .find_path(Point3::new(1.0, 0.0, 2.5), goal)
                .expect("rooms are connected");

            assert_eq!(path.len(), 3);
            assert_relative_eq!(path[0].x, 5.0, epsilon = 1e-4);
            assert_relative_eq!(path[1].x, 10.0, epsilon = 1e-4);
            assert_eq!(path[2], goal);
        }

        #[test]
        fn disconnected_rooms_have_no_path() {
            // Replace the second opening with a solid wall.
            let polygons = vec![
                quad(
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(15.0, 0.0, 0.0),
                    Point3::new(15.0, 0.0, 5.0),
                    Point3::new(0.0, 0.0, 5.0),
                    PolygonKind::Floor,
                ),
                quad(
                    Point3::new(0.0, 3.0, 0.0),
                    Point3::new(15.0, 3.0, 0.0),
                    Point3::new(15.0, 3.0, 5.0),
                    Point3::new(0.0, 3.0, 5.0),
                    PolygonKind::Floor,
                ),
                quad(
                    Point3::new(5.0, 0.0, 0.0),
                    Point3::new(5.0, 0.0, 5.0),
                    Point3::new(5.0, 0.5, 5.0),
                    Point3::new(5.0, 0.5, 0.0),
                    PolygonKind::PassableWall,
                ),
                quad(
                    Point3::new(10.0, 0.0, 0.0),
                    Point3::new(10.0, 0.0, 5.0),
                    Point3::new(10.0, 3.0, 5.0),
                    Point3::new(10.0, 3.0, 0.0),
                    PolygonKind::Wall,
                ),
            ];
            let mut tree = Builder::new().build(polygons).unwrap();
            build_portals(&mut tree);

            let finder = PathFinder::new(&tree);
            assert!(
                finder
                    .find_path(Point3::new(1.0, 0.0, 2.5), Point3::new(14.0, 0.0, 2.5))
                    .is_none()
            );
        }

        #[test]
        fn search_leaves_portal_lists_untouched() {
            let tree = three_rooms();
            let before: Vec<Vec<PortalId>> = tree
                .leaves()
                .iter()
                .map(|leaf| leaf.portals().to_vec())
                .collect();

            let finder = PathFinder::new(&tree);
            // One successful and one failed search.
            let _ = finder.find_path(Point3::new(1.0, 0.0, 2.5), Point3::new(14.0, 0.0, 2.5));
            let _ = finder.find_path(Point3::new(1.0, 0.0, 2.5), Point3::new(100.0, 0.0, 100.0));

            let after: Vec<Vec<PortalId>> = tree
                .leaves()
                .iter()
                .map(|leaf| leaf.portals().to_vec())
                .collect();
            assert_eq!(before, after);
        }
    }
}
