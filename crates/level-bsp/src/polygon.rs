//! Level polygon representation for BSP trees.

use nalgebra::{Point2, Point3, Vector3};

use crate::line::{LineClassification, PartitionLine, combine_sides};

/// Role of a polygon within the level geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonKind {
    /// A horizontal surface: floor or ceiling, distinguished by normal sign.
    Floor,
    /// A solid vertical wall that blocks movement and sight.
    Wall,
    /// A wall that movers can cross (a doorway sill, a low threshold).
    /// Portal placement treats these as open boundaries.
    PassableWall,
}

impl PolygonKind {
    /// Returns `true` for both solid and passable walls.
    #[inline]
    pub fn is_wall(self) -> bool {
        matches!(self, PolygonKind::Wall | PolygonKind::PassableWall)
    }
}

/// A convex polygon in 3D space, defined by an ordered list of vertices and a
/// level-geometry role.
///
/// Vertices should be coplanar and consistently wound. The horizontal plane is
/// (x, z) with y as height; walls are vertical and derive a 2D
/// [`PartitionLine`], floors and ceilings carry a ±Y normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point3<f32>>,
    kind: PolygonKind,
}

impl Polygon {
    /// Creates a new polygon from a list of vertices.
    ///
    /// Convexity and planarity are a caller contract (the map loader's job);
    /// only the vertex count is checked here.
    ///
    /// # Panics (debug builds only)
    /// Panics if fewer than 3 vertices are provided.
    pub fn new(vertices: Vec<Point3<f32>>, kind: PolygonKind) -> Self {
        debug_assert!(vertices.len() >= 3, "Polygon must have at least 3 vertices");
        Self { vertices, kind }
    }

    /// Returns the vertices of the polygon.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    /// Returns the polygon's role in the level geometry.
    #[inline]
    pub fn kind(&self) -> PolygonKind {
        self.kind
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the polygon has no vertices (never true for valid polygons).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Computes the (unnormalized) normal vector of the polygon.
    ///
    /// Uses the first three vertices via cross product; the direction follows
    /// the right-hand rule based on vertex winding.
    pub fn normal(&self) -> Vector3<f32> {
        let a = &self.vertices[0];
        let b = &self.vertices[1];
        let c = &self.vertices[2];
        (b - a).cross(&(c - a))
    }

    /// Computes the unit normal vector of the polygon.
    ///
    /// Returns `None` if the first three vertices are collinear.
    pub fn unit_normal(&self) -> Option<Vector3<f32>> {
        let n = self.normal();
        let len = n.norm();
        if len > f32::EPSILON { Some(n / len) } else { None }
    }

    /// Computes the centroid (vertex average) of the polygon.
    pub fn centroid(&self) -> Point3<f32> {
        let sum: Vector3<f32> = self.vertices.iter().map(|p| p.coords).sum();
        Point3::from(sum / self.vertices.len() as f32)
    }

    /// Returns the lowest vertex height.
    pub fn min_y(&self) -> f32 {
        self.vertices.iter().map(|v| v.y).fold(f32::INFINITY, f32::min)
    }

    /// Returns the highest vertex height.
    pub fn max_y(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Returns `true` if the polygon is a horizontal surface (floor or ceiling).
    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.kind == PolygonKind::Floor
    }

    /// Derives the 2D partition line of a wall polygon.
    ///
    /// The segment spans the wall's full horizontal extent: the direction comes
    /// from the first two (x, z)-distinct vertices and the endpoints are the
    /// extreme vertex projections along it. Returns `None` when every vertex
    /// projects to the same (x, z) point, which makes the wall unusable as a
    /// partition.
    pub fn wall_line(&self) -> Option<PartitionLine> {
        let first = flatten(self.vertices[0]);
        let second = self
            .vertices
            .iter()
            .map(|v| flatten(*v))
            .find(|p| (p - first).norm() > f32::EPSILON)?;

        let direction = (second - first).normalize();
        let mut min_t = f32::INFINITY;
        let mut max_t = f32::NEG_INFINITY;
        for vertex in &self.vertices {
            let t = (flatten(*vertex) - first).dot(&direction);
            min_t = min_t.min(t);
            max_t = max_t.max(t);
        }

        if max_t - min_t <= f32::EPSILON {
            return None;
        }
        Some(PartitionLine::new(
            first + direction * min_t,
            first + direction * max_t,
        ))
    }

    /// Classifies this polygon relative to a partition line, using the thick
    /// (epsilon-banded) per-vertex test on the (x, z) projection.
    pub fn classify(&self, line: &PartitionLine) -> LineClassification {
        combine_sides(self.vertices.iter().map(|v| line.side_thick(flatten(*v))))
    }

    /// Inserts `point` into the edge of this polygon it lies on, if any.
    ///
    /// This is the T-junction repair primitive: when splitting introduces a new
    /// vertex on a shared boundary, the same point must appear in every polygon
    /// whose edge passes through it, or adjacent surfaces develop cracks that
    /// both rendering and collision can detect.
    ///
    /// Returns `true` if a vertex was inserted. Points within `epsilon` of an
    /// existing vertex are ignored.
    pub fn insert_vertex_on_edge(&mut self, point: Point3<f32>, epsilon: f32) -> bool {
        if self.vertices.iter().any(|v| (v - point).norm() <= epsilon) {
            return false;
        }

        let n = self.vertices.len();
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if point_on_segment(point, a, b, epsilon) {
                self.vertices.insert(i + 1, point);
                return true;
            }
        }
        false
    }
}

/// Projects a 3D vertex into the horizontal (x, z) plane.
#[inline]
pub(crate) fn flatten(point: Point3<f32>) -> Point2<f32> {
    Point2::new(point.x, point.z)
}

/// Tests whether `point` lies on segment `a..b` within `epsilon`.
fn point_on_segment(point: Point3<f32>, a: Point3<f32>, b: Point3<f32>, epsilon: f32) -> bool {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f32::EPSILON {
        return false;
    }
    let t = (point - a).dot(&ab) / len_sq;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }
    let closest = a + ab * t;
    (point - closest).norm() <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_wall(x0: f32, z0: f32, x1: f32, z1: f32, y0: f32, y1: f32) -> Polygon {
        Polygon::new(
            vec![
                Point3::new(x0, y0, z0),
                Point3::new(x1, y0, z1),
                Point3::new(x1, y1, z1),
                Point3::new(x0, y1, z0),
            ],
            PolygonKind::Wall,
        )
    }

    fn make_floor(y: f32) -> Polygon {
        Polygon::new(
            vec![
                Point3::new(0.0, y, 0.0),
                Point3::new(10.0, y, 0.0),
                Point3::new(10.0, y, 10.0),
                Point3::new(0.0, y, 10.0),
            ],
            PolygonKind::Floor,
        )
    }

    #[test]
    fn kind_predicates() {
        assert!(PolygonKind::Wall.is_wall());
        assert!(PolygonKind::PassableWall.is_wall());
        assert!(!PolygonKind::Floor.is_wall());
        assert!(make_floor(0.0).is_horizontal());
        assert!(!make_wall(0.0, 0.0, 1.0, 0.0, 0.0, 1.0).is_horizontal());
    }

    #[test]
    fn floor_normal_is_vertical() {
        let floor = make_floor(0.0);
        let n = floor.unit_normal().unwrap();
        assert_relative_eq!(n.x, 0.0);
        assert_relative_eq!(n.y.abs(), 1.0);
        assert_relative_eq!(n.z, 0.0);
    }

    #[test]
    fn y_extent() {
        let wall = make_wall(0.0, 0.0, 4.0, 0.0, 1.0, 3.0);
        assert_relative_eq!(wall.min_y(), 1.0);
        assert_relative_eq!(wall.max_y(), 3.0);
    }

    #[test]
    fn centroid_is_vertex_average() {
        let floor = make_floor(2.0);
        let c = floor.centroid();
        assert_relative_eq!(c.x, 5.0);
        assert_relative_eq!(c.y, 2.0);
        assert_relative_eq!(c.z, 5.0);
    }

    #[test]
    fn wall_line_spans_full_extent() {
        let wall = make_wall(1.0, 0.0, 7.0, 0.0, 0.0, 3.0);
        let line = wall.wall_line().unwrap();
        assert_relative_eq!(line.length(), 6.0);
        assert_relative_eq!(line.start().y, 0.0);
        assert_relative_eq!(line.end().y, 0.0);
    }

    #[test]
    fn wall_line_degenerate_projection() {
        // All vertices project to the same (x, z) point.
        let wall = Polygon::new(
            vec![
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(1.0, 2.0, 1.0),
            ],
            PolygonKind::Wall,
        );
        assert!(wall.wall_line().is_none());
    }

    #[test]
    fn classify_against_wall_line() {
        let wall = make_wall(0.0, 5.0, 10.0, 5.0, 0.0, 3.0);
        let line = wall.wall_line().unwrap();

        let floor = make_floor(0.0); // spans z = 5
        assert_eq!(floor.classify(&line), LineClassification::Spanning);

        let near = make_wall(0.0, 1.0, 10.0, 1.0, 0.0, 3.0);
        let far = make_wall(0.0, 9.0, 10.0, 9.0, 0.0, 3.0);
        let (near_class, far_class) = (near.classify(&line), far.classify(&line));
        assert_ne!(near_class, far_class);
        assert_ne!(near_class, LineClassification::Spanning);

        assert_eq!(wall.classify(&line), LineClassification::Collinear);
    }

    #[test]
    fn insert_vertex_on_edge_splits_edge() {
        let mut wall = make_wall(0.0, 0.0, 4.0, 0.0, 0.0, 2.0);
        let inserted = wall.insert_vertex_on_edge(Point3::new(2.0, 0.0, 0.0), 1e-3);
        assert!(inserted);
        assert_eq!(wall.len(), 5);
        assert_eq!(wall.vertices()[1], Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn insert_vertex_skips_existing_and_off_edge_points() {
        let mut wall = make_wall(0.0, 0.0, 4.0, 0.0, 0.0, 2.0);
        assert!(!wall.insert_vertex_on_edge(Point3::new(0.0, 0.0, 0.0), 1e-3));
        assert!(!wall.insert_vertex_on_edge(Point3::new(2.0, 1.0, 5.0), 1e-3));
        assert_eq!(wall.len(), 4);
    }
}
