//! Polygon cutting/splitting operations for BSP tree construction.

use nalgebra::Point3;

use crate::line::{LINE_EPSILON, LineClassification, LineSide, PartitionLine};
use crate::polygon::{Polygon, flatten};

/// Trait for geometry that can be cut by a partition line.
pub trait Cut {
    /// Cuts the geometry by a partition line.
    ///
    /// Returns `(front, back)` where:
    /// - `front`: `Some(polygon)` containing the part on the front side of the line
    /// - `back`: `Some(polygon)` containing the part on the back side of the line
    ///
    /// # Return values by classification
    ///
    /// - **Front**: `(Some(self), None)` - entire geometry is in front
    /// - **Back**: `(None, Some(self))` - entire geometry is behind
    /// - **Collinear**: `(Some(self), None)` - treated as front
    /// - **Spanning**: `(Some(front_part), Some(back_part))` - split into two
    ///   pieces, either of which may be `None` when it degenerates below a
    ///   triangle
    fn cut(&self, line: &PartitionLine) -> (Option<Polygon>, Option<Polygon>);
}

impl Cut for Polygon {
    fn cut(&self, line: &PartitionLine) -> (Option<Polygon>, Option<Polygon>) {
        match self.classify(line) {
            LineClassification::Front | LineClassification::Collinear => {
                (Some(self.clone()), None)
            }
            LineClassification::Back => (None, Some(self.clone())),
            LineClassification::Spanning => split_polygon(self, line),
        }
    }
}

/// Splits a spanning polygon into front and back parts.
///
/// Uses a variant of the Sutherland-Hodgman algorithm on the (x, z)
/// projection: walks the polygon edges and builds two vertex lists, adding
/// interpolated 3D intersection points when an edge crosses the line.
fn split_polygon(polygon: &Polygon, line: &PartitionLine) -> (Option<Polygon>, Option<Polygon>) {
    let vertices = polygon.vertices();
    let n = vertices.len();

    let mut front_verts = Vec::with_capacity(n + 1);
    let mut back_verts = Vec::with_capacity(n + 1);

    // Classify all vertices upfront
    let sides: Vec<LineSide> = vertices
        .iter()
        .map(|v| line.side_thick(flatten(*v)))
        .collect();

    for i in 0..n {
        let current = vertices[i];
        let current_side = sides[i];
        let next_idx = (i + 1) % n;
        let next = vertices[next_idx];
        let next_side = sides[next_idx];

        match current_side {
            LineSide::Front => front_verts.push(current),
            LineSide::Back => back_verts.push(current),
            LineSide::Collinear => {
                // On-line vertices go to both sides
                front_verts.push(current);
                back_verts.push(current);
            }
        }

        let crosses = matches!(
            (current_side, next_side),
            (LineSide::Front, LineSide::Back) | (LineSide::Back, LineSide::Front)
        );

        if crosses {
            if let Some(t) = line.intersection(flatten(current), flatten(next)) {
                let t = t.clamp(0.0, 1.0);
                let intersection = current + (next - current) * t;
                front_verts.push(intersection);
                back_verts.push(intersection);
            }
        }
    }

    (
        build_part(front_verts, polygon),
        build_part(back_verts, polygon),
    )
}

/// Assembles a split half into a polygon, dropping degenerate results.
fn build_part(vertices: Vec<Point3<f32>>, source: &Polygon) -> Option<Polygon> {
    let deduped = drop_duplicate_vertices(vertices);
    if deduped.len() >= 3 {
        Some(Polygon::new(deduped, source.kind()))
    } else {
        None
    }
}

/// Removes consecutive near-duplicate vertices (including the wrap-around
/// pair), which splitting can introduce when an edge endpoint sits on the line.
fn drop_duplicate_vertices(vertices: Vec<Point3<f32>>) -> Vec<Point3<f32>> {
    let mut result: Vec<Point3<f32>> = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        if result
            .last()
            .is_none_or(|last| (vertex - last).norm() > LINE_EPSILON)
        {
            result.push(vertex);
        }
    }
    while result.len() > 1 {
        let first = result[0];
        let last = result[result.len() - 1];
        if (first - last).norm() > LINE_EPSILON {
            break;
        }
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::PolygonKind;
    use nalgebra::Point2;

    fn make_floor(x0: f32, z0: f32, x1: f32, z1: f32, y: f32) -> Polygon {
        Polygon::new(
            vec![
                Point3::new(x0, y, z0),
                Point3::new(x1, y, z0),
                Point3::new(x1, y, z1),
                Point3::new(x0, y, z1),
            ],
            PolygonKind::Floor,
        )
    }

    fn line_x(x: f32) -> PartitionLine {
        PartitionLine::new(Point2::new(x, 0.0), Point2::new(x, 1.0))
    }

    #[test]
    fn cut_front_passes_through() {
        let floor = make_floor(2.0, 0.0, 6.0, 4.0, 0.0);
        let line = line_x(1.0);
        let (front, back) = floor.cut(&line);
        // Everything is on one side; the untouched polygon comes back whole.
        assert!(front.is_some() != back.is_some());
        let whole = front.or(back).unwrap();
        assert_eq!(whole, floor);
    }

    #[test]
    fn cut_spanning_splits_in_two() {
        let floor = make_floor(0.0, 0.0, 10.0, 4.0, 0.0);
        let line = line_x(4.0);
        let (front, back) = floor.cut(&line);
        let front = front.unwrap();
        let back = back.unwrap();

        assert_eq!(front.len(), 4);
        assert_eq!(back.len(), 4);
        assert_eq!(front.kind(), PolygonKind::Floor);

        // No vertex of either half crosses the line.
        for v in front.vertices() {
            assert!(line.side_thick(flatten(*v)) != opposite_of(&line, &front));
        }
        for (a, b) in [(&front, &back), (&back, &front)] {
            let a_sides: Vec<_> = a
                .vertices()
                .iter()
                .map(|v| line.side_thick(flatten(*v)))
                .collect();
            let b_sides: Vec<_> = b
                .vertices()
                .iter()
                .map(|v| line.side_thick(flatten(*v)))
                .collect();
            assert!(a_sides.iter().any(|s| *s != LineSide::Collinear));
            assert!(b_sides.iter().any(|s| *s != LineSide::Collinear));
        }
    }

    fn opposite_of(line: &PartitionLine, polygon: &Polygon) -> LineSide {
        match polygon.classify(line) {
            LineClassification::Front => LineSide::Back,
            LineClassification::Back => LineSide::Front,
            _ => panic!("half should classify cleanly"),
        }
    }

    #[test]
    fn cut_round_trip_preserves_vertex_set() {
        let floor = make_floor(0.0, 0.0, 10.0, 4.0, 0.0);
        let line = line_x(4.0);
        let (front, back) = floor.cut(&line);
        let front = front.unwrap();
        let back = back.unwrap();

        // Every original vertex survives in one of the halves.
        for v in floor.vertices() {
            let in_front = front.vertices().iter().any(|w| (w - v).norm() < 1e-5);
            let in_back = back.vertices().iter().any(|w| (w - v).norm() < 1e-5);
            assert!(in_front || in_back, "lost vertex {v:?}");
        }

        // Both halves share the two intersection vertices on the line.
        let shared: Vec<_> = front
            .vertices()
            .iter()
            .filter(|v| back.vertices().iter().any(|w| (*v - w).norm() < 1e-5))
            .collect();
        assert_eq!(shared.len(), 2);
        for v in shared {
            assert_eq!(line.side_thick(flatten(*v)), LineSide::Collinear);
        }
    }

    #[test]
    fn cut_through_vertex_degenerates_gracefully() {
        // A triangle touched exactly at one vertex: one half collapses.
        let triangle = Polygon::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 2.0),
            ],
            PolygonKind::Floor,
        );
        let line = line_x(2.0);
        let (front, back) = triangle.cut(&line);
        assert_eq!(front.is_some() as usize + back.is_some() as usize, 1);
    }

    #[test]
    fn split_preserves_height_interpolation() {
        // A sloped quad: intersection vertices must interpolate y.
        let ramp = Polygon::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 5.0, 0.0),
                Point3::new(10.0, 5.0, 2.0),
                Point3::new(0.0, 0.0, 2.0),
            ],
            PolygonKind::Floor,
        );
        let line = line_x(4.0);
        let (front, back) = ramp.cut(&line);
        let halves = [front.unwrap(), back.unwrap()];
        let on_line: Vec<_> = halves
            .iter()
            .flat_map(|p| p.vertices())
            .filter(|v| (v.x - 4.0).abs() < 1e-4)
            .collect();
        assert!(!on_line.is_empty());
        for v in on_line {
            approx::assert_relative_eq!(v.y, 2.0, epsilon = 1e-4);
        }
    }
}
