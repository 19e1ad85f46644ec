//! Partition line representation and operations for level BSP trees.

use nalgebra::{Point2, Vector2};

/// Default epsilon for thick line classification.
/// Points within this distance of the line are considered collinear with it.
pub const LINE_EPSILON: f32 = 1e-3;

/// Which side of a partition line a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSide {
    /// Point is in front of the line (positive side of normal)
    Front,
    /// Point is behind the line (negative side of normal)
    Back,
    /// Point lies on the line (within tolerance)
    Collinear,
}

/// Classification of a polygon or segment relative to a partition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClassification {
    /// All vertices are in front of the line
    Front,
    /// All vertices are behind the line
    Back,
    /// All vertices lie on the line
    Collinear,
    /// Vertices are on both sides (spans the line)
    Spanning,
}

/// A directed line segment in the horizontal (x, z) plane, usable both as an
/// infinite partition and as a finite wall segment.
///
/// The line stores its endpoints plus a derived unit normal and offset, so the
/// signed-distance form `normal · point = offset` is available for
/// classification. Which semantics apply (finite segment or infinite line)
/// depends on the operation: side tests treat the line as infinite, while
/// [`fraction_along`](Self::fraction_along) and the endpoint accessors expose
/// the finite segment.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionLine {
    start: Point2<f32>,
    end: Point2<f32>,
    normal: Vector2<f32>,
    offset: f32,
}

impl PartitionLine {
    /// Creates a directed line through the given endpoints.
    ///
    /// The unit normal is the `start -> end` direction `(dx, dz)` rotated a
    /// quarter turn to `(dz, -dx)`; the front side is the side the normal
    /// points into.
    ///
    /// # Panics
    /// Panics if the endpoints coincide.
    pub fn new(start: Point2<f32>, end: Point2<f32>) -> Self {
        let direction = end - start;
        let length = direction.norm();
        assert!(length > f32::EPSILON, "Partition line endpoints must be distinct");
        let normal = Vector2::new(direction.y, -direction.x) / length;
        let offset = normal.dot(&start.coords);
        Self {
            start,
            end,
            normal,
            offset,
        }
    }

    /// Returns the start point of the segment.
    #[inline]
    pub fn start(&self) -> Point2<f32> {
        self.start
    }

    /// Returns the end point of the segment.
    #[inline]
    pub fn end(&self) -> Point2<f32> {
        self.end
    }

    /// Returns the midpoint of the segment.
    #[inline]
    pub fn midpoint(&self) -> Point2<f32> {
        nalgebra::center(&self.start, &self.end)
    }

    /// Returns the unit normal of the line.
    #[inline]
    pub fn normal(&self) -> Vector2<f32> {
        self.normal
    }

    /// Returns the length of the finite segment.
    #[inline]
    pub fn length(&self) -> f32 {
        (self.end - self.start).norm()
    }

    /// Computes the signed distance from a point to the infinite line.
    /// - Positive: point is in front (same side as normal)
    /// - Negative: point is behind
    #[inline]
    pub fn signed_distance(&self, point: Point2<f32>) -> f32 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Classifies a point against the infinite line with no tolerance band.
    ///
    /// Only exact zeros report [`LineSide::Collinear`]; use
    /// [`side_thick`](Self::side_thick) when floating-point noise matters.
    #[inline]
    pub fn side_thin(&self, point: Point2<f32>) -> LineSide {
        let dist = self.signed_distance(point);
        if dist > 0.0 {
            LineSide::Front
        } else if dist < 0.0 {
            LineSide::Back
        } else {
            LineSide::Collinear
        }
    }

    /// Classifies a point against the infinite line using the default
    /// [`LINE_EPSILON`] tolerance band.
    #[inline]
    pub fn side_thick(&self, point: Point2<f32>) -> LineSide {
        self.side_with_epsilon(point, LINE_EPSILON)
    }

    /// Classifies a point against the infinite line with a custom epsilon.
    pub fn side_with_epsilon(&self, point: Point2<f32>, epsilon: f32) -> LineSide {
        let dist = self.signed_distance(point);
        if dist > epsilon {
            LineSide::Front
        } else if dist < -epsilon {
            LineSide::Back
        } else {
            LineSide::Collinear
        }
    }

    /// Classifies another segment against this infinite line by combining the
    /// thick classifications of its endpoints.
    pub fn classify_line(&self, other: &PartitionLine) -> LineClassification {
        combine_sides([self.side_thick(other.start), self.side_thick(other.end)])
    }

    /// Computes the parametric position along `start..end` where the segment
    /// crosses this infinite line.
    ///
    /// Returns `None` when the segment is parallel to the line; the result is
    /// not clamped to `[0, 1]`, so callers decide whether an out-of-range
    /// crossing counts.
    pub fn intersection(&self, start: Point2<f32>, end: Point2<f32>) -> Option<f32> {
        let direction = end - start;
        let denom = self.normal.dot(&direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        Some((self.offset - self.normal.dot(&start.coords)) / denom)
    }

    /// Computes the point where the segment `start..end` crosses this infinite
    /// line, restricted to the segment's extent.
    pub fn intersection_point(
        &self,
        start: Point2<f32>,
        end: Point2<f32>,
    ) -> Option<Point2<f32>> {
        let t = self.intersection(start, end)?;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        Some(start + (end - start) * t)
    }

    /// Computes the parametric position of a point along the finite segment
    /// (0.0 at `start`, 1.0 at `end`). The point is assumed to lie on or near
    /// the line.
    pub fn fraction_along(&self, point: Point2<f32>) -> f32 {
        let direction = self.end - self.start;
        (point - self.start).dot(&direction) / direction.norm_squared()
    }

    /// Returns `true` if the two segments share both endpoints, in either
    /// order, within [`LINE_EPSILON`]. Used to deduplicate candidate portal
    /// edges.
    pub fn equals_ignoring_order(&self, other: &PartitionLine) -> bool {
        let close = |a: Point2<f32>, b: Point2<f32>| (a - b).norm() <= LINE_EPSILON;
        (close(self.start, other.start) && close(self.end, other.end))
            || (close(self.start, other.end) && close(self.end, other.start))
    }

    /// Returns a new line with the normal flipped (endpoints swapped).
    #[inline]
    pub fn flipped(&self) -> Self {
        Self::new(self.end, self.start)
    }
}

/// Combines per-vertex side classifications into a segment/polygon
/// classification.
pub(crate) fn combine_sides<I>(sides: I) -> LineClassification
where
    I: IntoIterator<Item = LineSide>,
{
    let mut front = 0usize;
    let mut back = 0usize;
    let mut total = 0usize;

    for side in sides {
        total += 1;
        match side {
            LineSide::Front => front += 1,
            LineSide::Back => back += 1,
            LineSide::Collinear => {}
        }
    }

    if front > 0 && back > 0 {
        LineClassification::Spanning
    } else if front > 0 {
        LineClassification::Front
    } else if back > 0 {
        LineClassification::Back
    } else {
        debug_assert!(total > 0, "cannot classify an empty vertex set");
        LineClassification::Collinear
    }
}
