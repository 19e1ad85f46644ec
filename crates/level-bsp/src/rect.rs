//! Axis-aligned bounding rectangles in the horizontal (x, z) plane.

use nalgebra::{Point2, Point3};

/// An axis-aligned rectangle over the (x, z) projection of level geometry.
///
/// Stored as min/max corners; used for leaf bounds, whole-tree bounds, and the
/// "open void" test during portal construction (an empty leaf has no bounds at
/// all, represented as `Option<Bounds>` by its owner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: Point2<f32>,
    max: Point2<f32>,
}

impl Bounds {
    /// Creates a rectangle from explicit corners.
    ///
    /// # Panics (debug builds only)
    /// Panics if `min` exceeds `max` on either axis.
    pub fn new(min: Point2<f32>, max: Point2<f32>) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y, "Bounds corners out of order");
        Self { min, max }
    }

    /// Creates a degenerate rectangle containing a single point.
    pub fn from_point(point: Point2<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Accumulates the (x, z) projections of 3D vertices into a rectangle.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_vertices<'a, I>(vertices: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut bounds: Option<Self> = None;
        for vertex in vertices {
            let p = Point2::new(vertex.x, vertex.z);
            bounds = Some(match bounds {
                Some(b) => b.including(p),
                None => Self::from_point(p),
            });
        }
        bounds
    }

    /// Returns the minimum corner.
    #[inline]
    pub fn min(&self) -> Point2<f32> {
        self.min
    }

    /// Returns the maximum corner.
    #[inline]
    pub fn max(&self) -> Point2<f32> {
        self.max
    }

    /// Returns the center of the rectangle.
    pub fn center(&self) -> Point2<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the smallest rectangle containing both `self` and `point`.
    pub fn including(&self, point: Point2<f32>) -> Self {
        Self {
            min: Point2::new(self.min.x.min(point.x), self.min.y.min(point.y)),
            max: Point2::new(self.max.x.max(point.x), self.max.y.max(point.y)),
        }
    }

    /// Returns the smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Bounds) -> Self {
        self.including(other.min).including(other.max)
    }

    /// Tests whether a point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.y && z <= self.max.y
    }
}
