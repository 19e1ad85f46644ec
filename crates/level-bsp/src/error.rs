//! Build-input validation errors.

/// Errors detected while validating builder input.
///
/// Geometric edge cases (degenerate clip results, parallel intersections,
/// points in open space) are not errors; they are handled with `Option`s and
/// sentinel values at the call sites that produce them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The polygon list was empty, so there is nothing to partition.
    #[error("cannot build a BSP tree from an empty polygon list")]
    NoPolygons,
    /// A wall polygon's (x, z) projection collapses to a point, so no
    /// partition line can be derived from it.
    #[error("wall polygon {index} has no horizontal extent")]
    DegenerateWall {
        /// Index of the offending polygon in the input list.
        index: usize,
    },
}
