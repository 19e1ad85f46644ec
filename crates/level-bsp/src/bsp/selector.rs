//! Partition selection strategies for BSP tree construction.
//!
//! The choice of partition line affects tree balance and the number of
//! polygon splits during construction. Different strategies offer different
//! trade-offs between build time and tree quality.

use crate::line::LineClassification;
use crate::polygon::Polygon;

/// Classification counts for one candidate partition against a working set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionStats {
    /// Polygons entirely in front of the candidate line.
    pub front: usize,
    /// Polygons entirely behind the candidate line.
    pub back: usize,
    /// Polygons that would be split.
    pub spanning: usize,
}

impl PartitionStats {
    /// A candidate only partitions the set if it actually separates geometry:
    /// something would be split, or there are polygons on both sides. A hull
    /// wall of an already-convex region separates nothing and is left in the
    /// leaf.
    pub fn separates(&self) -> bool {
        self.spanning > 0 || (self.front > 0 && self.back > 0)
    }
}

/// Computes [`PartitionStats`] for the wall polygon at `index`.
///
/// Returns `None` when the polygon is not a wall or has no derivable line.
pub fn partition_stats(polygons: &[Polygon], index: usize) -> Option<PartitionStats> {
    let candidate = &polygons[index];
    if !candidate.kind().is_wall() {
        return None;
    }
    let line = candidate.wall_line()?;

    let mut stats = PartitionStats::default();
    for (i, polygon) in polygons.iter().enumerate() {
        if i == index {
            continue;
        }
        match polygon.classify(&line) {
            LineClassification::Front => stats.front += 1,
            LineClassification::Back => stats.back += 1,
            LineClassification::Spanning => stats.spanning += 1,
            LineClassification::Collinear => {}
        }
    }
    Some(stats)
}

/// Strategy for selecting which wall polygon's line partitions a working set.
///
/// The selected wall's line becomes the partition of a BSP node. Returning
/// `None` means no wall separates the set, which terminates recursion and
/// produces a leaf.
pub trait PartitionSelector {
    /// Select a separating wall from the slice to use as the partition.
    ///
    /// The returned index must refer to a wall polygon for which
    /// [`partition_stats`] reports [`PartitionStats::separates`].
    fn select(&self, polygons: &[Polygon]) -> Option<usize>;
}

/// Selects the first wall that separates the working set.
///
/// This is the reference heuristic: fastest to evaluate, but sensitive to
/// input order and prone to deep, unbalanced trees on complex floor plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstWall;

impl PartitionSelector for FirstWall {
    fn select(&self, polygons: &[Polygon]) -> Option<usize> {
        (0..polygons.len())
            .find(|&i| partition_stats(polygons, i).is_some_and(|s| s.separates()))
    }
}

/// Selects the candidate wall that splits the fewest polygons, over a bounded
/// sample of separating candidates; ties go to the candidate with the best
/// front/back balance.
#[derive(Debug, Clone, Copy)]
pub struct FewestSplits {
    /// Maximum number of separating candidates to evaluate.
    pub sample_limit: usize,
}

impl Default for FewestSplits {
    fn default() -> Self {
        Self { sample_limit: 16 }
    }
}

impl PartitionSelector for FewestSplits {
    fn select(&self, polygons: &[Polygon]) -> Option<usize> {
        let mut best: Option<(usize, PartitionStats)> = None;
        let mut sampled = 0usize;

        for i in 0..polygons.len() {
            let Some(stats) = partition_stats(polygons, i) else {
                continue;
            };
            if !stats.separates() {
                continue;
            }
            sampled += 1;

            let better = match &best {
                None => true,
                Some((_, current)) => {
                    stats.spanning < current.spanning
                        || (stats.spanning == current.spanning
                            && imbalance(&stats) < imbalance(current))
                }
            };
            if better {
                best = Some((i, stats));
            }
            if sampled >= self.sample_limit {
                break;
            }
        }

        best.map(|(i, _)| i)
    }
}

fn imbalance(stats: &PartitionStats) -> usize {
    stats.front.abs_diff(stats.back)
}
