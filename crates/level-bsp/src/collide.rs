//! Real-time collision of moving objects against the partitioned level.
//!
//! Movers are approximated as upright cylinders. Each simulation tick the
//! caller moves the object by its own logic, then hands the old and new
//! state to a detector, which sweeps the movement against the tree's walls,
//! clamps floor/ceiling penetration, and reports what it hit through a
//! [`CollisionListener`]. [`CollisionDetector`] stops movers dead at walls;
//! [`SlidingCollisionDetector`] adds gravity, slide-along-wall resolution,
//! and a scoot-up allowance for stair-like geometry.

use log::trace;
use nalgebra::{Point2, Point3, Vector2, Vector3};

use crate::bsp::node::{Leaf, Node};
use crate::bsp::tree::Tree;
use crate::line::{LineSide, PartitionLine};
use crate::polygon::Polygon;

/// Height a mover can pass over without being blocked: the wall test starts
/// this far above the mover's feet, so low thresholds and step edges never
/// register as walls.
pub const STEP_HEIGHT: f32 = 0.35;

/// Clearance kept between a resolved mover and the wall it hit, and the
/// amount the radius shrinks for the corner-cleanup and slide retries.
pub const CORNER_MARGIN: f32 = 0.01;

/// Downward acceleration applied by the sliding detector, units per second
/// squared.
pub const GRAVITY: f32 = 9.8;

/// Cap on downward speed under gravity, units per second.
pub const TERMINAL_VELOCITY: f32 = 16.0;

/// Upward speed at which a mover standing slightly below the floor surface
/// is raised, units per second.
pub const SCOOT_SPEED: f32 = 2.0;

/// Tolerance for the hit point landing just past a wall segment's endpoint,
/// as a fraction of the segment.
const WALL_HIT_EPSILON: f32 = 1e-4;

/// Squared-distance window within which two corner hits count as a tie.
const TIE_EPSILON: f32 = 1e-6;

/// Upright-cylinder approximation of a mover, as offsets from its location:
/// the cylinder spans `[location.y + bottom, location.y + top]` vertically
/// with the given radius in the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoverBounds {
    pub radius: f32,
    pub bottom: f32,
    pub top: f32,
}

impl MoverBounds {
    pub fn new(radius: f32, bottom: f32, top: f32) -> Self {
        Self {
            radius,
            bottom,
            top,
        }
    }
}

/// Position, velocity, and bounds of a moving object. The detectors mutate
/// location and velocity in place; everything else about the object stays
/// with the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoverState {
    pub location: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub bounds: MoverBounds,
}

impl MoverState {
    pub fn new(location: Point3<f32>, velocity: Vector3<f32>, bounds: MoverBounds) -> Self {
        Self {
            location,
            velocity,
            bounds,
        }
    }
}

/// How a mover responds to touching another object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectResponse {
    /// Revert the horizontal movement.
    Stop,
    /// Slide around the other object's cylinder.
    Slide,
    /// Climb onto the other object's top surface if it is low enough.
    StepUp,
}

/// Receives collision events as a tick is resolved.
///
/// The detector guarantees *when* and *with what geometry* a collision
/// happened; what the object does in response (sounds, damage, scripting) is
/// the listener's business. All methods default to no-ops, object collisions
/// to [`ObjectResponse::Stop`].
pub trait CollisionListener {
    /// A wall blocked the mover's path.
    fn on_wall_collision(&mut self, wall: &PartitionLine) {
        let _ = wall;
    }

    /// The mover's feet penetrated the floor at the given height.
    fn on_floor_collision(&mut self, height: f32) {
        let _ = height;
    }

    /// The mover's top penetrated the ceiling at the given height.
    fn on_ceiling_collision(&mut self, height: f32) {
        let _ = height;
    }

    /// The mover's cylinder overlapped another object's.
    fn on_object_collision(&mut self, other: &MoverState) -> ObjectResponse {
        let _ = other;
        ObjectResponse::Stop
    }
}

/// A listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl CollisionListener for NullListener {}

/// The first wall crossing along a swept corner path.
struct WallHit {
    point: Point2<f32>,
    line: PartitionLine,
    t: f32,
}

/// Per-tick collision resolution against a built tree.
///
/// Reads the tree only; multiple objects are resolved sequentially, each
/// mutating its own state.
#[derive(Debug, Clone, Copy)]
pub struct CollisionDetector<'a> {
    tree: &'a Tree,
}

impl<'a> CollisionDetector<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self { tree }
    }

    /// Resolves one tick of movement from `old_location` to the mover's
    /// current location: walls first, then floor/ceiling clamping. Returns
    /// `true` if a wall blocked the path.
    pub fn check<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        old_location: Point3<f32>,
        listener: &mut L,
    ) -> bool {
        let hit = self.resolve_walls(mover, old_location, listener);
        self.resolve_floor_ceiling(mover, listener);
        hit.is_some()
    }

    /// Sweeps the mover's corners against the tree's walls and clips the
    /// position at the nearest hit. Returns the wall line that was hit.
    ///
    /// The center path gets no sweep of its own: a wall wide enough to block
    /// it is caught by a corner sweep, and anything narrower that slips
    /// between the corners is caught by the edge-midpoint cleanup below.
    fn resolve_walls<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        old_location: Point3<f32>,
        listener: &mut L,
    ) -> Option<PartitionLine> {
        let band = vertical_band(old_location.y, &mover.bounds);
        let old = Point2::new(old_location.x, old_location.z);
        let new = Point2::new(mover.location.x, mover.location.z);
        let radius = mover.bounds.radius;

        // Nearest hit over the 4 corner sweeps wins; ties go to the corner
        // leading in the direction of travel, which keeps a flush-sliding
        // mover from snagging on its trailing corner.
        let mut best: Option<(WallHit, Vector2<f32>, f32)> = None;
        for offset in corner_offsets(radius) {
            let Some(hit) = self.sweep(old + offset, new + offset, band) else {
                continue;
            };
            let d2 = (hit.point - (old + offset)).norm_squared();
            let replace = match &best {
                None => true,
                Some((_, best_offset, best_d2)) => {
                    d2 + TIE_EPSILON < *best_d2
                        || ((d2 - best_d2).abs() <= TIE_EPSILON
                            && velocity_alignment(offset, &mover.velocity)
                                > velocity_alignment(*best_offset, &mover.velocity))
                }
            };
            if replace {
                best = Some((hit, offset, d2));
            }
        }

        let mut hit_line = None;
        if let Some((hit, offset, _)) = best {
            let movement = new - old;
            let pullback = if movement.norm_squared() > f32::EPSILON {
                movement.normalize() * CORNER_MARGIN
            } else {
                Vector2::zeros()
            };
            let corrected = hit.point - offset - pullback;
            mover.location.x = corrected.x;
            mover.location.z = corrected.y;

            // Kill the velocity component into the wall.
            let normal = hit.line.normal();
            let lateral = Vector2::new(mover.velocity.x, mover.velocity.z);
            let lateral = lateral - normal * lateral.dot(&normal);
            mover.velocity.x = lateral.x;
            mover.velocity.z = lateral.y;

            trace!(
                "wall hit at ({:.3}, {:.3}), t = {:.3}",
                hit.point.x, hit.point.y, hit.t
            );
            listener.on_wall_collision(&hit.line);
            hit_line = Some(hit.line);
        }

        // Corner cleanup: the 4 edge midpoints between adjacent corners,
        // swept at a slightly reduced radius, catch a wall corner poking
        // between the sampled corners. Any hit reverts the tick entirely.
        let reduced = (radius - CORNER_MARGIN).max(0.0);
        let resting = Point2::new(mover.location.x, mover.location.z);
        for offset in edge_offsets(reduced) {
            if let Some(hit) = self.sweep(old + offset, resting + offset, band) {
                mover.location.x = old_location.x;
                mover.location.z = old_location.z;
                if hit_line.is_none() {
                    listener.on_wall_collision(&hit.line);
                    hit_line = Some(hit.line);
                }
                break;
            }
        }

        hit_line
    }

    /// Finds the first wall crossing along `from..to` within the vertical
    /// band, descending the tree by the same side classification the builder
    /// used to place the walls.
    fn sweep(&self, from: Point2<f32>, to: Point2<f32>, band: (f32, f32)) -> Option<WallHit> {
        if (to - from).norm_squared() <= f32::EPSILON {
            return None;
        }
        hit_below(self.tree.root(), self.tree.leaves(), from, to, band)
    }

    /// Samples floor and ceiling at the center and 4 corner offsets:
    /// effective floor is the maximum and effective ceiling the minimum, so
    /// the mover stands on the highest ground underfoot and ducks under the
    /// lowest overhang.
    fn floor_and_ceiling(&self, location: Point3<f32>, radius: f32) -> (f32, f32) {
        let center = Point2::new(location.x, location.z);
        let mut floor = f32::NEG_INFINITY;
        let mut ceiling = f32::INFINITY;

        let mut sample = |point: Point2<f32>| {
            let leaf = self.tree.leaf(self.tree.leaf_at(point.x, point.y));
            floor = floor.max(leaf.floor());
            ceiling = ceiling.min(leaf.ceiling());
        };
        sample(center);
        for offset in corner_offsets(radius) {
            sample(center + offset);
        }

        (floor, ceiling)
    }

    /// Clamps floor/ceiling penetration and zeroes the offending velocity
    /// component.
    fn resolve_floor_ceiling<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        listener: &mut L,
    ) {
        let (floor, ceiling) = self.floor_and_ceiling(mover.location, mover.bounds.radius);

        if floor.is_finite() && mover.location.y + mover.bounds.bottom < floor {
            mover.location.y = floor - mover.bounds.bottom;
            if mover.velocity.y < 0.0 {
                mover.velocity.y = 0.0;
            }
            listener.on_floor_collision(floor);
        }
        if ceiling.is_finite() && mover.location.y + mover.bounds.top > ceiling {
            mover.location.y = ceiling - mover.bounds.top;
            if mover.velocity.y > 0.0 {
                mover.velocity.y = 0.0;
            }
            listener.on_ceiling_collision(ceiling);
        }
    }

    /// Resolves the mover against another object's cylinder.
    ///
    /// A collision requires both vertical interval overlap and horizontal
    /// center distance below the combined radii. The listener's response
    /// decides the outcome: revert the horizontal movement, slide around the
    /// other cylinder, or climb onto its top surface when it is within
    /// [`STEP_HEIGHT`]. Returns `true` if a collision was resolved.
    pub fn check_object<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        old_location: Point3<f32>,
        other: &MoverState,
        listener: &mut L,
    ) -> bool {
        let mover_bottom = mover.location.y + mover.bounds.bottom;
        let mover_top = mover.location.y + mover.bounds.top;
        let other_bottom = other.location.y + other.bounds.bottom;
        let other_top = other.location.y + other.bounds.top;
        if mover_bottom >= other_top || mover_top <= other_bottom {
            return false;
        }

        let delta = Vector2::new(
            mover.location.x - other.location.x,
            mover.location.z - other.location.z,
        );
        let combined = mover.bounds.radius + other.bounds.radius;
        if delta.norm_squared() >= combined * combined {
            return false;
        }

        let revert = |mover: &mut MoverState| {
            mover.location.x = old_location.x;
            mover.location.z = old_location.z;
        };

        match listener.on_object_collision(other) {
            ObjectResponse::Stop => revert(mover),
            ObjectResponse::Slide => {
                if delta.norm_squared() <= f32::EPSILON {
                    // Dead-center overlap has no slide direction.
                    revert(mover);
                } else {
                    let normal = delta.normalize();
                    let displacement = Vector2::new(
                        mover.location.x - old_location.x,
                        mover.location.z - old_location.z,
                    );
                    let slide = displacement - normal * displacement.dot(&normal);
                    mover.location.x = old_location.x + slide.x;
                    mover.location.z = old_location.z + slide.y;
                }
            }
            ObjectResponse::StepUp => {
                if other_top - mover_bottom <= STEP_HEIGHT {
                    mover.location.y = other_top - mover.bounds.bottom;
                } else {
                    revert(mover);
                }
            }
        }

        true
    }
}

/// [`CollisionDetector`] extended with gravity, slide-along-wall resolution,
/// and a scoot-up allowance for climbing stair-like floor steps.
#[derive(Debug, Clone, Copy)]
pub struct SlidingCollisionDetector<'a> {
    detector: CollisionDetector<'a>,
}

impl<'a> SlidingCollisionDetector<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self {
            detector: CollisionDetector::new(tree),
        }
    }

    /// Resolves one tick of movement with gravity and sliding.
    ///
    /// On a wall hit the attempted displacement loses its wall-normal
    /// component and the slide target is retried with a marginally reduced
    /// radius; the slide commits only if that retry is collision-free,
    /// otherwise the mover keeps the clipped stop position. Feet within the
    /// per-tick scoot distance below the floor are raised smoothly rather
    /// than clamped, approximating stair climbing. Returns `true` if a wall
    /// blocked the path.
    pub fn check<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        old_location: Point3<f32>,
        elapsed: f32,
        listener: &mut L,
    ) -> bool {
        mover.velocity.y = (mover.velocity.y - GRAVITY * elapsed).max(-TERMINAL_VELOCITY);
        mover.location.y += mover.velocity.y * elapsed;

        let attempted = Point2::new(mover.location.x, mover.location.z);
        let hit = self.detector.resolve_walls(mover, old_location, listener);

        if let Some(wall) = &hit {
            let old = Point2::new(old_location.x, old_location.z);
            let displacement = attempted - old;
            let normal = wall.normal();
            let slide = displacement - normal * displacement.dot(&normal);

            if slide.norm_squared() > f32::EPSILON {
                let mut trial = *mover;
                trial.location.x = old.x + slide.x;
                trial.location.z = old.y + slide.y;
                trial.bounds.radius = (mover.bounds.radius - CORNER_MARGIN).max(0.0);

                let clean = self
                    .detector
                    .resolve_walls(&mut trial, old_location, &mut NullListener)
                    .is_none();
                if clean {
                    mover.location.x = trial.location.x;
                    mover.location.z = trial.location.z;
                }
            }
        }

        self.resolve_floor_ceiling(mover, elapsed, listener);
        hit.is_some()
    }

    /// Like the base floor/ceiling pass, but feet slightly below the floor
    /// rise by at most `SCOOT_SPEED * elapsed` per tick instead of snapping.
    fn resolve_floor_ceiling<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        elapsed: f32,
        listener: &mut L,
    ) {
        let (floor, ceiling) = self
            .detector
            .floor_and_ceiling(mover.location, mover.bounds.radius);

        if floor.is_finite() {
            let feet = mover.location.y + mover.bounds.bottom;
            let deficit = floor - feet;
            if deficit > 0.0 {
                if deficit <= STEP_HEIGHT {
                    mover.location.y += deficit.min(SCOOT_SPEED * elapsed);
                } else {
                    mover.location.y = floor - mover.bounds.bottom;
                }
                if mover.velocity.y < 0.0 {
                    mover.velocity.y = 0.0;
                }
                listener.on_floor_collision(floor);
            }
        }
        if ceiling.is_finite() && mover.location.y + mover.bounds.top > ceiling {
            mover.location.y = ceiling - mover.bounds.top;
            if mover.velocity.y > 0.0 {
                mover.velocity.y = 0.0;
            }
            listener.on_ceiling_collision(ceiling);
        }
    }

    /// See [`CollisionDetector::check_object`].
    pub fn check_object<L: CollisionListener>(
        &self,
        mover: &mut MoverState,
        old_location: Point3<f32>,
        other: &MoverState,
        listener: &mut L,
    ) -> bool {
        self.detector
            .check_object(mover, old_location, other, listener)
    }
}

/// The vertical band of a mover that walls can block: feet plus the
/// step-over allowance up to the top of the cylinder.
fn vertical_band(y: f32, bounds: &MoverBounds) -> (f32, f32) {
    (y + bounds.bottom + STEP_HEIGHT, y + bounds.top)
}

fn corner_offsets(radius: f32) -> [Vector2<f32>; 4] {
    [
        Vector2::new(radius, radius),
        Vector2::new(radius, -radius),
        Vector2::new(-radius, radius),
        Vector2::new(-radius, -radius),
    ]
}

fn edge_offsets(radius: f32) -> [Vector2<f32>; 4] {
    [
        Vector2::new(radius, 0.0),
        Vector2::new(0.0, radius),
        Vector2::new(-radius, 0.0),
        Vector2::new(0.0, -radius),
    ]
}

/// Counts axes on which the corner offset leads in the direction of travel.
fn velocity_alignment(offset: Vector2<f32>, velocity: &Vector3<f32>) -> u32 {
    u32::from(offset.x * velocity.x > 0.0) + u32::from(offset.y * velocity.z > 0.0)
}

fn hit_below(
    node: &Node,
    leaves: &[Leaf],
    from: Point2<f32>,
    to: Point2<f32>,
    band: (f32, f32),
) -> Option<WallHit> {
    match node {
        Node::Leaf(id) => hit_in_polygons(leaves[id.index()].polygons(), from, to, band),
        Node::Internal(internal) => {
            let partition = internal.partition();
            let side_from = partition.side_thick(from);
            let side_to = partition.side_thick(to);

            if side_from == LineSide::Front && side_to == LineSide::Front {
                return hit_below(internal.front(), leaves, from, to, band);
            }
            if side_from == LineSide::Back && side_to == LineSide::Back {
                return hit_below(internal.back(), leaves, from, to, band);
            }

            // The segment crosses or touches the partition. Geometry in the
            // near subtree lies entirely before the crossing point, the
            // node's own walls at it, and the far subtree beyond it, so the
            // first Some is the first hit.
            let (near, far) = if side_from == LineSide::Back {
                (internal.back(), internal.front())
            } else {
                (internal.front(), internal.back())
            };
            hit_below(near, leaves, from, to, band)
                .or_else(|| hit_in_polygons(internal.polygons(), from, to, band))
                .or_else(|| hit_below(far, leaves, from, to, band))
        }
    }
}

/// Nearest blocking wall crossing among a polygon list.
///
/// A wall blocks only when its vertical extent overlaps the mover's band,
/// which is what lets low passable walls be stepped over, and only within
/// its finite horizontal extent.
fn hit_in_polygons(
    polygons: &[Polygon],
    from: Point2<f32>,
    to: Point2<f32>,
    band: (f32, f32),
) -> Option<WallHit> {
    let mut best: Option<WallHit> = None;
    for polygon in polygons.iter().filter(|p| p.kind().is_wall()) {
        if polygon.max_y() <= band.0 || polygon.min_y() >= band.1 {
            continue;
        }
        let Some(line) = polygon.wall_line() else {
            continue;
        };
        let Some(t) = line.intersection(from, to) else {
            continue;
        };
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let point = from + (to - from) * t;
        let fraction = line.fraction_along(point);
        if !(-WALL_HIT_EPSILON..=1.0 + WALL_HIT_EPSILON).contains(&fraction) {
            continue;
        }
        if best.as_ref().is_none_or(|b| t < b.t) {
            best = Some(WallHit { point, line, t });
        }
    }
    best
}
