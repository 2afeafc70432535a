//! [`SceneSynchronizer`] – rebuilds the planner's obstacle world model from
//! the perception cache.
//!
//! The rebuild is wholesale: every previously registered obstacle is
//! removed, then one box per cached object is added, plus a flat box for
//! the support surface.  The remove-then-add sequence is not transactional;
//! a failure between the two leaves the world model empty until the next
//! SCENE command.

use std::sync::{Arc, PoisonError};
use std::thread;
use std::time::Duration;

use armos_perception::{PerceptionCache, SceneSnapshot};
use armos_planner::{MotionPlanner, SharedPlanner};
use armos_types::{ArmError, CollisionBox, Dimensions, RollPitchYaw, SupportSurface, Vec3};
use tracing::{debug, info};

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// Clearance added to each obstacle dimension, per axis (metres).
pub const OBSTACLE_CLEARANCE: f64 = 0.02;

/// Obstacle id used for the support surface.
pub const TABLE_OBSTACLE_ID: &str = "table";

/// World-frame point at which the table height is probed from the plane.
const TABLE_PROBE_X: f64 = 0.8;
const TABLE_PROBE_Y: f64 = 0.0;

/// Small lift so the table box sits on, not in, the estimated plane.
const TABLE_LIFT: f64 = 0.01;

/// Footprint of the flat table box (metres).
const TABLE_SIZE: Dimensions = Dimensions {
    width: 1.0,
    depth: 1.0,
    height: 0.02,
};

// ────────────────────────────────────────────────────────────────────────────
// SceneSynchronizer
// ────────────────────────────────────────────────────────────────────────────

/// Converts the perception snapshot into the planner's obstacle list.
pub struct SceneSynchronizer {
    planner: SharedPlanner,
    cache: Arc<PerceptionCache>,
    /// Pause after clearing and after re-adding, giving the planning
    /// service time to propagate the world-model change.
    settle: Duration,
}

impl SceneSynchronizer {
    pub fn new(planner: SharedPlanner, cache: Arc<PerceptionCache>, settle: Duration) -> Self {
        Self {
            planner,
            cache,
            settle,
        }
    }

    /// Replace the planner's obstacle set with the current snapshot.
    ///
    /// The snapshot is taken once, at the start of the call; perception
    /// updates arriving mid-rebuild are picked up by the next one.
    pub fn rebuild(&self) -> Result<(), ArmError> {
        let snapshot = self.cache.snapshot();

        {
            let mut planner = self.planner.lock().unwrap_or_else(PoisonError::into_inner);
            let known = planner.known_obstacles();
            debug!(removing = known.len(), "clearing obstacle world model");
            if !known.is_empty() {
                planner.remove_obstacles(&known)?;
            }
        }
        thread::sleep(self.settle);

        let boxes = Self::obstacle_boxes(&snapshot);
        info!(obstacles = boxes.len(), "registering obstacle boxes");
        {
            let mut planner = self.planner.lock().unwrap_or_else(PoisonError::into_inner);
            planner.add_obstacles(boxes)?;
        }
        thread::sleep(self.settle);

        Ok(())
    }

    /// One box per snapshot object, plus the support surface when its plane
    /// is well-formed.
    fn obstacle_boxes(snapshot: &SceneSnapshot) -> Vec<CollisionBox> {
        let mut boxes = Vec::with_capacity(snapshot.len() + 1);

        for (id, pose) in &snapshot.poses {
            // The cache invariant guarantees a matching size entry.
            let Some(size) = snapshot.sizes.get(id) else {
                continue;
            };
            boxes.push(CollisionBox {
                id: id.to_string(),
                center: Vec3::new(
                    pose.position.x,
                    pose.position.y,
                    pose.position.z + size.height / 2.0,
                ),
                // Fixed convention: the cache's yaw is negated when the RPY
                // is translated into an obstacle rotation.
                orientation: RollPitchYaw::new(
                    pose.orientation.roll,
                    pose.orientation.pitch,
                    -pose.orientation.yaw,
                ),
                size: Dimensions::new(
                    size.width + OBSTACLE_CLEARANCE,
                    size.depth + OBSTACLE_CLEARANCE,
                    size.height + OBSTACLE_CLEARANCE,
                ),
            });
        }

        if let Some(table) = Self::support_surface_box(&snapshot.surface) {
            boxes.push(table);
        }

        boxes
    }

    /// Flat-box stand-in for the support surface, probed from its plane
    /// coefficients.  `None` when the plane is degenerate (|c| ~ 0), which
    /// also covers the zeroed surface before the first perception update.
    fn support_surface_box(surface: &SupportSurface) -> Option<CollisionBox> {
        let [a, b, c, d] = surface.coefficients;
        if c.abs() < 1.0e-6 {
            return None;
        }
        let z = (d + a * TABLE_PROBE_X + b * TABLE_PROBE_Y) / -c + TABLE_LIFT;
        Some(CollisionBox {
            id: TABLE_OBSTACLE_ID.to_string(),
            center: Vec3::new(TABLE_PROBE_X, TABLE_PROBE_Y, z),
            orientation: RollPitchYaw::zero(),
            size: TABLE_SIZE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armos_planner::{SimPlanner, shared_planner};
    use armos_types::{ObjectObservation, ObservationFrame, Quat};
    use std::f64::consts::FRAC_PI_4;

    fn frame(ids: &[i32], table: SupportSurface) -> ObservationFrame {
        ObservationFrame {
            objects: ids
                .iter()
                .map(|&id| ObjectObservation {
                    id,
                    position: Vec3::new(0.5, 0.1 * id as f64, 0.72),
                    orientation: Quat::identity(),
                    size: Dimensions::new(0.06, 0.04, 0.10),
                })
                .collect(),
            table,
        }
    }

    fn synchronizer(frame: &ObservationFrame) -> (SceneSynchronizer, SharedPlanner) {
        let cache = Arc::new(PerceptionCache::new());
        cache.update(frame);
        let planner = shared_planner(SimPlanner::new());
        let sync = SceneSynchronizer::new(Arc::clone(&planner), cache, Duration::ZERO);
        (sync, planner)
    }

    fn known(planner: &SharedPlanner) -> Vec<String> {
        planner.lock().unwrap().known_obstacles()
    }

    #[test]
    fn rebuild_registers_one_box_per_object_plus_table() {
        let (sync, planner) = synchronizer(&frame(&[1, 2], SupportSurface::new([0.0, 0.0, 1.0, -0.7])));
        sync.rebuild().unwrap();

        let mut ids = known(&planner);
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "table"]);
    }

    #[test]
    fn rebuild_is_wholesale() {
        let cache = Arc::new(PerceptionCache::new());
        cache.update(&frame(&[1, 2, 3], SupportSurface::new([0.0, 0.0, 1.0, -0.7])));
        let planner = shared_planner(SimPlanner::new());
        let sync = SceneSynchronizer::new(Arc::clone(&planner), Arc::clone(&cache), Duration::ZERO);
        sync.rebuild().unwrap();
        assert_eq!(known(&planner).len(), 4);

        // A new frame with different ids fully replaces the obstacle set.
        cache.update(&frame(&[9], SupportSurface::new([0.0, 0.0, 1.0, -0.7])));
        sync.rebuild().unwrap();
        let mut ids = known(&planner);
        ids.sort();
        assert_eq!(ids, vec!["9", "table"]);
    }

    #[test]
    fn box_geometry_matches_the_cached_object() {
        let mut observation_frame = frame(&[5], SupportSurface::default());
        // Quarter turn about z so the yaw-negation convention is visible.
        let half = FRAC_PI_4 / 2.0;
        observation_frame.objects[0].orientation = Quat::new(half.cos(), 0.0, 0.0, half.sin());

        let cache = Arc::new(PerceptionCache::new());
        cache.update(&observation_frame);
        let snapshot = cache.snapshot();
        let boxes = SceneSynchronizer::obstacle_boxes(&snapshot);
        assert_eq!(boxes.len(), 1, "degenerate plane adds no table box");

        let b = &boxes[0];
        // Center raised by half the cached height.
        assert!((b.center.z - (0.72 + 0.05)).abs() < 1.0e-9);
        // Dimensions padded by the clearance margin.
        assert!((b.size.width - 0.08).abs() < 1.0e-9);
        assert!((b.size.depth - 0.06).abs() < 1.0e-9);
        assert!((b.size.height - 0.12).abs() < 1.0e-9);
        // Yaw negated relative to the cached pose.
        assert!((b.orientation.yaw + FRAC_PI_4).abs() < 1.0e-9);
    }

    #[test]
    fn table_height_is_probed_from_the_plane() {
        // z = (d + a*0.8 + b*0.0) / -c + lift with [0, 0, 1, -0.7] -> 0.71.
        let table =
            SceneSynchronizer::support_surface_box(&SupportSurface::new([0.0, 0.0, 1.0, -0.7]))
                .unwrap();
        assert!((table.center.z - 0.71).abs() < 1.0e-9);
        assert_eq!(table.id, TABLE_OBSTACLE_ID);
    }

    #[test]
    fn degenerate_plane_yields_no_table_box() {
        assert!(
            SceneSynchronizer::support_surface_box(&SupportSurface::new([1.0, 0.0, 0.0, -0.7]))
                .is_none()
        );
        assert!(SceneSynchronizer::support_surface_box(&SupportSurface::default()).is_none());
    }

    #[test]
    fn rebuild_with_empty_cache_leaves_only_the_table() {
        let (sync, planner) = synchronizer(&frame(&[], SupportSurface::new([0.0, 0.0, 1.0, -0.7])));
        sync.rebuild().unwrap();
        assert_eq!(known(&planner), vec!["table"]);
    }
}
