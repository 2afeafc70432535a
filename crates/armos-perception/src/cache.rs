//! [`PerceptionCache`] – thread-safe store of the latest perception frame.
//!
//! The perception feed and the motion layer run on different threads, so
//! the cache is the one place in the stack with an explicit
//! mutual-exclusion discipline: [`update`][PerceptionCache::update] holds
//! the write lock for its full duration (clear, then rebuild both maps and
//! the surface), and [`snapshot`][PerceptionCache::snapshot] holds the read
//! lock only long enough to clone the current values out.  No caller ever
//! retains a reference into live cache state, so a reader can never observe
//! a frame that is half old, half new.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use armos_types::{Dimensions, ObservationFrame, RollPitchYaw, SupportSurface, Vec3};
use tracing::debug;

use crate::pose::quat_to_rpy;

/// Cached pose of one observed object: position plus decomposed orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPose {
    pub position: Vec3,
    pub orientation: RollPitchYaw,
}

/// A consistent copy of the cache contents at one instant.
///
/// The pose map and the size map are guaranteed to have identical key sets.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub poses: HashMap<i32, ObjectPose>,
    pub sizes: HashMap<i32, Dimensions>,
    pub surface: SupportSurface,
}

impl SceneSnapshot {
    /// Look up one object's pose and size together.
    pub fn object(&self, id: i32) -> Option<(&ObjectPose, &Dimensions)> {
        match (self.poses.get(&id), self.sizes.get(&id)) {
            (Some(pose), Some(size)) => Some((pose, size)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

#[derive(Debug, Default)]
struct Inner {
    poses: HashMap<i32, ObjectPose>,
    sizes: HashMap<i32, Dimensions>,
    surface: SupportSurface,
}

/// Thread-safe store of the most recent object poses, object dimensions,
/// and support-surface parameters.
///
/// Shared between threads behind an `Arc`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct PerceptionCache {
    inner: RwLock<Inner>,
}

impl PerceptionCache {
    /// Create an empty cache (no objects, zeroed surface).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire cache contents with `frame`.
    ///
    /// Holds the exclusive lock for the whole call: prior state is cleared
    /// first, then both maps and the surface descriptor are rebuilt, so the
    /// id sets of the pose and size maps always match once the lock drops.
    /// Orientations are decomposed to roll/pitch/yaw here, before storage.
    pub fn update(&self, frame: &ObservationFrame) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        inner.poses.clear();
        inner.sizes.clear();
        inner.surface = frame.table;

        for obs in &frame.objects {
            inner.poses.insert(
                obs.id,
                ObjectPose {
                    position: obs.position,
                    orientation: quat_to_rpy(&obs.orientation),
                },
            );
            inner.sizes.insert(obs.id, obs.size);
        }

        debug!(objects = frame.objects.len(), "perception cache updated");
    }

    /// Copy the current contents out under the read lock.
    pub fn snapshot(&self) -> SceneSnapshot {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        SceneSnapshot {
            poses: inner.poses.clone(),
            sizes: inner.sizes.clone(),
            surface: inner.surface,
        }
    }
}
