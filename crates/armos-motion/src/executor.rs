//! [`MotionExecutor`] – target derivation and the plan → gate → execute
//! pipeline.
//!
//! Every physical motion goes through the same pipeline: submit the target
//! to the planner, bail to `Failed` on a planning failure, ask the safety
//! gate, bail to `Failed` on rejection, execute, and land in `Idle` only
//! when execution itself reports success.  An execution fault is a `Failed`
//! transition, not a silent success.
//!
//! Pick and place add the gripper to the picture: the executor drives the
//! jaw through its Open → Moving → Closed state machine in lockstep with
//! the approach motion, and records the held object for the status stream.

use std::sync::Arc;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

use armos_perception::PerceptionCache;
use armos_planner::{Gripper, MotionPlanner, SharedGripper, SharedPlanner};
use armos_types::{
    ArmError, GateDecision, GripperState, MotionRequest, NUM_JOINTS, OperatingState, PlanOutcome,
    PoseTarget, RollPitchYaw, Vec3,
};
use tracing::{info, warn};

use crate::gate::SafetyGate;
use crate::state::StateHandle;

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// The fixed home joint configuration (radians, shoulder to wrist).
pub const HOME_JOINTS: [f64; NUM_JOINTS] = [1.32, 0.7, 0.0, -2.0, 0.0, -0.57, 0.0];

/// Reach-and-hover standoff from a pointed-at object, world x axis.
pub const POINT_STANDOFF_X: f64 = -0.22;

/// Reach-and-hover standoff from a pointed-at object, world z axis.
pub const POINT_STANDOFF_Z: f64 = 0.22;

/// Height above an object's top face (or a drop destination) at which the
/// pick/place approach pose is placed.
pub const VERTICAL_STANDOFF: f64 = 0.15;

/// End-effector pitch while pointing: tilted 45 degrees downward.
const POINT_PITCH: f64 = std::f64::consts::FRAC_PI_4;

/// End-effector pitch while picking/placing: straight down.
const VERTICAL_PITCH: f64 = std::f64::consts::FRAC_PI_2;

// ────────────────────────────────────────────────────────────────────────────
// MotionExecutor
// ────────────────────────────────────────────────────────────────────────────

/// Derives a target pose or joint configuration for each action, runs the
/// safety-gated pipeline, and lands the terminal operating state.
pub struct MotionExecutor {
    planner: SharedPlanner,
    gripper: SharedGripper,
    cache: Arc<PerceptionCache>,
    gate: SafetyGate,
    state: StateHandle,
    gripper_state: GripperState,
    /// Pause between a completed motion and its chained follow-up.
    settle: Duration,
}

impl MotionExecutor {
    pub fn new(
        planner: SharedPlanner,
        gripper: SharedGripper,
        cache: Arc<PerceptionCache>,
        gate: SafetyGate,
        state: StateHandle,
        settle: Duration,
    ) -> Self {
        Self {
            planner,
            gripper,
            cache,
            gate,
            state,
            gripper_state: GripperState::Open,
            settle,
        }
    }

    /// Current position of the jaw state machine.
    pub fn gripper_state(&self) -> GripperState {
        self.gripper_state
    }

    /// Drive the arm to the fixed home configuration.
    ///
    /// Always available regardless of perception state.
    pub fn home(&mut self) -> PlanOutcome {
        self.run_pipeline(MotionRequest::Joints(HOME_JOINTS))
    }

    /// Reach-and-hover near object `id`, then settle and chain back home.
    ///
    /// The command is complete only once both the point motion and the
    /// follow-up home motion have each gone through the full pipeline.
    ///
    /// # Errors
    ///
    /// [`ArmError::ObjectNotFound`] when `id` is absent from the current
    /// snapshot; the state lands in `Failed` and no motion request is made.
    pub fn point_at(&mut self, id: i32) -> Result<PlanOutcome, ArmError> {
        let snapshot = self.cache.snapshot();
        let Some((pose, _)) = snapshot.object(id) else {
            warn!(object = id, "point target not in perception snapshot");
            self.state.set(OperatingState::Failed);
            return Err(ArmError::ObjectNotFound(id));
        };

        let target = MotionRequest::Pose(PoseTarget {
            position: Vec3::new(
                pose.position.x + POINT_STANDOFF_X,
                pose.position.y,
                pose.position.z + POINT_STANDOFF_Z,
            ),
            orientation: RollPitchYaw::new(0.0, POINT_PITCH, 0.0),
        });

        let outcome = self.run_pipeline(target);
        if outcome != PlanOutcome::Executed {
            return Ok(outcome);
        }

        thread::sleep(self.settle);
        Ok(self.home())
    }

    /// Pick up object `id`: approach from above, close the gripper, settle,
    /// and chain back home with the object held.
    ///
    /// # Errors
    ///
    /// [`ArmError::ObjectNotFound`] when `id` is not in the snapshot;
    /// [`ArmError::GripperFault`] when jaw actuation fails.  Both land the
    /// state in `Failed`.
    pub fn grab(&mut self, id: i32) -> Result<PlanOutcome, ArmError> {
        let snapshot = self.cache.snapshot();
        let Some((pose, size)) = snapshot.object(id) else {
            warn!(object = id, "grab target not in perception snapshot");
            self.state.set(OperatingState::Failed);
            return Err(ArmError::ObjectNotFound(id));
        };

        let approach = MotionRequest::Pose(PoseTarget {
            position: Vec3::new(
                pose.position.x,
                pose.position.y,
                pose.position.z + size.height / 2.0 + VERTICAL_STANDOFF,
            ),
            orientation: RollPitchYaw::new(0.0, VERTICAL_PITCH, 0.0),
        });

        let outcome = self.run_pipeline(approach);
        if outcome != PlanOutcome::Executed {
            return Ok(outcome);
        }

        self.actuate_gripper(true)?;
        self.state.set_held_object(Some(id));
        info!(object = id, "object grasped");

        thread::sleep(self.settle);
        Ok(self.home())
    }

    /// Place the held object at `dest`: approach from above, open the
    /// gripper, settle, and chain back home.
    ///
    /// # Errors
    ///
    /// [`ArmError::NothingHeld`] when no object is held;
    /// [`ArmError::GripperFault`] when jaw actuation fails.  Both land the
    /// state in `Failed`.
    pub fn drop_at(&mut self, dest: Vec3) -> Result<PlanOutcome, ArmError> {
        let Some(held) = self.state.held_object() else {
            warn!("drop requested with no object held");
            self.state.set(OperatingState::Failed);
            return Err(ArmError::NothingHeld);
        };

        let approach = MotionRequest::Pose(PoseTarget {
            position: Vec3::new(dest.x, dest.y, dest.z + VERTICAL_STANDOFF),
            orientation: RollPitchYaw::new(0.0, VERTICAL_PITCH, 0.0),
        });

        let outcome = self.run_pipeline(approach);
        if outcome != PlanOutcome::Executed {
            return Ok(outcome);
        }

        self.actuate_gripper(false)?;
        self.state.set_held_object(None);
        info!(object = held, "object released");

        thread::sleep(self.settle);
        Ok(self.home())
    }

    // ────────────────────────────────────────────────────────────────────
    // Pipeline
    // ────────────────────────────────────────────────────────────────────

    /// One pass through plan → gate → execute for `request`.
    ///
    /// Lands the terminal operating state itself: `Idle` on success,
    /// `Failed` on any planning, gate, or execution failure.
    fn run_pipeline(&mut self, request: MotionRequest) -> PlanOutcome {
        let plan = {
            let mut planner = self.planner.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = planner.set_target(&request) {
                warn!(error = %e, "planner rejected target");
                self.state.set(OperatingState::Failed);
                return PlanOutcome::PlanFailed;
            }
            match planner.plan() {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(error = %e, "planning failed");
                    self.state.set(OperatingState::Failed);
                    return PlanOutcome::PlanFailed;
                }
            }
            // The lock drops here so the (possibly indefinite) confirmation
            // prompt never holds the planner.
        };

        if self.gate.confirm(&plan) == GateDecision::Rejected {
            self.state.set(OperatingState::Failed);
            return PlanOutcome::GateRejected;
        }

        let mut planner = self.planner.lock().unwrap_or_else(PoisonError::into_inner);
        match planner.execute(&plan) {
            Ok(()) => {
                self.state.set(OperatingState::Idle);
                PlanOutcome::Executed
            }
            Err(e) => {
                warn!(error = %e, "trajectory execution failed");
                self.state.set(OperatingState::Failed);
                PlanOutcome::ExecutionFailed
            }
        }
    }

    /// Drive the jaw through Moving into the commanded position.
    fn actuate_gripper(&mut self, closed: bool) -> Result<(), ArmError> {
        self.gripper_state = GripperState::Moving;
        let result = self
            .gripper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_closed(closed);
        match result {
            Ok(()) => {
                self.gripper_state = if closed {
                    GripperState::Closed
                } else {
                    GripperState::Open
                };
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "gripper actuation failed");
                self.state.set(OperatingState::Failed);
                Err(e)
            }
        }
    }
}
