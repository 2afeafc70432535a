//! [`MotionPlanner`] – the trait the motion layer plans and executes through.

use std::sync::{Arc, Mutex};

use armos_types::{ArmError, CollisionBox, MotionPlan, MotionRequest};

/// The external planning/execution engine, seen from inside ARMOS.
///
/// Implementations are stateful in two ways: the current target (set by
/// [`set_target`][Self::set_target], consumed by [`plan`][Self::plan]) and
/// the obstacle world model.  Every call is synchronous and may be slow;
/// callers must expect a `plan` or `execute` call to hold its thread until
/// the engine completes or fails.  Failures are surfaced, never retried
/// here; a retry is always an externally-issued new command.
pub trait MotionPlanner: Send {
    /// Install `target` as the goal for the next [`plan`][Self::plan] call.
    fn set_target(&mut self, target: &MotionRequest) -> Result<(), ArmError>;

    /// Compute a feasible plan to the current target.
    ///
    /// # Errors
    ///
    /// [`ArmError::PlanFailed`] when no feasible plan exists;
    /// [`ArmError::NoTarget`] when no target has been set.
    fn plan(&mut self) -> Result<MotionPlan, ArmError>;

    /// Execute a previously computed plan on the arm.
    ///
    /// # Errors
    ///
    /// [`ArmError::ExecutionFailed`] when the trajectory aborts mid-flight.
    fn execute(&mut self, plan: &MotionPlan) -> Result<(), ArmError>;

    /// Ids of every obstacle currently registered in the world model.
    fn known_obstacles(&self) -> Vec<String>;

    /// Register box obstacles.  An existing obstacle with the same id is
    /// replaced.
    fn add_obstacles(&mut self, obstacles: Vec<CollisionBox>) -> Result<(), ArmError>;

    /// Remove the named obstacles.  Unknown ids are ignored.
    fn remove_obstacles(&mut self, ids: &[String]) -> Result<(), ArmError>;
}

/// A planner handle shareable between the motion executor and the scene
/// synchronizer.  Both run on the command worker thread, so the mutex is
/// uncontended in practice; it exists so the handle is `Send + Sync`.
pub type SharedPlanner = Arc<Mutex<Box<dyn MotionPlanner>>>;

/// Wrap a concrete planner into a [`SharedPlanner`].
pub fn shared_planner<P: MotionPlanner + 'static>(planner: P) -> SharedPlanner {
    Arc::new(Mutex::new(Box::new(planner)))
}
