//! In-process simulation backends for headless runs and CI.
//!
//! [`SimPlanner`] implements the full [`MotionPlanner`] contract against an
//! in-memory world model, records every call it receives, and can be
//! scripted to fail planning or execution so the failure paths of the
//! plan → gate → execute pipeline are testable without hardware.
//! [`SimGripper`] does the same for the gripper boundary.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use armos_types::{ArmError, CollisionBox, MotionPlan, MotionRequest};
use tracing::{debug, info};
use uuid::Uuid;

use crate::gripper::Gripper;
use crate::planner::MotionPlanner;

// ────────────────────────────────────────────────────────────────────────────
// Call journal
// ────────────────────────────────────────────────────────────────────────────

/// One recorded call against the simulated planner.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerCall {
    SetTarget(MotionRequest),
    Plan,
    Execute(MotionRequest),
    AddObstacles(Vec<CollisionBox>),
    RemoveObstacles(Vec<String>),
}

/// Shared journal of planner calls.
///
/// Clone the handle out of [`SimPlanner::journal`] before boxing the
/// planner behind the trait; the journal stays readable afterwards.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<PlannerCall>>>,
}

impl CallJournal {
    fn record(&self, call: PlannerCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<PlannerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `plan()` calls seen so far.
    pub fn plan_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlannerCall::Plan))
            .count()
    }

    /// The requests passed to `execute()`, in order.
    pub fn executed_requests(&self) -> Vec<MotionRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlannerCall::Execute(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimPlanner
// ────────────────────────────────────────────────────────────────────────────

/// Simulated planning/execution engine.
///
/// Planning always succeeds against the current target (unless scripted
/// otherwise) and execution is instantaneous.  The obstacle world model is
/// a plain map keyed by obstacle id.
#[derive(Debug, Default)]
pub struct SimPlanner {
    journal: CallJournal,
    target: Option<MotionRequest>,
    obstacles: BTreeMap<String, CollisionBox>,
    fail_planning: bool,
    fail_execution: bool,
}

impl SimPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script every subsequent `plan()` call to fail.
    pub fn with_planning_failure(mut self) -> Self {
        self.fail_planning = true;
        self
    }

    /// Script every subsequent `execute()` call to fail.
    pub fn with_execution_failure(mut self) -> Self {
        self.fail_execution = true;
        self
    }

    /// Handle onto the call journal; stays valid after the planner is boxed.
    pub fn journal(&self) -> CallJournal {
        self.journal.clone()
    }
}

impl MotionPlanner for SimPlanner {
    fn set_target(&mut self, target: &MotionRequest) -> Result<(), ArmError> {
        self.journal.record(PlannerCall::SetTarget(target.clone()));
        self.target = Some(target.clone());
        Ok(())
    }

    fn plan(&mut self) -> Result<MotionPlan, ArmError> {
        self.journal.record(PlannerCall::Plan);
        let request = self.target.clone().ok_or(ArmError::NoTarget)?;
        if self.fail_planning {
            return Err(ArmError::PlanFailed);
        }
        debug!(?request, "sim planner produced a plan");
        Ok(MotionPlan {
            id: Uuid::new_v4(),
            request,
        })
    }

    fn execute(&mut self, plan: &MotionPlan) -> Result<(), ArmError> {
        self.journal
            .record(PlannerCall::Execute(plan.request.clone()));
        if self.fail_execution {
            return Err(ArmError::ExecutionFailed(
                "simulated trajectory abort".to_string(),
            ));
        }
        info!(plan = %plan.id, "sim planner executed trajectory");
        Ok(())
    }

    fn known_obstacles(&self) -> Vec<String> {
        self.obstacles.keys().cloned().collect()
    }

    fn add_obstacles(&mut self, obstacles: Vec<CollisionBox>) -> Result<(), ArmError> {
        self.journal
            .record(PlannerCall::AddObstacles(obstacles.clone()));
        for obstacle in obstacles {
            self.obstacles.insert(obstacle.id.clone(), obstacle);
        }
        Ok(())
    }

    fn remove_obstacles(&mut self, ids: &[String]) -> Result<(), ArmError> {
        self.journal
            .record(PlannerCall::RemoveObstacles(ids.to_vec()));
        for id in ids {
            self.obstacles.remove(id);
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimGripper
// ────────────────────────────────────────────────────────────────────────────

/// Observable state of a [`SimGripper`], shared with tests.
#[derive(Debug, Clone, Default)]
pub struct GripperProbe {
    inner: Arc<Mutex<GripperRecord>>,
}

#[derive(Debug, Default)]
struct GripperRecord {
    closed: bool,
    actuations: u32,
}

impl GripperProbe {
    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Number of `set_closed` calls the gripper has received.
    pub fn actuations(&self) -> u32 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .actuations
    }
}

/// Simulated gripper; actuation always succeeds.
#[derive(Debug, Default)]
pub struct SimGripper {
    probe: GripperProbe,
}

impl SimGripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto the observable jaw state; stays valid after boxing.
    pub fn probe(&self) -> GripperProbe {
        self.probe.clone()
    }
}

impl Gripper for SimGripper {
    fn id(&self) -> &str {
        "sim_gripper"
    }

    fn set_closed(&mut self, closed: bool) -> Result<(), ArmError> {
        let mut record = self
            .probe
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        record.closed = closed;
        record.actuations += 1;
        debug!(closed, "sim gripper actuated");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.probe.is_closed()
    }
}
